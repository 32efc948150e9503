use crate::{
    error::{ClientError, Result},
    models::starred::StarredEntry,
    services::starred::StarredSync,
};

/// Where one image's note stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteState {
    Unstarred,
    Starred { note: String },
    /// A draft is open. `existing` is the saved note, if the image was
    /// already starred when editing began.
    Editing { draft: String, existing: Option<String> },
}

/// The note editor for a single image.
///
/// `Unstarred → Editing → Starred`, `Starred → Editing → Starred`, and a
/// cancelled edit goes back to where it started. The move to `Starred`
/// happens only once the backend has accepted the note.
#[derive(Debug)]
pub struct NoteEditor {
    image_id: String,
    state: NoteState,
    saving: bool,
    error: Option<String>,
}

impl NoteEditor {
    /// Opens an editor reflecting what the synchronizer has cached.
    pub fn for_image(sync: &StarredSync, image_id: &str) -> Self {
        let state = match sync.get(image_id) {
            Some(entry) => NoteState::Starred { note: entry.note },
            None => NoteState::Unstarred,
        };

        Self {
            image_id: image_id.to_string(),
            state,
            saving: false,
            error: None,
        }
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn state(&self) -> &NoteState {
        &self.state
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// The message from the last failed save.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, NoteState::Editing { .. })
    }

    /// Opens a draft, pre-filled with the saved note when there is one.
    pub fn begin(&mut self) {
        self.error = None;
        self.state = match std::mem::replace(&mut self.state, NoteState::Unstarred) {
            NoteState::Unstarred => NoteState::Editing {
                draft: String::new(),
                existing: None,
            },
            NoteState::Starred { note } => NoteState::Editing {
                draft: note.clone(),
                existing: Some(note),
            },
            editing @ NoteState::Editing { .. } => editing,
        };
    }

    /// Replaces the draft text. Ignored when no draft is open.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        if let NoteState::Editing { draft, .. } = &mut self.state {
            *draft = text.into();
        }
    }

    /// Whether the save action should be enabled.
    pub fn can_save(&self) -> bool {
        match &self.state {
            NoteState::Editing { draft, .. } => !self.saving && !draft.trim().is_empty(),
            _ => false,
        }
    }

    /// Closes the draft without saving anything.
    pub fn cancel(&mut self) {
        if self.saving {
            return;
        }
        if let NoteState::Editing { existing, .. } = &mut self.state {
            self.state = Self::settled(existing.take());
        }
    }

    /// Sends the draft through the synchronizer.
    ///
    /// On success the editor is `Starred` with the saved note. On failure it
    /// returns to its pre-edit state and keeps the error for display. A
    /// trigger ignored because the same save is already in flight leaves the
    /// draft open.
    pub async fn save(&mut self, sync: &StarredSync, user_id: &str) -> Result<StarredEntry> {
        let (draft, existing) = match &self.state {
            NoteState::Editing { draft, existing } => (draft.clone(), existing.clone()),
            _ => {
                return Err(ClientError::Validation("No note is being edited".to_string()));
            }
        };

        if self.saving {
            return Err(ClientError::ActionInFlight(format!(
                "saving the note for {}",
                self.image_id
            )));
        }

        self.saving = true;
        let outcome = sync.add_or_update(user_id, &self.image_id, &draft).await;
        self.saving = false;

        match outcome {
            Ok(entry) => {
                self.error = None;
                self.state = NoteState::Starred {
                    note: entry.note.clone(),
                };
                Ok(entry)
            }
            Err(e @ ClientError::ActionInFlight(_)) => Err(e),
            Err(e) => {
                self.error = Some(e.user_message());
                self.state = Self::settled(existing);
                Err(e)
            }
        }
    }

    fn settled(existing: Option<String>) -> NoteState {
        match existing {
            Some(note) => NoteState::Starred { note },
            None => NoteState::Unstarred,
        }
    }
}
