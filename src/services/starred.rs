use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::{
    api::ScanApi,
    error::{ClientError, Result},
    models::scan::ScanRecord,
    models::starred::{StarRequest, StarredEntry, StarredMap},
    validation::starred::validate_note,
};

/// A source of "now" for timestamps assigned on first star.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Action {
    Save,
    Remove,
}

impl Action {
    fn describe(self, image_id: &str) -> String {
        match self {
            Action::Save => format!("saving the note for {}", image_id),
            Action::Remove => format!("removing the star from {}", image_id),
        }
    }
}

type InFlightKey = (Action, String, String);

/// Releases an in-flight slot when the call settles or is dropped.
struct InFlightGuard<'a> {
    slots: &'a Mutex<HashSet<InFlightKey>>,
    key: Option<InFlightKey>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let (Some(key), Ok(mut slots)) = (self.key.take(), self.slots.lock()) {
            slots.remove(&key);
        }
    }
}

/// The local mirror of one user's starred collection.
#[derive(Default)]
struct StarredCache {
    owner: Option<String>,
    entries: StarredMap,
    known_scans: HashMap<String, ScanRecord>,
    selected: Option<String>,
}

impl StarredCache {
    /// Drops everything belonging to a different user.
    fn switch_to(&mut self, user_id: &str) {
        if self.owner.as_deref() != Some(user_id) {
            *self = StarredCache {
                owner: Some(user_id.to_string()),
                ..StarredCache::default()
            };
        }
    }

    fn owned_by(&self, user_id: &str) -> bool {
        self.owner.as_deref() == Some(user_id)
    }
}

/// Reconciles the remote starred collection with a write-through local cache.
///
/// The remote store is the authority: the cache only changes after the
/// backend has accepted a mutation, so a failed call leaves the cache exactly
/// as it was.
pub struct StarredSync {
    api: Arc<dyn ScanApi>,
    clock: Arc<dyn Clock>,
    cache: Mutex<StarredCache>,
    in_flight: Mutex<HashSet<InFlightKey>>,
}

impl StarredSync {
    pub fn new(api: Arc<dyn ScanApi>) -> Self {
        Self::with_clock(api, Arc::new(SystemClock))
    }

    pub fn with_clock(api: Arc<dyn ScanApi>, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            clock,
            cache: Mutex::new(StarredCache::default()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn cache(&self) -> Result<MutexGuard<'_, StarredCache>> {
        self.cache
            .lock()
            .map_err(|_| ClientError::Internal("starred cache lock poisoned".to_string()))
    }

    fn begin(&self, action: Action, user_id: &str, image_id: &str) -> Result<InFlightGuard<'_>> {
        let key = (action, user_id.to_string(), image_id.to_string());
        let mut slots = self
            .in_flight
            .lock()
            .map_err(|_| ClientError::Internal("in-flight lock poisoned".to_string()))?;

        if !slots.insert(key.clone()) {
            return Err(ClientError::ActionInFlight(action.describe(image_id)));
        }

        Ok(InFlightGuard {
            slots: &self.in_flight,
            key: Some(key),
        })
    }

    /// Whether a save or removal for `image_id` is waiting on the backend.
    pub fn is_busy(&self, user_id: &str, image_id: &str) -> bool {
        self.in_flight.lock().is_ok_and(|slots| {
            [Action::Save, Action::Remove]
                .into_iter()
                .any(|action| slots.contains(&(action, user_id.to_string(), image_id.to_string())))
        })
    }

    /// Fetches the user's full starred collection and replaces the cache with it.
    ///
    /// # Returns
    ///
    /// A `Result` containing the collection. On failure the cache is unchanged.
    pub async fn list(&self, user_id: &str) -> Result<StarredMap> {
        let remote = self.api.starred(user_id).await?;

        for (image_id, entry) in &remote {
            if entry.image_data.is_none() {
                tracing::warn!("Starred image {} is missing image_data", image_id);
            }
        }
        tracing::info!("⭐ Loaded {} starred images for {}", remote.len(), user_id);

        let mut cache = self.cache()?;
        cache.switch_to(user_id);
        if let Some(selected) = cache.selected.clone() {
            if !remote.contains_key(&selected) {
                cache.selected = None;
            }
        }
        cache.entries = remote.clone();

        Ok(remote)
    }

    /// Stars an image or updates its note.
    ///
    /// The entry is built from what is already known locally (an existing
    /// star, else a scan seen in history) so image bytes are never fetched
    /// twice. An existing star keeps its original timestamp.
    ///
    /// # Returns
    ///
    /// A `Result` containing the entry as now cached.
    pub async fn add_or_update(&self, user_id: &str, image_id: &str, note: &str) -> Result<StarredEntry> {
        validate_note(note)?;
        let _guard = self.begin(Action::Save, user_id, image_id)?;

        let entry = self.merge(user_id, image_id, note)?;

        self.api
            .star(&StarRequest {
                user_id,
                image_id,
                note,
            })
            .await?;

        {
            let mut cache = self.cache()?;
            cache.switch_to(user_id);
            cache.entries.insert(image_id.to_string(), entry.clone());
        }

        tracing::info!("⭐ Saved note for {}", image_id);
        Ok(entry)
    }

    fn merge(&self, user_id: &str, image_id: &str, note: &str) -> Result<StarredEntry> {
        let cache = self.cache()?;
        let owned = cache.owned_by(user_id);

        let existing = owned.then(|| cache.entries.get(image_id)).flatten();
        let known_scan = owned.then(|| cache.known_scans.get(image_id)).flatten();

        let mut entry = match (existing, known_scan) {
            (Some(existing), _) => StarredEntry {
                note: note.to_string(),
                ..existing.clone()
            },
            (None, Some(scan)) => StarredEntry::from_scan(scan, note.to_string(), self.clock.now()),
            (None, None) => StarredEntry::bare(image_id, note.to_string(), self.clock.now()),
        };

        if entry.image_data.is_none() {
            entry.image_data = known_scan.and_then(|scan| scan.image_data.clone());
        }
        entry.user_id = Some(user_id.to_string());

        Ok(entry)
    }

    /// Unstars an image.
    ///
    /// The remote delete always happens, even for images not cached locally.
    /// Only after it succeeds is the cache entry dropped, along with the
    /// selection if it pointed at that image.
    pub async fn remove(&self, user_id: &str, image_id: &str) -> Result<()> {
        let _guard = self.begin(Action::Remove, user_id, image_id)?;

        self.api.unstar(user_id, image_id).await?;

        {
            let mut cache = self.cache()?;
            if cache.owned_by(user_id) {
                cache.entries.remove(image_id);
                if cache.selected.as_deref() == Some(image_id) {
                    cache.selected = None;
                }
            }
        }

        tracing::info!("⭐ Removed star from {}", image_id);
        Ok(())
    }

    /// Records scans the user has seen so their fields can seed new stars.
    pub fn remember_scans<'a>(&self, user_id: &str, scans: impl IntoIterator<Item = &'a ScanRecord>) -> Result<()> {
        let mut cache = self.cache()?;
        cache.switch_to(user_id);
        for scan in scans {
            cache.known_scans.insert(scan.image_id.clone(), scan.clone());
        }
        Ok(())
    }

    /// A known scan record, if one was remembered for this user.
    pub fn known_scan(&self, user_id: &str, image_id: &str) -> Option<ScanRecord> {
        let cache = self.cache().ok()?;
        if !cache.owned_by(user_id) {
            return None;
        }
        cache.known_scans.get(image_id).cloned()
    }

    /// A snapshot of the cached collection.
    pub fn cached(&self) -> StarredMap {
        self.cache().map(|cache| cache.entries.clone()).unwrap_or_default()
    }

    pub fn get(&self, image_id: &str) -> Option<StarredEntry> {
        self.cache().ok()?.entries.get(image_id).cloned()
    }

    pub fn is_starred(&self, image_id: &str) -> bool {
        self.cache().is_ok_and(|cache| cache.entries.contains_key(image_id))
    }

    /// Marks a cached entry as the one on display.
    pub fn select(&self, image_id: &str) -> Result<()> {
        let mut cache = self.cache()?;
        if !cache.entries.contains_key(image_id) {
            return Err(ClientError::Validation(format!("{} is not starred", image_id)));
        }
        cache.selected = Some(image_id.to_string());
        Ok(())
    }

    pub fn selected(&self) -> Option<StarredEntry> {
        let cache = self.cache().ok()?;
        cache
            .selected
            .as_ref()
            .and_then(|id| cache.entries.get(id))
            .cloned()
    }

    pub fn clear_selection(&self) {
        if let Ok(mut cache) = self.cache() {
            cache.selected = None;
        }
    }

    /// Forgets everything, e.g. on logout.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache() {
            *cache = StarredCache::default();
        }
    }
}
