use std::fmt;

use crate::{models::session::Session, services::session::SessionManager};

/// Every view the client can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Login,
    Register,
    About,
    Upload,
    History,
    Starred,
}

impl View {
    pub const ALL: [View; 7] = [
        View::Home,
        View::Login,
        View::Register,
        View::About,
        View::Upload,
        View::History,
        View::Starred,
    ];

    pub fn path(self) -> &'static str {
        match self {
            View::Home => "/",
            View::Login => "/login",
            View::Register => "/register",
            View::About => "/about",
            View::Upload => "/upload",
            View::History => "/history",
            View::Starred => "/starred",
        }
    }

    /// Whether the view needs a logged-in user.
    pub fn is_protected(self) -> bool {
        matches!(self, View::Upload | View::History | View::Starred)
    }

    /// Resolves a path. Unknown paths land on Home.
    pub fn from_path(path: &str) -> View {
        let trimmed = path.trim();
        let normalized = match trimmed.trim_end_matches('/') {
            "" => "/",
            p => p,
        };

        View::ALL
            .into_iter()
            .find(|view| view.path() == normalized)
            .unwrap_or(View::Home)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// The outcome of a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Show the view. Protected views always carry the session.
    Render(View, Option<Session>),
    /// Go somewhere else first.
    Redirect(View),
}

/// Resolves `path` against the current session.
///
/// The session is read from the store on every call, so a view that rendered
/// before a logout redirects right after it.
pub fn navigate(sessions: &SessionManager, path: &str) -> Navigation {
    let view = View::from_path(path);
    let session = sessions.current_session();

    if view.is_protected() && session.is_none() {
        tracing::debug!("🔒 {} requires login, redirecting", view);
        return Navigation::Redirect(View::Login);
    }

    Navigation::Render(view, session)
}
