use crate::config::SESSION_EVENTS_CHANNEL_SIZE;
use fadmin_protocol::http::auth::UserProfile;
use tokio::sync::broadcast;

/// Host environment hook invoked by the request pipeline.
pub trait Navigator: Send + Sync + 'static {
    /// Asks the host to navigate to `path`, used once a session cannot be recovered.
    fn navigate(&self, path: &str);

    /// Called after the access token was refreshed.
    fn token_refreshed(&self) {}

    fn logged_in(&self, _user: &UserProfile) {}

    fn logged_out(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { email: String },
    LoggedOut,
    TokenRefreshed,
    /// The session expired and could not be refreshed, the user has to log in again.
    Unauthenticated { redirect_to: String },
}

/// [`Navigator`] broadcasting [`SessionEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        Self {
            tx: broadcast::channel(SESSION_EVENTS_CHANNEL_SIZE).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: SessionEvent) {
        tracing::trace!(?event, "Emitting session event");
        // no subscribers is fine
        self.tx.send(event).ok();
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for SessionEvents {
    fn navigate(&self, path: &str) {
        self.emit(SessionEvent::Unauthenticated {
            redirect_to: path.to_string(),
        });
    }

    fn token_refreshed(&self) {
        self.emit(SessionEvent::TokenRefreshed);
    }

    fn logged_in(&self, user: &UserProfile) {
        self.emit(SessionEvent::LoggedIn {
            email: user.email.clone(),
        });
    }

    fn logged_out(&self) {
        self.emit(SessionEvent::LoggedOut);
    }
}
