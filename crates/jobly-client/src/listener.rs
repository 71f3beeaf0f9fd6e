//! Session-expired notification.

/// Observer told when a refresh cycle fails and the stored credentials have
/// been cleared. The application typically sends the user to sign in again.
///
/// Called once per failed refresh cycle, regardless of how many requests
/// were waiting on it.
pub trait SessionListener: Send + Sync {
    fn session_expired(&self);
}

impl<F> SessionListener for F
where
    F: Fn() + Send + Sync,
{
    fn session_expired(&self) {
        self()
    }
}

/// Listener used when the application registers none.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct NoopListener;

impl SessionListener for NoopListener {
    fn session_expired(&self) {}
}
