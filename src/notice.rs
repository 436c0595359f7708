//! User-facing notices (the toast collaborator).

use tracing::{info, warn};

/// Transient success/error messages shown to the user.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Notifier that only writes to the log. Used when no UI is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        info!(notice = %message, "success");
    }

    fn error(&self, message: &str) {
        warn!(notice = %message, "error");
    }
}
