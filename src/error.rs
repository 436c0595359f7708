//! Error codes shared by every error enum in the crate.
//!
//! Each error carries a stable `E_*` code so log lines and notices can be
//! grepped independently of the human message.

/// Stable machine-readable code for an error value.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    /// Whether repeating the same action unchanged may succeed.
    fn retryable(&self) -> bool {
        false
    }
}
