use crate::models::TaskStatus;
use thiserror::Error;

/// Domain errors. Gate violations and not-found conditions are returned
/// to the caller as typed values; channel delivery failures are not in
/// this taxonomy because they never fail the originating mutation (see
/// `notify::ChannelOutcome`).
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid username or password")]
    InvalidCredential,

    #[error("user #{0} not found")]
    UserNotFound(i64),

    #[error("username '{0}' is already taken")]
    UsernameConflict(String),

    #[error("operation not permitted for this user")]
    Forbidden,

    #[error("a comment is required before marking a task {0}")]
    CommentRequired(TaskStatus),

    #[error("task #{0} not found")]
    TaskNotFound(i64),

    #[error("project #{0} not found")]
    ProjectNotFound(i64),

    #[error("credential processing failed: {0}")]
    Credential(String),

    #[error("store unavailable: {0}")]
    Store(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for the gate violations a caller is expected to surface as
    /// user-facing messages rather than failures.
    pub fn is_gate_violation(&self) -> bool {
        matches!(self, Error::Forbidden | Error::CommentRequired(_))
    }
}
