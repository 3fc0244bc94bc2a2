//! Error types for process supervision.

use thiserror::Error;

/// Errors that can occur during process supervision.
///
/// All of these are fatal at startup only; nothing here fires in steady
/// state.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Another engine instance already holds the mutex.
    #[error("another engine instance is already running")]
    AlreadyRunning,

    /// The instance mutex could not be created.
    #[error("failed to create instance mutex: {0}")]
    MutexFailed(String),

    /// A child process could not be spawned.
    #[error("failed to launch process: {0}")]
    Spawn(#[from] std::io::Error),
}
