//! Error types for desktop embedding.

use thiserror::Error;

/// Errors that can occur while attaching to the shell's desktop layer.
///
/// Not fatal in steady state: the controller degrades to bottom-of-stack
/// placement and retries on later poll opportunities.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// A Win32 call failed.
    #[error("windows api error: {0}")]
    WindowsApi(String),
}

#[cfg(windows)]
impl From<windows::core::Error> for EmbedError {
    fn from(err: windows::core::Error) -> Self {
        Self::WindowsApi(err.message().to_string())
    }
}
