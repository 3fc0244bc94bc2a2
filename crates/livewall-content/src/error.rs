use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[cfg(windows)]
    #[error("webview error: {0}")]
    Webview(#[from] wry::Error),

    #[error("failed to spawn mpv: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("mpv ipc pipe error: {0}")]
    Ipc(#[source] std::io::Error),

    #[error("media file not found: {0}")]
    MediaMissing(PathBuf),
}

pub type ContentResult<T> = Result<T, ContentError>;
