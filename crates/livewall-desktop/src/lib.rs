//! Desktop-layer embedding and the auto-pause/resume state machine.
//!
//! The render window lives beneath the desktop icons: the shell's `Progman`
//! window is asked to spawn its `WorkerW` background host and the render
//! surface is reparented under it. A periodic poll watches the foreground
//! window and pauses the wallpaper whenever another window occupies the full
//! screen, since frames drawn behind it would be wasted.
//!
//! The Win32 queries live in [`win`]; the decision logic is a pure core so
//! the state machine tests run anywhere.

mod controller;
mod error;
mod poll;

#[cfg(windows)]
pub mod win;

pub use controller::{EmbedController, EmbedState, Transition};
pub use error::EmbedError;
pub use poll::{classify, ForegroundWindow, PollVerdict, Rect, SHELL_WINDOW_CLASSES};

/// Result type for embedding operations.
pub type EmbedResult<T> = Result<T, EmbedError>;
