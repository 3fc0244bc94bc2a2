//! Typed cross-thread messages and session identity for the wallpaper engine.
//!
//! The engine's UI thread owns the render surface and every window mutation.
//! Background threads (control server, poll timer) never touch it directly;
//! they send [`EngineCommand`]s through a bounded channel that the app drains
//! into its event loop.

mod commands;
mod session;

pub use commands::EngineCommand;
pub use session::{EngineSession, RenderMode, SessionFlags, AUTH_TOKEN_LEN};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for commands (background threads → UI thread).
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Creates a bounded command channel.
pub fn command_channel() -> (Sender<EngineCommand>, Receiver<EngineCommand>) {
    crossbeam_channel::bounded(COMMAND_CHANNEL_CAPACITY)
}
