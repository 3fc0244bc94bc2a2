//! Process lifecycle ownership for the wallpaper engine.
//!
//! Exactly one engine may hold the desktop surface. That guarantee lives
//! here, not in the embedding code: a named OS-global mutex is taken before
//! anything else starts, and a second instance exits immediately.
//!
//! Restart is deliberately a process boundary, not an in-process reset: a
//! fresh image releases every native resource (window handles, GPU context,
//! webview profile) for free.

mod error;
mod instance;
mod launch;
mod probe;
mod restart;

pub use error::SupervisorError;
pub use instance::SingleInstance;
pub use launch::launch_detached;
pub use probe::{probe, PROBE_TIMEOUT};
pub use restart::exit_or_restart;

/// Name of the engine's OS-global instance mutex.
pub const INSTANCE_MUTEX_NAME: &str = "Global\\livewall_engine";

/// Result type for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;
