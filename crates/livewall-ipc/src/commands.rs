//! Commands marshaled onto the UI thread.

use serde::{Deserialize, Serialize};

/// Requests into the engine's UI thread.
///
/// `Reload` and `Quit` are terminal: once scheduled they are not cancellable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineCommand {
    /// Restart the whole engine process (restart flag set by the sender).
    Reload,

    /// Shut down cleanly without restarting.
    Quit,

    /// Operator-requested pause of the content source.
    Pause,

    /// Operator-requested resume of the content source.
    Resume,

    /// Periodic foreground-window poll tick for the embedding state machine.
    PollTick,
}
