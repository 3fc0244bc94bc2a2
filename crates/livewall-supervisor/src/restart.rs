//! Engine shutdown with optional self-restart.

use livewall_ipc::SessionFlags;
use tracing::{error, info};

use crate::launch::launch_detached;

/// Terminates the process, respawning a fresh copy of the current
/// executable first when a restart was requested.
///
/// The replacement inherits the original command line arguments and is
/// spawned detached before this process exits 0. Callers must drop their
/// `SingleInstance` guard first, since the child acquires its own mutex
/// while this process is still winding down.
pub fn exit_or_restart(flags: &SessionFlags, code: i32) -> ! {
    if flags.is_restarting() {
        match std::env::current_exe() {
            Ok(exe) => {
                let args: Vec<std::ffi::OsString> = std::env::args_os().skip(1).collect();
                match launch_detached(&exe, args) {
                    Ok(pid) => info!(pid, "restarting engine"),
                    Err(err) => error!(%err, "restart spawn failed"),
                }
            }
            Err(err) => error!(%err, "cannot resolve current executable for restart"),
        }
        std::process::exit(0);
    }
    std::process::exit(code);
}
