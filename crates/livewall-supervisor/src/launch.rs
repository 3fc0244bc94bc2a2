//! Detached child process creation.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use tracing::info;

use crate::SupervisorResult;

/// Windows process creation flags for a fully detached child.
///
/// New process group + no inherited console, so the parent (launcher or the
/// restarting engine) can exit without taking the child with it.
#[cfg(windows)]
const DETACHED_FLAGS: u32 = 0x0000_0200 | 0x0000_0008; // CREATE_NEW_PROCESS_GROUP | DETACHED_PROCESS

/// Spawns `program args…` detached from the current process.
pub fn launch_detached<I, S>(program: &Path, args: I) -> SupervisorResult<u32>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = program.parent() {
        command.current_dir(dir);
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(DETACHED_FLAGS);
    }

    let child = command.spawn()?;
    let pid = child.id();
    info!(program = %program.display(), pid, "launched detached process");
    Ok(pid)
}
