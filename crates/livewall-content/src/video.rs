//! Video playback through an embedded mpv child process.

use std::path::Path;

use livewall_config::VideoOptions;

/// Builds the mpv command line for an embedded, endlessly looping player.
///
/// The read-ahead cache is generous so the loop boundary never stalls on
/// disk; frame rate is capped with a filter rather than display sync so a
/// 30 fps wallpaper does not burn a 144 Hz monitor's worth of decode.
pub fn mpv_args(media: &Path, surface_handle: isize, options: &VideoOptions, pipe: &str) -> Vec<String> {
    let mut args = vec![
        format!("--wid={surface_handle}"),
        format!("--input-ipc-server={pipe}"),
        "--loop-file=inf".to_string(),
        "--hwdec=auto".to_string(),
        "--keep-open=yes".to_string(),
        "--cache=yes".to_string(),
        "--demuxer-max-bytes=500M".to_string(),
        "--demuxer-readahead-secs=20".to_string(),
        "--no-osc".to_string(),
        "--no-input-default-bindings".to_string(),
        format!("--vf=fps={}", options.fps_limit),
    ];
    if options.mute {
        args.push("--mute=yes".to_string());
    } else {
        args.push(format!("--volume={}", options.volume));
    }
    args.push(media.display().to_string());
    args
}

#[cfg(windows)]
pub use player::VideoPlayer;

#[cfg(windows)]
mod player {
    use std::fs::{File, OpenOptions};
    use std::io::Write;
    use std::path::Path;
    use std::process::{Child, Command, Stdio};
    use std::time::Duration;

    use livewall_config::VideoOptions;
    use serde_json::json;
    use tracing::{debug, info, warn};

    use crate::error::{ContentError, ContentResult};

    use super::mpv_args;

    const PIPE_CONNECT_ATTEMPTS: u32 = 30;
    const PIPE_CONNECT_INTERVAL: Duration = Duration::from_millis(100);

    /// An mpv child rendering into the wallpaper window, controlled over
    /// its JSON IPC named pipe.
    pub struct VideoPlayer {
        child: Child,
        pipe: Option<File>,
        paused: bool,
        stopped: bool,
    }

    impl VideoPlayer {
        /// Spawns mpv embedded in `surface_handle`. The media file must
        /// exist up front; mpv reports a missing file asynchronously and
        /// the caller wants a blank surface instead of a dead child.
        pub fn spawn(
            media: &Path,
            surface_handle: isize,
            options: &VideoOptions,
        ) -> ContentResult<Self> {
            if !media.is_file() {
                return Err(ContentError::MediaMissing(media.to_path_buf()));
            }

            let pipe_name = format!(r"\\.\pipe\livewall_mpv_{}", std::process::id());
            let args = mpv_args(media, surface_handle, options, &pipe_name);
            debug!(?args, "starting mpv");

            let child = Command::new("mpv")
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map_err(ContentError::Spawn)?;
            info!(pid = child.id(), media = %media.display(), "mpv started");

            // mpv creates the pipe once it is up; poll until it appears.
            let mut pipe = None;
            for _ in 0..PIPE_CONNECT_ATTEMPTS {
                std::thread::sleep(PIPE_CONNECT_INTERVAL);
                match OpenOptions::new().read(true).write(true).open(&pipe_name) {
                    Ok(f) => {
                        pipe = Some(f);
                        break;
                    }
                    Err(_) => continue,
                }
            }
            if pipe.is_none() {
                warn!("mpv ipc pipe never appeared, playback control unavailable");
            }

            Ok(Self {
                child,
                pipe,
                paused: false,
                stopped: false,
            })
        }

        pub fn pause(&mut self) {
            if self.paused || self.stopped {
                return;
            }
            self.send(json!({"command": ["set_property", "pause", true]}));
            self.paused = true;
        }

        pub fn resume(&mut self) {
            if !self.paused || self.stopped {
                return;
            }
            self.send(json!({"command": ["set_property", "pause", false]}));
            self.paused = false;
        }

        /// Asks mpv to quit, killing it if the pipe is gone.
        pub fn stop(&mut self) {
            if self.stopped {
                return;
            }
            self.stopped = true;
            if self.pipe.is_some() {
                self.send(json!({"command": ["quit"]}));
                std::thread::sleep(Duration::from_millis(200));
            }
            match self.child.try_wait() {
                Ok(Some(status)) => debug!(%status, "mpv exited"),
                _ => {
                    if let Err(err) = self.child.kill() {
                        warn!(%err, "failed to kill mpv");
                    }
                    let _ = self.child.wait();
                }
            }
        }

        fn send(&mut self, command: serde_json::Value) {
            let Some(pipe) = self.pipe.as_mut() else {
                return;
            };
            let mut line = command.to_string();
            line.push('\n');
            if let Err(err) = pipe.write_all(line.as_bytes()) {
                warn!(%err, "mpv ipc write failed, dropping pipe");
                self.pipe = None;
            }
        }
    }

    impl Drop for VideoPlayer {
        fn drop(&mut self) {
            self.stop();
        }
    }
}
