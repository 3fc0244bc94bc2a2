//! Wallpaper content backends.
//!
//! Three ways to fill the desktop surface: an embedded web view for
//! markup/script themes, an mpv child process for video files, and the
//! engine's bundled page for 3d scene themes (which is the web view again,
//! pointed at the control-plane root). All backends share the same
//! pause/resume/stop surface and every operation is idempotent.

mod device;
mod error;
mod script;
mod video;

#[cfg(windows)]
mod html;
#[cfg(windows)]
mod source;

pub use device::device_id;
pub use error::{ContentError, ContentResult};
pub use script::{
    browser_args, environment_script, BROWSER_ARGS_ENV, CANVAS_PATCH_SCRIPT, PAUSE_SCRIPT,
    RESUME_SCRIPT,
};
pub use video::mpv_args;

#[cfg(windows)]
pub use html::HtmlSurface;
#[cfg(windows)]
pub use source::ContentSource;
#[cfg(windows)]
pub use video::VideoPlayer;
