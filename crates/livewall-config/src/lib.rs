//! Shared app config, theme manifests and render-mode resolution.
//!
//! Two files on disk matter to the engine:
//!
//! - `app_config.json` at the engine root, shared with the launcher process.
//!   Read-modify-write cycles take a cross-process advisory lock so both
//!   sides can mutate it safely. Unknown fields are preserved on rewrite.
//! - `config.json` inside the active theme directory (the manifest). The
//!   engine only reads it; the launcher owns mutation.
//!
//! Resolution runs once at startup. Every failure path degrades to a
//! documented default; a broken manifest must never take the engine down.

mod error;
mod manifest;
mod paths;
mod resolver;
mod store;
mod widget;

pub use error::ConfigError;
pub use manifest::ThemeManifest;
pub use paths::{EnginePaths, DEFAULT_THEME_ID};
pub use resolver::{resolve, Resolved, VideoOptions, DEFAULT_FPS_LIMIT, DEFAULT_VOLUME};
pub use store::{ConfigStore, EngineConfig};
pub use widget::write_widget_layout;

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
