//! Startup render-mode and content resolution.

use std::path::PathBuf;

use tracing::{info, warn};

use livewall_ipc::RenderMode;

use crate::{ConfigStore, EnginePaths, ThemeManifest, DEFAULT_THEME_ID};

/// Default frame-rate cap when the manifest value is absent or invalid.
pub const DEFAULT_FPS_LIMIT: u32 = 60;

/// Default volume when the manifest value is absent or invalid.
pub const DEFAULT_VOLUME: u32 = 70;

/// Playback options for the video backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoOptions {
    /// Frame-rate cap applied via a playback filter.
    pub fps_limit: u32,

    /// Whether audio is muted.
    pub mute: bool,

    /// Volume, 0-100.
    pub volume: u32,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            fps_limit: DEFAULT_FPS_LIMIT,
            mute: false,
            volume: DEFAULT_VOLUME,
        }
    }
}

/// The outcome of startup resolution: which backend runs and on what content.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The active theme id (after fallback).
    pub theme_id: String,

    /// The active theme's directory.
    pub theme_dir: PathBuf,

    /// Selected content backend.
    pub mode: RenderMode,

    /// Document served at control-plane root: the theme's html entry in
    /// html mode, the engine's bundled entry page otherwise.
    pub root_document: PathBuf,

    /// Absolute media path for the video backend.
    pub media_file: Option<PathBuf>,

    /// Video playback options (defaults applied).
    pub video: VideoOptions,

    /// Whether the telemetry widget feed runs. Forced off in html mode:
    /// a theme that owns the whole page also owns its own widgets.
    pub widget_enabled: bool,

    /// The manifest the decisions were made from.
    pub manifest: ThemeManifest,
}

/// Resolves the active theme into a render mode and content location.
///
/// Runs exactly once per process. Never fails: a missing or corrupt app
/// config falls back to [`DEFAULT_THEME_ID`], a broken manifest to the
/// bundled scene.
pub fn resolve(store: &ConfigStore, paths: &EnginePaths) -> Resolved {
    let config = store.load();
    let theme_id = if config.active_theme.is_empty() {
        warn!("no active theme configured, falling back to '{DEFAULT_THEME_ID}'");
        DEFAULT_THEME_ID.to_string()
    } else {
        config.active_theme
    };

    let theme_dir = paths.theme_dir(&theme_id);
    let manifest = ThemeManifest::load_or_default(&paths.manifest(&theme_id));

    let mode = select_mode(&manifest);
    let root_document = match mode {
        RenderMode::Html => {
            let entry = manifest.html_entry_file.as_deref().unwrap_or("index.html");
            theme_dir.join(entry)
        }
        _ => paths.bundled_entry_page(),
    };
    let media_file = match mode {
        RenderMode::Video => manifest.media_file.as_deref().map(|f| theme_dir.join(f)),
        _ => None,
    };

    let video = VideoOptions {
        fps_limit: manifest.fps_limit.unwrap_or(DEFAULT_FPS_LIMIT),
        mute: manifest.mute_audio.unwrap_or(false),
        volume: manifest.volume.unwrap_or(DEFAULT_VOLUME),
    };

    let widget_enabled = mode != RenderMode::Html && manifest.widget_enabled.unwrap_or(false);

    info!(
        theme = %theme_id,
        mode = mode.name(),
        root = %root_document.display(),
        widget = widget_enabled,
        "resolved wallpaper content"
    );

    Resolved {
        theme_id,
        theme_dir,
        mode,
        root_document,
        media_file,
        video,
        widget_enabled,
        manifest,
    }
}

/// Selection policy: an explicit `renderMode` wins; otherwise a declared
/// html entry implies html, a declared media file implies video, and the
/// bundled scene is the default.
fn select_mode(manifest: &ThemeManifest) -> RenderMode {
    if let Some(mode) = manifest.render_mode {
        return mode;
    }
    if manifest.html_entry_file.is_some() {
        return RenderMode::Html;
    }
    if manifest.media_file.is_some() {
        return RenderMode::Video;
    }
    RenderMode::Scene
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup(theme_id: &str, manifest_json: Option<&str>) -> (tempfile::TempDir, ConfigStore, EnginePaths) {
        let dir = tempdir().unwrap();
        let paths = EnginePaths::new(dir.path());
        std::fs::create_dir_all(paths.theme_dir(theme_id)).unwrap();
        if let Some(json) = manifest_json {
            std::fs::write(paths.manifest(theme_id), json).unwrap();
        }
        let store = ConfigStore::new(paths.app_config());
        store.update(|c| c.active_theme = theme_id.to_string()).unwrap();
        (dir, store, paths)
    }

    #[test]
    fn html_entry_selects_html_mode() {
        let (_dir, store, paths) = setup("neon", Some(r#"{"htmlEntryFile": "main.html"}"#));
        let resolved = resolve(&store, &paths);
        assert_eq!(resolved.mode, RenderMode::Html);
        assert!(resolved.root_document.ends_with("wallpapers/neon/main.html"));
        assert!(resolved.media_file.is_none());
    }

    #[test]
    fn media_file_selects_video_mode_with_options() {
        let (_dir, store, paths) = setup(
            "rain",
            Some(r#"{"mediaFile": "rain.mp4", "fpsLimit": 30, "muteAudio": true, "volume": 40}"#),
        );
        let resolved = resolve(&store, &paths);
        assert_eq!(resolved.mode, RenderMode::Video);
        assert!(resolved.media_file.unwrap().ends_with("rain.mp4"));
        assert_eq!(
            resolved.video,
            VideoOptions {
                fps_limit: 30,
                mute: true,
                volume: 40
            }
        );
        assert!(resolved.root_document.ends_with("index.html"));
    }

    #[test]
    fn invalid_playback_values_fall_back_to_defaults() {
        let (_dir, store, paths) = setup(
            "rain",
            Some(r#"{"mediaFile": "rain.mp4", "fpsLimit": "max", "volume": "loud"}"#),
        );
        let resolved = resolve(&store, &paths);
        assert_eq!(resolved.video.fps_limit, DEFAULT_FPS_LIMIT);
        assert_eq!(resolved.video.volume, DEFAULT_VOLUME);
        assert!(!resolved.video.mute);
    }

    #[test]
    fn empty_manifest_selects_bundled_scene() {
        let (_dir, store, paths) = setup("plain", Some("{}"));
        let resolved = resolve(&store, &paths);
        assert_eq!(resolved.mode, RenderMode::Scene);
        assert_eq!(resolved.root_document, paths.bundled_entry_page());
    }

    #[test]
    fn corrupt_manifest_never_raises() {
        let (_dir, store, paths) = setup("broken", Some("{{{{"));
        let resolved = resolve(&store, &paths);
        assert_eq!(resolved.mode, RenderMode::Scene);
    }

    #[test]
    fn missing_app_config_falls_back_to_default_theme() {
        let dir = tempdir().unwrap();
        let paths = EnginePaths::new(dir.path());
        let store = ConfigStore::new(paths.app_config());

        let resolved = resolve(&store, &paths);
        assert_eq!(resolved.theme_id, DEFAULT_THEME_ID);
        assert_eq!(resolved.mode, RenderMode::Scene);
    }

    #[test]
    fn explicit_render_mode_wins_over_inference() {
        let (_dir, store, paths) = setup(
            "mixed",
            Some(r#"{"renderMode": "scene", "mediaFile": "a.mp4", "htmlEntryFile": "b.html"}"#),
        );
        let resolved = resolve(&store, &paths);
        assert_eq!(resolved.mode, RenderMode::Scene);
    }

    #[test]
    fn widget_forced_off_in_html_mode() {
        let (_dir, store, paths) = setup(
            "widgets",
            Some(r#"{"htmlEntryFile": "w.html", "widgetEnabled": true}"#),
        );
        assert!(!resolve(&store, &paths).widget_enabled);

        let (_dir, store, paths) = setup(
            "widgets2",
            Some(r#"{"widgetEnabled": true}"#),
        );
        assert!(resolve(&store, &paths).widget_enabled);
    }
}
