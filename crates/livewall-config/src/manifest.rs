//! Per-theme manifest (`config.json`).

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use livewall_ipc::RenderMode;

use crate::{ConfigError, ConfigResult};

/// A theme's manifest as authored in its directory.
///
/// The engine never writes this file; the launcher owns mutation through its
/// own update endpoint. Playback fields arrive from theme authors and are
/// deliberately lenient: a value of the wrong type reads as absent and the
/// resolver substitutes the documented default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThemeManifest {
    /// Explicit content backend selection. Wins over inference when present.
    #[serde(default, rename = "renderMode", skip_serializing_if = "Option::is_none")]
    pub render_mode: Option<RenderMode>,

    /// Video file for the native video backend, relative to the theme dir.
    #[serde(default, rename = "mediaFile", skip_serializing_if = "Option::is_none")]
    pub media_file: Option<String>,

    /// Markup entry for the html backend, relative to the theme dir.
    #[serde(default, rename = "htmlEntryFile", skip_serializing_if = "Option::is_none")]
    pub html_entry_file: Option<String>,

    /// 3D model served through `GET /model`, relative to the theme dir.
    #[serde(default, rename = "modelFile", skip_serializing_if = "Option::is_none")]
    pub model_file: Option<String>,

    /// Frame-rate cap for video playback.
    #[serde(
        default,
        rename = "fpsLimit",
        deserialize_with = "lenient_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub fps_limit: Option<u32>,

    /// Whether video audio is muted.
    #[serde(
        default,
        rename = "muteAudio",
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub mute_audio: Option<bool>,

    /// Video volume, 0-100.
    #[serde(
        default,
        rename = "volume",
        deserialize_with = "lenient_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub volume: Option<u32>,

    /// Whether the telemetry widget overlay is enabled for this theme.
    #[serde(
        default,
        rename = "widgetEnabled",
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub widget_enabled: Option<bool>,

    /// Author-defined fields the engine does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ThemeManifest {
    /// Loads a manifest from the given path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| ConfigError::io(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| ConfigError::json(path, e))
    }

    /// Loads a manifest, degrading to an empty one on any failure.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "theme manifest unreadable, using defaults");
                Self::default()
            }
        }
    }
}

/// Accepts integers, numeric strings, or garbage (as `None`).
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

/// Accepts booleans or garbage (as `None`).
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_bool()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_manifest() {
        let manifest: ThemeManifest = serde_json::from_str(
            r#"{
                "renderMode": "video",
                "mediaFile": "loop.mp4",
                "fpsLimit": 30,
                "muteAudio": true,
                "volume": 55,
                "widgetEnabled": false,
                "metadata": {"themeName": "Rain"}
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.render_mode, Some(RenderMode::Video));
        assert_eq!(manifest.media_file.as_deref(), Some("loop.mp4"));
        assert_eq!(manifest.fps_limit, Some(30));
        assert_eq!(manifest.mute_audio, Some(true));
        assert_eq!(manifest.volume, Some(55));
        assert!(manifest.extra.contains_key("metadata"));
    }

    #[test]
    fn invalid_playback_values_read_as_absent() {
        let manifest: ThemeManifest = serde_json::from_str(
            r#"{"fpsLimit": "fast", "muteAudio": "yes please", "volume": -3}"#,
        )
        .unwrap();

        assert_eq!(manifest.fps_limit, None);
        assert_eq!(manifest.mute_audio, None);
        assert_eq!(manifest.volume, None);
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let manifest: ThemeManifest = serde_json::from_str(r#"{"fpsLimit": "24"}"#).unwrap();
        assert_eq!(manifest.fps_limit, Some(24));
    }

    #[test]
    fn load_or_default_swallows_missing_file() {
        let manifest = ThemeManifest::load_or_default(Path::new("/nonexistent/config.json"));
        assert!(manifest.render_mode.is_none());
        assert!(manifest.media_file.is_none());
    }
}
