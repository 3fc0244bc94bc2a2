//! On-disk layout of the engine root.

use std::path::{Path, PathBuf};

/// Theme id used when the app config is missing or unreadable.
pub const DEFAULT_THEME_ID: &str = "defolt";

/// Directory under the engine root that holds theme bundles.
const WALLPAPERS_DIR: &str = "wallpapers";

/// Shared app config file name.
const APP_CONFIG_FILE: &str = "app_config.json";

/// Per-theme manifest file name.
const MANIFEST_FILE: &str = "config.json";

/// Per-theme widget layout side file.
const WIDGET_LAYOUT_FILE: &str = "widget.json";

/// Resolves engine-relative paths from a single root directory.
///
/// The root is the directory containing the engine executable; all theme
/// content and shared state lives beneath it.
#[derive(Debug, Clone)]
pub struct EnginePaths {
    root: PathBuf,
}

impl EnginePaths {
    /// Creates a path resolver rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Rooted at the directory containing the current executable.
    pub fn from_exe() -> std::io::Result<Self> {
        let exe = std::env::current_exe()?;
        let root = exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self { root })
    }

    /// The engine root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The shared `app_config.json` path.
    pub fn app_config(&self) -> PathBuf {
        self.root.join(APP_CONFIG_FILE)
    }

    /// The directory holding all theme bundles.
    pub fn wallpapers_root(&self) -> PathBuf {
        self.root.join(WALLPAPERS_DIR)
    }

    /// The directory of a single theme.
    pub fn theme_dir(&self, theme_id: &str) -> PathBuf {
        self.wallpapers_root().join(theme_id)
    }

    /// A theme's manifest file.
    pub fn manifest(&self, theme_id: &str) -> PathBuf {
        self.theme_dir(theme_id).join(MANIFEST_FILE)
    }

    /// A theme's widget layout side file.
    pub fn widget_layout(&self, theme_id: &str) -> PathBuf {
        self.theme_dir(theme_id).join(WIDGET_LAYOUT_FILE)
    }

    /// The engine's own bundled entry page (the default 3D scene host).
    pub fn bundled_entry_page(&self) -> PathBuf {
        self.root.join("index.html")
    }
}
