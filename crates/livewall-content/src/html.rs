//! Embedded web view for markup/script wallpaper themes.

use tao::window::Window;
use tracing::{debug, warn};
use wry::{WebView, WebViewBuilder};

use crate::error::ContentResult;
use crate::script::{environment_script, CANVAS_PATCH_SCRIPT, PAUSE_SCRIPT, RESUME_SCRIPT};

/// A web view filling the wallpaper window. Also serves as the scene
/// backend, pointed at the engine's bundled entry page.
pub struct HtmlSurface {
    webview: WebView,
    paused: bool,
}

impl HtmlSurface {
    /// Builds the web view as a child of `window`.
    ///
    /// The user agent carries the session auth token, which is what lets
    /// theme scripts call back into the control plane without any extra
    /// credential plumbing. The canvas patch is wrapped in a load listener
    /// so it reruns on every navigation.
    pub fn attach(
        window: &Window,
        url: &str,
        auth_token: &str,
        device_id: &str,
    ) -> ContentResult<Self> {
        let on_load = format!(
            "window.addEventListener('load', function() {{ {CANVAS_PATCH_SCRIPT} }});"
        );
        let webview = WebViewBuilder::new()
            .with_user_agent(auth_token)
            .with_initialization_script(&environment_script(device_id))
            .with_initialization_script(&on_load)
            .with_background_color((0, 0, 0, 255))
            .with_url(url)
            .build(window)?;
        debug!(url, "web surface attached");
        Ok(Self {
            webview,
            paused: false,
        })
    }

    pub fn pause(&mut self) {
        if self.paused {
            return;
        }
        self.evaluate(PAUSE_SCRIPT);
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        self.evaluate(RESUME_SCRIPT);
        self.paused = false;
    }

    fn evaluate(&self, script: &str) {
        if let Err(err) = self.webview.evaluate_script(script) {
            warn!(%err, "script evaluation failed");
        }
    }
}
