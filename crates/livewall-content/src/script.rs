//! Scripts and browser arguments injected into the web surface.

/// Rescales a full-page `#canvas` element to the real device pixel size.
/// Themes that size their canvas once at load render blurry or clipped
/// after a DPI change; this runs after every page load.
pub const CANVAS_PATCH_SCRIPT: &str = r#"
(function() {
    var canvas = document.getElementById("canvas");
    if (canvas) {
        var dpr = window.devicePixelRatio || 1;
        canvas.width = window.innerWidth * dpr;
        canvas.height = window.innerHeight * dpr;
        var ctx = canvas.getContext("2d");
        if (ctx) { ctx.scale(dpr, dpr); }
        canvas.style.width = window.innerWidth + "px";
        canvas.style.height = window.innerHeight + "px";
    }
})();
"#;

/// Themes expose these two globals; failures are swallowed so a theme
/// without them doesn't spam the console.
pub const PAUSE_SCRIPT: &str = "try { pauseAnimation(); } catch (e) {}";
pub const RESUME_SCRIPT: &str = "try { resumeAnimation(); } catch (e) {}";

/// Initialization script injecting the per-machine device id before any
/// theme script runs.
pub fn environment_script(device_id: &str) -> String {
    format!(
        "window.livewall = Object.freeze({{ deviceId: \"{}\" }});",
        device_id.replace('\\', "").replace('"', "")
    )
}

/// Chromium arguments for the embedded browser. Rendering must continue
/// while the window sits behind the icon layer, so occlusion detection
/// and renderer backgrounding are switched off, and the scale factor is
/// forced to the real monitor scale.
pub fn browser_args(scale: f64) -> String {
    format!(
        "--force-device-scale-factor={scale} \
         --high-dpi-support=1 \
         --enable-use-zoom-for-dsf=true \
         --disable-renderer-backgrounding \
         --disable-backgrounding-occluded-windows \
         --disable-features=CalculateNativeWinOcclusion"
    )
}

/// Environment variable WebView2 reads extra browser arguments from.
pub const BROWSER_ARGS_ENV: &str = "WEBVIEW2_ADDITIONAL_BROWSER_ARGUMENTS";
