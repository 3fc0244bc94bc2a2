//! Unified handle over the active content backend.

use crate::html::HtmlSurface;
use crate::video::VideoPlayer;

/// The running wallpaper content. Scene themes reuse the web surface,
/// loading the engine's bundled page instead of a theme document.
pub enum ContentSource {
    Html(HtmlSurface),
    Video(VideoPlayer),
    Scene(HtmlSurface),
}

impl ContentSource {
    pub fn pause(&mut self) {
        match self {
            ContentSource::Html(s) | ContentSource::Scene(s) => s.pause(),
            ContentSource::Video(p) => p.pause(),
        }
    }

    pub fn resume(&mut self) {
        match self {
            ContentSource::Html(s) | ContentSource::Scene(s) => s.resume(),
            ContentSource::Video(p) => p.resume(),
        }
    }

    pub fn stop(&mut self) {
        if let ContentSource::Video(p) = self {
            p.stop();
        }
    }
}
