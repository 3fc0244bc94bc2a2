//! Content-type mapping for theme and engine asset passthrough.

use std::path::Path;

const FALLBACK: &str = "application/octet-stream";

/// Maps a file extension to its content type. Unknown extensions are
/// served as opaque bytes; `.hdr` environment maps deliberately are too,
/// matching what scene loaders expect.
pub fn content_type_for(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return FALLBACK;
    };
    match ext.to_ascii_lowercase().as_str() {
        "css" => "text/css",
        "js" => "application/javascript",
        "html" => "text/html",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogg" => "video/ogg",
        "mov" => "video/quicktime",
        "json" => "application/json",
        "glb" => "model/gltf-binary",
        _ => FALLBACK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn known_extensions_map() {
        assert_eq!(content_type_for(&PathBuf::from("a/style.CSS")), "text/css");
        assert_eq!(content_type_for(&PathBuf::from("scene.glb")), "model/gltf-binary");
        assert_eq!(content_type_for(&PathBuf::from("loop.mp4")), "video/mp4");
    }

    #[test]
    fn unknown_and_bare_paths_fall_back() {
        assert_eq!(content_type_for(&PathBuf::from("env.hdr")), FALLBACK);
        assert_eq!(content_type_for(&PathBuf::from("README")), FALLBACK);
    }
}
