//! Widget layout persistence.

use std::path::Path;

use parking_lot::Mutex;
use tracing::debug;

use crate::{ConfigError, ConfigResult};

/// Serializes widget-layout writers across threads.
static WRITE_GUARD: Mutex<()> = Mutex::new(());

/// Persists caller-supplied bytes verbatim as a theme's widget layout.
///
/// Full overwrite semantics: the previous file content is discarded, not
/// merged. At most one writer runs at a time.
pub fn write_widget_layout(path: &Path, bytes: &[u8]) -> ConfigResult<()> {
    let _guard = WRITE_GUARD.lock();
    std::fs::write(path, bytes).map_err(|e| ConfigError::io(path, e))?;
    debug!(path = %path.display(), len = bytes.len(), "widget layout saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_is_byte_exact_full_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("widget.json");

        write_widget_layout(&path, br#"{"clock":{"x":1,"y":2}}"#).unwrap();
        write_widget_layout(&path, b"P").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"P");
    }
}
