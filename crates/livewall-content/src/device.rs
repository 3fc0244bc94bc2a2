//! Stable per-machine identifier exposed to page scripts.

use tracing::warn;
use uuid::Uuid;

const FALLBACK_SOURCE: &str = "livewall-unknown-machine";

/// Hashed machine identifier. Never exposes the raw OS guid to page
/// content; the same machine always yields the same value.
pub fn device_id() -> String {
    let raw = read_machine_guid().unwrap_or_else(|| {
        warn!("machine guid unavailable, using fallback device id");
        FALLBACK_SOURCE.to_string()
    });
    hash_machine_source(&raw)
}

fn hash_machine_source(raw: &str) -> String {
    let normalized = raw.trim().to_ascii_lowercase();
    Uuid::new_v5(&Uuid::NAMESPACE_OID, normalized.as_bytes())
        .simple()
        .to_string()
}

#[cfg(windows)]
fn read_machine_guid() -> Option<String> {
    use windows::core::w;
    use windows::Win32::Foundation::ERROR_SUCCESS;
    use windows::Win32::System::Registry::{RegGetValueW, HKEY_LOCAL_MACHINE, RRF_RT_REG_SZ};

    let mut buf = [0u16; 128];
    let mut size = (buf.len() * 2) as u32;
    let status = unsafe {
        RegGetValueW(
            HKEY_LOCAL_MACHINE,
            w!("SOFTWARE\\Microsoft\\Cryptography"),
            w!("MachineGuid"),
            RRF_RT_REG_SZ,
            None,
            Some(buf.as_mut_ptr().cast()),
            Some(&mut size),
        )
    };
    if status != ERROR_SUCCESS {
        return None;
    }
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    Some(String::from_utf16_lossy(&buf[..len]))
}

#[cfg(not(windows))]
fn read_machine_guid() -> Option<String> {
    std::fs::read_to_string("/etc/machine-id")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
