//! Telemetry frame model and the pure bookkeeping around it.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

/// Browser processes whose HTTPS connections are hidden from the active
/// list; they churn dozens of short-lived TLS connections and drown out
/// everything interesting.
pub const PROCESS_HIDE_LIST: [&str; 6] = ["chrome", "firefox", "msedge", "brave", "safari", "opera"];

/// When the seen-connection set grows past this, it is cleared and
/// reseeded from the live table so memory stays bounded.
pub const SEEN_RESEED_THRESHOLD: usize = 2000;

/// Rolling window of the live traffic log.
pub const TRAFFIC_LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct ActiveConnection {
    pub ip: String,
    pub port: u16,
    #[serde(rename = "type")]
    pub socket_type: String,
    pub protocol: String,
    pub process: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListeningPort {
    pub port: u16,
    #[serde(rename = "type")]
    pub socket_type: String,
    pub protocol: String,
    pub process: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrafficLogEntry {
    pub timestamp: String,
    #[serde(rename = "type")]
    pub direction: String,
    pub ip_port: String,
    pub protocol: String,
    pub process: String,
}

/// One frame as pushed over the WebSocket, field names fixed by the
/// widget themes consuming them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetryFrame {
    pub upload_bps: u64,
    pub download_bps: u64,
    pub total_sent: u64,
    pub total_recv: u64,
    pub active_connections: Vec<ActiveConnection>,
    pub listening_ports: Vec<ListeningPort>,
    pub live_traffic_log: Vec<TrafficLogEntry>,
    pub active_count: usize,
    pub listening_count: usize,
}

/// Latest frame plus the rolling traffic log, shared between the
/// collector and the push loop.
#[derive(Default)]
pub struct TelemetryState {
    frame: Mutex<TelemetryFrame>,
    log: Mutex<VecDeque<TrafficLogEntry>>,
}

impl TelemetryState {
    /// Replaces the current frame, folding in the rolling log.
    pub fn publish(&self, mut frame: TelemetryFrame, new_log_entries: Vec<TrafficLogEntry>) {
        let mut log = self.log.lock();
        for entry in new_log_entries {
            if log.len() == TRAFFIC_LOG_CAPACITY {
                log.pop_front();
            }
            log.push_back(entry);
        }
        frame.live_traffic_log = log.iter().cloned().collect();
        frame.active_count = frame.active_connections.len();
        frame.listening_count = frame.listening_ports.len();
        *self.frame.lock() = frame;
    }

    pub fn snapshot_json(&self) -> String {
        let frame = self.frame.lock();
        serde_json::to_string(&*frame).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Turns monotonically growing byte totals into bits-per-second rates.
#[derive(Debug, Default)]
pub struct RateTracker {
    last: Option<(u64, u64)>,
}

impl RateTracker {
    /// Feeds new totals; returns `(upload_bps, download_bps)` scaled by
    /// the elapsed interval. Counter resets (totals going backwards)
    /// yield zero for that sample.
    pub fn update(&mut self, sent: u64, recv: u64, elapsed: Duration) -> (u64, u64) {
        let rates = match self.last {
            Some((prev_sent, prev_recv)) if elapsed > Duration::ZERO => {
                let secs = elapsed.as_secs_f64();
                let up = sent.saturating_sub(prev_sent) as f64 * 8.0 / secs;
                let down = recv.saturating_sub(prev_recv) as f64 * 8.0 / secs;
                (up as u64, down as u64)
            }
            _ => (0, 0),
        };
        self.last = Some((sent, recv));
        rates
    }
}

/// Connection identity for the live-traffic log: a connection is logged
/// once, when first seen.
pub type ConnKey = (String, String, u32, u32);

#[derive(Debug, Default)]
pub struct SeenConnections {
    set: HashSet<ConnKey>,
}

impl SeenConnections {
    /// Returns true when the key is new.
    pub fn note(&mut self, key: ConnKey) -> bool {
        self.set.insert(key)
    }

    pub fn needs_reseed(&self) -> bool {
        self.set.len() > SEEN_RESEED_THRESHOLD
    }

    /// Drops history and reseeds from the currently live connections, so
    /// existing ones are not re-logged after the flush.
    pub fn reseed(&mut self, live: impl IntoIterator<Item = ConnKey>) {
        self.set.clear();
        self.set.extend(live);
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

/// Well-known service name for a port, used by widget themes for display.
pub fn protocol_for_port(port: u16) -> &'static str {
    match port {
        20 | 21 => "FTP",
        22 => "SSH",
        25 | 587 => "SMTP",
        53 => "DNS",
        80 | 8080 => "HTTP",
        110 => "POP3",
        123 => "NTP",
        143 => "IMAP",
        443 | 8443 => "HTTPS",
        993 => "IMAPS",
        995 => "POP3S",
        1900 => "SSDP",
        3389 => "RDP",
        5353 => "mDNS",
        _ => "Unknown",
    }
}

/// Whether a connection should be hidden from the active list: browser
/// HTTPS noise only.
pub fn hide_from_active(process: &str, protocol: &str) -> bool {
    if protocol != "HTTPS" {
        return false;
    }
    let lower = process.to_ascii_lowercase();
    PROCESS_HIDE_LIST.iter().any(|name| lower.contains(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_tracker_scales_to_interval() {
        let mut tracker = RateTracker::default();
        assert_eq!(tracker.update(1000, 2000, Duration::from_secs(1)), (0, 0));
        let (up, down) = tracker.update(2000, 4000, Duration::from_secs(1));
        assert_eq!(up, 8000);
        assert_eq!(down, 16000);
        // 200ms interval, same byte delta, five times the rate
        let (up, _) = tracker.update(3000, 4000, Duration::from_millis(200));
        assert_eq!(up, 40000);
    }

    #[test]
    fn rate_tracker_survives_counter_reset() {
        let mut tracker = RateTracker::default();
        tracker.update(5000, 5000, Duration::from_secs(1));
        let (up, down) = tracker.update(100, 100, Duration::from_secs(1));
        assert_eq!((up, down), (0, 0));
    }

    #[test]
    fn seen_connections_reseed() {
        let mut seen = SeenConnections::default();
        for i in 0..=SEEN_RESEED_THRESHOLD as u32 {
            assert!(seen.note(("a".into(), "b".into(), i, 5)));
        }
        assert!(seen.needs_reseed());
        seen.reseed(vec![("a".into(), "b".into(), 1, 5)]);
        assert_eq!(seen.len(), 1);
        assert!(!seen.note(("a".into(), "b".into(), 1, 5)));
        assert!(seen.note(("a".into(), "b".into(), 2, 5)));
    }

    #[test]
    fn browser_https_hidden_other_traffic_kept() {
        assert!(hide_from_active("chrome.exe", "HTTPS"));
        assert!(hide_from_active("MSEdge.exe", "HTTPS"));
        assert!(!hide_from_active("chrome.exe", "DNS"));
        assert!(!hide_from_active("ssh.exe", "HTTPS"));
    }

    #[test]
    fn traffic_log_is_bounded() {
        let state = TelemetryState::default();
        let entries: Vec<TrafficLogEntry> = (0..60)
            .map(|i| TrafficLogEntry {
                timestamp: format!("00:00:{i:02}.000"),
                direction: "OUTGOING".into(),
                ip_port: "1.2.3.4:443".into(),
                protocol: "HTTPS".into(),
                process: "curl.exe".into(),
            })
            .collect();
        state.publish(TelemetryFrame::default(), entries);
        let json = state.snapshot_json();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let log = parsed["live_traffic_log"].as_array().unwrap();
        assert_eq!(log.len(), TRAFFIC_LOG_CAPACITY);
        assert_eq!(log[0]["timestamp"], "00:00:10.000");
    }

    #[test]
    fn frame_counts_follow_lists() {
        let state = TelemetryState::default();
        let frame = TelemetryFrame {
            active_connections: vec![ActiveConnection {
                ip: "9.9.9.9".into(),
                port: 53,
                socket_type: "SOCK_STREAM".into(),
                protocol: "DNS".into(),
                process: "dig.exe".into(),
            }],
            ..Default::default()
        };
        state.publish(frame, Vec::new());
        let parsed: serde_json::Value =
            serde_json::from_str(&state.snapshot_json()).unwrap();
        assert_eq!(parsed["active_count"], 1);
        assert_eq!(parsed["listening_count"], 0);
    }
}
