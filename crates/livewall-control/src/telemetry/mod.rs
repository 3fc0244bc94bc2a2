//! Network telemetry feed for widget themes.
//!
//! A collector thread samples OS network tables into a shared
//! [`TelemetryState`]; the push server broadcasts a JSON frame to every
//! authenticated WebSocket subscriber five times a second. Slow readers
//! lag and miss frames rather than stalling the loop.

mod push;
mod sample;

#[cfg(windows)]
mod collector;

pub use push::{spawn_push_server, PushServerHandle, PUSH_INTERVAL};
pub use sample::{
    protocol_for_port, ActiveConnection, ListeningPort, RateTracker, SeenConnections,
    TelemetryFrame, TelemetryState, TrafficLogEntry, PROCESS_HIDE_LIST, SEEN_RESEED_THRESHOLD,
    TRAFFIC_LOG_CAPACITY,
};

#[cfg(windows)]
pub use collector::spawn_collector;
