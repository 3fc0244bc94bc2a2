//! Engine liveness probing.

use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

use tracing::debug;

/// Timeout for one liveness probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Checks whether an engine is already listening on the given port.
///
/// A plain TCP connect is enough: the control plane accepts loopback
/// connections unconditionally and authenticates per request. The launcher
/// calls this before deciding between "reload the running engine" and
/// "launch a new one".
pub fn probe(port: u16, timeout: Duration) -> bool {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let alive = TcpStream::connect_timeout(&addr, timeout).is_ok();
    debug!(port, alive, "engine liveness probe");
    alive
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn probe_detects_a_listener() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        assert!(probe(port, PROBE_TIMEOUT));
    }

    #[test]
    fn probe_fails_on_a_closed_port() {
        // Bind-then-drop guarantees the port was free a moment ago.
        let port = {
            let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
            listener.local_addr().unwrap().port()
        };

        assert!(!probe(port, Duration::from_millis(200)));
    }
}
