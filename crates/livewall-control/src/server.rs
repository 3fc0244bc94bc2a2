//! HTTP server lifecycle.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use livewall_config::{ConfigStore, EnginePaths};
use livewall_ipc::{EngineCommand, SessionFlags};
use tracing::{debug, info};

use crate::error::{ControlError, ControlResult};
use crate::routes;

/// Everything a request handler needs. Shared read-only across worker
/// threads; the config store and widget writer serialize internally.
pub struct ControlContext {
    pub auth_token: String,
    pub paths: EnginePaths,
    pub store: ConfigStore,
    pub commands: Sender<EngineCommand>,
    pub flags: Arc<SessionFlags>,
}

/// The loopback HTTP server. One accept thread, one short-lived worker
/// per request.
pub struct ControlServer {
    server: Arc<tiny_http::Server>,
    port: u16,
    accept: Option<JoinHandle<()>>,
}

impl ControlServer {
    /// Binds `127.0.0.1:port` and starts serving. Port 0 picks a free
    /// port; `bound_port` reports the real one either way.
    pub fn bind(port: u16, ctx: Arc<ControlContext>) -> ControlResult<Self> {
        let server = tiny_http::Server::http(("127.0.0.1", port))
            .map_err(|e| ControlError::Bind(e.to_string()))?;
        let server = Arc::new(server);
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .unwrap_or(port);
        info!(port, "control server listening on loopback");

        let accept_server = Arc::clone(&server);
        let accept = std::thread::Builder::new()
            .name("control-accept".into())
            .spawn(move || {
                for request in accept_server.incoming_requests() {
                    let ctx = Arc::clone(&ctx);
                    let _ = std::thread::Builder::new()
                        .name("control-worker".into())
                        .spawn(move || routes::handle(request, &ctx, port));
                }
                debug!("control accept loop ended");
            })?;

        Ok(Self {
            server,
            port,
            accept: Some(accept),
        })
    }

    pub fn bound_port(&self) -> u16 {
        self.port
    }

    /// Stops accepting and joins the accept thread. In-flight workers
    /// finish on their own.
    pub fn shutdown(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.accept.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
