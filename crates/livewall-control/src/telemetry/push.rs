//! WebSocket push server for telemetry frames.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::{ControlError, ControlResult};
use crate::telemetry::sample::TelemetryState;

/// Frame push cadence.
pub const PUSH_INTERVAL: Duration = Duration::from_millis(200);

/// Broadcast backlog per subscriber before it starts missing frames.
const SUBSCRIBER_BACKLOG: usize = 8;

pub struct PushServerHandle {
    port: u16,
    _thread: std::thread::JoinHandle<()>,
}

impl PushServerHandle {
    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Starts the telemetry WebSocket server on its own runtime thread.
/// Port 0 picks a free port; the handle reports the real one.
pub fn spawn_push_server(
    port: u16,
    auth_token: String,
    state: Arc<TelemetryState>,
) -> ControlResult<PushServerHandle> {
    let listener =
        std::net::TcpListener::bind(("127.0.0.1", port)).map_err(ControlError::TelemetryBind)?;
    listener
        .set_nonblocking(true)
        .map_err(ControlError::TelemetryBind)?;
    let port = listener
        .local_addr()
        .map_err(ControlError::TelemetryBind)?
        .port();
    info!(port, "telemetry push server listening on loopback");

    let thread = std::thread::Builder::new()
        .name("telemetry-push".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(err) => {
                    error!(%err, "failed to build telemetry runtime");
                    return;
                }
            };
            runtime.block_on(run(listener, auth_token, state));
        })?;

    Ok(PushServerHandle {
        port,
        _thread: thread,
    })
}

async fn run(listener: std::net::TcpListener, auth_token: String, state: Arc<TelemetryState>) {
    let listener = match tokio::net::TcpListener::from_std(listener) {
        Ok(l) => l,
        Err(err) => {
            error!(%err, "failed to adopt telemetry listener");
            return;
        }
    };

    let (tx, _) = broadcast::channel::<String>(SUBSCRIBER_BACKLOG);

    let push_tx = tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PUSH_INTERVAL);
        loop {
            interval.tick().await;
            if push_tx.receiver_count() > 0 {
                let _ = push_tx.send(state.snapshot_json());
            }
        }
    });

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(%err, "telemetry accept failed");
                continue;
            }
        };
        let token = auth_token.clone();
        let rx = tx.subscribe();
        tokio::spawn(async move {
            serve_subscriber(stream, peer.to_string(), token, rx).await;
        });
    }
}

async fn serve_subscriber(
    stream: tokio::net::TcpStream,
    peer: String,
    auth_token: String,
    mut rx: broadcast::Receiver<String>,
) {
    let mut agent: Option<String> = None;
    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        agent = req
            .headers()
            .get("User-Agent")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(resp)
    };
    let mut ws = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(err) => {
            debug!(%peer, %err, "websocket handshake failed");
            return;
        }
    };

    if agent.as_deref() != Some(auth_token.as_str()) {
        warn!(%peer, "websocket auth failed, closing");
        let _ = ws
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Policy,
                reason: "Invalid Auth Token".into(),
            })))
            .await;
        return;
    }
    debug!(%peer, "telemetry subscriber connected");

    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Ok(json) => {
                    if ws.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    debug!(%peer, missed, "subscriber lagging, frames dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = ws.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }
    debug!(%peer, "telemetry subscriber disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::sample::TelemetryFrame;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;

    const TOKEN: &str = "push-test-token";

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    fn started_server() -> (PushServerHandle, Arc<TelemetryState>) {
        let state = Arc::new(TelemetryState::default());
        state.publish(
            TelemetryFrame {
                upload_bps: 1234,
                ..Default::default()
            },
            Vec::new(),
        );
        let handle = spawn_push_server(0, TOKEN.to_string(), Arc::clone(&state)).unwrap();
        (handle, state)
    }

    #[test]
    fn authenticated_subscriber_receives_frames() {
        let (handle, _state) = started_server();
        runtime().block_on(async {
            let mut request = format!("ws://127.0.0.1:{}/", handle.port())
                .into_client_request()
                .unwrap();
            request
                .headers_mut()
                .insert("User-Agent", TOKEN.parse().unwrap());
            let (mut ws, _) = connect_async(request).await.unwrap();
            let msg = tokio::time::timeout(Duration::from_secs(3), ws.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            let text = msg.into_text().unwrap();
            assert!(text.contains("\"upload_bps\":1234"));
            assert!(text.contains("live_traffic_log"));
        });
    }

    #[test]
    fn wrong_token_closed_with_policy_violation() {
        let (handle, _state) = started_server();
        runtime().block_on(async {
            let mut request = format!("ws://127.0.0.1:{}/", handle.port())
                .into_client_request()
                .unwrap();
            request
                .headers_mut()
                .insert("User-Agent", "not-the-token".parse().unwrap());
            let (mut ws, _) = connect_async(request).await.unwrap();
            let msg = tokio::time::timeout(Duration::from_secs(3), ws.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            match msg {
                Message::Close(Some(frame)) => assert_eq!(frame.code, CloseCode::Policy),
                other => panic!("expected policy close, got {other:?}"),
            }
        });
    }
}
