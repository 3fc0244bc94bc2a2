//! Loopback control plane: HTTP content/config server plus the WebSocket
//! telemetry push channel.
//!
//! Everything binds to `127.0.0.1` only. Requests authenticate by carrying
//! the session auth token in the `User-Agent` header; the embedded web
//! surface gets this for free because its user agent is set to the token.
//! A short allow-list of paths stays unauthenticated so external tools can
//! drive reload/quit and discover the port.

mod error;
mod mime;
mod routes;
mod server;
pub mod telemetry;

pub use error::{ControlError, ControlResult};
pub use mime::content_type_for;
pub use routes::PUBLIC_PATHS;
pub use server::{ControlContext, ControlServer};
