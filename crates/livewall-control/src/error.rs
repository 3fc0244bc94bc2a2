use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("failed to bind control server: {0}")]
    Bind(String),

    #[error("failed to bind telemetry socket: {0}")]
    TelemetryBind(#[source] std::io::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ControlResult<T> = Result<T, ControlError>;
