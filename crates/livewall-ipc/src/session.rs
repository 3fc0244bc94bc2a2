//! Per-process session identity and lifecycle flags.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of the control-plane auth token.
pub const AUTH_TOKEN_LEN: usize = 50;

/// Which content backend runs for this session.
///
/// Fixed at startup; a mode change requires a full engine restart so that
/// resolution re-runs against a fresh process image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Markup/script scene served from the theme directory.
    Html,

    /// Native looping video via an embedded player.
    Video,

    /// The engine's bundled 3D/scene entry page. Manifests may also spell
    /// this `model`.
    #[serde(alias = "model")]
    Scene,
}

impl RenderMode {
    /// Returns a display name for logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Video => "video",
            Self::Scene => "scene",
        }
    }
}

/// Immutable identity of one engine process run.
///
/// `auth_token` is the single credential for the control plane. It is
/// generated fresh for every process start and never persisted.
#[derive(Debug, Clone)]
pub struct EngineSession {
    /// Unique id of this process run.
    pub instance_token: Uuid,

    /// High-entropy control-plane credential.
    pub auth_token: String,

    /// Port the control-plane HTTP server is bound to.
    pub http_port: u16,

    /// Port of the telemetry push channel, when the widget is enabled.
    pub ws_port: Option<u16>,

    /// Content backend selected at startup.
    pub render_mode: RenderMode,
}

impl EngineSession {
    /// Creates a session with a fresh instance and auth token.
    pub fn new(render_mode: RenderMode) -> Self {
        let auth_token: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(AUTH_TOKEN_LEN)
            .map(char::from)
            .collect();

        Self {
            instance_token: Uuid::new_v4(),
            auth_token,
            http_port: 0,
            ws_port: None,
            render_mode,
        }
    }
}

/// Mutable lifecycle flags shared between the UI thread and the control plane.
#[derive(Debug, Default)]
pub struct SessionFlags {
    restarting: AtomicBool,
}

impl SessionFlags {
    /// Creates a shared flag set.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// One-shot restart flag, consulted only at process exit.
    pub fn is_restarting(&self) -> bool {
        self.restarting.load(Ordering::SeqCst)
    }

    /// Marks the process for re-exec at exit.
    pub fn request_restart(&self) {
        self.restarting.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_token_is_high_entropy_alphanumeric() {
        let session = EngineSession::new(RenderMode::Scene);
        assert_eq!(session.auth_token.len(), AUTH_TOKEN_LEN);
        assert!(session.auth_token.chars().all(|c| c.is_ascii_alphanumeric()));

        let other = EngineSession::new(RenderMode::Scene);
        assert_ne!(session.auth_token, other.auth_token);
        assert_ne!(session.instance_token, other.instance_token);
    }

    #[test]
    fn restart_flag_is_one_shot_and_defaults_off() {
        let flags = SessionFlags::default();
        assert!(!flags.is_restarting());
        flags.request_restart();
        assert!(flags.is_restarting());
    }
}
