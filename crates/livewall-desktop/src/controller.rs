//! Embedding state machine: `Detached → Attached(Running | Paused)`.

use tracing::debug;

use crate::poll::PollVerdict;

/// Where the render surface currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedState {
    /// Not yet attached to the desktop layer.
    Detached,

    /// Attached; `paused` mirrors whether content playback is suspended.
    Attached { paused: bool },
}

/// A transition the caller must apply to the content source.
///
/// `Resume` also re-asserts the embedding: the shell may have recreated its
/// WorkerW host while we were paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Pause,
    Resume,
}

/// Drives pause/resume decisions from poll verdicts and manual requests.
///
/// A manual pause latches an override: poll ticks will not auto-resume until
/// the operator resumes. All operations are idempotent: repeated pauses or
/// resumes produce no further transitions.
#[derive(Debug)]
pub struct EmbedController {
    state: EmbedState,
    manual_override: bool,
}

impl EmbedController {
    /// Creates a detached controller.
    pub fn new() -> Self {
        Self {
            state: EmbedState::Detached,
            manual_override: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> EmbedState {
        self.state
    }

    /// Whether playback is currently paused.
    pub fn is_paused(&self) -> bool {
        matches!(self.state, EmbedState::Attached { paused: true })
    }

    /// Records that the surface has been attached (running).
    pub fn mark_attached(&mut self) {
        if self.state == EmbedState::Detached {
            self.state = EmbedState::Attached { paused: false };
        }
    }

    /// Operator-requested pause. Returns the transition to apply, if any.
    pub fn manual_pause(&mut self) -> Option<Transition> {
        self.manual_override = true;
        match self.state {
            EmbedState::Attached { paused: false } => {
                self.state = EmbedState::Attached { paused: true };
                debug!("manual pause");
                Some(Transition::Pause)
            }
            _ => None,
        }
    }

    /// Operator-requested resume. Clears the override.
    pub fn manual_resume(&mut self) -> Option<Transition> {
        self.manual_override = false;
        match self.state {
            EmbedState::Attached { paused: true } => {
                self.state = EmbedState::Attached { paused: false };
                debug!("manual resume");
                Some(Transition::Resume)
            }
            _ => None,
        }
    }

    /// Feeds one poll verdict through the state machine.
    pub fn on_poll(&mut self, verdict: PollVerdict) -> Option<Transition> {
        let EmbedState::Attached { paused } = self.state else {
            return None;
        };
        // An operator pause outlives any number of poll ticks.
        if self.manual_override {
            return None;
        }

        match verdict {
            PollVerdict::Occluded if !paused => {
                self.state = EmbedState::Attached { paused: true };
                debug!("foreground occludes desktop, pausing wallpaper");
                Some(Transition::Pause)
            }
            PollVerdict::ShellForeground | PollVerdict::Clear if paused => {
                self.state = EmbedState::Attached { paused: false };
                debug!("desktop visible again, resuming wallpaper");
                Some(Transition::Resume)
            }
            _ => None,
        }
    }
}

impl Default for EmbedController {
    fn default() -> Self {
        Self::new()
    }
}
