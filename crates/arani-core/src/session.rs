//! Enrollment session state machine.
//!
//! Pure transitions only. Timers, the camera hand-off and the backend call
//! are driven by the dashboard runtime, which feeds the results in here.
//!
//! ```text
//! Idle -> AwaitingCameraRelease -> Countdown -> Capturing -> Succeeded | Failed -> Idle
//! ```

use crate::arbiter::ArbiterError;
use std::fmt;
use thiserror::Error;

/// Progress value at which capture is complete.
pub const CAPTURE_COMPLETE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    AwaitingCameraRelease,
    Countdown,
    Capturing,
    Succeeded,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::AwaitingCameraRelease => "awaiting-camera-release",
            Phase::Countdown => "countdown",
            Phase::Capturing => "capturing",
            Phase::Succeeded => "succeeded",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("subject name must not be empty")]
    InvalidInput,
    #[error("an enrollment is already in progress ({phase})")]
    AlreadyActive { phase: Phase },
    #[error("transition requires phase {expected}, session is in {phase}")]
    OutOfOrder { phase: Phase, expected: Phase },
    #[error("camera hand-off failed: {0}")]
    Camera(#[from] ArbiterError),
    #[error("enrollment was interrupted before it settled")]
    Interrupted,
}

/// How the remote enrollment call settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Enrolled { message: Option<String> },
    Rejected { reason: String },
}

impl CaptureOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CaptureOutcome::Enrolled { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub phase: Phase,
    pub subject_name: Option<String>,
    pub countdown_remaining: u32,
    /// Cosmetic capture progress in [0, 100]. Not tied to the remote call.
    pub capture_progress: u8,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            subject_name: None,
            countdown_remaining: 0,
            capture_progress: 0,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True from `start` until the session concludes back to `Idle`.
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Begin an enrollment for `subject`.
    ///
    /// Rejected without touching any state when a session is already running
    /// or the trimmed name is empty.
    pub fn start(&mut self, subject: &str, countdown: u32) -> Result<(), SessionError> {
        if self.phase != Phase::Idle {
            return Err(SessionError::AlreadyActive { phase: self.phase });
        }
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(SessionError::InvalidInput);
        }
        self.phase = Phase::AwaitingCameraRelease;
        self.subject_name = Some(subject.to_string());
        self.countdown_remaining = countdown;
        self.capture_progress = 0;
        Ok(())
    }

    /// The hardware grace delay has elapsed; start counting down.
    ///
    /// A zero-length countdown goes straight to `Capturing`.
    pub fn camera_released(&mut self) -> Result<(), SessionError> {
        self.expect(Phase::AwaitingCameraRelease)?;
        self.phase = if self.countdown_remaining == 0 {
            Phase::Capturing
        } else {
            Phase::Countdown
        };
        Ok(())
    }

    /// One countdown tick elapsed. Reaching zero enters `Capturing`.
    pub fn countdown_tick(&mut self) -> Result<(), SessionError> {
        self.expect(Phase::Countdown)?;
        self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
        if self.countdown_remaining == 0 {
            self.phase = Phase::Capturing;
        }
        Ok(())
    }

    /// Advance the progress animation by `step`, saturating at 100.
    /// Returns true once progress is complete.
    pub fn progress_tick(&mut self, step: u8) -> Result<bool, SessionError> {
        self.expect(Phase::Capturing)?;
        self.capture_progress = self
            .capture_progress
            .saturating_add(step)
            .min(CAPTURE_COMPLETE);
        Ok(self.capture_progress >= CAPTURE_COMPLETE)
    }

    /// Record how the remote call settled. Only legal once the progress
    /// animation has completed.
    pub fn settle(&mut self, outcome: &CaptureOutcome) -> Result<(), SessionError> {
        self.expect(Phase::Capturing)?;
        if self.capture_progress < CAPTURE_COMPLETE {
            return Err(SessionError::OutOfOrder {
                phase: self.phase,
                expected: Phase::Capturing,
            });
        }
        self.phase = if outcome.is_success() {
            Phase::Succeeded
        } else {
            Phase::Failed
        };
        Ok(())
    }

    /// Leave a terminal phase and return to `Idle`.
    pub fn conclude(&mut self) -> Result<(), SessionError> {
        if !matches!(self.phase, Phase::Succeeded | Phase::Failed) {
            return Err(SessionError::OutOfOrder {
                phase: self.phase,
                expected: Phase::Succeeded,
            });
        }
        *self = Self::default();
        Ok(())
    }

    fn expect(&self, expected: Phase) -> Result<(), SessionError> {
        if self.phase != expected {
            return Err(SessionError::OutOfOrder {
                phase: self.phase,
                expected,
            });
        }
        Ok(())
    }
}
