//! Enrollment session driver.
//!
//! Runs the [`SessionState`] machine against real time: yields the camera,
//! waits out the hardware grace delay, counts down, then issues the backend
//! enroll call while the progress animation runs alongside it. The camera
//! goes back to the preview on every exit through [`PreviewReclaim`].

use crate::bus::{publish, OperatorNotice, Signal, SignalBus};
use crate::camera::{PreviewReclaim, SharedCamera};
use crate::config::Config;
use arani_client::Backend;
use arani_core::{CameraHolder, CaptureOutcome, Phase, SessionError, SessionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Timer settings for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    pub release_grace: Duration,
    pub countdown_ticks: u32,
    pub countdown_tick: Duration,
    pub progress_tick: Duration,
    pub progress_step: u8,
}

impl From<&Config> for SessionTimings {
    fn from(config: &Config) -> Self {
        Self {
            release_grace: config.release_grace(),
            countdown_ticks: config.countdown_ticks,
            countdown_tick: config.countdown_tick(),
            progress_tick: config.progress_tick(),
            progress_step: config.progress_step(),
        }
    }
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Handle to a running enrollment. Dropping the handle aborts the session.
pub struct EnrollmentTask {
    handle: JoinHandle<Result<CaptureOutcome, SessionError>>,
}

impl EnrollmentTask {
    /// Wait for the session to settle.
    pub async fn wait(mut self) -> Result<CaptureOutcome, SessionError> {
        match (&mut self.handle).await {
            Ok(result) => result,
            Err(e) => {
                if e.is_panic() {
                    tracing::error!(error = %e, "enrollment task panicked");
                }
                Err(SessionError::Interrupted)
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Tear the session down. The camera is still returned to the preview
    /// and the session goes back to `Idle`.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for EnrollmentTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Puts the session back to `Idle` when dropped, unless disarmed.
///
/// Owned by the enrollment task, so an error exit and an aborted task both
/// leave the session startable again.
struct SessionReset {
    state: Arc<watch::Sender<SessionState>>,
    bus: SignalBus,
    armed: bool,
}

impl SessionReset {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SessionReset {
    fn drop(&mut self) {
        if self.armed {
            reset_state(&self.state, &self.bus);
        }
    }
}

fn reset_state(state: &watch::Sender<SessionState>, bus: &SignalBus) {
    state.send_replace(SessionState::new());
    publish(bus, Signal::Session(SessionState::new()));
}

/// The dashboard's single enrollment session.
pub struct EnrollmentSession<B> {
    backend: Arc<B>,
    camera: SharedCamera,
    state: Arc<watch::Sender<SessionState>>,
    bus: SignalBus,
    timings: SessionTimings,
}

impl<B> Clone for EnrollmentSession<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            camera: self.camera.clone(),
            state: Arc::clone(&self.state),
            bus: self.bus.clone(),
            timings: self.timings,
        }
    }
}

impl<B: Backend> EnrollmentSession<B> {
    pub fn new(
        backend: Arc<B>,
        camera: SharedCamera,
        bus: SignalBus,
        timings: SessionTimings,
    ) -> Self {
        let (tx, _rx) = watch::channel(SessionState::new());
        Self {
            backend,
            camera,
            state: Arc::new(tx),
            bus,
            timings,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Begin enrolling `subject`.
    ///
    /// Rejected with no side effects if a session is already running or the
    /// name is empty. On success the preview has already yielded the camera
    /// and the rest of the session runs on a spawned task.
    pub fn start(&self, subject: &str) -> Result<EnrollmentTask, SessionError> {
        let ticks = self.timings.countdown_ticks;
        self.transition(|state| state.start(subject, ticks))
            .map_err(|e| {
                tracing::debug!(error = %e, "enrollment start rejected");
                e
            })?;

        if let Err(e) = self.camera.release(CameraHolder::LocalPreview) {
            tracing::error!(error = %e, "camera ownership out of sync; enrollment not started");
            self.reset();
            return Err(e.into());
        }
        let reclaim = PreviewReclaim::new(self.camera.clone());
        let reset = SessionReset {
            state: Arc::clone(&self.state),
            bus: self.bus.clone(),
            armed: true,
        };

        let state = self.state();
        let subject = state.subject_name.unwrap_or_default();
        tracing::info!(subject = %subject, "enrollment started");

        let session = self.clone();
        let handle = tokio::spawn(async move {
            let result = session.run(&subject, reclaim).await;
            if result.is_ok() {
                reset.disarm();
            }
            result
        });
        Ok(EnrollmentTask { handle })
    }

    async fn run(
        &self,
        subject: &str,
        reclaim: PreviewReclaim,
    ) -> Result<CaptureOutcome, SessionError> {
        tokio::time::sleep(self.timings.release_grace).await;
        self.camera.acquire(CameraHolder::RemoteEnrollment);
        self.transition(SessionState::camera_released)?;

        while self.state().phase == Phase::Countdown {
            tokio::time::sleep(self.timings.countdown_tick).await;
            self.transition(SessionState::countdown_tick)?;
        }

        // Capture: the remote call and the animation run independently; the
        // phase only settles once both are done.
        let (call, animation) = tokio::join!(
            self.backend.enroll_subject(subject),
            self.animate_progress()
        );
        animation?;

        let outcome = match call {
            Ok(receipt) => CaptureOutcome::Enrolled {
                message: receipt.message,
            },
            Err(e) => CaptureOutcome::Rejected {
                reason: e.to_string(),
            },
        };

        // Preview owns the camera again before anyone sees a terminal phase.
        drop(reclaim);

        self.transition(|state| state.settle(&outcome))?;
        let notice = match &outcome {
            CaptureOutcome::Enrolled { message } => {
                tracing::info!(subject, "enrollment succeeded");
                OperatorNotice::Enrolled {
                    subject: subject.to_string(),
                    message: message.clone(),
                }
            }
            CaptureOutcome::Rejected { reason } => {
                tracing::warn!(subject, reason = %reason, "enrollment failed");
                OperatorNotice::EnrollmentFailed {
                    subject: subject.to_string(),
                    reason: reason.clone(),
                }
            }
        };
        publish(&self.bus, Signal::Notice(notice));
        self.transition(SessionState::conclude)?;
        Ok(outcome)
    }

    async fn animate_progress(&self) -> Result<(), SessionError> {
        let step = self.timings.progress_step;
        let mut ticker = tokio::time::interval(self.timings.progress_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let mut complete = false;
            self.transition(|state| {
                complete = state.progress_tick(step)?;
                Ok(())
            })?;
            if complete {
                return Ok(());
            }
        }
    }

    /// Apply `f` to the session state and publish the result.
    fn transition(
        &self,
        f: impl FnOnce(&mut SessionState) -> Result<(), SessionError>,
    ) -> Result<(), SessionError> {
        let mut result = Ok(());
        self.state.send_if_modified(|state| {
            result = f(state);
            result.is_ok()
        });
        match &result {
            Ok(()) => {
                let snapshot = self.state();
                tracing::debug!(
                    phase = %snapshot.phase,
                    countdown = snapshot.countdown_remaining,
                    progress = snapshot.capture_progress,
                    "enrollment transition"
                );
                publish(&self.bus, Signal::Session(snapshot));
            }
            Err(SessionError::OutOfOrder { .. }) => {
                tracing::error!(error = ?result, "enrollment state machine misuse");
            }
            Err(_) => {}
        }
        result
    }

    fn reset(&self) {
        reset_state(&self.state, &self.bus);
    }
}
