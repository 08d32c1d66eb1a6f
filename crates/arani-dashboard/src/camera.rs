//! Shared camera ownership.
//!
//! Wraps [`CameraArbiter`] so the preview path and the enrollment path see
//! the same holder, and publishes every hand-off on the signal bus.

use crate::bus::{publish, Signal, SignalBus};
use arani_core::{ArbiterError, CameraArbiter, CameraHolder};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct SharedCamera {
    state: Arc<watch::Sender<CameraArbiter>>,
    bus: SignalBus,
}

impl SharedCamera {
    /// Camera held by the local preview.
    pub fn new(bus: SignalBus) -> Self {
        let (tx, _rx) = watch::channel(CameraArbiter::new());
        Self {
            state: Arc::new(tx),
            bus,
        }
    }

    pub fn holder(&self) -> CameraHolder {
        self.state.borrow().holder()
    }

    pub fn subscribe(&self) -> watch::Receiver<CameraArbiter> {
        self.state.subscribe()
    }

    pub fn release(&self, current: CameraHolder) -> Result<(), ArbiterError> {
        let mut result = Ok(());
        self.state.send_if_modified(|arbiter| {
            result = arbiter.release(current);
            result.is_ok()
        });
        if result.is_ok() {
            tracing::debug!(from = %current, "camera released");
            publish(&self.bus, Signal::Camera(CameraHolder::None));
        }
        result
    }

    pub fn acquire(&self, next: CameraHolder) {
        let changed = self
            .state
            .send_if_modified(|arbiter| arbiter.acquire(next) != next);
        if changed {
            tracing::debug!(holder = %next, "camera acquired");
            publish(&self.bus, Signal::Camera(next));
        }
    }
}

/// Returns the camera to the local preview when dropped.
///
/// Held across the whole enrollment run, so the preview gets the camera
/// back on success, failure, error and task abort alike.
pub struct PreviewReclaim {
    camera: SharedCamera,
}

impl PreviewReclaim {
    pub fn new(camera: SharedCamera) -> Self {
        Self { camera }
    }
}

impl Drop for PreviewReclaim {
    fn drop(&mut self) {
        self.camera.acquire(CameraHolder::LocalPreview);
    }
}
