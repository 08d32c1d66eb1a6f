//! Exclusive camera ownership between the local preview and remote enrollment.
//!
//! The camera is a single physical device. Only one consumer may hold it:
//! the dashboard's live preview, or the backend's enrollment capture. The
//! arbiter records who holds it; hardware start/stop latency is not modelled
//! here but as the caller's grace delay.

use std::fmt;
use thiserror::Error;

/// Current owner of the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraHolder {
    LocalPreview,
    RemoteEnrollment,
    None,
}

impl fmt::Display for CameraHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CameraHolder::LocalPreview => "local-preview",
            CameraHolder::RemoteEnrollment => "remote-enrollment",
            CameraHolder::None => "none",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArbiterError {
    #[error("camera release by {expected} rejected: camera is held by {actual}")]
    InvalidHolder {
        expected: CameraHolder,
        actual: CameraHolder,
    },
}

/// Records which consumer holds the camera.
///
/// Starts held by the local preview. No operation blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraArbiter {
    holder: CameraHolder,
}

impl Default for CameraArbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraArbiter {
    pub fn new() -> Self {
        Self {
            holder: CameraHolder::LocalPreview,
        }
    }

    pub fn holder(&self) -> CameraHolder {
        self.holder
    }

    /// Release the camera on behalf of `current`.
    ///
    /// Fails if `current` is not the recorded holder. A failure here means
    /// the caller lost track of ownership and is never expected at runtime.
    pub fn release(&mut self, current: CameraHolder) -> Result<(), ArbiterError> {
        if current != self.holder {
            return Err(ArbiterError::InvalidHolder {
                expected: current,
                actual: self.holder,
            });
        }
        self.holder = CameraHolder::None;
        Ok(())
    }

    /// Hand the camera to `next`, returning the previous holder.
    ///
    /// Acquiring from a held state is allowed and treated as recovery: the
    /// previous holder is overridden and a warning is logged. The enrollment
    /// handing the camera back to the preview is the normal path, not
    /// recovery.
    pub fn acquire(&mut self, next: CameraHolder) -> CameraHolder {
        let previous = self.holder;
        if is_forced(previous, next) {
            tracing::warn!(%previous, %next, "camera forcibly reassigned");
        } else if previous != next {
            tracing::debug!(%previous, %next, "camera handed over");
        }
        self.holder = next;
        previous
    }
}

fn is_forced(previous: CameraHolder, next: CameraHolder) -> bool {
    match (previous, next) {
        (CameraHolder::None, _) => false,
        (CameraHolder::RemoteEnrollment, CameraHolder::LocalPreview) => false,
        (previous, next) => previous != next,
    }
}
