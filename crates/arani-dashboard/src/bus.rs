//! Broadcast of everything the dashboard renders: session transitions,
//! camera hand-offs, operator notices and feed refreshes.

use arani_core::{CameraHolder, SessionState};
use std::fmt;
use tokio::sync::broadcast;

/// Enough headroom for a full enrollment (one signal per progress tick)
/// without a slow renderer lagging.
pub const SIGNAL_CAPACITY: usize = 256;

pub type SignalBus = broadcast::Sender<Signal>;

pub fn signal_bus() -> SignalBus {
    broadcast::channel(SIGNAL_CAPACITY).0
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Session(SessionState),
    Camera(CameraHolder),
    Notice(OperatorNotice),
    FeedUpdated { events: usize, sequence: u64 },
}

/// Message addressed to the operator when an enrollment ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorNotice {
    Enrolled {
        subject: String,
        message: Option<String>,
    },
    EnrollmentFailed {
        subject: String,
        reason: String,
    },
}

impl fmt::Display for OperatorNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorNotice::Enrolled { subject, message } => {
                write!(f, "Enrollment for {subject} successful!")?;
                if let Some(message) = message {
                    write!(f, " ({message})")?;
                }
                Ok(())
            }
            OperatorNotice::EnrollmentFailed { subject, reason } => write!(
                f,
                "Enrollment for {subject} failed: {reason}. Check that the backend is running and the camera is available."
            ),
        }
    }
}

/// Publish without caring whether anyone is listening.
pub(crate) fn publish(bus: &SignalBus, signal: Signal) {
    let _ = bus.send(signal);
}
