//! The backend contract the dashboard depends on.

use arani_core::DetectionEvent;
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed backend response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("enrollment rejected: {message}")]
    Rejected { message: String },
}

/// Acknowledgement of a completed enrollment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollReceipt {
    /// Server-provided confirmation text, if any.
    pub message: Option<String>,
}

/// Remote service that owns recognition, capture and persistence.
///
/// The dashboard only ever reads the current event log and asks for an
/// enrollment; everything else happens on the other side.
pub trait Backend: Send + Sync + 'static {
    /// Fetch the full current event log.
    fn list_events(&self) -> impl Future<Output = Result<Vec<DetectionEvent>, BackendError>> + Send;

    /// Ask the backend to capture and enroll `name`. Resolves when the
    /// backend has finished (or given up).
    fn enroll_subject(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<EnrollReceipt, BackendError>> + Send;
}

impl<B: Backend> Backend for std::sync::Arc<B> {
    fn list_events(&self) -> impl Future<Output = Result<Vec<DetectionEvent>, BackendError>> + Send {
        (**self).list_events()
    }

    fn enroll_subject(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<EnrollReceipt, BackendError>> + Send {
        (**self).enroll_subject(name)
    }
}
