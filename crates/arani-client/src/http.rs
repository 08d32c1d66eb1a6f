//! HTTP implementation of [`Backend`] via `reqwest`.
//!
//! Wire contract:
//! - `GET  /api/logs`          → 200, JSON array of events
//! - `POST /api/enroll`        → 200 on success, body `{status, message}`
//! - `POST /api/new_detection` → 200, records one event

use crate::backend::{Backend, BackendError, EnrollReceipt};
use arani_core::{DetectionEvent, EventStatus};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const LOGS_PATH: &str = "/api/logs";
const ENROLL_PATH: &str = "/api/enroll";
const NEW_DETECTION_PATH: &str = "/api/new_detection";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct EnrollRequest<'a> {
    name: &'a str,
}

/// Body returned by the enroll and new-detection endpoints.
#[derive(Debug, Default, Deserialize)]
struct StatusBody {
    status: Option<String>,
    message: Option<String>,
}

impl StatusBody {
    fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }
}

/// A recognition event to push into the backend's log.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub name: String,
    pub status: EventStatus,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a client for the backend at `base_url` (e.g. `http://localhost:5000`).
    ///
    /// `timeout` bounds every request end to end; enrollment runs capture
    /// and training server-side, so it should be generous.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Record a detection in the backend's log.
    pub async fn report_detection(&self, report: &DetectionReport) -> Result<(), BackendError> {
        let response = self
            .http
            .post(self.endpoint(NEW_DETECTION_PATH))
            .json(report)
            .send()
            .await?;
        let status = response.status();
        let body = read_status_body(response).await;
        if status != StatusCode::OK {
            return Err(status_error(status, body.message));
        }
        tracing::debug!(name = %report.name, status = %report.status, "detection reported");
        Ok(())
    }
}

impl Backend for HttpBackend {
    async fn list_events(&self) -> Result<Vec<DetectionEvent>, BackendError> {
        let response = self.http.get(self.endpoint(LOGS_PATH)).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(status_error(status, None));
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn enroll_subject(&self, name: &str) -> Result<EnrollReceipt, BackendError> {
        tracing::info!(subject = name, "requesting enrollment");
        let response = self
            .http
            .post(self.endpoint(ENROLL_PATH))
            .json(&EnrollRequest { name })
            .send()
            .await?;
        let status = response.status();
        let body = read_status_body(response).await;

        if status != StatusCode::OK {
            return Err(status_error(status, body.message));
        }
        if body.is_error() {
            return Err(BackendError::Rejected {
                message: body
                    .message
                    .unwrap_or_else(|| "backend reported an error".to_string()),
            });
        }
        Ok(EnrollReceipt {
            message: body.message,
        })
    }
}

/// Best-effort parse of a `{status, message}` body. Missing or non-JSON
/// bodies yield an empty value rather than an error.
async fn read_status_body(response: Response) -> StatusBody {
    match response.bytes().await {
        Ok(bytes) if !bytes.is_empty() => serde_json::from_slice(&bytes).unwrap_or_default(),
        _ => StatusBody::default(),
    }
}

fn status_error(status: StatusCode, message: Option<String>) -> BackendError {
    BackendError::Status {
        status: status.as_u16(),
        message: message.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        }),
    }
}
