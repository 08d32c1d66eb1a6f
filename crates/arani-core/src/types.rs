use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Recognition verdict attached to a detection event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Authorized,
    Unauthorized,
}

impl EventStatus {
    /// Wire spelling ("authorized" / "unauthorized").
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Authorized => "authorized",
            EventStatus::Unauthorized => "unauthorized",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorized" => Ok(EventStatus::Authorized),
            "unauthorized" => Ok(EventStatus::Unauthorized),
            other => Err(format!(
                "unknown status '{other}' (expected authorized or unauthorized)"
            )),
        }
    }
}

/// A single recognition event as reported by the backend.
///
/// Events are immutable once received. The event store replaces its whole
/// list on every successful refresh and never edits an event in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionEvent {
    /// Server-assigned identifier.
    pub id: u64,
    #[serde(rename = "name")]
    pub subject_name: String,
    /// ISO-8601 timestamp, kept verbatim as the backend sent it.
    pub timestamp: String,
    pub status: EventStatus,
}

impl DetectionEvent {
    pub fn is_breach(&self) -> bool {
        self.status == EventStatus::Unauthorized
    }
}
