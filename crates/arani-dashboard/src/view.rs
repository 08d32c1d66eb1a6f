//! Text rendering of the dashboard.

use arani_core::{CameraHolder, DetectionEvent, EventStatus, Phase, SessionState};
use std::fmt;
use std::sync::Arc;

const TITLE: &str = "ARANI 2.0 | Advanced Biometric Security";
const EMPTY_FEED: &str = "Scanning for authorized signatures...";
const RELEASING: &str = "Releasing hardware for AI enrollment";

/// Everything needed to draw one dashboard frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub backend_host: String,
    pub camera: CameraHolder,
    pub session: SessionState,
    pub events: Arc<[DetectionEvent]>,
}

impl DashboardView {
    /// Enrollment control label; disabled while a session runs.
    pub fn control_label(&self) -> &'static str {
        if self.session.is_active() {
            "Processing..."
        } else {
            "Register new biometric subject"
        }
    }

    /// Overlay shown over the camera panel during enrollment.
    pub fn overlay(&self) -> Option<String> {
        let session = &self.session;
        let text = match session.phase {
            Phase::Idle => return None,
            Phase::AwaitingCameraRelease | Phase::Countdown => {
                session.countdown_remaining.to_string()
            }
            Phase::Capturing => format!("{}%", session.capture_progress),
            Phase::Succeeded => "done".to_string(),
            Phase::Failed => "failed".to_string(),
        };
        Some(text)
    }
}

/// Host part of a backend URL for the header (`http://127.0.0.1:5000` → `127.0.0.1:5000`).
pub fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.trim_end_matches('/')
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{TITLE}")?;
        writeln!(f, "* BIOMETRIC NODE ACTIVE   HOST: {}", self.backend_host)?;
        writeln!(f)?;

        if self.camera == CameraHolder::LocalPreview {
            writeln!(f, "[camera] live preview")?;
        } else {
            writeln!(f, "[camera] {RELEASING}")?;
        }
        if let Some(overlay) = self.overlay() {
            let subject = self.session.subject_name.as_deref().unwrap_or("");
            writeln!(f, "[enroll] {overlay:>5}  Biometric extraction in progress ({subject})")?;
        }
        writeln!(f, "[{}]", self.control_label())?;
        writeln!(f)?;

        writeln!(f, "LIVE INTEL ({})", self.events.len())?;
        if self.events.is_empty() {
            writeln!(f, "  {EMPTY_FEED}")?;
        }
        for event in self.events.iter() {
            let marker = match event.status {
                EventStatus::Authorized => '+',
                EventStatus::Unauthorized => '!',
            };
            writeln!(
                f,
                "  {marker} {:<20} {:<24} {}",
                event.subject_name,
                event.timestamp,
                event.status.as_str().to_uppercase()
            )?;
        }
        Ok(())
    }
}
