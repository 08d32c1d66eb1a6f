//! Composition root: wires the store, poller, camera and enrollment
//! session together and exposes the operator actions.

use crate::bus::{signal_bus, Signal, SignalBus};
use crate::camera::SharedCamera;
use crate::config::Config;
use crate::enrollment::{EnrollmentSession, EnrollmentTask, SessionTimings};
use crate::export::save_report;
use crate::poller::{self, PollerHandle, SharedStore};
use crate::view::{host_of, DashboardView};
use arani_client::Backend;
use arani_core::{
    CameraHolder, CaptureOutcome, DetectionEvent, ExportFilter, Report, SessionError, SessionState,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct Dashboard<B: Backend> {
    config: Config,
    store: SharedStore,
    camera: SharedCamera,
    session: EnrollmentSession<B>,
    bus: SignalBus,
    poller: Option<PollerHandle>,
    enrollment: Option<EnrollmentTask>,
}

impl<B: Backend> Dashboard<B> {
    /// Mount the dashboard and start polling. Must be called from within a
    /// tokio runtime.
    pub fn mount(config: Config, backend: B) -> Self {
        let backend = Arc::new(backend);
        let bus = signal_bus();
        let store = poller::shared_store();
        let camera = SharedCamera::new(bus.clone());
        let session = EnrollmentSession::new(
            Arc::clone(&backend),
            camera.clone(),
            bus.clone(),
            SessionTimings::from(&config),
        );
        let poller = poller::spawn(
            backend,
            Arc::clone(&store),
            config.poll_interval(),
            bus.clone(),
        );
        tracing::info!(backend = %config.backend_url, "dashboard mounted");

        Self {
            config,
            store,
            camera,
            session,
            bus,
            poller: Some(poller),
            enrollment: None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.bus.subscribe()
    }

    pub fn camera_holder(&self) -> CameraHolder {
        self.camera.holder()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub async fn events(&self) -> Arc<[DetectionEvent]> {
        self.store.read().await.snapshot()
    }

    /// Operator action: enroll a new subject.
    pub fn enroll(&mut self, subject: &str) -> Result<(), SessionError> {
        let task = self.session.start(subject)?;
        self.enrollment = Some(task);
        Ok(())
    }

    /// Wait for the current enrollment, if any, to settle.
    pub async fn wait_enrollment(&mut self) -> Option<Result<CaptureOutcome, SessionError>> {
        let task = self.enrollment.take()?;
        Some(task.wait().await)
    }

    /// Operator action: export the current feed to `export_dir`.
    pub async fn export(
        &self,
        filter: ExportFilter,
        include_id: bool,
    ) -> std::io::Result<(PathBuf, Report)> {
        let events = self.events().await;
        save_report(&self.config.export_dir, &events, filter, include_id).await
    }

    pub async fn view(&self) -> DashboardView {
        DashboardView {
            backend_host: host_of(&self.config.backend_url).to_string(),
            camera: self.camera.holder(),
            session: self.session.state(),
            events: self.events().await,
        }
    }

    /// Stop polling and tear down any running enrollment. The camera ends
    /// up with the preview either way.
    ///
    /// Dropping the dashboard without unmounting aborts the same tasks.
    pub async fn unmount(mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop().await;
        }
        if let Some(task) = self.enrollment.take() {
            if !task.is_finished() {
                tracing::warn!("unmounting with enrollment in progress");
                task.abort();
            }
            let _ = task.wait().await;
        }
        tracing::info!("dashboard unmounted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{event, ScriptedBackend};
    use arani_core::{EventStatus, Phase};
    use std::time::Duration;

    fn config(dir: &std::path::Path) -> Config {
        Config {
            export_dir: dir.to_path_buf(),
            ..Config::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_and_export_follow_store() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptedBackend::new();
        backend.push_list(
            Duration::ZERO,
            Ok(vec![
                event(1, "Alice", EventStatus::Authorized),
                event(2, "Bob", EventStatus::Unauthorized),
            ]),
        );
        let dashboard = Dashboard::mount(config(dir.path()), backend);

        tokio::time::sleep(Duration::from_millis(10)).await;
        let view = dashboard.view().await;
        assert_eq!(view.events.len(), 2);
        assert_eq!(view.camera, CameraHolder::LocalPreview);

        let (path, report) = dashboard.export(ExportFilter::Breaches, false).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "report_breaches.csv");
        assert_eq!(
            report.body,
            "Name,Timestamp,Status\n\"Bob\",\"2024-01-01T00:02:00Z\",\"unauthorized\""
        );

        dashboard.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_continues_during_enrollment() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptedBackend::new();
        for n in 1..=8u64 {
            backend.push_list(
                Duration::ZERO,
                Ok((1..=n).map(|id| event(id, "X", EventStatus::Authorized)).collect()),
            );
        }
        backend.push_enroll(Duration::from_millis(500), Ok(None));
        let mut dashboard = Dashboard::mount(config(dir.path()), backend);

        tokio::time::sleep(Duration::from_millis(10)).await;
        dashboard.enroll("Carol").unwrap();
        assert_eq!(dashboard.camera_holder(), CameraHolder::None);

        // Well into capture: polls at 1.5s, 3.0s and 4.5s have landed.
        tokio::time::sleep(Duration::from_millis(4600)).await;
        assert_eq!(dashboard.session_state().phase, Phase::Capturing);
        assert_eq!(dashboard.events().await.len(), 4);

        let outcome = dashboard.wait_enrollment().await.unwrap().unwrap();
        assert!(outcome.is_success());
        assert_eq!(dashboard.camera_holder(), CameraHolder::LocalPreview);

        dashboard.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_enroll_rejected_while_running() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptedBackend::new();
        backend.push_enroll(Duration::ZERO, Ok(None));
        let mut dashboard = Dashboard::mount(config(dir.path()), backend);

        dashboard.enroll("Carol").unwrap();
        assert!(matches!(
            dashboard.enroll("Dave"),
            Err(SessionError::AlreadyActive { .. })
        ));
        assert_eq!(
            dashboard.session_state().subject_name.as_deref(),
            Some("Carol")
        );
        dashboard.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_mid_enrollment_returns_camera() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptedBackend::new();
        backend.push_enroll(Duration::from_secs(60), Ok(None));
        let mut dashboard = Dashboard::mount(config(dir.path()), backend);
        let camera = dashboard.camera.clone();

        dashboard.enroll("Carol").unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(camera.holder(), CameraHolder::RemoteEnrollment);

        dashboard.unmount().await;
        assert_eq!(camera.holder(), CameraHolder::LocalPreview);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_enrollment() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_enroll(Duration::ZERO, Ok(None));
        let mut dashboard = Dashboard::mount(config(dir.path()), Arc::clone(&backend));
        let camera = dashboard.camera.clone();
        let session = dashboard.session.clone();

        dashboard.enroll("Carol").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let polls = backend.list_calls();
        drop(dashboard);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.enroll_calls(), 0);
        assert_eq!(backend.list_calls(), polls);
        assert_eq!(camera.holder(), CameraHolder::LocalPreview);
        assert_eq!(session.state().phase, Phase::Idle);
    }
}
