//! Scripted in-memory backend for runtime tests.

use crate::camera::SharedCamera;
use arani_client::{Backend, BackendError, EnrollReceipt};
use arani_core::{CameraHolder, DetectionEvent, EventStatus};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type ListScript = (Duration, Option<Vec<DetectionEvent>>);
type EnrollScript = (Duration, Result<Option<String>, String>);

pub fn event(id: u64, name: &str, status: EventStatus) -> DetectionEvent {
    DetectionEvent {
        id,
        subject_name: name.into(),
        timestamp: format!("2024-01-01T00:{id:02}:00Z"),
        status,
    }
}

/// Answers each call with the next scripted response after its delay.
/// Unscripted calls fail like an unreachable backend.
#[derive(Default)]
pub struct ScriptedBackend {
    lists: Mutex<VecDeque<ListScript>>,
    enrolls: Mutex<VecDeque<EnrollScript>>,
    list_calls: AtomicUsize,
    enrolled: Mutex<Vec<(String, Option<CameraHolder>)>>,
    camera: Mutex<Option<SharedCamera>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_list(&self, delay: Duration, events: Result<Vec<DetectionEvent>, ()>) {
        self.lists.lock().unwrap().push_back((delay, events.ok()));
    }

    pub fn push_list_error(&self, delay: Duration) {
        self.push_list(delay, Err(()));
    }

    pub fn push_enroll(&self, delay: Duration, result: Result<Option<String>, String>) {
        self.enrolls.lock().unwrap().push_back((delay, result));
    }

    /// Record the camera holder at the moment each enroll call arrives.
    pub fn watch_camera(&self, camera: SharedCamera) {
        *self.camera.lock().unwrap() = Some(camera);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn enroll_calls(&self) -> usize {
        self.enrolled.lock().unwrap().len()
    }

    pub fn enrolled(&self) -> Vec<(String, Option<CameraHolder>)> {
        self.enrolled.lock().unwrap().clone()
    }
}

fn unreachable_backend() -> BackendError {
    BackendError::Status {
        status: 503,
        message: "no scripted response".into(),
    }
}

impl Backend for ScriptedBackend {
    async fn list_events(&self) -> Result<Vec<DetectionEvent>, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.lists.lock().unwrap().pop_front();
        let Some((delay, events)) = next else {
            return Err(unreachable_backend());
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        events.ok_or_else(unreachable_backend)
    }

    async fn enroll_subject(&self, name: &str) -> Result<EnrollReceipt, BackendError> {
        let holder = self.camera.lock().unwrap().as_ref().map(|c| c.holder());
        self.enrolled.lock().unwrap().push((name.to_string(), holder));
        let next = self.enrolls.lock().unwrap().pop_front();
        let Some((delay, result)) = next else {
            return Err(unreachable_backend());
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
            .map(|message| EnrollReceipt { message })
            .map_err(|message| BackendError::Status {
                status: 500,
                message,
            })
    }
}
