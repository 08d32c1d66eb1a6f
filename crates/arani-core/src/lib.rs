//! arani-core — Dashboard state for the Arani biometric access node.
//!
//! Pure logic with no I/O: the mirrored event log, camera ownership
//! between preview and enrollment, the enrollment state machine, and
//! CSV report rendering.

pub mod arbiter;
pub mod export;
pub mod session;
pub mod store;
pub mod types;

pub use arbiter::{ArbiterError, CameraArbiter, CameraHolder};
pub use export::{render_csv, ExportFilter, Report};
pub use session::{CaptureOutcome, Phase, SessionError, SessionState};
pub use store::{EventStore, RefreshOutcome, RefreshTicket};
pub use types::{DetectionEvent, EventStatus};
