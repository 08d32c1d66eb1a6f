//! arani-dashboard — Runtime for the Arani monitoring dashboard.
//!
//! Mirrors the backend's event log on a fixed cadence, coordinates the
//! camera between the live preview and remote enrollment, and drives the
//! timed enrollment sequence. Everything runs on tokio; the backend is any
//! [`arani_client::Backend`].

pub mod bus;
pub mod camera;
pub mod config;
pub mod dashboard;
pub mod enrollment;
pub mod export;
pub mod poller;
pub mod view;

#[cfg(test)]
mod testing;

pub use bus::{OperatorNotice, Signal, SignalBus};
pub use camera::{PreviewReclaim, SharedCamera};
pub use config::{Config, ConfigError};
pub use dashboard::Dashboard;
pub use enrollment::{EnrollmentSession, EnrollmentTask, SessionTimings};
pub use poller::{PollerHandle, SharedStore};
pub use view::DashboardView;
