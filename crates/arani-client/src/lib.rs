//! arani-client — Bridge to the recognition backend.
//!
//! Defines the [`Backend`] contract the dashboard is written against and
//! an HTTP implementation for the bridge service.

pub mod backend;
pub mod http;

pub use backend::{Backend, BackendError, EnrollReceipt};
pub use http::{DetectionReport, HttpBackend};
