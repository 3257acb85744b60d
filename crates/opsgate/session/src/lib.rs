//! OpsGate Session - session-gated routing
//!
//! [`SessionGate`] is the synchronous state machine deciding what a browser
//! session shows and where it navigates. [`SessionHandle::start`] runs it
//! against a live identity provider, resolves admin capability and publishes
//! [`SessionSnapshot`](opsgate_types::SessionSnapshot)s. The [`shell`] module
//! maps snapshots onto dashboard surfaces.

#![deny(unsafe_code)]

mod driver;
mod gate;
mod navigator;
pub mod shell;

pub use driver::SessionHandle;
pub use gate::SessionGate;
pub use navigator::{Navigator, RecordingNavigator};
