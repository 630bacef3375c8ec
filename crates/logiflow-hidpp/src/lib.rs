//! HID++ channel switching for logiflow.
//!
//! This crate turns a "switch to channel N" intent into the exact HID++
//! report for the receiver's wire protocol (via [`encode_switch`]), and
//! delivers it through an external HID transport with bounded retries (via
//! [`CommandRunner`]). The transport itself is the `hidapitester`
//! executable, driven as a subprocess behind the [`HidTransport`] trait.

pub mod encode;
pub mod error;
pub mod runner;
pub mod transport;

pub use encode::{encode_switch, usage, SwitchCommand, USAGE_PAGE};
pub use error::TransportError;
pub use runner::{CommandRunner, RetryPolicy, SwitchOutcome};
pub use transport::{HidTransport, HidapiTester, WriteRequest};
