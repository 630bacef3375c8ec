//! Shared types for logiflow.
//!
//! This crate contains the plain value types shared across the logiflow
//! workspace: desktop geometry and edge classification, edge targets,
//! receiver channels, and the receiver profile that maps logical devices
//! onto HID++ wire addresses.

pub mod device;
pub mod screen;
pub mod target;

pub use device::{DeviceKind, Protocol, ReceiverProfile};
pub use screen::{EdgePosition, Point, Rect, ScreenBounds, EDGE_MARGIN};
pub use target::{Channel, EdgeTarget, InvalidChannel, TriggerMode, ZoneAnchor};
