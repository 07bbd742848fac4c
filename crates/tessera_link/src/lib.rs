//! Tessera data links
//!
//! Cross-scene provider → consumer bindings between data slots, with dirty
//! tracking and automatic unlinking when an endpoint goes away.

pub mod error;
pub mod registry;

pub use error::LinkError;
pub use registry::{DataLinkRegistry, Link, LinkKey, SceneLookup};
