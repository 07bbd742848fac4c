//! Framework Settings
//!
//! ```rust,ignore
//! use tessera::FrameworkSettings;
//!
//! let settings = FrameworkSettings {
//!     reject_cyclic_links: false,
//!     ..Default::default()
//! };
//! ```
//!
//! Settings are plain serde data; loading them from a file is left to the
//! caller.

use serde::{Deserialize, Serialize};
use tessera_lifecycle::LifecycleSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkSettings {
    /// Lifecycle controller settings, including the display assignment used
    /// for scenes mapped without one.
    pub lifecycle: LifecycleSettings,
    /// Initial capacity of the event buffer.
    pub event_capacity: usize,
    /// Initial mutation log capacity of recording scenes created through
    /// [`crate::Framework::create_recording_scene`].
    pub log_capacity: usize,
    /// Reject links that would make two scenes depend on each other.
    pub reject_cyclic_links: bool,
}

impl Default for FrameworkSettings {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleSettings::default(),
            event_capacity: 64,
            log_capacity: 256,
            reject_cyclic_links: true,
        }
    }
}
