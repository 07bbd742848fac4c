//! Tessera scene graph
//!
//! - [`Scene`]: typed object pools, mutated only through [`Scene::apply`]
//! - [`SceneAction`]: one mutation record
//! - [`MutationLog`] / [`SceneUpdate`]: ordered records of one flush
//! - [`RecordingScene`]: producer wrapper that applies and records
//! - [`codec`]: binary wire format of updates

pub mod action;
pub mod codec;
pub mod error;
pub mod mutation_log;
pub mod objects;
pub mod recording;
pub mod scene;
pub mod size;

pub use action::{ActionKind, AppliedEffect, SceneAction};
pub use error::{CodecError, SceneError};
pub use mutation_log::{MutationLog, SceneUpdate};
pub use objects::*;
pub use recording::RecordingScene;
pub use scene::{LinkedValues, Scene};
pub use size::SceneSizeInformation;
