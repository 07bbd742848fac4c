//! Tessera core types
//!
//! Foundational building blocks shared by every other Tessera crate:
//! - [`ids`]: scene, slot and display buffer identifiers
//! - [`pool`]: generational handle pools backing the scene arenas
//! - [`state`]: scene lifecycle states
//! - [`event`]: externally visible notifications and their dispatcher

pub mod event;
pub mod ids;
pub mod pool;
pub mod state;

pub use event::{Event, EventDispatcher};
pub use ids::{DisplayAssignment, DisplayBufferId, LinkKind, SceneId, SlotAddress, SlotId, SlotType};
pub use pool::{ArenaError, Handle, MAX_INDEX_GAP, MAX_RESERVATION, Pool};
pub use state::{RendererSceneState, SceneState};
