//! # Tessera
//!
//! Scene replication backbone for a split client/renderer pipeline.
//!
//! - **Mutation logs** ([`tessera_scene`]): every change to a scene graph is
//!   recorded as an ordered, replayable record and shipped in flushes.
//! - **Scene lifecycle** ([`tessera_lifecycle`]): each scene is driven through
//!   publish, subscribe, map, assign and render one asynchronous command at a
//!   time.
//! - **Data links** ([`tessera_link`]): values, transformations and textures
//!   of one scene feed consumer slots of another, with dirty propagation.
//!
//! [`Framework`] ties these together on the consuming side.

pub mod errors;
pub mod framework;
pub mod settings;

pub use tessera_core;
pub use tessera_lifecycle;
pub use tessera_link;
pub use tessera_scene;

pub use errors::{Result, TesseraError};
pub use framework::Framework;
pub use settings::FrameworkSettings;

pub use tessera_core::{
    DisplayAssignment, DisplayBufferId, Event, EventDispatcher, Handle, RendererSceneState,
    SceneId, SceneState, SlotAddress, SlotId, SlotType,
};
pub use tessera_lifecycle::{
    CommandKind, CommandQueue, CommandResult, LifecycleSettings, SceneCommand,
    SceneCommandExecutor, SceneLifecycleController,
};
pub use tessera_link::{DataLinkRegistry, LinkError};
pub use tessera_scene::{
    MutationLog, RecordingScene, Scene, SceneAction, SceneError, SceneSizeInformation,
    SceneUpdate, SlotValue,
};
