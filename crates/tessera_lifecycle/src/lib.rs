//! Tessera scene lifecycle
//!
//! - [`SceneLifecycleController`]: one state machine per scene, turning
//!   target states into commands and consuming their results
//! - [`SceneCommandExecutor`]: the asynchronous side that carries commands out
//! - [`CommandQueue`]: an executor that buffers commands for transport

pub mod command;
pub mod controller;
pub mod settings;

pub use command::{CommandKind, CommandQueue, CommandResult, SceneCommand, SceneCommandExecutor};
pub use controller::SceneLifecycleController;
pub use settings::LifecycleSettings;
