//! Error Types
//!
//! [`TesseraError`] gathers the failures of every layer behind one type so
//! that framework calls can use `?` throughout:
//! - handle misuse in an arena ([`ArenaError`])
//! - records that do not apply to a scene ([`SceneError`])
//! - malformed wire data ([`CodecError`])
//! - rejected link operations ([`LinkError`])
//!
//! Lifecycle protocol problems are not errors: the controller logs and
//! drops them.

use tessera_core::{ArenaError, SceneId};
use tessera_link::LinkError;
use tessera_scene::{CodecError, SceneError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TesseraError {
    #[error("Arena error: {0}")]
    Arena(#[from] ArenaError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// The scene is not published in this framework.
    #[error("Unknown scene: {0}")]
    UnknownScene(SceneId),

    /// A flush arrived with a different index than the next expected one.
    #[error("Flush {received} for {scene} out of order (expected {expected})")]
    FlushOutOfOrder {
        scene: SceneId,
        expected: u64,
        received: u64,
    },

    /// One record of a flush could not be applied. Records before it stay
    /// applied; it and everything after it were dropped.
    #[error("Record {index} of flush {flush_index} for {scene} failed: {source}")]
    ApplyFailed {
        scene: SceneId,
        flush_index: u64,
        index: usize,
        #[source]
        source: SceneError,
    },
}

/// Alias for `Result<T, TesseraError>`.
pub type Result<T> = std::result::Result<T, TesseraError>;
