//! Scene and codec error types.

use tessera_core::{ArenaError, SlotId, SlotType};
use thiserror::Error;

use crate::objects::{DataType, NodeHandle, SlotTarget};

/// A record could not be applied to a scene.
///
/// Applying a record is all-or-nothing: when an error is returned the scene
/// is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("{kind}: {source}")]
    Handle {
        kind: &'static str,
        #[source]
        source: ArenaError,
    },

    #[error("data slot id {0} is already in use")]
    DuplicateSlotId(SlotId),

    #[error("data slot id {0} does not exist")]
    UnknownSlotId(SlotId),

    #[error("slot type {slot_type:?} cannot target {target:?}")]
    SlotTargetMismatch {
        slot_type: SlotType,
        target: SlotTarget,
    },

    #[error("expected a {expected:?} value, got {actual:?}")]
    DataTypeMismatch { expected: DataType, actual: DataType },

    #[error("node {0:?} already has a transform")]
    TransformExists(NodeHandle),

    #[error("attaching {child:?} to {parent:?} would create a cycle")]
    HierarchyCycle { parent: NodeHandle, child: NodeHandle },

    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeHandle, child: NodeHandle },
}

impl SceneError {
    pub(crate) fn handle(kind: &'static str) -> impl FnOnce(ArenaError) -> Self {
        move |source| Self::Handle { kind, source }
    }
}

/// A byte stream could not be decoded into mutation records.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unexpected end of input: needed {needed} more bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("bad magic {0:?}")]
    BadMagic([u8; 4]),

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),

    #[error("unknown record tag {tag} at offset {offset}")]
    UnknownTag { tag: u8, offset: usize },

    #[error("record tagged {tag:?} decoded as {decoded:?}")]
    TagMismatch {
        tag: crate::action::ActionKind,
        decoded: crate::action::ActionKind,
    },

    #[error("{0} trailing bytes after the last record")]
    TrailingBytes(usize),

    #[error("record payload: {0}")]
    Payload(#[from] postcard::Error),
}
