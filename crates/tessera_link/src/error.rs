use tessera_core::{SceneId, SlotAddress, SlotType};
use tessera_scene::DataType;
use thiserror::Error;

/// Structural failure of a link operation. The registry is unchanged
/// whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("data slot {0} is not registered")]
    SlotNotFound(SlotAddress),

    #[error("data slot {0} is already registered")]
    SlotExists(SlotAddress),

    #[error("data slot {slot} is a {slot_type:?}, not a provider")]
    NotAProvider { slot: SlotAddress, slot_type: SlotType },

    #[error("data slot {slot} is a {slot_type:?}, not a consumer")]
    NotAConsumer { slot: SlotAddress, slot_type: SlotType },

    #[error("cannot link a {provider:?} to a {consumer:?}")]
    IncompatibleKinds { provider: SlotType, consumer: SlotType },

    #[error("cannot link a {provider:?} value to a {consumer:?} consumer")]
    ValueTypeMismatch { provider: DataType, consumer: DataType },

    #[error("consumer {consumer} is already linked to {provider}")]
    AlreadyLinked {
        consumer: SlotAddress,
        provider: SlotAddress,
    },

    #[error("provider and consumer are both in {0}")]
    SameScene(SceneId),

    #[error("linking {provider} to {consumer} would make the scenes depend on each other")]
    CyclicDependency { provider: SceneId, consumer: SceneId },

    #[error("consumer {0} is not linked")]
    NotLinked(SlotAddress),

    #[error("value of data slot {0} is not available")]
    ValueUnavailable(SlotAddress),
}
