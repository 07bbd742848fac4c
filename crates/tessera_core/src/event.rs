//! Event Dispatcher
//!
//! Externally visible notifications produced by the link registry and the
//! lifecycle controller. Producers push, the owner drains once per cycle.
//!
//! Nothing is merged or de-duplicated: both the order and the multiplicity of
//! events carry meaning (a consumer that loses its link is told so *before*
//! it is told the slot went away).

use crate::ids::{DisplayAssignment, SceneId, SlotAddress, SlotType};
use crate::state::SceneState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The confirmed state of a scene changed.
    SceneStateChanged { scene: SceneId, state: SceneState },
    /// A display buffer assignment was confirmed by the executor.
    SceneAssigned {
        scene: SceneId,
        assignment: DisplayAssignment,
    },
    DataSlotCreated {
        slot: SlotAddress,
        slot_type: SlotType,
    },
    DataSlotDestroyed {
        slot: SlotAddress,
        slot_type: SlotType,
    },
    DataLinked {
        provider: SlotAddress,
        consumer: SlotAddress,
    },
    /// Explicit unlink requested by the owner.
    DataUnlinked {
        provider: SlotAddress,
        consumer: SlotAddress,
    },
    /// Link removed because one of its endpoint slots was destroyed.
    DataUnlinkedAsSideEffect {
        provider: SlotAddress,
        consumer: SlotAddress,
    },
    /// The provider bound to this consumer changed its value.
    ConsumerDirty { consumer: SlotAddress },
}

impl Event {
    /// Scene the event is primarily about.
    #[must_use]
    pub const fn scene(&self) -> SceneId {
        match self {
            Self::SceneStateChanged { scene, .. } | Self::SceneAssigned { scene, .. } => *scene,
            Self::DataSlotCreated { slot, .. } | Self::DataSlotDestroyed { slot, .. } => slot.scene,
            Self::DataLinked { consumer, .. }
            | Self::DataUnlinked { consumer, .. }
            | Self::DataUnlinkedAsSideEffect { consumer, .. }
            | Self::ConsumerDirty { consumer } => consumer.scene,
        }
    }
}

/// FIFO buffer of [`Event`]s.
#[derive(Debug, Default, Clone)]
pub struct EventDispatcher {
    events: Vec<Event>,
}

impl EventDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Returns every buffered event in push order and empties the buffer.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Events buffered since the last drain.
    #[must_use]
    pub fn pending(&self) -> &[Event] {
        &self.events
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
