//! Mutation records.
//!
//! Every state-changing operation on a [`Scene`](crate::Scene) is expressed as
//! one [`SceneAction`]. Producers apply and record them, consumers replay
//! them; both go through [`Scene::apply`](crate::Scene::apply), so the two
//! sides cannot drift apart.
//!
//! Allocation records carry the handle to allocate at. The producer picks it
//! from [`Pool::next_handle`](tessera_core::Pool::next_handle), the consumer
//! places the object at exactly that handle.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tessera_core::{SlotId, SlotType};

use crate::objects::{
    DataObjectHandle, DataSlot, DataSlotHandle, DataType, DataValue, NodeHandle,
    RenderGroupHandle, RenderState, RenderStateHandle, RenderTargetHandle, RenderableHandle,
    ResourceContentHash, TextureFilter, TextureSamplerHandle, TransformHandle, Visibility,
};
use crate::size::SceneSizeInformation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneAction {
    PreallocateSceneSize(SceneSizeInformation),

    // Hierarchy
    AllocateNode { handle: NodeHandle },
    ReleaseNode { handle: NodeHandle },
    AddChildToNode { parent: NodeHandle, child: NodeHandle },
    RemoveChildFromNode { parent: NodeHandle, child: NodeHandle },

    // Transforms
    AllocateTransform { handle: TransformHandle, node: NodeHandle },
    ReleaseTransform { handle: TransformHandle },
    SetTransformTranslation { transform: TransformHandle, value: Vec3 },
    SetTransformRotation { transform: TransformHandle, value: Quat },
    SetTransformScaling { transform: TransformHandle, value: Vec3 },

    // Data
    AllocateDataObject { handle: DataObjectHandle, value: DataValue },
    ReleaseDataObject { handle: DataObjectHandle },
    SetDataValue { data: DataObjectHandle, value: DataValue },

    // Textures
    AllocateTextureSampler {
        handle: TextureSamplerHandle,
        texture: ResourceContentHash,
        filter: TextureFilter,
    },
    ReleaseTextureSampler { handle: TextureSamplerHandle },
    SetTextureSamplerTexture {
        sampler: TextureSamplerHandle,
        texture: ResourceContentHash,
    },

    // Render states
    AllocateRenderState { handle: RenderStateHandle, state: RenderState },
    ReleaseRenderState { handle: RenderStateHandle },
    SetRenderState { handle: RenderStateHandle, state: RenderState },

    // Renderables
    AllocateRenderable { handle: RenderableHandle, node: NodeHandle },
    ReleaseRenderable { handle: RenderableHandle },
    SetRenderableDataInstance {
        renderable: RenderableHandle,
        data: Option<DataObjectHandle>,
    },
    SetRenderableRenderState {
        renderable: RenderableHandle,
        state: Option<RenderStateHandle>,
    },
    /// Swaps data instance and render state in one step, so no consumer can
    /// ever draw with the new data and the old state (or vice versa).
    SetRenderableDataInstanceAndState {
        renderable: RenderableHandle,
        data: Option<DataObjectHandle>,
        state: Option<RenderStateHandle>,
    },
    SetRenderableVisibility {
        renderable: RenderableHandle,
        visibility: Visibility,
    },

    // Render groups
    AllocateRenderGroup { handle: RenderGroupHandle },
    ReleaseRenderGroup { handle: RenderGroupHandle },
    AddRenderableToRenderGroup {
        group: RenderGroupHandle,
        renderable: RenderableHandle,
        order: i32,
    },
    RemoveRenderableFromRenderGroup {
        group: RenderGroupHandle,
        renderable: RenderableHandle,
    },

    // Render targets
    AllocateRenderTarget {
        handle: RenderTargetHandle,
        width: u32,
        height: u32,
    },
    ReleaseRenderTarget { handle: RenderTargetHandle },

    // Data slots
    AllocateDataSlot { handle: DataSlotHandle, slot: DataSlot },
    ReleaseDataSlot { handle: DataSlotHandle },
}

/// Wire tag of a [`SceneAction`]. Values are part of the binary format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActionKind {
    PreallocateSceneSize = 1,
    AllocateNode = 2,
    ReleaseNode = 3,
    AddChildToNode = 4,
    RemoveChildFromNode = 5,
    AllocateTransform = 6,
    ReleaseTransform = 7,
    SetTransformTranslation = 8,
    SetTransformRotation = 9,
    SetTransformScaling = 10,
    AllocateDataObject = 11,
    ReleaseDataObject = 12,
    SetDataValue = 13,
    AllocateTextureSampler = 14,
    ReleaseTextureSampler = 15,
    SetTextureSamplerTexture = 16,
    AllocateRenderState = 17,
    ReleaseRenderState = 18,
    SetRenderState = 19,
    AllocateRenderable = 20,
    ReleaseRenderable = 21,
    SetRenderableDataInstance = 22,
    SetRenderableRenderState = 23,
    SetRenderableDataInstanceAndState = 24,
    SetRenderableVisibility = 25,
    AllocateRenderGroup = 26,
    ReleaseRenderGroup = 27,
    AddRenderableToRenderGroup = 28,
    RemoveRenderableFromRenderGroup = 29,
    AllocateRenderTarget = 30,
    ReleaseRenderTarget = 31,
    AllocateDataSlot = 32,
    ReleaseDataSlot = 33,
}

impl ActionKind {
    const ALL: [Self; 33] = [
        Self::PreallocateSceneSize,
        Self::AllocateNode,
        Self::ReleaseNode,
        Self::AddChildToNode,
        Self::RemoveChildFromNode,
        Self::AllocateTransform,
        Self::ReleaseTransform,
        Self::SetTransformTranslation,
        Self::SetTransformRotation,
        Self::SetTransformScaling,
        Self::AllocateDataObject,
        Self::ReleaseDataObject,
        Self::SetDataValue,
        Self::AllocateTextureSampler,
        Self::ReleaseTextureSampler,
        Self::SetTextureSamplerTexture,
        Self::AllocateRenderState,
        Self::ReleaseRenderState,
        Self::SetRenderState,
        Self::AllocateRenderable,
        Self::ReleaseRenderable,
        Self::SetRenderableDataInstance,
        Self::SetRenderableRenderState,
        Self::SetRenderableDataInstanceAndState,
        Self::SetRenderableVisibility,
        Self::AllocateRenderGroup,
        Self::ReleaseRenderGroup,
        Self::AddRenderableToRenderGroup,
        Self::RemoveRenderableFromRenderGroup,
        Self::AllocateRenderTarget,
        Self::ReleaseRenderTarget,
        Self::AllocateDataSlot,
        Self::ReleaseDataSlot,
    ];

    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| *kind as u8 == tag)
    }

    #[inline]
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

impl SceneAction {
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::PreallocateSceneSize(_) => ActionKind::PreallocateSceneSize,
            Self::AllocateNode { .. } => ActionKind::AllocateNode,
            Self::ReleaseNode { .. } => ActionKind::ReleaseNode,
            Self::AddChildToNode { .. } => ActionKind::AddChildToNode,
            Self::RemoveChildFromNode { .. } => ActionKind::RemoveChildFromNode,
            Self::AllocateTransform { .. } => ActionKind::AllocateTransform,
            Self::ReleaseTransform { .. } => ActionKind::ReleaseTransform,
            Self::SetTransformTranslation { .. } => ActionKind::SetTransformTranslation,
            Self::SetTransformRotation { .. } => ActionKind::SetTransformRotation,
            Self::SetTransformScaling { .. } => ActionKind::SetTransformScaling,
            Self::AllocateDataObject { .. } => ActionKind::AllocateDataObject,
            Self::ReleaseDataObject { .. } => ActionKind::ReleaseDataObject,
            Self::SetDataValue { .. } => ActionKind::SetDataValue,
            Self::AllocateTextureSampler { .. } => ActionKind::AllocateTextureSampler,
            Self::ReleaseTextureSampler { .. } => ActionKind::ReleaseTextureSampler,
            Self::SetTextureSamplerTexture { .. } => ActionKind::SetTextureSamplerTexture,
            Self::AllocateRenderState { .. } => ActionKind::AllocateRenderState,
            Self::ReleaseRenderState { .. } => ActionKind::ReleaseRenderState,
            Self::SetRenderState { .. } => ActionKind::SetRenderState,
            Self::AllocateRenderable { .. } => ActionKind::AllocateRenderable,
            Self::ReleaseRenderable { .. } => ActionKind::ReleaseRenderable,
            Self::SetRenderableDataInstance { .. } => ActionKind::SetRenderableDataInstance,
            Self::SetRenderableRenderState { .. } => ActionKind::SetRenderableRenderState,
            Self::SetRenderableDataInstanceAndState { .. } => {
                ActionKind::SetRenderableDataInstanceAndState
            }
            Self::SetRenderableVisibility { .. } => ActionKind::SetRenderableVisibility,
            Self::AllocateRenderGroup { .. } => ActionKind::AllocateRenderGroup,
            Self::ReleaseRenderGroup { .. } => ActionKind::ReleaseRenderGroup,
            Self::AddRenderableToRenderGroup { .. } => ActionKind::AddRenderableToRenderGroup,
            Self::RemoveRenderableFromRenderGroup { .. } => {
                ActionKind::RemoveRenderableFromRenderGroup
            }
            Self::AllocateRenderTarget { .. } => ActionKind::AllocateRenderTarget,
            Self::ReleaseRenderTarget { .. } => ActionKind::ReleaseRenderTarget,
            Self::AllocateDataSlot { .. } => ActionKind::AllocateDataSlot,
            Self::ReleaseDataSlot { .. } => ActionKind::ReleaseDataSlot,
        }
    }
}

/// What applying one record changed, as far as cross-scene links care.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AppliedEffect {
    #[default]
    None,
    SlotCreated {
        id: SlotId,
        slot_type: SlotType,
        /// Value type of the backing data object, for data slots.
        data_type: Option<DataType>,
    },
    SlotReleased { id: SlotId, slot_type: SlotType },
    /// World transforms of these nodes (and their subtrees) changed.
    TransformsChanged(SmallVec<[NodeHandle; 2]>),
    DataChanged(DataObjectHandle),
    TextureChanged(TextureSamplerHandle),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_unique_and_resolvable() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ActionKind::from_tag(0), None);
        assert_eq!(ActionKind::from_tag(200), None);
    }
}
