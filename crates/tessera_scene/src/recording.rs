//! Recording scene: the producer side.
//!
//! [`RecordingScene`] wraps a plain [`Scene`] and a [`MutationLog`]. Every
//! mutating call builds one [`SceneAction`], applies it and, only if that
//! succeeded, appends it to the log. A failed call leaves both untouched.

use glam::{Quat, Vec3};
use tessera_core::{SceneId, SlotId, SlotType};

use crate::action::{AppliedEffect, SceneAction};
use crate::error::SceneError;
use crate::mutation_log::{MutationLog, SceneUpdate};
use crate::objects::{
    DataObjectHandle, DataSlot, DataSlotHandle, DataValue, NodeHandle, RenderGroupHandle,
    RenderState, RenderStateHandle, RenderTargetHandle, RenderableHandle, ResourceContentHash,
    SlotTarget, TextureFilter, TextureSamplerHandle, TransformHandle, Visibility,
};
use crate::scene::Scene;
use crate::size::SceneSizeInformation;

#[derive(Debug, Clone)]
pub struct RecordingScene {
    id: SceneId,
    scene: Scene,
    log: MutationLog,
    flush_index: u64,
}

impl RecordingScene {
    #[must_use]
    pub fn new(id: SceneId) -> Self {
        Self {
            id,
            scene: Scene::new(),
            log: MutationLog::new(),
            flush_index: 0,
        }
    }

    #[must_use]
    pub fn with_log_capacity(id: SceneId, capacity: usize) -> Self {
        Self {
            log: MutationLog::with_capacity(capacity),
            ..Self::new(id)
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> SceneId {
        self.id
    }

    /// Current producer-side state.
    #[inline]
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Records not yet flushed.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &MutationLog {
        &self.log
    }

    /// Index the next [`RecordingScene::flush`] will carry.
    #[inline]
    #[must_use]
    pub fn next_flush_index(&self) -> u64 {
        self.flush_index
    }

    /// Applies `action` and records it if it succeeded.
    pub fn perform(&mut self, action: SceneAction) -> Result<AppliedEffect, SceneError> {
        let effect = self.scene.apply(&action)?;
        self.log.record(action);
        Ok(effect)
    }

    /// Drains the pending records into an update for the consumer.
    pub fn flush(&mut self) -> SceneUpdate {
        let update = SceneUpdate {
            scene: self.id,
            flush_index: self.flush_index,
            log: self.log.drain(),
        };
        log::trace!(
            "{} flush #{} with {} records",
            self.id,
            update.flush_index,
            update.log.len()
        );
        self.flush_index += 1;
        update
    }

    /// Reserves arena and log storage, and asks the consumer to do the same.
    pub fn preallocate(&mut self, size: SceneSizeInformation) -> Result<(), SceneError> {
        self.log.preallocate(&size);
        self.perform(SceneAction::PreallocateSceneSize(size))?;
        Ok(())
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    pub fn allocate_node(&mut self) -> Result<NodeHandle, SceneError> {
        let handle = self.scene.nodes().next_handle();
        self.perform(SceneAction::AllocateNode { handle })?;
        Ok(handle)
    }

    pub fn release_node(&mut self, handle: NodeHandle) -> Result<(), SceneError> {
        self.perform(SceneAction::ReleaseNode { handle }).map(drop)
    }

    pub fn add_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<(), SceneError> {
        self.perform(SceneAction::AddChildToNode { parent, child })
            .map(drop)
    }

    pub fn remove_child(
        &mut self,
        parent: NodeHandle,
        child: NodeHandle,
    ) -> Result<(), SceneError> {
        self.perform(SceneAction::RemoveChildFromNode { parent, child })
            .map(drop)
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    pub fn allocate_transform(&mut self, node: NodeHandle) -> Result<TransformHandle, SceneError> {
        let handle = self.scene.transforms().next_handle();
        self.perform(SceneAction::AllocateTransform { handle, node })?;
        Ok(handle)
    }

    pub fn release_transform(&mut self, handle: TransformHandle) -> Result<(), SceneError> {
        self.perform(SceneAction::ReleaseTransform { handle }).map(drop)
    }

    pub fn set_translation(
        &mut self,
        transform: TransformHandle,
        value: Vec3,
    ) -> Result<(), SceneError> {
        self.perform(SceneAction::SetTransformTranslation { transform, value })
            .map(drop)
    }

    pub fn set_rotation(
        &mut self,
        transform: TransformHandle,
        value: Quat,
    ) -> Result<(), SceneError> {
        self.perform(SceneAction::SetTransformRotation { transform, value })
            .map(drop)
    }

    pub fn set_scaling(
        &mut self,
        transform: TransformHandle,
        value: Vec3,
    ) -> Result<(), SceneError> {
        self.perform(SceneAction::SetTransformScaling { transform, value })
            .map(drop)
    }

    // ========================================================================
    // Data and textures
    // ========================================================================

    pub fn allocate_data_object(
        &mut self,
        value: DataValue,
    ) -> Result<DataObjectHandle, SceneError> {
        let handle = self.scene.data_objects().next_handle();
        self.perform(SceneAction::AllocateDataObject { handle, value })?;
        Ok(handle)
    }

    pub fn release_data_object(&mut self, handle: DataObjectHandle) -> Result<(), SceneError> {
        self.perform(SceneAction::ReleaseDataObject { handle }).map(drop)
    }

    pub fn set_data_value(
        &mut self,
        data: DataObjectHandle,
        value: DataValue,
    ) -> Result<(), SceneError> {
        self.perform(SceneAction::SetDataValue { data, value }).map(drop)
    }

    pub fn allocate_texture_sampler(
        &mut self,
        texture: ResourceContentHash,
        filter: TextureFilter,
    ) -> Result<TextureSamplerHandle, SceneError> {
        let handle = self.scene.texture_samplers().next_handle();
        self.perform(SceneAction::AllocateTextureSampler {
            handle,
            texture,
            filter,
        })?;
        Ok(handle)
    }

    pub fn release_texture_sampler(
        &mut self,
        handle: TextureSamplerHandle,
    ) -> Result<(), SceneError> {
        self.perform(SceneAction::ReleaseTextureSampler { handle })
            .map(drop)
    }

    pub fn set_sampler_texture(
        &mut self,
        sampler: TextureSamplerHandle,
        texture: ResourceContentHash,
    ) -> Result<(), SceneError> {
        self.perform(SceneAction::SetTextureSamplerTexture { sampler, texture })
            .map(drop)
    }

    // ========================================================================
    // Render states, renderables, groups, targets
    // ========================================================================

    pub fn allocate_render_state(
        &mut self,
        state: RenderState,
    ) -> Result<RenderStateHandle, SceneError> {
        let handle = self.scene.render_states().next_handle();
        self.perform(SceneAction::AllocateRenderState { handle, state })?;
        Ok(handle)
    }

    pub fn release_render_state(&mut self, handle: RenderStateHandle) -> Result<(), SceneError> {
        self.perform(SceneAction::ReleaseRenderState { handle }).map(drop)
    }

    pub fn set_render_state(
        &mut self,
        handle: RenderStateHandle,
        state: RenderState,
    ) -> Result<(), SceneError> {
        self.perform(SceneAction::SetRenderState { handle, state }).map(drop)
    }

    pub fn allocate_renderable(
        &mut self,
        node: NodeHandle,
    ) -> Result<RenderableHandle, SceneError> {
        let handle = self.scene.renderables().next_handle();
        self.perform(SceneAction::AllocateRenderable { handle, node })?;
        Ok(handle)
    }

    pub fn release_renderable(&mut self, handle: RenderableHandle) -> Result<(), SceneError> {
        self.perform(SceneAction::ReleaseRenderable { handle }).map(drop)
    }

    pub fn set_renderable_data_instance(
        &mut self,
        renderable: RenderableHandle,
        data: Option<DataObjectHandle>,
    ) -> Result<(), SceneError> {
        self.perform(SceneAction::SetRenderableDataInstance { renderable, data })
            .map(drop)
    }

    pub fn set_renderable_render_state(
        &mut self,
        renderable: RenderableHandle,
        state: Option<RenderStateHandle>,
    ) -> Result<(), SceneError> {
        self.perform(SceneAction::SetRenderableRenderState { renderable, state })
            .map(drop)
    }

    /// Replaces data instance and render state as a single record.
    pub fn set_renderable_data_instance_and_state(
        &mut self,
        renderable: RenderableHandle,
        data: Option<DataObjectHandle>,
        state: Option<RenderStateHandle>,
    ) -> Result<(), SceneError> {
        self.perform(SceneAction::SetRenderableDataInstanceAndState {
            renderable,
            data,
            state,
        })
        .map(drop)
    }

    pub fn set_renderable_visibility(
        &mut self,
        renderable: RenderableHandle,
        visibility: Visibility,
    ) -> Result<(), SceneError> {
        self.perform(SceneAction::SetRenderableVisibility {
            renderable,
            visibility,
        })
        .map(drop)
    }

    pub fn allocate_render_group(&mut self) -> Result<RenderGroupHandle, SceneError> {
        let handle = self.scene.render_groups().next_handle();
        self.perform(SceneAction::AllocateRenderGroup { handle })?;
        Ok(handle)
    }

    pub fn release_render_group(&mut self, handle: RenderGroupHandle) -> Result<(), SceneError> {
        self.perform(SceneAction::ReleaseRenderGroup { handle }).map(drop)
    }

    pub fn add_renderable_to_group(
        &mut self,
        group: RenderGroupHandle,
        renderable: RenderableHandle,
        order: i32,
    ) -> Result<(), SceneError> {
        self.perform(SceneAction::AddRenderableToRenderGroup {
            group,
            renderable,
            order,
        })
        .map(drop)
    }

    pub fn remove_renderable_from_group(
        &mut self,
        group: RenderGroupHandle,
        renderable: RenderableHandle,
    ) -> Result<(), SceneError> {
        self.perform(SceneAction::RemoveRenderableFromRenderGroup { group, renderable })
            .map(drop)
    }

    pub fn allocate_render_target(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<RenderTargetHandle, SceneError> {
        let handle = self.scene.render_targets().next_handle();
        self.perform(SceneAction::AllocateRenderTarget {
            handle,
            width,
            height,
        })?;
        Ok(handle)
    }

    pub fn release_render_target(&mut self, handle: RenderTargetHandle) -> Result<(), SceneError> {
        self.perform(SceneAction::ReleaseRenderTarget { handle }).map(drop)
    }

    // ========================================================================
    // Data slots
    // ========================================================================

    pub fn allocate_data_slot(
        &mut self,
        id: SlotId,
        slot_type: SlotType,
        target: SlotTarget,
    ) -> Result<DataSlotHandle, SceneError> {
        let handle = self.scene.data_slots().next_handle();
        self.perform(SceneAction::AllocateDataSlot {
            handle,
            slot: DataSlot {
                id,
                slot_type,
                target,
            },
        })?;
        Ok(handle)
    }

    pub fn release_data_slot(&mut self, handle: DataSlotHandle) -> Result<(), SceneError> {
        self.perform(SceneAction::ReleaseDataSlot { handle }).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;

    #[test]
    fn failed_calls_are_not_recorded() {
        let mut scene = RecordingScene::new(SceneId(1));
        let node = scene.allocate_node().unwrap();
        scene.release_node(node).unwrap();

        assert!(scene.allocate_transform(node).is_err());
        assert_eq!(scene.pending().len(), 2);
    }

    #[test]
    fn compound_update_is_one_record() {
        let mut scene = RecordingScene::new(SceneId(1));
        let node = scene.allocate_node().unwrap();
        let renderable = scene.allocate_renderable(node).unwrap();
        let data = scene.allocate_data_object(DataValue::Float(0.5)).unwrap();
        let state = scene.allocate_render_state(RenderState::default()).unwrap();
        scene.flush();

        scene
            .set_renderable_data_instance_and_state(renderable, Some(data), Some(state))
            .unwrap();
        let update = scene.flush();

        assert_eq!(update.flush_index, 1);
        assert_eq!(update.log.len(), 1);
        assert_eq!(
            update.log.actions()[0].kind(),
            ActionKind::SetRenderableDataInstanceAndState
        );
        let stored = scene.scene().renderable(renderable).unwrap();
        assert_eq!(stored.data_instance, Some(data));
        assert_eq!(stored.render_state, Some(state));
    }
}
