//! Scene Arena
//!
//! [`Scene`] is plain data: one generational [`Pool`] per object kind plus an
//! index from author-assigned [`SlotId`]s to data slot handles. It knows
//! nothing about recording; the only way to mutate it is [`Scene::apply`],
//! which both the producer (through
//! [`RecordingScene`](crate::RecordingScene)) and the consumer (replaying a
//! [`MutationLog`](crate::MutationLog)) call.

use glam::Mat4;
use rustc_hash::FxHashMap;
use smallvec::smallvec;
use tessera_core::{LinkKind, MAX_RESERVATION, Pool, SlotId};

use crate::action::{AppliedEffect, SceneAction};
use crate::error::SceneError;
use crate::objects::{
    DataObject, DataObjectHandle, DataSlot, DataSlotHandle, Node, NodeHandle, RenderGroup,
    RenderState, RenderTarget, Renderable, SlotTarget, SlotValue, TextureSampler,
    TextureSamplerHandle, Transform,
};
use crate::size::SceneSizeInformation;

/// Values consumer slots receive through links, keyed by slot id.
pub type LinkedValues<'a> = dyn Fn(SlotId) -> Option<SlotValue> + 'a;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    nodes: Pool<Node>,
    transforms: Pool<Transform>,
    data_objects: Pool<DataObject>,
    texture_samplers: Pool<TextureSampler>,
    render_states: Pool<RenderState>,
    renderables: Pool<Renderable>,
    render_groups: Pool<RenderGroup>,
    render_targets: Pool<RenderTarget>,
    data_slots: Pool<DataSlot>,

    slot_index: FxHashMap<SlotId, DataSlotHandle>,
}

macro_rules! pool_accessors {
    ($($pool:ident, $get:ident: $ty:ty, $kind:literal;)*) => {
        $(
            #[inline]
            #[must_use]
            pub fn $pool(&self) -> &Pool<$ty> {
                &self.$pool
            }

            #[inline]
            pub fn $get(&self, handle: tessera_core::Handle<$ty>) -> Result<&$ty, SceneError> {
                self.$pool.get(handle).map_err(SceneError::handle($kind))
            }
        )*
    };
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_size(size: &SceneSizeInformation) -> Self {
        let mut scene = Self::default();
        scene.preallocate(size);
        scene
    }

    pool_accessors! {
        nodes, node: Node, "node";
        transforms, transform: Transform, "transform";
        data_objects, data_object: DataObject, "data object";
        texture_samplers, texture_sampler: TextureSampler, "texture sampler";
        render_states, render_state: RenderState, "render state";
        renderables, renderable: Renderable, "renderable";
        render_groups, render_group: RenderGroup, "render group";
        render_targets, render_target: RenderTarget, "render target";
        data_slots, data_slot: DataSlot, "data slot";
    }

    /// Reserves storage for the given object counts, each capped at
    /// [`MAX_RESERVATION`].
    pub fn preallocate(&mut self, size: &SceneSizeInformation) {
        self.nodes.reserve_total(size.nodes as usize);
        self.transforms.reserve_total(size.transforms as usize);
        self.data_objects.reserve_total(size.data_objects as usize);
        self.texture_samplers.reserve_total(size.texture_samplers as usize);
        self.render_states.reserve_total(size.render_states as usize);
        self.renderables.reserve_total(size.renderables as usize);
        self.render_groups.reserve_total(size.render_groups as usize);
        self.render_targets.reserve_total(size.render_targets as usize);
        self.data_slots.reserve_total(size.data_slots as usize);
        let slots = (size.data_slots as usize).min(MAX_RESERVATION);
        self.slot_index
            .reserve(slots.saturating_sub(self.slot_index.len()));
    }

    /// Live object counts.
    #[must_use]
    pub fn size_information(&self) -> SceneSizeInformation {
        SceneSizeInformation {
            nodes: self.nodes.len() as u32,
            transforms: self.transforms.len() as u32,
            data_objects: self.data_objects.len() as u32,
            texture_samplers: self.texture_samplers.len() as u32,
            render_states: self.render_states.len() as u32,
            renderables: self.renderables.len() as u32,
            render_groups: self.render_groups.len() as u32,
            render_targets: self.render_targets.len() as u32,
            data_slots: self.data_slots.len() as u32,
        }
    }

    // ========================================================================
    // Applying records
    // ========================================================================

    /// Applies one record. On error the scene is left untouched.
    pub fn apply(&mut self, action: &SceneAction) -> Result<AppliedEffect, SceneError> {
        match *action {
            SceneAction::PreallocateSceneSize(ref size) => {
                self.preallocate(size);
                Ok(AppliedEffect::None)
            }

            // --- hierarchy ---
            SceneAction::AllocateNode { handle } => {
                self.nodes
                    .allocate_at(handle, Node::default())
                    .map_err(SceneError::handle("node"))?;
                Ok(AppliedEffect::None)
            }
            SceneAction::ReleaseNode { handle } => self.release_node(handle),
            SceneAction::AddChildToNode { parent, child } => self.add_child(parent, child),
            SceneAction::RemoveChildFromNode { parent, child } => {
                self.node(parent)?;
                if self.node(child)?.parent != Some(parent) {
                    return Err(SceneError::NotAChild { parent, child });
                }
                self.detach(child);
                Ok(AppliedEffect::TransformsChanged(smallvec![child]))
            }

            // --- transforms ---
            SceneAction::AllocateTransform { handle, node } => {
                if self.node(node)?.transform.is_some() {
                    return Err(SceneError::TransformExists(node));
                }
                self.transforms
                    .allocate_at(handle, Transform::new(node))
                    .map_err(SceneError::handle("transform"))?;
                self.node_mut(node)?.transform = Some(handle);
                Ok(AppliedEffect::None)
            }
            SceneAction::ReleaseTransform { handle } => {
                let transform = self
                    .transforms
                    .release(handle)
                    .map_err(SceneError::handle("transform"))?;
                if let Ok(node) = self.nodes.get_mut(transform.node)
                    && node.transform == Some(handle)
                {
                    node.transform = None;
                }
                Ok(AppliedEffect::TransformsChanged(smallvec![transform.node]))
            }
            SceneAction::SetTransformTranslation { transform, value } => {
                let transform = self.transform_mut(transform)?;
                transform.translation = value;
                Ok(AppliedEffect::TransformsChanged(smallvec![transform.node]))
            }
            SceneAction::SetTransformRotation { transform, value } => {
                let transform = self.transform_mut(transform)?;
                transform.rotation = value;
                Ok(AppliedEffect::TransformsChanged(smallvec![transform.node]))
            }
            SceneAction::SetTransformScaling { transform, value } => {
                let transform = self.transform_mut(transform)?;
                transform.scale = value;
                Ok(AppliedEffect::TransformsChanged(smallvec![transform.node]))
            }

            // --- data ---
            SceneAction::AllocateDataObject { handle, value } => {
                self.data_objects
                    .allocate_at(handle, DataObject { value })
                    .map_err(SceneError::handle("data object"))?;
                Ok(AppliedEffect::None)
            }
            SceneAction::ReleaseDataObject { handle } => {
                self.data_objects
                    .release(handle)
                    .map_err(SceneError::handle("data object"))?;
                Ok(AppliedEffect::None)
            }
            SceneAction::SetDataValue { data, value } => {
                let object = self
                    .data_objects
                    .get_mut(data)
                    .map_err(SceneError::handle("data object"))?;
                if object.data_type() != value.data_type() {
                    return Err(SceneError::DataTypeMismatch {
                        expected: object.data_type(),
                        actual: value.data_type(),
                    });
                }
                object.value = value;
                Ok(AppliedEffect::DataChanged(data))
            }

            // --- textures ---
            SceneAction::AllocateTextureSampler {
                handle,
                texture,
                filter,
            } => {
                self.texture_samplers
                    .allocate_at(handle, TextureSampler { texture, filter })
                    .map_err(SceneError::handle("texture sampler"))?;
                Ok(AppliedEffect::None)
            }
            SceneAction::ReleaseTextureSampler { handle } => {
                self.texture_samplers
                    .release(handle)
                    .map_err(SceneError::handle("texture sampler"))?;
                Ok(AppliedEffect::None)
            }
            SceneAction::SetTextureSamplerTexture { sampler, texture } => {
                self.texture_samplers
                    .get_mut(sampler)
                    .map_err(SceneError::handle("texture sampler"))?
                    .texture = texture;
                Ok(AppliedEffect::TextureChanged(sampler))
            }

            // --- render states ---
            SceneAction::AllocateRenderState { handle, state } => {
                self.render_states
                    .allocate_at(handle, state)
                    .map_err(SceneError::handle("render state"))?;
                Ok(AppliedEffect::None)
            }
            SceneAction::ReleaseRenderState { handle } => {
                self.render_states
                    .release(handle)
                    .map_err(SceneError::handle("render state"))?;
                Ok(AppliedEffect::None)
            }
            SceneAction::SetRenderState { handle, state } => {
                *self
                    .render_states
                    .get_mut(handle)
                    .map_err(SceneError::handle("render state"))? = state;
                Ok(AppliedEffect::None)
            }

            // --- renderables ---
            SceneAction::AllocateRenderable { handle, node } => {
                self.node(node)?;
                self.renderables
                    .allocate_at(handle, Renderable::new(node))
                    .map_err(SceneError::handle("renderable"))?;
                Ok(AppliedEffect::None)
            }
            SceneAction::ReleaseRenderable { handle } => {
                self.renderables
                    .release(handle)
                    .map_err(SceneError::handle("renderable"))?;
                Ok(AppliedEffect::None)
            }
            SceneAction::SetRenderableDataInstance { renderable, data } => {
                if let Some(data) = data {
                    self.data_object(data)?;
                }
                self.renderable_mut(renderable)?.data_instance = data;
                Ok(AppliedEffect::None)
            }
            SceneAction::SetRenderableRenderState { renderable, state } => {
                if let Some(state) = state {
                    self.render_state(state)?;
                }
                self.renderable_mut(renderable)?.render_state = state;
                Ok(AppliedEffect::None)
            }
            SceneAction::SetRenderableDataInstanceAndState {
                renderable,
                data,
                state,
            } => {
                if let Some(data) = data {
                    self.data_object(data)?;
                }
                if let Some(state) = state {
                    self.render_state(state)?;
                }
                let renderable = self.renderable_mut(renderable)?;
                renderable.data_instance = data;
                renderable.render_state = state;
                Ok(AppliedEffect::None)
            }
            SceneAction::SetRenderableVisibility {
                renderable,
                visibility,
            } => {
                self.renderable_mut(renderable)?.visibility = visibility;
                Ok(AppliedEffect::None)
            }

            // --- render groups ---
            SceneAction::AllocateRenderGroup { handle } => {
                self.render_groups
                    .allocate_at(handle, RenderGroup::default())
                    .map_err(SceneError::handle("render group"))?;
                Ok(AppliedEffect::None)
            }
            SceneAction::ReleaseRenderGroup { handle } => {
                self.render_groups
                    .release(handle)
                    .map_err(SceneError::handle("render group"))?;
                Ok(AppliedEffect::None)
            }
            SceneAction::AddRenderableToRenderGroup {
                group,
                renderable,
                order,
            } => {
                self.renderable(renderable)?;
                let group = self
                    .render_groups
                    .get_mut(group)
                    .map_err(SceneError::handle("render group"))?;
                match group.entries.iter_mut().find(|(handle, _)| *handle == renderable) {
                    Some(entry) => entry.1 = order,
                    None => group.entries.push((renderable, order)),
                }
                Ok(AppliedEffect::None)
            }
            SceneAction::RemoveRenderableFromRenderGroup { group, renderable } => {
                self.render_groups
                    .get_mut(group)
                    .map_err(SceneError::handle("render group"))?
                    .entries
                    .retain(|(handle, _)| *handle != renderable);
                Ok(AppliedEffect::None)
            }

            // --- render targets ---
            SceneAction::AllocateRenderTarget {
                handle,
                width,
                height,
            } => {
                self.render_targets
                    .allocate_at(handle, RenderTarget { width, height })
                    .map_err(SceneError::handle("render target"))?;
                Ok(AppliedEffect::None)
            }
            SceneAction::ReleaseRenderTarget { handle } => {
                self.render_targets
                    .release(handle)
                    .map_err(SceneError::handle("render target"))?;
                Ok(AppliedEffect::None)
            }

            // --- data slots ---
            SceneAction::AllocateDataSlot { handle, slot } => self.allocate_data_slot(handle, slot),
            SceneAction::ReleaseDataSlot { handle } => {
                let slot = self
                    .data_slots
                    .release(handle)
                    .map_err(SceneError::handle("data slot"))?;
                self.slot_index.remove(&slot.id);
                Ok(AppliedEffect::SlotReleased {
                    id: slot.id,
                    slot_type: slot.slot_type,
                })
            }
        }
    }

    fn node_mut(&mut self, handle: NodeHandle) -> Result<&mut Node, SceneError> {
        self.nodes.get_mut(handle).map_err(SceneError::handle("node"))
    }

    fn transform_mut(
        &mut self,
        handle: crate::objects::TransformHandle,
    ) -> Result<&mut Transform, SceneError> {
        self.transforms
            .get_mut(handle)
            .map_err(SceneError::handle("transform"))
    }

    fn renderable_mut(
        &mut self,
        handle: crate::objects::RenderableHandle,
    ) -> Result<&mut Renderable, SceneError> {
        self.renderables
            .get_mut(handle)
            .map_err(SceneError::handle("renderable"))
    }

    fn release_node(&mut self, handle: NodeHandle) -> Result<AppliedEffect, SceneError> {
        let node = self.nodes.release(handle).map_err(SceneError::handle("node"))?;

        if let Some(parent) = node.parent
            && let Ok(parent) = self.nodes.get_mut(parent)
        {
            parent.children.retain(|&child| child != handle);
        }
        for &child in &node.children {
            if let Ok(child) = self.nodes.get_mut(child) {
                child.parent = None;
            }
        }

        Ok(AppliedEffect::TransformsChanged(node.children.into_iter().collect()))
    }

    fn add_child(
        &mut self,
        parent: NodeHandle,
        child: NodeHandle,
    ) -> Result<AppliedEffect, SceneError> {
        self.node(parent)?;
        let current_parent = self.node(child)?.parent;
        if self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::HierarchyCycle { parent, child });
        }
        if current_parent == Some(parent) {
            return Ok(AppliedEffect::None);
        }

        self.detach(child);
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(AppliedEffect::TransformsChanged(smallvec![child]))
    }

    /// Unlinks `child` from its parent, if any.
    fn detach(&mut self, child: NodeHandle) {
        let Some(parent) = self.nodes.get(child).ok().and_then(|node| node.parent) else {
            return;
        };
        if let Ok(parent) = self.nodes.get_mut(parent) {
            parent.children.retain(|&c| c != child);
        }
        if let Ok(child) = self.nodes.get_mut(child) {
            child.parent = None;
        }
    }

    fn allocate_data_slot(
        &mut self,
        handle: DataSlotHandle,
        slot: DataSlot,
    ) -> Result<AppliedEffect, SceneError> {
        if self.slot_index.contains_key(&slot.id) {
            return Err(SceneError::DuplicateSlotId(slot.id));
        }

        let data_type = match (slot.slot_type.link_kind(), slot.target) {
            (LinkKind::Transformation, SlotTarget::Node(node)) => {
                self.node(node)?;
                None
            }
            (LinkKind::Data, SlotTarget::Data(data)) => Some(self.data_object(data)?.data_type()),
            (LinkKind::Texture, SlotTarget::Texture(sampler)) => {
                self.texture_sampler(sampler)?;
                None
            }
            _ => {
                return Err(SceneError::SlotTargetMismatch {
                    slot_type: slot.slot_type,
                    target: slot.target,
                });
            }
        };

        self.data_slots
            .allocate_at(handle, slot)
            .map_err(SceneError::handle("data slot"))?;
        self.slot_index.insert(slot.id, handle);

        Ok(AppliedEffect::SlotCreated {
            id: slot.id,
            slot_type: slot.slot_type,
            data_type,
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// `true` if `ancestor` is `node` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut current = Some(node);
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self.nodes.get(handle).ok().and_then(|n| n.parent);
        }
        false
    }

    /// Local matrix of a node; identity when it has no transform.
    pub fn local_matrix(&self, node: NodeHandle) -> Result<Mat4, SceneError> {
        match self.node(node)?.transform {
            Some(transform) => Ok(self.transform(transform)?.local_matrix()),
            None => Ok(Mat4::IDENTITY),
        }
    }

    /// Product of all local matrices from the root down to `node`.
    pub fn world_matrix(&self, node: NodeHandle) -> Result<Mat4, SceneError> {
        self.linked_world_matrix(node, &|_| None)
    }

    /// [`Self::world_matrix`] where a node targeted by a linked consumer
    /// slot takes the received matrix in place of its own transform.
    fn linked_world_matrix(
        &self,
        node: NodeHandle,
        linked: &LinkedValues<'_>,
    ) -> Result<Mat4, SceneError> {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(node);
        while let Some(handle) = current {
            let local = match self.received_value(SlotTarget::Node(handle), linked) {
                Some(SlotValue::Transformation(received)) => received,
                _ => self.local_matrix(handle)?,
            };
            matrix = local * matrix;
            current = self.node(handle)?.parent;
        }
        Ok(matrix)
    }

    /// `node` and all of its descendants, depth first.
    #[must_use]
    pub fn subtree(&self, node: NodeHandle) -> Vec<NodeHandle> {
        let mut result = Vec::new();
        let mut stack = vec![node];
        while let Some(handle) = stack.pop() {
            if let Ok(n) = self.nodes.get(handle) {
                result.push(handle);
                stack.extend(n.children.iter().rev());
            }
        }
        result
    }

    #[must_use]
    pub fn data_slot_by_id(&self, id: SlotId) -> Option<(DataSlotHandle, &DataSlot)> {
        let handle = *self.slot_index.get(&id)?;
        self.data_slots.get(handle).ok().map(|slot| (handle, slot))
    }

    /// Current local value behind a data slot.
    pub fn slot_value(&self, id: SlotId) -> Result<SlotValue, SceneError> {
        self.resolve_slot_value(id, &|_| None)
    }

    /// Value behind a data slot once links are applied. `linked` returns
    /// the value a consumer slot of this scene receives through its link,
    /// or `None` when it is not linked. A received value replaces the
    /// consumer's target object wherever the slot's value is derived from
    /// that object.
    pub fn resolve_slot_value(
        &self,
        id: SlotId,
        linked: &LinkedValues<'_>,
    ) -> Result<SlotValue, SceneError> {
        let (_, slot) = self.data_slot_by_id(id).ok_or(SceneError::UnknownSlotId(id))?;
        match slot.target {
            SlotTarget::Node(node) => Ok(SlotValue::Transformation(
                self.linked_world_matrix(node, linked)?,
            )),
            SlotTarget::Data(data) => match self.received_value(slot.target, linked) {
                Some(value @ SlotValue::Data(_)) => Ok(value),
                _ => Ok(SlotValue::Data(self.data_object(data)?.value)),
            },
            SlotTarget::Texture(sampler) => match self.received_value(slot.target, linked) {
                Some(value @ SlotValue::Texture(_)) => Ok(value),
                _ => Ok(SlotValue::Texture(self.texture_sampler(sampler)?.texture)),
            },
        }
    }

    /// First value received by a linked consumer slot on `target`.
    fn received_value(&self, target: SlotTarget, linked: &LinkedValues<'_>) -> Option<SlotValue> {
        self.data_slots
            .iter()
            .map(|(_, slot)| slot)
            .filter(|slot| slot.slot_type.is_consumer() && slot.target == target)
            .find_map(|slot| linked(slot.id))
    }

    /// Provider slots whose value depends on the world transform of `node`.
    #[must_use]
    pub fn providers_affected_by_node(&self, node: NodeHandle) -> Vec<SlotId> {
        self.provider_slots()
            .filter_map(|slot| match slot.target {
                SlotTarget::Node(target) if self.is_ancestor_or_self(node, target) => Some(slot.id),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn providers_affected_by_data(&self, data: DataObjectHandle) -> Vec<SlotId> {
        self.provider_slots()
            .filter(|slot| slot.target == SlotTarget::Data(data))
            .map(|slot| slot.id)
            .collect()
    }

    #[must_use]
    pub fn providers_affected_by_texture(&self, sampler: TextureSamplerHandle) -> Vec<SlotId> {
        self.provider_slots()
            .filter(|slot| slot.target == SlotTarget::Texture(sampler))
            .map(|slot| slot.id)
            .collect()
    }

    /// Provider slots whose value changes when consumer slot `id` receives a
    /// new value through its link.
    #[must_use]
    pub fn providers_affected_by_slot(&self, id: SlotId) -> Vec<SlotId> {
        let Some((_, slot)) = self.data_slot_by_id(id) else {
            return Vec::new();
        };
        let mut affected = match slot.target {
            SlotTarget::Node(node) => self.providers_affected_by_node(node),
            SlotTarget::Data(data) => self.providers_affected_by_data(data),
            SlotTarget::Texture(sampler) => self.providers_affected_by_texture(sampler),
        };
        affected.retain(|&provider| provider != id);
        affected
    }

    fn provider_slots(&self) -> impl Iterator<Item = &DataSlot> {
        self.data_slots
            .iter()
            .map(|(_, slot)| slot)
            .filter(|slot| slot.slot_type.is_provider())
    }
}
