//! Scene object kinds stored in the [`Scene`](crate::Scene) pools.

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use tessera_core::{Handle, SlotId, SlotType};

pub type NodeHandle = Handle<Node>;
pub type TransformHandle = Handle<Transform>;
pub type DataObjectHandle = Handle<DataObject>;
pub type TextureSamplerHandle = Handle<TextureSampler>;
pub type RenderStateHandle = Handle<RenderState>;
pub type RenderableHandle = Handle<Renderable>;
pub type RenderGroupHandle = Handle<RenderGroup>;
pub type RenderTargetHandle = Handle<RenderTarget>;
pub type DataSlotHandle = Handle<DataSlot>;

// ============================================================================
// Hierarchy
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub parent: Option<NodeHandle>,
    pub children: Vec<NodeHandle>,
    /// Local transform, if one was allocated for this node.
    pub transform: Option<TransformHandle>,
}

/// TRS component attached to exactly one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub node: NodeHandle,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    #[must_use]
    pub fn new(node: NodeHandle) -> Self {
        Self {
            node,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    #[must_use]
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

// ============================================================================
// Data
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    Float(f32),
    Int(i32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl DataValue {
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Float(_) => DataType::Float,
            Self::Int(_) => DataType::Int,
            Self::Vec2(_) => DataType::Vec2,
            Self::Vec3(_) => DataType::Vec3,
            Self::Vec4(_) => DataType::Vec4,
            Self::Mat4(_) => DataType::Mat4,
        }
    }
}

/// A typed value. The type is fixed when the object is allocated.
#[derive(Debug, Clone, PartialEq)]
pub struct DataObject {
    pub value: DataValue,
}

impl DataObject {
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.value.data_type()
    }
}

// ============================================================================
// Textures
// ============================================================================

/// Content hash of an uploaded texture resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceContentHash(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureFilter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureSampler {
    pub texture: ResourceContentHash,
    pub filter: TextureFilter,
}

// ============================================================================
// Rendering
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Disabled,
    Alpha,
    Additive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

/// Fixed-function pipeline state of a renderable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderState {
    pub blend: BlendMode,
    pub cull: CullMode,
    pub depth_test: bool,
    pub depth_write: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            blend: BlendMode::Disabled,
            cull: CullMode::Back,
            depth_test: true,
            depth_write: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    /// Not rendered and its resources may be dropped.
    Off,
    /// Not rendered, resources kept.
    Invisible,
    #[default]
    Visible,
}

/// One draw: a node's world transform, its uniform data and pipeline state.
#[derive(Debug, Clone, PartialEq)]
pub struct Renderable {
    pub node: NodeHandle,
    pub data_instance: Option<DataObjectHandle>,
    pub render_state: Option<RenderStateHandle>,
    pub visibility: Visibility,
}

impl Renderable {
    #[must_use]
    pub fn new(node: NodeHandle) -> Self {
        Self {
            node,
            data_instance: None,
            render_state: None,
            visibility: Visibility::Visible,
        }
    }
}

/// Ordered collection of renderables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderGroup {
    pub entries: Vec<(RenderableHandle, i32)>,
}

impl RenderGroup {
    /// Renderables sorted by order; ties keep insertion order.
    #[must_use]
    pub fn sorted_renderables(&self) -> Vec<RenderableHandle> {
        let mut entries = self.entries.clone();
        entries.sort_by_key(|&(_, order)| order);
        entries.into_iter().map(|(handle, _)| handle).collect()
    }

    #[must_use]
    pub fn contains(&self, renderable: RenderableHandle) -> bool {
        self.entries.iter().any(|&(handle, _)| handle == renderable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
}

// ============================================================================
// Data slots
// ============================================================================

/// Object a data slot exposes (provider) or overrides (consumer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotTarget {
    Node(NodeHandle),
    Data(DataObjectHandle),
    Texture(TextureSamplerHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSlot {
    pub id: SlotId,
    pub slot_type: SlotType,
    pub target: SlotTarget,
}

/// Current value behind a data slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotValue {
    /// World matrix of the slot's node.
    Transformation(Mat4),
    Data(DataValue),
    Texture(ResourceContentHash),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_group_sorts_by_order_stably() {
        let a = RenderableHandle::new(0, 0);
        let b = RenderableHandle::new(1, 0);
        let c = RenderableHandle::new(2, 0);
        let group = RenderGroup {
            entries: vec![(a, 5), (b, -1), (c, 5)],
        };
        assert_eq!(group.sorted_renderables(), vec![b, a, c]);
    }

    #[test]
    fn identity_transform_has_identity_matrix() {
        let transform = Transform::new(NodeHandle::new(0, 0));
        assert_eq!(transform.local_matrix(), Mat4::IDENTITY);
    }
}
