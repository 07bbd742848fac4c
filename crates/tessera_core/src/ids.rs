//! Strongly-typed identifiers.
//!
//! Unlike arena handles, these identifiers are chosen by whoever owns the
//! object and stay stable across processes: a [`SceneId`] names a scene
//! everywhere, a [`SlotId`] names a data slot inside one scene.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Process-wide unique identifier of one scene graph instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SceneId(pub u64);

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scene#{}", self.0)
    }
}

/// Author-assigned identifier of a data slot, unique within its scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

/// Fully qualified data slot address: `(scene, slot)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotAddress {
    pub scene: SceneId,
    pub slot: SlotId,
}

impl SlotAddress {
    #[inline]
    #[must_use]
    pub const fn new(scene: SceneId, slot: SlotId) -> Self {
        Self { scene, slot }
    }
}

impl fmt::Display for SlotAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scene, self.slot)
    }
}

/// What a data slot provides or consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotType {
    TransformationProvider,
    TransformationConsumer,
    DataProvider,
    DataConsumer,
    TextureProvider,
    TextureConsumer,
}

/// Category of value carried over a link. Provider and consumer must agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    Transformation,
    Data,
    Texture,
}

impl SlotType {
    #[must_use]
    pub const fn is_provider(self) -> bool {
        matches!(
            self,
            Self::TransformationProvider | Self::DataProvider | Self::TextureProvider
        )
    }

    #[must_use]
    pub const fn is_consumer(self) -> bool {
        !self.is_provider()
    }

    #[must_use]
    pub const fn link_kind(self) -> LinkKind {
        match self {
            Self::TransformationProvider | Self::TransformationConsumer => LinkKind::Transformation,
            Self::DataProvider | Self::DataConsumer => LinkKind::Data,
            Self::TextureProvider | Self::TextureConsumer => LinkKind::Texture,
        }
    }
}

/// Offscreen or onscreen buffer a mapped scene renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DisplayBufferId(pub u32);

impl DisplayBufferId {
    /// The display's own framebuffer.
    pub const FRAMEBUFFER: Self = Self(0);
}

/// Target buffer and render order of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayAssignment {
    pub buffer: DisplayBufferId,
    pub render_order: i32,
}

impl DisplayAssignment {
    #[must_use]
    pub const fn new(buffer: DisplayBufferId, render_order: i32) -> Self {
        Self { buffer, render_order }
    }
}

impl Default for DisplayAssignment {
    fn default() -> Self {
        Self::new(DisplayBufferId::FRAMEBUFFER, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_types_pair_up_by_link_kind() {
        assert_eq!(
            SlotType::TransformationProvider.link_kind(),
            SlotType::TransformationConsumer.link_kind()
        );
        assert_ne!(SlotType::DataProvider.link_kind(), SlotType::TextureConsumer.link_kind());
        assert!(SlotType::TextureProvider.is_provider());
        assert!(SlotType::DataConsumer.is_consumer());
    }

    #[test]
    fn slot_address_display() {
        let address = SlotAddress::new(SceneId(3), SlotId(12));
        assert_eq!(address.to_string(), "scene#3/slot#12");
    }
}
