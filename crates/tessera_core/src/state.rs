//! Scene lifecycle states.

use serde::{Deserialize, Serialize};

/// How far a scene has progressed towards being rendered.
///
/// Variants are ordered: every state implies all states before it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SceneState {
    #[default]
    Unpublished,
    Published,
    Subscribed,
    Mapped,
    MappedAndAssigned,
    Rendered,
}

/// The coarse state an owning application asks for and observes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RendererSceneState {
    /// Not known to the renderer, or not needed by the owner.
    #[default]
    Unavailable,
    /// Published, but no renderer resources held.
    Available,
    /// Mapped and assigned, ready to be shown.
    Ready,
    Rendered,
}

impl SceneState {
    /// Coarse view of a confirmed state.
    #[must_use]
    pub const fn renderer_state(self) -> RendererSceneState {
        match self {
            Self::Unpublished => RendererSceneState::Unavailable,
            Self::Published | Self::Subscribed | Self::Mapped => RendererSceneState::Available,
            Self::MappedAndAssigned => RendererSceneState::Ready,
            Self::Rendered => RendererSceneState::Rendered,
        }
    }
}

impl From<RendererSceneState> for SceneState {
    /// Internal target for a requested coarse state.
    ///
    /// A scene cannot be unpublished from the renderer side, so both
    /// `Unavailable` and `Available` mean "release everything but stay
    /// published".
    fn from(state: RendererSceneState) -> Self {
        match state {
            RendererSceneState::Unavailable | RendererSceneState::Available => Self::Published,
            RendererSceneState::Ready => Self::MappedAndAssigned,
            RendererSceneState::Rendered => Self::Rendered,
        }
    }
}
