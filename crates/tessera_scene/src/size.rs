use serde::{Deserialize, Serialize};

/// Expected object counts of a scene, per object kind.
///
/// Used to reserve arena and log storage up front when a scene is built in
/// bulk, and transmitted as a record so the consumer reserves the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneSizeInformation {
    pub nodes: u32,
    pub transforms: u32,
    pub data_objects: u32,
    pub texture_samplers: u32,
    pub render_states: u32,
    pub renderables: u32,
    pub render_groups: u32,
    pub render_targets: u32,
    pub data_slots: u32,
}

impl SceneSizeInformation {
    /// Total number of objects across all kinds.
    #[must_use]
    pub fn total(&self) -> usize {
        [
            self.nodes,
            self.transforms,
            self.data_objects,
            self.texture_samplers,
            self.render_states,
            self.renderables,
            self.render_groups,
            self.render_targets,
            self.data_slots,
        ]
        .iter()
        .map(|&count| count as usize)
        .sum()
    }

    /// Component-wise maximum.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self {
            nodes: self.nodes.max(other.nodes),
            transforms: self.transforms.max(other.transforms),
            data_objects: self.data_objects.max(other.data_objects),
            texture_samplers: self.texture_samplers.max(other.texture_samplers),
            render_states: self.render_states.max(other.render_states),
            renderables: self.renderables.max(other.renderables),
            render_groups: self.render_groups.max(other.render_groups),
            render_targets: self.render_targets.max(other.render_targets),
            data_slots: self.data_slots.max(other.data_slots),
        }
    }
}
