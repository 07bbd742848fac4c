//! Mutation Log
//!
//! Append-only sequence of [`SceneAction`]s in the exact order they were
//! applied on the producer. A flush drains the log into a [`SceneUpdate`]
//! which is what travels to the consumer.

use tessera_core::SceneId;

use crate::action::SceneAction;
use crate::error::SceneError;
use crate::scene::Scene;
use crate::size::SceneSizeInformation;

/// Rough number of records produced per object when a scene is built in
/// bulk (allocation plus a couple of setters).
const RECORDS_PER_OBJECT: usize = 2;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationLog {
    actions: Vec<SceneAction>,
}

impl MutationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            actions: Vec::with_capacity(capacity),
        }
    }

    /// Appends one record.
    #[inline]
    pub fn record(&mut self, action: SceneAction) {
        self.actions.push(action);
    }

    /// Takes every record out of the log, leaving it empty.
    pub fn drain(&mut self) -> Self {
        Self {
            actions: std::mem::take(&mut self.actions),
        }
    }

    /// Reserves room for the records a scene of the given size is expected
    /// to produce.
    pub fn preallocate(&mut self, size: &SceneSizeInformation) {
        let expected = size.total() * RECORDS_PER_OBJECT;
        self.actions
            .reserve(expected.saturating_sub(self.actions.len()));
    }

    /// Moves all records of `other` to the end of this log.
    pub fn append(&mut self, other: &mut Self) {
        self.actions.append(&mut other.actions);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.actions.capacity()
    }

    #[must_use]
    pub fn actions(&self) -> &[SceneAction] {
        &self.actions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SceneAction> {
        self.actions.iter()
    }

    /// Applies every record to `scene` in order.
    ///
    /// Stops at the first failing record and returns its position; records
    /// before it stay applied.
    pub fn replay(&self, scene: &mut Scene) -> Result<(), (usize, SceneError)> {
        for (position, action) in self.actions.iter().enumerate() {
            scene.apply(action).map_err(|err| (position, err))?;
        }
        Ok(())
    }
}

impl From<Vec<SceneAction>> for MutationLog {
    fn from(actions: Vec<SceneAction>) -> Self {
        Self { actions }
    }
}

impl IntoIterator for MutationLog {
    type Item = SceneAction;
    type IntoIter = std::vec::IntoIter<SceneAction>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

impl<'a> IntoIterator for &'a MutationLog {
    type Item = &'a SceneAction;
    type IntoIter = std::slice::Iter<'a, SceneAction>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

impl Extend<SceneAction> for MutationLog {
    fn extend<I: IntoIterator<Item = SceneAction>>(&mut self, iter: I) {
        self.actions.extend(iter);
    }
}

/// One flush worth of records for one scene.
///
/// `flush_index` starts at zero and increases by one per flush; consumers use
/// it to detect lost or reordered updates.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneUpdate {
    pub scene: SceneId,
    pub flush_index: u64,
    pub log: MutationLog,
}
