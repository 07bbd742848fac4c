//! Framework Context
//!
//! [`Framework`] is the single context object on the consuming side. It owns
//! every piece of per-scene state, so nothing lives in globals:
//!
//! - **Scenes**: arenas rebuilt from received [`SceneUpdate`]s
//! - **Links**: the [`DataLinkRegistry`] between those scenes
//! - **Lifecycle**: the [`SceneLifecycleController`] and its executor
//! - **Events**: one [`EventDispatcher`] drained by the owner
//!
//! # Flushes
//!
//! A flush is applied as a unit. All records are applied to the scene first;
//! only then are changed providers propagated to their consumers. Readers
//! never observe a provider change without its dirty notifications.
//!
//! ```rust,ignore
//! let mut framework = Framework::new(FrameworkSettings::default());
//! framework.scene_published(SceneId(1));
//! framework.apply_update(producer.flush())?;
//! for event in framework.drain_events() {
//!     // ...
//! }
//! ```

use rustc_hash::FxHashMap;
use tessera_core::{DisplayAssignment, Event, EventDispatcher, SceneId, SceneState, SlotAddress};
use tessera_lifecycle::{
    CommandKind, CommandQueue, CommandResult, SceneCommandExecutor, SceneLifecycleController,
};
use tessera_link::{DataLinkRegistry, Link};
use tessera_scene::{AppliedEffect, RecordingScene, Scene, SceneUpdate, SlotValue, codec};

use crate::errors::{Result, TesseraError};
use crate::settings::FrameworkSettings;

#[derive(Debug)]
pub struct Framework<E = CommandQueue> {
    settings: FrameworkSettings,
    scenes: FxHashMap<SceneId, Scene>,
    /// Next expected flush index per scene.
    flush_indices: FxHashMap<SceneId, u64>,
    links: DataLinkRegistry,
    lifecycle: SceneLifecycleController<E>,
    events: EventDispatcher,
}

impl Framework<CommandQueue> {
    /// Framework whose lifecycle commands are queued for the caller to
    /// carry out.
    #[must_use]
    pub fn new(settings: FrameworkSettings) -> Self {
        Self::with_executor(CommandQueue::new(), settings)
    }
}

impl Default for Framework<CommandQueue> {
    fn default() -> Self {
        Self::new(FrameworkSettings::default())
    }
}

impl<E: SceneCommandExecutor> Framework<E> {
    pub fn with_executor(executor: E, settings: FrameworkSettings) -> Self {
        Self {
            settings,
            scenes: FxHashMap::default(),
            flush_indices: FxHashMap::default(),
            links: DataLinkRegistry::with_cycle_check(settings.reject_cyclic_links),
            lifecycle: SceneLifecycleController::new(executor, settings.lifecycle),
            events: EventDispatcher::with_capacity(settings.event_capacity),
        }
    }

    /// Producer-side wrapper for a new scene, sized from the settings.
    #[must_use]
    pub fn create_recording_scene(&self, scene: SceneId) -> RecordingScene {
        RecordingScene::with_log_capacity(scene, self.settings.log_capacity)
    }

    // ========================================================================
    // Publication
    // ========================================================================

    /// Starts tracking `scene`: an empty arena awaiting flush 0, and a
    /// lifecycle row reset to `Published`.
    pub fn scene_published(&mut self, scene: SceneId) {
        if self.scenes.insert(scene, Scene::new()).is_some() {
            log::warn!("{scene} published again, discarding its replicated state");
            self.links.on_scene_removed(scene, &mut self.events);
        }
        self.flush_indices.insert(scene, 0);
        self.lifecycle.scene_published(scene, &mut self.events);
        log::debug!("{scene} published");
    }

    /// Stops tracking `scene`. Its slots are destroyed (unlinking every link
    /// that touches them) and its arena is dropped.
    pub fn scene_unpublished(&mut self, scene: SceneId) {
        let removed_slots = self.links.on_scene_removed(scene, &mut self.events);
        self.scenes.remove(&scene);
        self.flush_indices.remove(&scene);
        self.lifecycle.scene_unpublished(scene, &mut self.events);
        log::debug!("{scene} unpublished ({removed_slots} slots removed)");
    }

    // ========================================================================
    // Scene updates
    // ========================================================================

    /// Decodes a wire-format flush and applies it.
    pub fn apply_encoded(&mut self, bytes: &[u8]) -> Result<usize> {
        let update = codec::decode_update(bytes)?;
        self.apply_update(&update)
    }

    /// Applies one flush to its scene and propagates the resulting changes
    /// through the link registry. Returns the number of records applied.
    ///
    /// Flushes must arrive in order. When a record fails, the records before
    /// it stay applied and are propagated, the flush counts as consumed, and
    /// [`TesseraError::ApplyFailed`] is returned.
    pub fn apply_update(&mut self, update: &SceneUpdate) -> Result<usize> {
        let scene_id = update.scene;
        let Some(scene) = self.scenes.get_mut(&scene_id) else {
            return Err(TesseraError::UnknownScene(scene_id));
        };
        let expected = self.flush_indices.get(&scene_id).copied().unwrap_or(0);
        if update.flush_index != expected {
            log::warn!(
                "Rejecting flush {} for {scene_id}, expected {expected}",
                update.flush_index
            );
            return Err(TesseraError::FlushOutOfOrder {
                scene: scene_id,
                expected,
                received: update.flush_index,
            });
        }
        self.flush_indices.insert(scene_id, expected + 1);

        let mut changed_providers: Vec<SlotAddress> = Vec::new();
        let mut failure = None;
        let mut applied = 0;

        for (index, action) in update.log.iter().enumerate() {
            let effect = match scene.apply(action) {
                Ok(effect) => effect,
                Err(source) => {
                    log::error!(
                        "{scene_id} flush {expected}: record {index} ({:?}) failed: {source}",
                        action.kind()
                    );
                    failure = Some((index, source));
                    break;
                }
            };
            applied += 1;

            let providers = match effect {
                AppliedEffect::None => continue,
                AppliedEffect::SlotCreated {
                    id,
                    slot_type,
                    data_type,
                } => {
                    let address = SlotAddress::new(scene_id, id);
                    self.links
                        .register_slot(address, slot_type, data_type, &mut self.events)?;
                    continue;
                }
                AppliedEffect::SlotReleased { id, .. } => {
                    let address = SlotAddress::new(scene_id, id);
                    changed_providers.retain(|provider| *provider != address);
                    self.links.on_slot_destroyed(address, &mut self.events)?;
                    continue;
                }
                AppliedEffect::TransformsChanged(nodes) => nodes
                    .iter()
                    .flat_map(|&node| scene.providers_affected_by_node(node))
                    .collect(),
                AppliedEffect::DataChanged(data) => scene.providers_affected_by_data(data),
                AppliedEffect::TextureChanged(sampler) => {
                    scene.providers_affected_by_texture(sampler)
                }
            };
            for slot in providers {
                let address = SlotAddress::new(scene_id, slot);
                if !changed_providers.contains(&address) {
                    changed_providers.push(address);
                }
            }
        }

        for provider in changed_providers {
            self.links
                .propagate_provider_change(&self.scenes, provider, &mut self.events);
        }

        log::trace!("{scene_id} flush {expected}: {applied} records applied");
        match failure {
            Some((index, source)) => Err(TesseraError::ApplyFailed {
                scene: scene_id,
                flush_index: expected,
                index,
                source,
            }),
            None => Ok(applied),
        }
    }

    // ========================================================================
    // Links
    // ========================================================================

    pub fn create_link(&mut self, provider: SlotAddress, consumer: SlotAddress) -> Result<()> {
        self.links.create_link(provider, consumer, &mut self.events)?;
        Ok(())
    }

    pub fn remove_link(&mut self, consumer: SlotAddress) -> Result<Link> {
        Ok(self.links.remove_link(consumer, &mut self.events)?)
    }

    /// Value `consumer` should use: its provider's current value when
    /// linked, its own local value otherwise.
    pub fn resolve_provider_value(&self, consumer: SlotAddress) -> Result<SlotValue> {
        Ok(self.links.resolve_provider_value(&self.scenes, consumer)?)
    }

    /// Takes the dirty consumers of `scene` and resolves their values, in
    /// slot id order. Consumers whose value cannot be resolved are skipped
    /// with a warning.
    pub fn resolve_dirty_consumers(&mut self, scene: SceneId) -> Vec<(SlotAddress, SlotValue)> {
        self.links
            .take_dirty_consumers(scene)
            .into_iter()
            .filter_map(|consumer| {
                match self.links.resolve_provider_value(&self.scenes, consumer) {
                    Ok(value) => Some((consumer, value)),
                    Err(err) => {
                        log::warn!("Dropping dirty consumer {consumer}: {err}");
                        None
                    }
                }
            })
            .collect()
    }

    /// Published scenes with every provider scene ahead of its consumers.
    #[must_use]
    pub fn scene_update_order(&self) -> Vec<SceneId> {
        self.links.scene_update_order(self.scenes.keys().copied())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn set_target_state(&mut self, scene: SceneId, target: impl Into<SceneState>) {
        self.lifecycle.set_target_state(scene, target);
    }

    pub fn set_display_buffer_assignment(&mut self, scene: SceneId, assignment: DisplayAssignment) {
        self.lifecycle.set_display_buffer_assignment(scene, assignment);
    }

    /// Feeds an executor result into the lifecycle controller.
    pub fn process_event(&mut self, scene: SceneId, kind: CommandKind, result: CommandResult) {
        self.lifecycle
            .process_event(scene, kind, result, &mut self.events);
    }

    // ========================================================================
    // Events & accessors
    // ========================================================================

    /// Returns every event produced since the last drain, in order.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }

    #[must_use]
    pub fn scene(&self, scene: SceneId) -> Option<&Scene> {
        self.scenes.get(&scene)
    }

    /// Index the next flush of `scene` must carry.
    #[must_use]
    pub fn next_flush_index(&self, scene: SceneId) -> Option<u64> {
        self.flush_indices.get(&scene).copied()
    }

    #[must_use]
    pub fn links(&self) -> &DataLinkRegistry {
        &self.links
    }

    #[must_use]
    pub fn lifecycle(&self) -> &SceneLifecycleController<E> {
        &self.lifecycle
    }

    pub fn executor_mut(&mut self) -> &mut E {
        self.lifecycle.executor_mut()
    }

    #[must_use]
    pub fn settings(&self) -> &FrameworkSettings {
        &self.settings
    }
}
