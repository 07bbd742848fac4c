//! Data Link Registry
//!
//! Provider/consumer bindings between data slots of different scenes.
//!
//! ```text
//!   scene#1                          scene#2
//!  ┌──────────────────┐            ┌──────────────────┐
//!  │ slot#5 provider ─┼── link ───►│ slot#9 consumer  │
//!  │                  │   └───────►│ slot#10 consumer │ (other scene)
//!  └──────────────────┘            └──────────────────┘
//! ```
//!
//! A consumer has at most one incoming link, a provider fans out to any
//! number. The registry never touches a scene's arena: it reads provider
//! values through [`SceneLookup`] and keeps its own per-scene dirty sets.
//!
//! Failed operations return a [`LinkError`] and leave the registry exactly as
//! it was. Links disappear automatically when either endpoint slot is
//! destroyed, reported as [`Event::DataUnlinkedAsSideEffect`].

use std::collections::{BTreeSet, HashMap};
use std::hash::BuildHasher;

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;
use tessera_core::{Event, EventDispatcher, LinkKind, SceneId, SlotAddress, SlotId, SlotType};
use tessera_scene::{DataType, LinkedValues, Scene, SlotValue};

use crate::error::LinkError;

new_key_type! {
    /// Key of one link inside the registry.
    pub struct LinkKey;
}

/// Read access to the scenes whose slots are linked.
pub trait SceneLookup {
    /// Value behind `slot`, if its scene and slot exist. `linked` supplies
    /// the values that consumer slots of the same scene receive through
    /// their links.
    fn slot_value(&self, slot: SlotAddress, linked: &LinkedValues<'_>) -> Option<SlotValue>;

    /// Provider slots in the consumer's scene whose value changes when
    /// `consumer` receives a new value.
    fn dependent_providers(&self, consumer: SlotAddress) -> Vec<SlotId>;
}

impl<S: BuildHasher> SceneLookup for HashMap<SceneId, Scene, S> {
    fn slot_value(&self, slot: SlotAddress, linked: &LinkedValues<'_>) -> Option<SlotValue> {
        self.get(&slot.scene)?
            .resolve_slot_value(slot.slot, linked)
            .ok()
    }

    fn dependent_providers(&self, consumer: SlotAddress) -> Vec<SlotId> {
        self.get(&consumer.scene)
            .map(|scene| scene.providers_affected_by_slot(consumer.slot))
            .unwrap_or_default()
    }
}

/// One directed provider → consumer edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub provider: SlotAddress,
    pub consumer: SlotAddress,
    pub kind: LinkKind,
}

#[derive(Debug, Clone)]
struct SlotRecord {
    slot_type: SlotType,
    data_type: Option<DataType>,
    incoming: Option<LinkKey>,
    outgoing: SmallVec<[LinkKey; 4]>,
}

impl SlotRecord {
    fn new(slot_type: SlotType, data_type: Option<DataType>) -> Self {
        Self {
            slot_type,
            data_type,
            incoming: None,
            outgoing: SmallVec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataLinkRegistry {
    slots: FxHashMap<SlotAddress, SlotRecord>,
    links: SlotMap<LinkKey, Link>,
    /// Link count per `(provider scene, consumer scene)` pair.
    dependencies: FxHashMap<(SceneId, SceneId), usize>,
    dirty: FxHashMap<SceneId, BTreeSet<SlotId>>,
    reject_cycles: bool,
}

impl Default for DataLinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLinkRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_cycle_check(true)
    }

    /// With `reject_cycles` unset, links that make two scenes depend on
    /// each other are accepted and [`Self::scene_update_order`] falls back
    /// to id order for the scenes involved.
    #[must_use]
    pub fn with_cycle_check(reject_cycles: bool) -> Self {
        Self {
            slots: FxHashMap::default(),
            links: SlotMap::with_key(),
            dependencies: FxHashMap::default(),
            dirty: FxHashMap::default(),
            reject_cycles,
        }
    }

    // ========================================================================
    // Slots
    // ========================================================================

    /// Makes a slot known to the registry. `data_type` is the value type of
    /// the backing data object for data slots.
    pub fn register_slot(
        &mut self,
        slot: SlotAddress,
        slot_type: SlotType,
        data_type: Option<DataType>,
        events: &mut EventDispatcher,
    ) -> Result<(), LinkError> {
        if self.slots.contains_key(&slot) {
            return reject(LinkError::SlotExists(slot));
        }
        self.slots.insert(slot, SlotRecord::new(slot_type, data_type));
        log::trace!("Registered {slot_type:?} {slot}");
        events.push(Event::DataSlotCreated { slot, slot_type });
        Ok(())
    }

    /// Removes every link touching `slot`, then the slot itself.
    ///
    /// Emits one [`Event::DataUnlinkedAsSideEffect`] per removed link (the
    /// incoming link first, then outgoing links in creation order) followed
    /// by a single [`Event::DataSlotDestroyed`].
    pub fn on_slot_destroyed(
        &mut self,
        slot: SlotAddress,
        events: &mut EventDispatcher,
    ) -> Result<(), LinkError> {
        let Some(record) = self.slots.get(&slot) else {
            return reject(LinkError::SlotNotFound(slot));
        };
        let slot_type = record.slot_type;
        let keys: SmallVec<[LinkKey; 4]> = record
            .incoming
            .into_iter()
            .chain(record.outgoing.iter().copied())
            .collect();

        for key in keys {
            if let Some(link) = self.detach(key) {
                log::debug!("Unlinked {} -> {} (slot destroyed)", link.provider, link.consumer);
                if link.consumer != slot {
                    self.mark_dirty(link.consumer);
                }
                events.push(Event::DataUnlinkedAsSideEffect {
                    provider: link.provider,
                    consumer: link.consumer,
                });
            }
        }

        self.slots.remove(&slot);
        self.clear_dirty(slot);
        events.push(Event::DataSlotDestroyed { slot, slot_type });
        Ok(())
    }

    /// Destroys every slot of `scene` in slot id order. Returns the number of
    /// slots removed.
    pub fn on_scene_removed(&mut self, scene: SceneId, events: &mut EventDispatcher) -> usize {
        let mut slots: Vec<SlotAddress> = self
            .slots
            .keys()
            .filter(|address| address.scene == scene)
            .copied()
            .collect();
        slots.sort_unstable();
        for &slot in &slots {
            // Slots were collected from the map above, so this cannot miss.
            let _ = self.on_slot_destroyed(slot, events);
        }
        self.dirty.remove(&scene);
        slots.len()
    }

    // ========================================================================
    // Links
    // ========================================================================

    /// Binds `consumer` to `provider` and marks the consumer dirty.
    pub fn create_link(
        &mut self,
        provider: SlotAddress,
        consumer: SlotAddress,
        events: &mut EventDispatcher,
    ) -> Result<LinkKey, LinkError> {
        let kind = self.check_link(provider, consumer)?;

        let key = self.links.insert(Link {
            provider,
            consumer,
            kind,
        });
        if let Some(record) = self.slots.get_mut(&provider) {
            record.outgoing.push(key);
        }
        if let Some(record) = self.slots.get_mut(&consumer) {
            record.incoming = Some(key);
        }
        *self
            .dependencies
            .entry((provider.scene, consumer.scene))
            .or_insert(0) += 1;

        self.mark_dirty(consumer);
        log::debug!("Linked {provider} -> {consumer} ({kind:?})");
        events.push(Event::DataLinked { provider, consumer });
        Ok(key)
    }

    /// Removes the link into `consumer` and marks the consumer dirty.
    pub fn remove_link(
        &mut self,
        consumer: SlotAddress,
        events: &mut EventDispatcher,
    ) -> Result<Link, LinkError> {
        let Some(record) = self.slots.get(&consumer) else {
            return reject(LinkError::SlotNotFound(consumer));
        };
        let Some(key) = record.incoming else {
            return reject(LinkError::NotLinked(consumer));
        };
        let Some(link) = self.detach(key) else {
            return reject(LinkError::NotLinked(consumer));
        };

        self.mark_dirty(consumer);
        log::debug!("Unlinked {} -> {}", link.provider, link.consumer);
        events.push(Event::DataUnlinked {
            provider: link.provider,
            consumer: link.consumer,
        });
        Ok(link)
    }

    /// Validates a prospective link without changing anything.
    fn check_link(
        &self,
        provider: SlotAddress,
        consumer: SlotAddress,
    ) -> Result<LinkKind, LinkError> {
        let Some(provider_record) = self.slots.get(&provider) else {
            return reject(LinkError::SlotNotFound(provider));
        };
        let Some(consumer_record) = self.slots.get(&consumer) else {
            return reject(LinkError::SlotNotFound(consumer));
        };
        if !provider_record.slot_type.is_provider() {
            return reject(LinkError::NotAProvider {
                slot: provider,
                slot_type: provider_record.slot_type,
            });
        }
        if !consumer_record.slot_type.is_consumer() {
            return reject(LinkError::NotAConsumer {
                slot: consumer,
                slot_type: consumer_record.slot_type,
            });
        }
        if provider.scene == consumer.scene {
            return reject(LinkError::SameScene(provider.scene));
        }

        let kind = provider_record.slot_type.link_kind();
        if kind != consumer_record.slot_type.link_kind() {
            return reject(LinkError::IncompatibleKinds {
                provider: provider_record.slot_type,
                consumer: consumer_record.slot_type,
            });
        }
        if let (Some(provider_type), Some(consumer_type)) =
            (provider_record.data_type, consumer_record.data_type)
            && provider_type != consumer_type
        {
            return reject(LinkError::ValueTypeMismatch {
                provider: provider_type,
                consumer: consumer_type,
            });
        }
        if let Some(existing) = consumer_record.incoming.and_then(|key| self.links.get(key)) {
            return reject(LinkError::AlreadyLinked {
                consumer,
                provider: existing.provider,
            });
        }
        if self.reject_cycles && self.scene_depends_on(consumer.scene, provider.scene) {
            return reject(LinkError::CyclicDependency {
                provider: provider.scene,
                consumer: consumer.scene,
            });
        }
        Ok(kind)
    }

    /// `true` if `from` reaches `to` by following provider → consumer scene
    /// edges, i.e. `to` already consumes (transitively) from `from`.
    fn scene_depends_on(&self, from: SceneId, to: SceneId) -> bool {
        let mut visited = FxHashSet::default();
        let mut stack = vec![from];
        while let Some(scene) = stack.pop() {
            if scene == to {
                return true;
            }
            if !visited.insert(scene) {
                continue;
            }
            stack.extend(
                self.dependencies
                    .keys()
                    .filter(|(provider, _)| *provider == scene)
                    .map(|&(_, consumer)| consumer),
            );
        }
        false
    }

    fn detach(&mut self, key: LinkKey) -> Option<Link> {
        let link = self.links.remove(key)?;
        if let Some(record) = self.slots.get_mut(&link.provider) {
            record.outgoing.retain(|k| *k != key);
        }
        if let Some(record) = self.slots.get_mut(&link.consumer) {
            record.incoming = None;
        }
        let pair = (link.provider.scene, link.consumer.scene);
        if let Some(count) = self.dependencies.get_mut(&pair) {
            *count -= 1;
            if *count == 0 {
                self.dependencies.remove(&pair);
            }
        }
        Some(link)
    }

    // ========================================================================
    // Dirty propagation
    // ========================================================================

    /// Marks every consumer directly linked to `provider` dirty and emits one
    /// [`Event::ConsumerDirty`] per consumer. Returns the consumers touched.
    pub fn on_provider_changed(
        &mut self,
        provider: SlotAddress,
        events: &mut EventDispatcher,
    ) -> SmallVec<[SlotAddress; 4]> {
        let consumers: SmallVec<[SlotAddress; 4]> = match self.slots.get(&provider) {
            Some(record) => record
                .outgoing
                .iter()
                .filter_map(|&key| self.links.get(key))
                .map(|link| link.consumer)
                .collect(),
            None => SmallVec::new(),
        };
        for &consumer in &consumers {
            self.mark_dirty(consumer);
            events.push(Event::ConsumerDirty { consumer });
        }
        consumers
    }

    /// [`Self::on_provider_changed`] followed through consumer scenes: a
    /// consumer that receives a new value may change providers of its own
    /// scene, whose consumers are dirtied in turn. Each provider is visited
    /// once. Returns every consumer dirtied, in propagation order.
    pub fn propagate_provider_change(
        &mut self,
        scenes: &impl SceneLookup,
        provider: SlotAddress,
        events: &mut EventDispatcher,
    ) -> Vec<SlotAddress> {
        let mut dirtied = Vec::new();
        let mut visited = FxHashSet::default();
        let mut worklist = vec![provider];
        while let Some(current) = worklist.pop() {
            if !visited.insert(current) {
                continue;
            }
            for consumer in self.on_provider_changed(current, events) {
                dirtied.push(consumer);
                worklist.extend(
                    scenes
                        .dependent_providers(consumer)
                        .into_iter()
                        .rev()
                        .map(|slot| SlotAddress::new(consumer.scene, slot))
                        .filter(|address| !visited.contains(address)),
                );
            }
        }
        dirtied
    }

    #[must_use]
    pub fn is_dirty(&self, consumer: SlotAddress) -> bool {
        self.dirty
            .get(&consumer.scene)
            .is_some_and(|set| set.contains(&consumer.slot))
    }

    /// Returns and clears the dirty consumers of `scene`, in slot id order.
    pub fn take_dirty_consumers(&mut self, scene: SceneId) -> Vec<SlotAddress> {
        self.dirty
            .remove(&scene)
            .map(|set| {
                set.into_iter()
                    .map(|slot| SlotAddress::new(scene, slot))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn mark_dirty(&mut self, consumer: SlotAddress) {
        self.dirty
            .entry(consumer.scene)
            .or_default()
            .insert(consumer.slot);
    }

    fn clear_dirty(&mut self, slot: SlotAddress) {
        if let Some(set) = self.dirty.get_mut(&slot.scene) {
            set.remove(&slot.slot);
            if set.is_empty() {
                self.dirty.remove(&slot.scene);
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Value a consumer should see: the linked provider's current value, or
    /// the consumer's own local value when it is not linked.
    ///
    /// Provider values are resolved with links applied, so a provider that
    /// sits behind a linked consumer of its own scene (the same data object,
    /// or a node below a linked transformation consumer) passes on the value
    /// that consumer receives.
    pub fn resolve_provider_value(
        &self,
        scenes: &impl SceneLookup,
        consumer: SlotAddress,
    ) -> Result<SlotValue, LinkError> {
        let Some(record) = self.slots.get(&consumer) else {
            return Err(LinkError::SlotNotFound(consumer));
        };
        let source = record
            .incoming
            .and_then(|key| self.links.get(key))
            .map_or(consumer, |link| link.provider);
        self.linked_slot_value(scenes, source, self.links.len())
            .ok_or(LinkError::ValueUnavailable(source))
    }

    /// Value behind `slot` with the links into its scene applied. At most
    /// `hops` further links are followed; past that, consumers keep their
    /// local value.
    fn linked_slot_value(
        &self,
        scenes: &impl SceneLookup,
        slot: SlotAddress,
        hops: usize,
    ) -> Option<SlotValue> {
        let linked = |consumer: SlotId| {
            let address = SlotAddress::new(slot.scene, consumer);
            let provider = self.provider_of(address)?;
            if hops == 0 {
                log::warn!("Link chain into {address} does not end, using its local value");
                return None;
            }
            self.linked_slot_value(scenes, provider, hops - 1)
        };
        scenes.slot_value(slot, &linked)
    }

    /// Scenes ordered so that every provider scene precedes its consumer
    /// scenes. Ties are broken by scene id. Scenes caught in a dependency
    /// cycle are appended last, in id order.
    #[must_use]
    pub fn scene_update_order(&self, scenes: impl IntoIterator<Item = SceneId>) -> Vec<SceneId> {
        let scenes: BTreeSet<SceneId> = scenes.into_iter().collect();
        let mut in_degree: FxHashMap<SceneId, usize> =
            scenes.iter().map(|&scene| (scene, 0)).collect();
        for &(provider, consumer) in self.dependencies.keys() {
            if scenes.contains(&provider)
                && let Some(degree) = in_degree.get_mut(&consumer)
            {
                *degree += 1;
            }
        }

        let mut ready: BTreeSet<SceneId> = in_degree
            .iter()
            .filter(|&(_, degree)| *degree == 0)
            .map(|(&scene, _)| scene)
            .collect();
        let mut order = Vec::with_capacity(scenes.len());
        while let Some(scene) = ready.pop_first() {
            order.push(scene);
            for &(provider, consumer) in self.dependencies.keys() {
                if provider != scene {
                    continue;
                }
                if let Some(degree) = in_degree.get_mut(&consumer) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(consumer);
                    }
                }
            }
        }

        if order.len() < scenes.len() {
            let placed: FxHashSet<SceneId> = order.iter().copied().collect();
            order.extend(scenes.iter().filter(|&scene| !placed.contains(scene)));
        }
        order
    }

    #[must_use]
    pub fn contains_slot(&self, slot: SlotAddress) -> bool {
        self.slots.contains_key(&slot)
    }

    #[must_use]
    pub fn slot_type(&self, slot: SlotAddress) -> Option<SlotType> {
        self.slots.get(&slot).map(|record| record.slot_type)
    }

    #[must_use]
    pub fn provider_of(&self, consumer: SlotAddress) -> Option<SlotAddress> {
        let key = self.slots.get(&consumer)?.incoming?;
        self.links.get(key).map(|link| link.provider)
    }

    /// Consumers linked to `provider`, in link creation order.
    #[must_use]
    pub fn consumers_of(&self, provider: SlotAddress) -> Vec<SlotAddress> {
        self.slots
            .get(&provider)
            .map(|record| {
                record
                    .outgoing
                    .iter()
                    .filter_map(|&key| self.links.get(key))
                    .map(|link| link.consumer)
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_linked(&self, consumer: SlotAddress) -> bool {
        self.provider_of(consumer).is_some()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

fn reject<T>(error: LinkError) -> Result<T, LinkError> {
    log::warn!("Link operation rejected: {error}");
    Err(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(scene: u64, slot: u32) -> SlotAddress {
        SlotAddress::new(SceneId(scene), SlotId(slot))
    }

    fn registry_with(slots: &[(SlotAddress, SlotType)]) -> (DataLinkRegistry, EventDispatcher) {
        let mut registry = DataLinkRegistry::new();
        let mut events = EventDispatcher::new();
        for &(slot, slot_type) in slots {
            registry.register_slot(slot, slot_type, None, &mut events).unwrap();
        }
        events.drain();
        (registry, events)
    }

    #[test]
    fn link_marks_consumer_dirty_and_emits_linked() {
        let (p, c) = (addr(1, 5), addr(2, 9));
        let (mut registry, mut events) = registry_with(&[
            (p, SlotType::DataProvider),
            (c, SlotType::DataConsumer),
        ]);

        registry.create_link(p, c, &mut events).unwrap();

        assert!(registry.is_dirty(c));
        assert_eq!(registry.provider_of(c), Some(p));
        assert_eq!(
            events.drain(),
            vec![Event::DataLinked {
                provider: p,
                consumer: c
            }]
        );
    }

    #[test]
    fn consumer_accepts_only_one_link() {
        let (p1, p2, c) = (addr(1, 1), addr(3, 1), addr(2, 1));
        let (mut registry, mut events) = registry_with(&[
            (p1, SlotType::TextureProvider),
            (p2, SlotType::TextureProvider),
            (c, SlotType::TextureConsumer),
        ]);
        registry.create_link(p1, c, &mut events).unwrap();
        events.drain();

        let err = registry.create_link(p2, c, &mut events).unwrap_err();
        assert_eq!(
            err,
            LinkError::AlreadyLinked {
                consumer: c,
                provider: p1
            }
        );
        assert!(events.is_empty());
        assert_eq!(registry.link_count(), 1);
        assert_eq!(registry.provider_of(c), Some(p1));
    }

    #[test]
    fn rejects_structurally_invalid_links() {
        let tp = addr(1, 1);
        let dp = addr(1, 2);
        let tc = addr(2, 1);
        let same_scene_consumer = addr(1, 3);
        let (mut registry, mut events) = registry_with(&[
            (tp, SlotType::TransformationProvider),
            (dp, SlotType::DataProvider),
            (tc, SlotType::TransformationConsumer),
            (same_scene_consumer, SlotType::TransformationConsumer),
        ]);

        assert_eq!(
            registry.create_link(addr(9, 9), tc, &mut events),
            Err(LinkError::SlotNotFound(addr(9, 9)))
        );
        assert!(matches!(
            registry.create_link(tc, tp, &mut events),
            Err(LinkError::NotAProvider { .. })
        ));
        assert!(matches!(
            registry.create_link(tp, dp, &mut events),
            Err(LinkError::NotAConsumer { .. })
        ));
        assert_eq!(
            registry.create_link(dp, tc, &mut events),
            Err(LinkError::IncompatibleKinds {
                provider: SlotType::DataProvider,
                consumer: SlotType::TransformationConsumer,
            })
        );
        assert_eq!(
            registry.create_link(tp, same_scene_consumer, &mut events),
            Err(LinkError::SameScene(SceneId(1)))
        );
        assert_eq!(registry.link_count(), 0);
        assert!(!registry.is_dirty(tc));
        assert!(events.is_empty());
    }

    #[test]
    fn data_links_require_matching_value_types() {
        let mut registry = DataLinkRegistry::new();
        let mut events = EventDispatcher::new();
        let (p, c) = (addr(1, 1), addr(2, 1));
        registry
            .register_slot(p, SlotType::DataProvider, Some(DataType::Vec3), &mut events)
            .unwrap();
        registry
            .register_slot(c, SlotType::DataConsumer, Some(DataType::Float), &mut events)
            .unwrap();

        assert_eq!(
            registry.create_link(p, c, &mut events),
            Err(LinkError::ValueTypeMismatch {
                provider: DataType::Vec3,
                consumer: DataType::Float,
            })
        );
    }

    #[test]
    fn cyclic_scene_dependencies_are_rejected_when_enabled() {
        let slots = [
            (addr(1, 1), SlotType::DataProvider),
            (addr(2, 1), SlotType::DataConsumer),
            (addr(2, 2), SlotType::DataProvider),
            (addr(3, 1), SlotType::DataConsumer),
            (addr(3, 2), SlotType::DataProvider),
            (addr(1, 2), SlotType::DataConsumer),
        ];
        let (mut registry, mut events) = registry_with(&slots);
        registry.create_link(addr(1, 1), addr(2, 1), &mut events).unwrap();
        registry.create_link(addr(2, 2), addr(3, 1), &mut events).unwrap();

        assert_eq!(
            registry.create_link(addr(3, 2), addr(1, 2), &mut events),
            Err(LinkError::CyclicDependency {
                provider: SceneId(3),
                consumer: SceneId(1),
            })
        );

        let mut lenient = DataLinkRegistry::with_cycle_check(false);
        for &(slot, slot_type) in &slots {
            lenient.register_slot(slot, slot_type, None, &mut events).unwrap();
        }
        lenient.create_link(addr(1, 1), addr(2, 1), &mut events).unwrap();
        lenient.create_link(addr(2, 2), addr(3, 1), &mut events).unwrap();
        assert!(lenient.create_link(addr(3, 2), addr(1, 2), &mut events).is_ok());
    }

    #[test]
    fn remove_link_requires_existing_link() {
        let (p, c) = (addr(1, 1), addr(2, 1));
        let (mut registry, mut events) = registry_with(&[
            (p, SlotType::DataProvider),
            (c, SlotType::DataConsumer),
        ]);

        assert_eq!(registry.remove_link(c, &mut events), Err(LinkError::NotLinked(c)));

        registry.create_link(p, c, &mut events).unwrap();
        registry.take_dirty_consumers(SceneId(2));
        events.drain();

        let link = registry.remove_link(c, &mut events).unwrap();
        assert_eq!(link.provider, p);
        assert!(registry.is_dirty(c));
        assert!(!registry.is_linked(c));
        assert_eq!(
            events.drain(),
            vec![Event::DataUnlinked {
                provider: p,
                consumer: c
            }]
        );
    }

    #[test]
    fn provider_change_dirties_each_direct_consumer_once() {
        let p = addr(1, 1);
        let consumers = [addr(2, 1), addr(3, 1), addr(4, 1)];
        let mut slots = vec![(p, SlotType::DataProvider)];
        slots.extend(consumers.iter().map(|&c| (c, SlotType::DataConsumer)));
        let (mut registry, mut events) = registry_with(&slots);
        for &c in &consumers {
            registry.create_link(p, c, &mut events).unwrap();
        }
        events.drain();

        let touched = registry.on_provider_changed(p, &mut events);

        assert_eq!(touched.as_slice(), &consumers);
        assert_eq!(
            events.drain(),
            consumers
                .iter()
                .map(|&consumer| Event::ConsumerDirty { consumer })
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn destroying_provider_unlinks_before_destroying() {
        let p = addr(1, 1);
        let (c1, c2) = (addr(2, 1), addr(3, 1));
        let (mut registry, mut events) = registry_with(&[
            (p, SlotType::DataProvider),
            (c1, SlotType::DataConsumer),
            (c2, SlotType::DataConsumer),
        ]);
        registry.create_link(p, c1, &mut events).unwrap();
        registry.create_link(p, c2, &mut events).unwrap();
        registry.take_dirty_consumers(SceneId(2));
        registry.take_dirty_consumers(SceneId(3));
        events.drain();

        registry.on_slot_destroyed(p, &mut events).unwrap();

        assert_eq!(
            events.drain(),
            vec![
                Event::DataUnlinkedAsSideEffect {
                    provider: p,
                    consumer: c1
                },
                Event::DataUnlinkedAsSideEffect {
                    provider: p,
                    consumer: c2
                },
                Event::DataSlotDestroyed {
                    slot: p,
                    slot_type: SlotType::DataProvider
                },
            ]
        );
        assert_eq!(registry.link_count(), 0);
        assert!(registry.is_dirty(c1) && registry.is_dirty(c2));
        assert!(!registry.contains_slot(p));
        assert_eq!(registry.on_slot_destroyed(p, &mut events), Err(LinkError::SlotNotFound(p)));
    }

    #[test]
    fn update_order_puts_providers_first() {
        let (mut registry, mut events) = registry_with(&[
            (addr(3, 1), SlotType::DataProvider),
            (addr(1, 1), SlotType::DataConsumer),
            (addr(1, 2), SlotType::DataProvider),
            (addr(2, 1), SlotType::DataConsumer),
        ]);
        registry.create_link(addr(3, 1), addr(1, 1), &mut events).unwrap();
        registry.create_link(addr(1, 2), addr(2, 1), &mut events).unwrap();

        let order = registry.scene_update_order([SceneId(1), SceneId(2), SceneId(3), SceneId(4)]);
        assert_eq!(order, vec![SceneId(3), SceneId(1), SceneId(2), SceneId(4)]);
    }

    #[test]
    fn scene_removal_destroys_slots_in_id_order() {
        let (mut registry, mut events) = registry_with(&[
            (addr(1, 7), SlotType::DataProvider),
            (addr(1, 2), SlotType::TextureConsumer),
            (addr(2, 1), SlotType::DataConsumer),
        ]);

        assert_eq!(registry.on_scene_removed(SceneId(1), &mut events), 2);
        assert_eq!(
            events.drain(),
            vec![
                Event::DataSlotDestroyed {
                    slot: addr(1, 2),
                    slot_type: SlotType::TextureConsumer
                },
                Event::DataSlotDestroyed {
                    slot: addr(1, 7),
                    slot_type: SlotType::DataProvider
                },
            ]
        );
        assert_eq!(registry.slot_count(), 1);
    }
}
