//! Generational Handle Pool
//!
//! Typed, indexable storage for one kind of scene object.
//!
//! # Design
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      Pool<T>                         │
//! │                                                      │
//! │  entries: [Entry { generation, value }]  ← index     │
//! │  free:    BTreeSet<index>                            │
//! │                                                      │
//! │  allocate(v)        → lowest free index              │
//! │  allocate_at(h, v)  → exactly h (replay)             │
//! │  release(h)         → generation += 1, index freed   │
//! │  get / get_mut(h)   → checks generation              │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Slot reuse is deterministic: a fresh allocation always takes the lowest
//! free index. Together with [`Pool::allocate_at`] this lets a consumer that
//! replays the producer's records end up with bit-identical handles.
//!
//! Every handle carries the generation of the slot it was issued for.
//! Releasing a slot bumps its generation, so a handle that outlived its
//! object resolves to [`ArenaError::Stale`] instead of aliasing whatever
//! was allocated there next.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to resolve or place a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("handle index {index} is out of bounds")]
    OutOfBounds { index: u32 },

    #[error("handle {index}v{generation} refers to a vacant slot")]
    Vacant { index: u32, generation: u32 },

    #[error("stale handle {index}v{generation}: slot is now at generation {current}")]
    Stale {
        index: u32,
        generation: u32,
        current: u32,
    },

    #[error("slot {index} is already occupied")]
    Occupied { index: u32 },

    /// An explicit placement more than [`MAX_INDEX_GAP`] slots past the end
    /// of the pool.
    #[error("handle index {index} is too far past the pool end ({len} slots)")]
    OutOfReach { index: u32, len: u32 },
}

/// Largest number of vacant slots [`Pool::allocate_at`] creates to reach an
/// explicit index.
pub const MAX_INDEX_GAP: usize = 1 << 16;

/// Upper bound on the slots [`Pool::reserve_total`] reserves up front.
/// Pools still grow past it as objects are allocated.
pub const MAX_RESERVATION: usize = 1 << 16;

/// Typed reference to one object inside a [`Pool`].
///
/// `Copy`, 8 bytes, and meaningless outside the pool (and scene) that
/// issued it.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Handle<T> {
    index: u32,
    generation: u32,
    #[serde(skip)]
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Dense index into the pool storage.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.index, self.generation).cmp(&(other.index, other.generation))
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

impl<T> Entry<T> {
    const fn vacant() -> Self {
        Self {
            generation: 0,
            value: None,
        }
    }
}

/// Generational object pool.
#[derive(Debug, Clone, PartialEq)]
pub struct Pool<T> {
    entries: Vec<Entry<T>>,
    free: BTreeSet<u32>,
    len: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: BTreeSet::new(),
            len: 0,
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free: BTreeSet::new(),
            len: 0,
        }
    }

    /// Reserves room for at least `total` live objects, up to
    /// [`MAX_RESERVATION`].
    pub fn reserve_total(&mut self, total: usize) {
        let additional = total
            .min(MAX_RESERVATION)
            .saturating_sub(self.entries.len());
        self.entries.reserve(additional);
    }

    /// Number of live objects.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// The handle the next [`Pool::allocate`] call will return.
    #[must_use]
    pub fn next_handle(&self) -> Handle<T> {
        match self.free.first() {
            Some(&index) => Handle::new(index, self.entries[index as usize].generation),
            None => Handle::new(self.entries.len() as u32, 0),
        }
    }

    /// Places `value` in the lowest free slot.
    pub fn allocate(&mut self, value: T) -> Handle<T> {
        let handle = self.next_handle();
        let index = handle.index as usize;
        if index == self.entries.len() {
            self.entries.push(Entry::vacant());
        }
        self.free.remove(&handle.index);
        self.entries[index].value = Some(value);
        self.len += 1;
        handle
    }

    /// Places `value` at exactly `handle`, growing storage as needed.
    ///
    /// Fails if the slot is occupied, if `handle` is older than the slot's
    /// current generation, or if reaching it would leave more than
    /// [`MAX_INDEX_GAP`] vacant slots behind.
    pub fn allocate_at(&mut self, handle: Handle<T>, value: T) -> Result<Handle<T>, ArenaError> {
        let index = handle.index as usize;
        if index > self.entries.len() + MAX_INDEX_GAP {
            return Err(ArenaError::OutOfReach {
                index: handle.index,
                len: self.entries.len() as u32,
            });
        }
        while self.entries.len() <= index {
            self.free.insert(self.entries.len() as u32);
            self.entries.push(Entry::vacant());
        }

        let entry = &mut self.entries[index];
        if entry.value.is_some() {
            return Err(ArenaError::Occupied {
                index: handle.index,
            });
        }
        if handle.generation < entry.generation {
            return Err(ArenaError::Stale {
                index: handle.index,
                generation: handle.generation,
                current: entry.generation,
            });
        }

        entry.generation = handle.generation;
        entry.value = Some(value);
        self.free.remove(&handle.index);
        self.len += 1;
        Ok(handle)
    }

    /// Frees the slot and returns its value. The handle becomes stale.
    pub fn release(&mut self, handle: Handle<T>) -> Result<T, ArenaError> {
        self.check(handle)?;
        let entry = &mut self.entries[handle.index as usize];
        let value = entry.value.take().ok_or(ArenaError::Vacant {
            index: handle.index,
            generation: handle.generation,
        })?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.insert(handle.index);
        self.len -= 1;
        Ok(value)
    }

    #[inline]
    pub fn get(&self, handle: Handle<T>) -> Result<&T, ArenaError> {
        self.check(handle)?;
        self.entries[handle.index as usize]
            .value
            .as_ref()
            .ok_or(ArenaError::Vacant {
                index: handle.index,
                generation: handle.generation,
            })
    }

    #[inline]
    pub fn get_mut(&mut self, handle: Handle<T>) -> Result<&mut T, ArenaError> {
        self.check(handle)?;
        self.entries[handle.index as usize]
            .value
            .as_mut()
            .ok_or(ArenaError::Vacant {
                index: handle.index,
                generation: handle.generation,
            })
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_ok()
    }

    /// Iterates live objects in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.entries.iter().enumerate().filter_map(|(index, entry)| {
            entry
                .value
                .as_ref()
                .map(|value| (Handle::new(index as u32, entry.generation), value))
        })
    }

    pub fn handles(&self) -> impl Iterator<Item = Handle<T>> + '_ {
        self.iter().map(|(handle, _)| handle)
    }

    fn check(&self, handle: Handle<T>) -> Result<(), ArenaError> {
        let entry = self
            .entries
            .get(handle.index as usize)
            .ok_or(ArenaError::OutOfBounds {
                index: handle.index,
            })?;
        if entry.generation != handle.generation {
            return Err(ArenaError::Stale {
                index: handle.index,
                generation: handle.generation,
                current: entry.generation,
            });
        }
        Ok(())
    }
}
