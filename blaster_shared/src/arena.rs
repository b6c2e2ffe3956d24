//! Entity arena.
//!
//! Entities of one kind live in an insertion-ordered arena keyed by stable
//! ids. Ids are allocated monotonically by the owning world, so the backing
//! `Vec` stays sorted by id and iteration order is identical on every
//! replica. There is no hashing anywhere in here.

use serde::{Deserialize, Serialize};

/// Opaque entity id, unique within one world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Monotonic id source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdAllocator {
    next_id: u64,
}

impl IdAllocator {
    /// Hands out the next id.
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Insertion-ordered storage for one entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arena<T> {
    entries: Vec<(EntityId, T)>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Arena<T> {
    /// Inserts an entity. Ids must be increasing; an id at or below the
    /// current maximum is placed at its sorted position instead.
    pub fn insert(&mut self, id: EntityId, value: T) {
        let append = self.entries.last().map_or(true, |(last, _)| *last < id);
        if append {
            self.entries.push((id, value));
            return;
        }
        match self.position(id) {
            Ok(i) => self.entries[i].1 = value,
            Err(i) => self.entries.insert(i, (id, value)),
        }
    }

    /// Removes an entity. Removing an absent id is a no-op returning `None`.
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        let i = self.position(id).ok()?;
        Some(self.entries.remove(i).1)
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.position(id).ok().map(|i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        let i = self.position(id).ok()?;
        Some(&mut self.entries[i].1)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.position(id).is_ok()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids in insertion order. Collected so callers can mutate while walking.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.entries.iter().map(|(id, v)| (*id, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.entries.iter_mut().map(|(id, v)| (*id, v))
    }

    fn position(&self, id: EntityId) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&id, |(k, _)| *k)
    }
}
