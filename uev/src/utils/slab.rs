use std::collections::TryReserveError;

/// A stable reference to a slot in a [`Slab`].
///
/// A key pairs a slot index with the generation the slot had when the value
/// was inserted. Once the value is removed the slot's generation moves on, so
/// an old key never resolves to a newer occupant of the same slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Key {
    index: u32,
    generation: u32,
}

impl Key {
    /// Packs the key into the 64-bit user data carried by the poller.
    pub(crate) fn to_token(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    /// Unpacks a key previously produced by [`to_token`](Self::to_token).
    pub(crate) fn from_token(token: u64) -> Self {
        Self {
            index: token as u32,
            generation: (token >> 32) as u32,
        }
    }
}

/// A generational slab allocator.
///
/// A `Slab` stores values of type `T` in a contiguous array and hands out
/// [`Key`]s that stay valid until the value is removed. Freed slots are reused
/// by later insertions, with a bumped generation.
///
/// Growth is fallible: [`vacant_key`](Self::vacant_key) reserves room for the
/// next insertion and reports allocation failure instead of aborting.
pub(crate) struct Slab<T> {
    /// Storage for items, `None` marks a free slot.
    items: Vec<Option<T>>,
    /// Current generation of every slot.
    generations: Vec<u32>,
    /// Stack of free indices that can be reused.
    free: Vec<usize>,
    /// Number of occupied slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates an empty slab.
    pub(crate) fn new() -> Self {
        Self {
            items: Vec::new(),
            generations: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Returns the key the next [`insert`](Self::insert) will use.
    ///
    /// Room for that insertion is reserved up front, so the following
    /// `insert` cannot allocate.
    pub(crate) fn vacant_key(&mut self) -> Result<Key, TryReserveError> {
        let index = match self.free.last() {
            Some(&i) => i,
            None => {
                self.items.try_reserve(1)?;
                self.generations.try_reserve(1)?;
                self.free.try_reserve(1)?;
                self.items.len()
            }
        };

        Ok(Key {
            index: index as u32,
            generation: self.generations.get(index).copied().unwrap_or(0),
        })
    }

    /// Inserts a value into the slab and returns its key.
    ///
    /// If a free slot is available, it is reused.
    /// Otherwise, the slab grows by one slot.
    pub(crate) fn insert(&mut self, item: T) -> Key {
        let index = match self.free.pop() {
            Some(i) => i,
            None => {
                self.items.push(None);
                self.generations.push(0);
                self.items.len() - 1
            }
        };

        self.items[index] = Some(item);
        self.len += 1;

        Key {
            index: index as u32,
            generation: self.generations[index],
        }
    }

    /// Removes and returns the value referenced by `key`.
    ///
    /// Returns `None` if the key is stale. The slot becomes free and may be
    /// reused by future insertions under a new generation.
    pub(crate) fn remove(&mut self, key: Key) -> Option<T> {
        if !self.contains(key) {
            return None;
        }

        let index = key.index as usize;
        let item = self.items[index].take();

        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free.push(index);
        self.len -= 1;

        item
    }

    /// Returns `true` if `key` references a live value.
    pub(crate) fn contains(&self, key: Key) -> bool {
        let index = key.index as usize;

        self.generations.get(index) == Some(&key.generation)
            && self.items.get(index).is_some_and(Option::is_some)
    }

    pub(crate) fn get(&self, key: Key) -> Option<&T> {
        if !self.contains(key) {
            return None;
        }

        self.items[key.index as usize].as_ref()
    }

    pub(crate) fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        if !self.contains(key) {
            return None;
        }

        self.items[key.index as usize].as_mut()
    }

    /// Returns the keys of all live values, in slot order.
    pub(crate) fn keys(&self) -> Vec<Key> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_some())
            .map(|(index, _)| Key {
                index: index as u32,
                generation: self.generations[index],
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }
}
