use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle into a [`RefCountArena`].
    pub struct RefKey;
}

struct Counted<T> {
    value: T,
    count: usize,
}

/// Arena of shared values with explicit reference counts.
///
/// A value is inserted with a count of one. When [`release`](Self::release)
/// brings the count to zero the value is removed and handed to `on_zero`.
pub struct RefCountArena<T> {
    slots: SlotMap<RefKey, Counted<T>>,
    on_zero: Box<dyn FnMut(RefKey, T) + Send>,
}

impl<T> RefCountArena<T> {
    pub fn new(on_zero: impl FnMut(RefKey, T) + Send + 'static) -> Self {
        Self {
            slots: SlotMap::with_key(),
            on_zero: Box::new(on_zero),
        }
    }

    /// Inserts `value` holding one reference.
    pub fn insert(&mut self, value: T) -> RefKey {
        self.slots.insert(Counted { value, count: 1 })
    }

    /// Takes another reference. Returns `None` for released keys.
    pub fn acquire(&mut self, key: RefKey) -> Option<&T> {
        let slot = self.slots.get_mut(key)?;
        slot.count += 1;
        Some(&slot.value)
    }

    /// Drops one reference; returns `true` when this removed the value.
    pub fn release(&mut self, key: RefKey) -> bool {
        let Some(slot) = self.slots.get_mut(key) else {
            return false;
        };

        slot.count -= 1;
        if slot.count > 0 {
            return false;
        }

        if let Some(slot) = self.slots.remove(key) {
            (self.on_zero)(key, slot.value);
        }
        true
    }

    pub fn get(&self, key: RefKey) -> Option<&T> {
        self.slots.get(key).map(|s| &s.value)
    }

    /// Current reference count; zero for released keys.
    pub fn count(&self, key: RefKey) -> usize {
        self.slots.get(key).map_or(0, |s| s.count)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
