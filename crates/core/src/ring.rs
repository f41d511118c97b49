//! Fixed-capacity ring buffer.
//!
//! Backed by a single `Vec` that grows to `capacity` once and is then
//! overwritten in place at `head`, so memory per ring is capped for the life
//! of the process.

#[derive(Debug, Clone)]
pub struct BoundedRing<T> {
    slots: Vec<T>,
    /// Index of the oldest element once the ring is full; 0 until then.
    head: usize,
    capacity: usize,
}

impl<T> BoundedRing<T> {
    /// Create an empty ring. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    /// Append `item`, evicting the oldest element when full.
    pub fn push(&mut self, item: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(item);
        } else {
            self.slots[self.head] = item;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }
}

impl<T: Clone> BoundedRing<T> {
    /// Copy out the contents, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}
