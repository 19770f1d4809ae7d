use super::error::BufferError;
use std::collections::VecDeque;

/// Upper bound guarding against absurd allocations from bad configuration.
const MAX_CAPACITY: usize = 100_000_000;

/// Fixed-capacity FIFO that never blocks and never rejects.
///
/// When full, `offer` evicts the oldest element before inserting, so the
/// queue always holds the most recently offered `capacity` items. Fresher
/// data wins over older data.
pub struct BoundedBatchQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
    evicted: u64,
}

impl<T> BoundedBatchQueue<T> {
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(BufferError::InvalidCapacity { capacity });
        }

        Ok(Self {
            items: VecDeque::with_capacity(capacity.min(8_192)),
            capacity,
            evicted: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Total number of items dropped by overflow since construction.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Insert `item`, evicting and returning the oldest item if the queue
    /// was full.
    pub fn offer(&mut self, item: T) -> Option<T> {
        let dropped = if self.is_full() {
            self.evicted += 1;
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        dropped
    }

    /// Repeated `offer`. Returns the number of evicted items.
    pub fn offer_all<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        items
            .into_iter()
            .filter_map(|item| self.offer(item))
            .count()
    }

    /// Contiguous view of the queued items, oldest first.
    pub fn as_slice(&mut self) -> &[T] {
        self.items.make_contiguous()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn drain(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }
}

impl<T> std::fmt::Debug for BoundedBatchQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedBatchQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.items.len())
            .field("evicted", &self.evicted)
            .finish()
    }
}
