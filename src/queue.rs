//! Queue — fixed-capacity FIFO exchanged between tasks
//!
//! Circular buffer with head/tail cursors and an explicit count, so all `N`
//! slots are usable. Like [`Share`](crate::Share) it relies on cells rather
//! than atomics or locks: the cooperative scheduler guarantees only one task
//! touches it at a time, and the cells keep it `!Sync`.
//!
//! Author: Moroya Sakamoto

use core::cell::Cell;
use core::fmt;

use crate::diag::Resource;
use crate::error::{Error, Result};
use crate::share::Protection;

/// Behavior of `put` on a full queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Fail with [`Error::QueueFull`] and leave the queue untouched
    Reject,
    /// Evict the oldest item to make room
    Overwrite,
}

/// Fixed-capacity circular FIFO
pub struct Queue<T: Copy + Default, const N: usize> {
    name: &'static str,
    /// Ring storage
    buffer: [Cell<T>; N],
    /// Index of the oldest item
    head: Cell<usize>,
    /// Index the next item is written to
    tail: Cell<usize>,
    /// Items currently stored
    count: Cell<usize>,
    /// Items discarded by the overwrite policy
    evicted: Cell<u32>,
    policy: OverflowPolicy,
    protection: Protection,
}

impl<T: Copy + Default, const N: usize> Queue<T, N> {
    /// Create an empty queue
    pub fn new(name: &'static str, policy: OverflowPolicy) -> Self {
        Self::with_protection(name, policy, Protection::Unprotected)
    }

    /// Create an empty queue with an explicit protection flag
    pub fn with_protection(name: &'static str, policy: OverflowPolicy, protection: Protection) -> Self {
        const { assert!(N > 0, "queue capacity must be non-zero") };
        Self {
            name,
            buffer: core::array::from_fn(|_| Cell::new(T::default())),
            head: Cell::new(0),
            tail: Cell::new(0),
            count: Cell::new(0),
            evicted: Cell::new(0),
            policy,
            protection,
        }
    }

    /// Append an item
    ///
    /// On a full queue the outcome depends on the overflow policy.
    pub fn put(&self, value: T) -> Result<()> {
        if self.count.get() == N {
            match self.policy {
                OverflowPolicy::Reject => return Err(Error::QueueFull),
                OverflowPolicy::Overwrite => {
                    self.head.set((self.head.get() + 1) % N);
                    self.count.set(N - 1);
                    self.evicted.set(self.evicted.get().saturating_add(1));
                }
            }
        }

        let tail = self.tail.get();
        self.buffer[tail].set(value);
        self.tail.set((tail + 1) % N);
        self.count.set(self.count.get() + 1);
        Ok(())
    }

    /// Remove and return the oldest item
    pub fn get(&self) -> Result<T> {
        let value = self.peek()?;
        self.head.set((self.head.get() + 1) % N);
        self.count.set(self.count.get() - 1);
        Ok(value)
    }

    /// Oldest item without removing it
    pub fn peek(&self) -> Result<T> {
        if self.count.get() == 0 {
            return Err(Error::QueueEmpty);
        }
        Ok(self.buffer[self.head.get()].get())
    }

    /// Number of items in the queue
    pub fn len(&self) -> usize {
        self.count.get()
    }

    pub fn is_empty(&self) -> bool {
        self.count.get() == 0
    }

    /// Is there anything to read?
    pub fn any(&self) -> bool {
        !self.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.count.get() == N
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Items dropped to make room under [`OverflowPolicy::Overwrite`]
    pub fn evicted(&self) -> u32 {
        self.evicted.get()
    }

    /// Discard every item
    pub fn clear(&self) {
        self.head.set(0);
        self.tail.set(0);
        self.count.set(0);
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn protection(&self) -> Protection {
        self.protection
    }

    /// Items oldest-first, without consuming them
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        let head = self.head.get();
        (0..self.count.get()).map(move |i| self.buffer[(head + i) % N].get())
    }
}

impl<T: Copy + Default, const N: usize> Resource for Queue<T, N> {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> &'static str {
        "queue"
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} used", self.len(), N)?;
        if self.evicted.get() > 0 {
            write!(f, ", {} evicted", self.evicted.get())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let q = Queue::<u32, 8>::new("q", OverflowPolicy::Reject);
        assert!(q.is_empty());

        q.put(42).unwrap();
        assert_eq!(q.len(), 1);
        assert!(q.any());

        assert_eq!(q.get(), Ok(42));
        assert!(q.is_empty());
    }

    #[test]
    fn test_get_empty_fails() {
        let q = Queue::<u32, 4>::new("q", OverflowPolicy::Reject);
        assert_eq!(q.get(), Err(Error::QueueEmpty));
        assert_eq!(q.peek(), Err(Error::QueueEmpty));
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn test_full_queue_rejects_and_is_unchanged() {
        let q = Queue::<u32, 4>::new("q", OverflowPolicy::Reject);
        for i in 0..4 {
            q.put(i).unwrap();
        }
        assert!(q.is_full());
        assert_eq!(q.put(99), Err(Error::QueueFull));
        assert_eq!(q.len(), 4);
        assert!(q.iter().eq(0..4u32));
        assert_eq!(q.evicted(), 0);
    }

    #[test]
    fn test_full_queue_overwrites_oldest() {
        let q = Queue::<u32, 4>::new("q", OverflowPolicy::Overwrite);
        for i in 0..4 {
            q.put(i).unwrap();
        }
        q.put(99).unwrap();
        assert_eq!(q.len(), 4);
        assert_eq!(q.evicted(), 1);
        assert_eq!(q.peek(), Ok(1));
        assert!(q.iter().eq([1u32, 2, 3, 99]));
    }

    #[test]
    fn test_all_slots_usable() {
        let q = Queue::<u8, 16>::new("q", OverflowPolicy::Reject);
        assert_eq!(q.capacity(), 16);
        for i in 0..16 {
            q.put(i).unwrap();
        }
        assert!(q.is_full());
    }

    #[test]
    fn test_wraparound() {
        let q = Queue::<u32, 4>::new("q", OverflowPolicy::Reject);
        // Fill and drain repeatedly with a partial offset to cross the end
        q.put(1000).unwrap();
        assert_eq!(q.get(), Ok(1000));
        for round in 0..3 {
            for i in 0..4 {
                q.put(round * 10 + i).unwrap();
            }
            for i in 0..4 {
                assert_eq!(q.get(), Ok(round * 10 + i));
            }
        }
    }

    #[test]
    fn test_peek_does_not_consume() {
        let q = Queue::<i16, 4>::new("q", OverflowPolicy::Reject);
        q.put(-5).unwrap();
        assert_eq!(q.peek(), Ok(-5));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_clear() {
        let q = Queue::<u32, 8>::new("q", OverflowPolicy::Reject);
        q.put(1).unwrap();
        q.put(2).unwrap();
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.get(), Err(Error::QueueEmpty));
        q.put(3).unwrap();
        assert_eq!(q.get(), Ok(3));
    }

    #[test]
    fn test_capacity_sixteen_reject_scenario() {
        let q = Queue::<u32, 16>::new("Queue 0", OverflowPolicy::Reject);
        for i in 0..16 {
            assert!(q.put(i).is_ok());
        }
        assert_eq!(q.put(16), Err(Error::QueueFull));
        for i in 0..16 {
            assert_eq!(q.get(), Ok(i));
        }
        assert!(q.is_empty());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn fifo_order_preserved(values in proptest::collection::vec(any::<u32>(), 0..=16)) {
                let q = Queue::<u32, 16>::new("q", OverflowPolicy::Reject);
                for v in &values {
                    prop_assert!(q.put(*v).is_ok());
                }
                for v in &values {
                    prop_assert_eq!(q.get(), Ok(*v));
                }
                prop_assert!(q.is_empty());
            }

            #[test]
            fn overwrite_keeps_newest(values in proptest::collection::vec(any::<u32>(), 0..64)) {
                let q = Queue::<u32, 8>::new("q", OverflowPolicy::Overwrite);
                for v in &values {
                    prop_assert!(q.put(*v).is_ok());
                }
                let keep = values.len().min(8);
                let expected = &values[values.len() - keep..];
                prop_assert_eq!(q.len(), keep);
                prop_assert!(q.iter().eq(expected.iter().copied()));
                prop_assert_eq!(q.evicted() as usize, values.len() - keep);
            }

            #[test]
            fn reject_never_mutates_full_queue(extra in any::<u32>()) {
                let q = Queue::<u32, 8>::new("q", OverflowPolicy::Reject);
                for i in 0..8 {
                    q.put(i).unwrap();
                }
                prop_assert_eq!(q.put(extra), Err(Error::QueueFull));
                prop_assert!(q.iter().eq(0..8u32));
            }
        }
    }
}
