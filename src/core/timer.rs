//! Cancelable delayed callbacks
//!
//! Nothing in the simulation blocks. "Do X later" is a payload scheduled
//! into a `TimerQueue` and handed back by `pop_due` once the host clock has
//! reached its due time. Entries are ordered by `(due, sequence)`, so two
//! timers due at the same millisecond fire in scheduling order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::AHashSet;

use crate::core::types::Millis;

/// Handle returned by `TimerQueue::schedule`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Entry<T> {
    due: Millis,
    sequence: u64,
    payload: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.sequence == other.sequence
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Min-heap of pending timers with O(1) cancellation
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    /// Sequences of timers that are scheduled and not yet fired or canceled
    live: AHashSet<u64>,
    next_sequence: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: AHashSet::new(),
            next_sequence: 0,
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `payload` to fire at `due`
    pub fn schedule(&mut self, due: Millis, payload: T) -> TimerId {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.live.insert(sequence);
        self.heap.push(Entry {
            due,
            sequence,
            payload,
        });
        TimerId(sequence)
    }

    /// Cancel a timer. Returns false if it already fired or was canceled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.live.remove(&id.0)
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.live.contains(&id.0)
    }

    /// Pop the next live timer whose due time is <= `now`
    pub fn pop_due(&mut self, now: Millis) -> Option<(TimerId, T)> {
        while let Some(top) = self.heap.peek() {
            if !self.live.contains(&top.sequence) {
                // Canceled earlier; drop lazily
                self.heap.pop();
                continue;
            }
            if top.due > now {
                return None;
            }
            let entry = self.heap.pop()?;
            self.live.remove(&entry.sequence);
            return Some((TimerId(entry.sequence), entry.payload));
        }
        None
    }

    /// Due time of the earliest live timer
    pub fn next_due(&self) -> Option<Millis> {
        self.heap
            .iter()
            .filter(|e| self.live.contains(&e.sequence))
            .map(|e| e.due)
            .min()
    }

    /// Push every pending timer `delta` milliseconds into the future
    pub fn postpone_all(&mut self, delta: Millis) {
        if delta == 0 {
            return;
        }
        let entries = std::mem::take(&mut self.heap);
        self.heap = entries
            .into_iter()
            .filter(|e| self.live.contains(&e.sequence))
            .map(|mut e| {
                e.due += delta;
                e
            })
            .collect();
    }

    /// Cancel everything
    pub fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
    }

    /// Number of pending (live) timers
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_in_due_order() {
        let mut q = TimerQueue::new();
        q.schedule(300, "c");
        q.schedule(100, "a");
        q.schedule(200, "b");

        assert!(q.pop_due(50).is_none());
        assert_eq!(q.pop_due(1000).map(|(_, p)| p), Some("a"));
        assert_eq!(q.pop_due(1000).map(|(_, p)| p), Some("b"));
        assert_eq!(q.pop_due(1000).map(|(_, p)| p), Some("c"));
        assert!(q.is_empty());
    }

    #[test]
    fn test_same_due_fires_in_schedule_order() {
        let mut q = TimerQueue::new();
        q.schedule(100, 1);
        q.schedule(100, 2);
        q.schedule(100, 3);

        let order: Vec<i32> = std::iter::from_fn(|| q.pop_due(100).map(|(_, p)| p)).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut q = TimerQueue::new();
        let id = q.schedule(100, ());
        assert!(q.cancel(id));
        assert!(!q.cancel(id));
        assert!(q.pop_due(500).is_none());
    }

    #[test]
    fn test_cancel_after_fire_is_noop() {
        let mut q = TimerQueue::new();
        let id = q.schedule(10, ());
        assert!(q.pop_due(10).is_some());
        assert!(!q.cancel(id));
        assert!(!q.is_pending(id));
    }

    #[test]
    fn test_postpone_all_shifts_due_times() {
        let mut q = TimerQueue::new();
        let canceled = q.schedule(100, "x");
        q.schedule(200, "y");
        q.cancel(canceled);

        q.postpone_all(1000);
        assert_eq!(q.next_due(), Some(1200));
        assert!(q.pop_due(1199).is_none());
        assert_eq!(q.pop_due(1200).map(|(_, p)| p), Some("y"));
    }

    #[test]
    fn test_clear_cancels_everything() {
        let mut q = TimerQueue::new();
        let id = q.schedule(1, ());
        q.schedule(2, ());
        q.clear();
        assert_eq!(q.len(), 0);
        assert!(!q.is_pending(id));
        assert!(q.pop_due(u64::MAX).is_none());
    }
}
