//! Deferred one-shot task queue.
//!
//! Respawn-after-death and kit-after-spawn are queued here as plain values and run
//! later on the same thread when the owner calls [`DeferredQueue::pop_due`] from
//! its tick. Nothing captures mutable state; each task carries what it needs to
//! re-validate the world when it fires. There is no cancellation: stale tasks
//! are expected to notice and do nothing.
//!
//! The queue is a small Vec kept sorted by due time, same-instant tasks in the
//! order they were scheduled.

use std::time::{Duration, Instant};

#[derive(Debug)]
struct ScheduledTask<T> {
    due: Instant,
    seq: u64,
    task: T,
}

#[derive(Debug)]
pub struct DeferredQueue<T> {
    pending: Vec<ScheduledTask<T>>,
    next_seq: u64,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_at(&mut self, due: Instant, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let idx = self
            .pending
            .partition_point(|t| (t.due, t.seq) <= (due, seq));
        self.pending.insert(idx, ScheduledTask { due, seq, task });
    }

    pub fn schedule(&mut self, now: Instant, delay: Duration, task: T) {
        self.schedule_at(now + delay, task);
    }

    /// Remove and return every task due at or before `now`, earliest first.
    pub fn pop_due(&mut self, now: Instant) -> Vec<T> {
        let split = self.pending.partition_point(|t| t.due <= now);
        self.pending.drain(..split).map(|t| t.task).collect()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.pending.first().map(|t| t.due)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
