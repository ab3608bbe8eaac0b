//! Bounded task queue with unfinished-item tracking.
//!
//! A `crossbeam-channel` bounded channel carries [`QueueItem`]s from the single producer to the
//! workers (`put` blocks when full, `get` blocks when empty). On top of that the queue counts
//! items that were put but not yet marked processed, so the producer can [`TaskQueue::join`]
//! until every task and every shutdown sentinel has been handled.

use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::QueueItem;

pub struct TaskQueue {
    tx: Sender<QueueItem>,
    rx: Receiver<QueueItem>,
    capacity: usize,
    unfinished: Mutex<usize>,
    all_done: Condvar,
}

impl TaskQueue {
    /// Queue holding at most `capacity` items (at least 1).
    pub fn bounded(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded::<QueueItem>(capacity);
        Self {
            tx,
            rx,
            capacity,
            unfinished: Mutex::new(0),
            all_done: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items currently buffered (not yet taken by a worker).
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    fn lock_unfinished(&self) -> MutexGuard<'_, usize> {
        self.unfinished.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue, blocking while the queue is full.
    pub fn put(&self, item: QueueItem) -> Result<()> {
        *self.lock_unfinished() += 1;
        if self.tx.send(item).is_err() {
            self.task_done();
            return Err(anyhow!("task queue disconnected"));
        }
        Ok(())
    }

    /// Dequeue, blocking while the queue is empty. `None` only if the channel disconnected,
    /// which cannot happen while `self` owns both ends.
    pub fn get(&self) -> Option<QueueItem> {
        self.rx.recv().ok()
    }

    /// Mark one previously dequeued item as processed.
    pub fn task_done(&self) {
        let mut unfinished = self.lock_unfinished();
        *unfinished = unfinished.saturating_sub(1);
        if *unfinished == 0 {
            self.all_done.notify_all();
        }
    }

    /// Guard that calls [`Self::task_done`] when dropped, including on unwind.
    pub fn done_on_drop(&self) -> ProcessedGuard<'_> {
        ProcessedGuard { queue: self }
    }

    /// Items put but not yet marked processed.
    pub fn unfinished(&self) -> usize {
        *self.lock_unfinished()
    }

    /// Block until every item put so far has been marked processed.
    pub fn join(&self) {
        let mut unfinished = self.lock_unfinished();
        while *unfinished > 0 {
            unfinished = self
                .all_done
                .wait(unfinished)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Returned by [`TaskQueue::done_on_drop`].
pub struct ProcessedGuard<'a> {
    queue: &'a TaskQueue,
}

impl Drop for ProcessedGuard<'_> {
    fn drop(&mut self) {
        self.queue.task_done();
    }
}
