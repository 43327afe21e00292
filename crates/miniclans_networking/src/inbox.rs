//! Inbound action queue shared between the receive thread and the
//! simulation thread.
//!
//! The receive thread is the only producer, the simulation thread the only
//! consumer. Every push and pop takes the lock for a single queue operation,
//! so neither side ever waits on the other for longer than that.

use parking_lot::Mutex;
use std::collections::VecDeque;

use miniclans_shared::Action;

/// Mutex-guarded FIFO of decoded actions.
#[derive(Debug, Default)]
pub struct Inbox {
    queue: Mutex<VecDeque<Action>>,
}

impl Inbox {
    /// Creates an empty inbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action at the back.
    pub fn push(&self, action: Action) {
        self.queue.lock().push_back(action);
    }

    /// Removes the oldest action, if any. Never blocks on an empty queue.
    pub fn pop(&self) -> Option<Action> {
        self.queue.lock().pop_front()
    }

    /// Takes every queued action, oldest first.
    pub fn pop_all(&self) -> Vec<Action> {
        self.queue.lock().drain(..).collect()
    }

    /// Number of queued actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// True if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
