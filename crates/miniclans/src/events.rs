//! # Match Events
//!
//! What the simulation reports to a renderer or logger: buildings placed
//! and destroyed, troops deployed and killed, upgrades, rejected peer
//! actions.
//!
//! [`event_channel`] hands out one sending and one receiving end of a
//! bounded queue. `MatchState` holds the sender and never blocks on it.
//! When the receiver falls behind, new events are discarded and tallied;
//! both ends can read the tally through `dropped()`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use miniclans_shared::{GridPos, Vec2};

/// Default channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Which side of the match something belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// The local player.
    Player,
    /// The mirrored remote peer.
    Opponent,
}

/// Something that happened in the match.
#[derive(Clone, Debug, PartialEq)]
pub enum MatchEvent {
    /// A building was added to a base.
    BuildingPlaced {
        /// Base that received it.
        side: Side,
        /// Index in that base.
        index: usize,
        /// Kind name.
        kind: String,
        /// Top-left cell.
        position: GridPos,
    },
    /// A building's hit points reached zero.
    BuildingDestroyed {
        /// Base that lost it.
        side: Side,
        /// Index in that base.
        index: usize,
    },
    /// A troop entered a roster.
    TroopDeployed {
        /// Roster that received it.
        side: Side,
        /// Kind name.
        kind: String,
        /// Deployment point.
        position: Vec2,
    },
    /// A troop died and left its roster.
    TroopDied {
        /// Roster that lost it.
        side: Side,
        /// Kind name.
        kind: String,
        /// Where it fell.
        position: Vec2,
    },
    /// A building was upgraded.
    BuildingUpgraded {
        /// Base that owns it.
        side: Side,
        /// Index in that base.
        index: usize,
        /// New level.
        level: u32,
    },
    /// The peer announced it is ready to attack.
    PeerReady,
    /// An action from the peer was not applied.
    RemoteActionRejected {
        /// Wire name of the action.
        action: &'static str,
        /// Why it was refused.
        reason: String,
    },
}

/// Opens a queue holding up to `capacity` undelivered events.
#[must_use]
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = bounded(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    (
        EventSender {
            tx,
            dropped: Arc::clone(&dropped),
        },
        EventReceiver { rx, dropped },
    )
}

/// Emitting end, cloned into whatever produces events.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: Sender<MatchEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventSender {
    /// Queues `event` if there is room. Returns whether it was queued.
    ///
    /// A full queue discards the event and bumps the drop tally. A missing
    /// receiver discards it silently.
    #[inline]
    pub fn send(&self, event: MatchEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::trace!(?event, dropped, "event queue full");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Events discarded so far because the queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consuming end.
#[derive(Debug)]
pub struct EventReceiver {
    rx: Receiver<MatchEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventReceiver {
    /// Empties the queue, oldest event first.
    pub fn drain(&self) -> Vec<MatchEvent> {
        self.rx.try_iter().collect()
    }

    /// Oldest queued event, if any.
    #[inline]
    pub fn try_recv(&self) -> Option<MatchEvent> {
        self.rx.try_recv().ok()
    }

    /// Events waiting in the queue.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.rx.len()
    }

    /// Events the sender had to discard.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
