//! # Peer Session
//!
//! Runs one match against one peer, a frame at a time.
//!
//! ```text
//!         user intent                               peer
//!             │                                       ▲ │
//!             v                                       │ v
//!  ┌──────────────────────┐  announce on success  ┌────────────┐
//!  │ Session              │──────────────────────>│ ActionLink │
//!  │  place / deploy / ...│                       │            │
//!  │  frame(dt):          │<──── inbound actions ─│            │
//!  │   tick, then apply   │                       └────────────┘
//!  └──────────────────────┘
//! ```
//!
//! The link sits behind [`ActionLink`] so a session can run over TCP or over
//! an in-memory pair in tests. A dead link never stops the session: actions
//! stay local and the match goes on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use miniclans_networking::{Inbox, PeerLink, TransportError, TransportResult};
use miniclans_shared::{Action, GridPos, Vec2};

use crate::config::DrainMode;
use crate::game_loop::FrameClock;
use crate::match_state::MatchState;

/// Anything that can carry actions to and from the peer.
pub trait ActionLink {
    /// Sends one action.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` or `ConnectionLost` when the peer is gone.
    fn send_action(&mut self, action: &Action) -> TransportResult<()>;

    /// Oldest pending inbound action.
    fn next_action(&mut self) -> Option<Action>;

    /// Every pending inbound action, oldest first.
    fn pending_actions(&mut self) -> Vec<Action> {
        std::iter::from_fn(|| self.next_action()).collect()
    }

    /// True while actions can reach the peer.
    fn is_connected(&self) -> bool;
}

impl ActionLink for PeerLink {
    fn send_action(&mut self, action: &Action) -> TransportResult<()> {
        self.send(action)
    }

    fn next_action(&mut self) -> Option<Action> {
        self.drain()
    }

    fn pending_actions(&mut self) -> Vec<Action> {
        self.drain_all()
    }

    fn is_connected(&self) -> bool {
        PeerLink::is_connected(self)
    }
}

/// One end of an in-process link pair.
#[derive(Debug)]
pub struct MemoryLink {
    outgoing: Arc<Inbox>,
    incoming: Arc<Inbox>,
    connected: Arc<AtomicBool>,
}

impl MemoryLink {
    /// Two connected ends: what one sends, the other receives.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let a_to_b = Arc::new(Inbox::new());
        let b_to_a = Arc::new(Inbox::new());
        let connected = Arc::new(AtomicBool::new(true));
        (
            Self {
                outgoing: Arc::clone(&a_to_b),
                incoming: Arc::clone(&b_to_a),
                connected: Arc::clone(&connected),
            },
            Self {
                outgoing: b_to_a,
                incoming: a_to_b,
                connected,
            },
        )
    }

    /// Disconnects both ends. Queued actions stay readable.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }
}

impl ActionLink for MemoryLink {
    fn send_action(&mut self, action: &Action) -> TransportResult<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.outgoing.push(action.clone());
        Ok(())
    }

    fn next_action(&mut self) -> Option<Action> {
        self.incoming.pop()
    }

    fn pending_actions(&mut self) -> Vec<Action> {
        self.incoming.pop_all()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

/// Session statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames run.
    pub frames: u64,
    /// Inbound actions applied.
    pub applied: u64,
    /// Inbound actions rejected by the match.
    pub rejected: u64,
    /// Local actions announced to the peer.
    pub announced: u64,
    /// Local actions that could not be announced.
    pub unannounced: u64,
}

/// A match bound to a peer link.
pub struct Session<L: ActionLink> {
    state: MatchState,
    link: L,
    drain: DrainMode,
    stats: SessionStats,
}

impl<L: ActionLink> Session<L> {
    /// Binds a match to a link.
    #[must_use]
    pub fn new(state: MatchState, link: L, drain: DrainMode) -> Self {
        Self {
            state,
            link,
            drain,
            stats: SessionStats::default(),
        }
    }

    /// The match.
    #[must_use]
    pub const fn state(&self) -> &MatchState {
        &self.state
    }

    /// Mutable access for intents that need no announcement.
    pub fn state_mut(&mut self) -> &mut MatchState {
        &mut self.state
    }

    /// The link.
    #[must_use]
    pub const fn link(&self) -> &L {
        &self.link
    }

    /// Mutable link access.
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Statistics so far.
    #[must_use]
    pub const fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Splits the session back into its parts.
    pub fn into_parts(self) -> (MatchState, L) {
        (self.state, self.link)
    }

    /// Runs one frame: tick, then apply inbound actions. Returns how many
    /// actions were applied.
    pub fn frame(&mut self, dt: f32) -> usize {
        self.frame_at(dt, Instant::now())
    }

    /// Runs one frame with accrual anchored at `now`.
    pub fn frame_at(&mut self, dt: f32, now: Instant) -> usize {
        self.state.tick_at(dt, now);
        self.stats.frames += 1;

        let inbound = match self.drain {
            DrainMode::All => self.link.pending_actions(),
            DrainMode::One => self.link.next_action().into_iter().collect(),
        };

        let mut applied = 0;
        for action in &inbound {
            if self.state.apply_remote(action).is_ok() {
                applied += 1;
            } else {
                self.stats.rejected += 1;
            }
        }
        self.stats.applied += applied as u64;
        applied
    }

    /// Places the selected building and announces it.
    pub fn place_building(&mut self, position: GridPos) -> bool {
        if !self.state.place_building(position) {
            return false;
        }
        if let Some(building) = self.state.player().buildings().last() {
            let action = Action::PlaceBuilding {
                building: building.to_record(),
            };
            self.announce(&action);
        }
        true
    }

    /// Deploys the selected troop and announces it.
    pub fn deploy_troop(&mut self, position: Vec2) -> bool {
        if !self.state.deploy_troop(position) {
            return false;
        }
        let action = Action::DeployTroop {
            position,
            troop_type: self.state.selected_troop().name.clone(),
        };
        self.announce(&action);
        true
    }

    /// Tells the peer this side is switching to attack.
    pub fn ready_to_attack(&mut self) {
        self.announce(&Action::ReadyToAttack);
    }

    /// Runs frames until `frames` have passed (forever if `None`) or
    /// `shutdown` is set.
    pub fn run(&mut self, clock: &mut FrameClock, frames: Option<u64>, shutdown: &AtomicBool) {
        let mut remaining = frames;
        while !shutdown.load(Ordering::Relaxed) {
            if let Some(left) = remaining.as_mut() {
                if *left == 0 {
                    break;
                }
                *left -= 1;
            }
            let dt = clock.begin_frame();
            self.frame(dt);
            clock.wait_for_next_frame();
        }
        tracing::info!(
            frames = self.stats.frames,
            applied = self.stats.applied,
            rejected = self.stats.rejected,
            "session stopped"
        );
    }

    fn announce(&mut self, action: &Action) {
        if !self.link.is_connected() {
            self.stats.unannounced += 1;
            tracing::debug!(action = action.name(), "no peer, action stays local");
            return;
        }
        match self.link.send_action(action) {
            Ok(()) => self.stats.announced += 1,
            Err(e) => {
                self.stats.unannounced += 1;
                tracing::warn!(action = action.name(), error = %e, "failed to announce action");
            }
        }
    }
}

impl<L: ActionLink> std::fmt::Debug for Session<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("connected", &self.link.is_connected())
            .field("drain", &self.drain)
            .field("stats", &self.stats)
            .finish()
    }
}
