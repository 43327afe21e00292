//! # Mini Clans
//!
//! Two players each build a base, then raid each other with autonomous
//! troops. There is no server: every peer runs its own simulation and the
//! two only exchange discrete actions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                            MINI CLANS                               │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐  │
//! │  │ miniclans_shared│    │miniclans_economy│    │   miniclans_    │  │
//! │  │                 │───>│                 │    │   networking    │  │
//! │  │  • Grid math    │    │  • Catalog      │    │                 │  │
//! │  │  • Wire records │    │  • Bases        │    │  • PeerLink     │  │
//! │  │  • Constants    │    │  • Snapshots    │    │  • Framing      │  │
//! │  └─────────────────┘    └────────┬────────┘    └────────┬────────┘  │
//! │                                  │                      │           │
//! │                         ┌────────v──────────────────────v────────┐  │
//! │                         │  miniclans (this crate)                │  │
//! │                         │  • MatchState + gameplay               │  │
//! │                         │  • Session + FrameClock                │  │
//! │                         │  • Events, config, peer binary         │  │
//! │                         └────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `match_state`: the per-peer authoritative match
//! - `gameplay`: troop movement and building defenses
//! - `session`: match + link, one frame at a time
//! - `game_loop`: frame pacing
//! - `events`: notifications for the rendering side
//! - `config`: TOML peer configuration

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod events;
pub mod game_loop;
pub mod gameplay;
pub mod match_state;
pub mod session;

pub use miniclans_economy as economy;
pub use miniclans_networking as networking;
pub use miniclans_shared as shared;

pub use config::{DrainMode, GameConfig};
pub use events::{event_channel, EventReceiver, EventSender, MatchEvent, Side};
pub use game_loop::{FrameClock, FrameStats, MAX_FRAME_DELTA};
pub use gameplay::{Troop, TroopStep};
pub use match_state::{MatchState, RemotePolicy};
pub use session::{ActionLink, MemoryLink, Session, SessionStats};
