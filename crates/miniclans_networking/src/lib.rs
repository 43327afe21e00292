//! # Mini Clans Networking
//!
//! Peer-to-peer transport for a two-player match. There is no server: one
//! peer hosts, the other joins, and both exchange discrete actions.
//!
//! ## Architecture
//!
//! ```text
//!  SIMULATION THREAD                       RECEIVE THREAD
//!  ┌──────────────────┐                    ┌─────────────────────────┐
//!  │ PeerLink::send() │── JSON + '\n' ──>  │      (remote peer)      │
//!  │                  │                    │                         │
//!  │ PeerLink::drain()│<── Arc<Inbox> <────│ read -> LineFramer      │
//!  └──────────────────┘   (Mutex<VecDeque>)│      -> codec::decode   │
//!                                          └─────────────────────────┘
//! ```
//!
//! The inbox and the connected flag are the only state shared between the
//! two threads. Malformed frames are logged and dropped; a lost connection
//! stops synchronization but never the simulation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use miniclans_networking::PeerLink;
//!
//! let mut link = PeerLink::default();
//! if link.join("127.0.0.1:5555") {
//!     link.send(&Action::ReadyToAttack)?;
//! }
//! while let Some(action) = link.drain() {
//!     // apply to the match
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod error;
pub mod inbox;
pub mod transport;

pub use error::{TransportError, TransportResult};
pub use inbox::Inbox;
pub use transport::{LineFramer, LinkConfig, LinkState, LinkStats, PeerLink};
