//! # Peer Link
//!
//! One TCP stream between the two peers of a match.
//!
//! ## State Machine
//!
//! ```text
//! host:   Idle ──host()──> Listening ──poll_accept()──> Connected ──> Closed
//! join:   Idle ──join()──> Connecting ─────────────────> Connected ──> Closed
//!                              │ (connect failed)
//!                              └──> Idle
//! ```
//!
//! A connected link owns exactly one receive thread. The thread reads with a
//! short timeout so it notices `close()` within one poll interval, frames the
//! byte stream, decodes each frame and pushes the action into the inbox.
//! EOF or an I/O error ends the thread and clears the connected flag; the
//! simulation keeps running without a peer.

mod framing;

pub use framing::LineFramer;

use parking_lot::Mutex;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use miniclans_shared::constants::{CONNECT_TIMEOUT_MS, MAX_FRAME_LEN, POLL_INTERVAL_MS};
use miniclans_shared::Action;

use crate::codec;
use crate::error::{TransportError, TransportResult};
use crate::inbox::Inbox;

/// Size of the receive thread's read buffer.
const READ_CHUNK: usize = 4096;

/// Connection state of a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    /// Nothing started yet.
    Idle,
    /// Host side: bound and waiting for the peer.
    Listening,
    /// Join side: connect in progress.
    Connecting,
    /// Peer connected, receive thread running.
    Connected,
    /// Closed locally or by the peer.
    Closed,
}

/// Link timing and limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkConfig {
    /// Read timeout of the receive thread, write timeout of `send`, and
    /// sleep between accept polls.
    pub poll_interval: Duration,
    /// Timeout of a single connect attempt.
    pub connect_timeout: Duration,
    /// Longest accepted frame in bytes.
    pub max_frame_len: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            connect_timeout: Duration::from_millis(CONNECT_TIMEOUT_MS),
            max_frame_len: MAX_FRAME_LEN,
        }
    }
}

/// Link statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Frames written.
    pub frames_sent: u64,
    /// Frames decoded and queued.
    pub frames_received: u64,
    /// Bytes written.
    pub bytes_sent: u64,
    /// Bytes read.
    pub bytes_received: u64,
    /// Frames that failed to decode.
    pub malformed: u64,
    /// Frames dropped for exceeding the length limit.
    pub oversized: u64,
}

/// Bidirectional action link to the other peer.
pub struct PeerLink {
    config: LinkConfig,
    state: LinkState,
    listener: Option<TcpListener>,
    stream: Option<TcpStream>,
    local_addr: Option<SocketAddr>,
    peer_addr: Option<SocketAddr>,
    connected: Arc<AtomicBool>,
    inbox: Arc<Inbox>,
    stats: Arc<Mutex<LinkStats>>,
    receiver: Option<JoinHandle<()>>,
}

impl PeerLink {
    /// Creates an idle link.
    #[must_use]
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            state: LinkState::Idle,
            listener: None,
            stream: None,
            local_addr: None,
            peer_addr: None,
            connected: Arc::new(AtomicBool::new(false)),
            inbox: Arc::new(Inbox::new()),
            stats: Arc::new(Mutex::new(LinkStats::default())),
            receiver: None,
        }
    }

    /// Current state. A connection dropped by the peer reads as `Closed`.
    #[must_use]
    pub fn state(&self) -> LinkState {
        if self.state == LinkState::Connected && !self.is_connected() {
            LinkState::Closed
        } else {
            self.state
        }
    }

    /// True while the peer is reachable.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Bound or connected local address.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Address of the connected peer.
    #[must_use]
    pub const fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> LinkStats {
        *self.stats.lock()
    }

    /// Starts listening. Returns false if the address cannot be bound.
    pub fn host(&mut self, addr: impl ToSocketAddrs + std::fmt::Debug) -> bool {
        match self.try_host(addr) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "host failed");
                false
            }
        }
    }

    /// Starts listening for the single peer.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyConnected` unless the link is idle, and `Bind` if the
    /// socket cannot be bound.
    pub fn try_host(&mut self, addr: impl ToSocketAddrs + std::fmt::Debug) -> TransportResult<()> {
        if self.state != LinkState::Idle {
            return Err(TransportError::AlreadyConnected);
        }

        let bind_error = |e: std::io::Error| TransportError::Bind {
            addr: format!("{addr:?}"),
            reason: e.to_string(),
        };
        let listener = TcpListener::bind(&addr).map_err(bind_error)?;
        listener.set_nonblocking(true).map_err(bind_error)?;

        self.local_addr = listener.local_addr().ok();
        self.listener = Some(listener);
        self.state = LinkState::Listening;
        tracing::info!(addr = ?self.local_addr, "listening for peer");
        Ok(())
    }

    /// Accepts the peer if one is waiting. Never blocks.
    ///
    /// Returns true once connected. The listener is dropped after the first
    /// accepted peer.
    pub fn poll_accept(&mut self) -> bool {
        if self.state != LinkState::Listening {
            return self.is_connected();
        }
        let Some(listener) = self.listener.as_ref() else {
            return false;
        };

        match listener.accept() {
            Ok((stream, peer)) => {
                self.listener = None;
                match self.start(stream, peer) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to start receive thread");
                        self.state = LinkState::Closed;
                        false
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => false,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                false
            }
        }
    }

    /// Polls `poll_accept` until a peer connects or `timeout` runs out.
    pub fn accept_within(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.poll_accept() {
                return true;
            }
            if self.state != LinkState::Listening || Instant::now() >= deadline {
                return false;
            }
            thread::sleep(self.config.poll_interval.min(Duration::from_millis(10)));
        }
    }

    /// Connects to a host. Returns false if it cannot be reached.
    pub fn join(&mut self, addr: impl ToSocketAddrs + std::fmt::Debug) -> bool {
        match self.try_join(addr) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "join failed");
                false
            }
        }
    }

    /// Connects to a host, trying each resolved address in turn.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyConnected` unless the link is idle, and `Connect` if
    /// no address accepts within the connect timeout. A failed join leaves
    /// the link idle so it can be retried.
    pub fn try_join(&mut self, addr: impl ToSocketAddrs + std::fmt::Debug) -> TransportResult<()> {
        if self.state != LinkState::Idle {
            return Err(TransportError::AlreadyConnected);
        }
        self.state = LinkState::Connecting;

        let connect_error = |reason: String| TransportError::Connect {
            addr: format!("{addr:?}"),
            reason,
        };

        let candidates = match addr.to_socket_addrs() {
            Ok(candidates) => candidates,
            Err(e) => {
                self.state = LinkState::Idle;
                return Err(connect_error(e.to_string()));
            }
        };

        let mut last_error = String::from("no addresses resolved");
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, self.config.connect_timeout) {
                Ok(stream) => {
                    return self.start(stream, candidate).map_err(|e| {
                        self.state = LinkState::Idle;
                        e
                    });
                }
                Err(e) => last_error = e.to_string(),
            }
        }

        self.state = LinkState::Idle;
        Err(connect_error(last_error))
    }

    /// Sends one action as a single write.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` without a live peer, and `ConnectionLost` if the
    /// write fails or the peer stops reading for longer than the poll
    /// interval. A failed write marks the link disconnected.
    pub fn send(&mut self, action: &Action) -> TransportResult<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let frame = codec::encode(action)?;

        if let Err(e) = stream.write_all(&frame) {
            self.connected.store(false, Ordering::Release);
            tracing::warn!(error = %e, action = action.name(), "send failed, peer lost");
            return Err(TransportError::ConnectionLost(e.to_string()));
        }

        let mut stats = self.stats.lock();
        stats.frames_sent += 1;
        stats.bytes_sent += frame.len() as u64;
        drop(stats);

        tracing::debug!(action = action.name(), bytes = frame.len(), "action sent");
        Ok(())
    }

    /// Pops the oldest received action.
    #[inline]
    pub fn drain(&self) -> Option<Action> {
        self.inbox.pop()
    }

    /// Pops every received action, oldest first.
    #[inline]
    pub fn drain_all(&self) -> Vec<Action> {
        self.inbox.pop_all()
    }

    /// Stops the receive thread and closes the socket. Idempotent.
    ///
    /// Actions already in the inbox stay drainable.
    pub fn close(&mut self) {
        self.connected.store(false, Ordering::Release);
        self.listener = None;
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        if let Some(handle) = self.receiver.take() {
            if handle.join().is_err() {
                tracing::warn!("receive thread panicked");
            }
        }
        if self.state != LinkState::Idle && self.state != LinkState::Closed {
            self.state = LinkState::Closed;
            tracing::info!("link closed");
        }
    }

    fn start(&mut self, stream: TcpStream, peer: SocketAddr) -> TransportResult<()> {
        let lost = |e: std::io::Error| TransportError::ConnectionLost(e.to_string());

        stream.set_nonblocking(false).map_err(lost)?;
        stream.set_nodelay(true).map_err(lost)?;
        stream
            .set_write_timeout(Some(self.config.poll_interval))
            .map_err(lost)?;
        let reader = stream.try_clone().map_err(lost)?;
        reader
            .set_read_timeout(Some(self.config.poll_interval))
            .map_err(lost)?;

        self.connected.store(true, Ordering::Release);

        let connected = Arc::clone(&self.connected);
        let inbox = Arc::clone(&self.inbox);
        let stats = Arc::clone(&self.stats);
        let max_frame_len = self.config.max_frame_len;

        let handle = thread::Builder::new()
            .name("miniclans-recv".to_string())
            .spawn(move || Self::receive_loop(reader, &connected, &inbox, &stats, max_frame_len))
            .map_err(|e| {
                self.connected.store(false, Ordering::Release);
                lost(e)
            })?;

        self.local_addr = stream.local_addr().ok().or(self.local_addr);
        self.peer_addr = Some(peer);
        self.stream = Some(stream);
        self.receiver = Some(handle);
        self.state = LinkState::Connected;
        tracing::info!(%peer, "peer connected");
        Ok(())
    }

    /// Receive thread main loop.
    fn receive_loop(
        mut stream: TcpStream,
        connected: &AtomicBool,
        inbox: &Inbox,
        stats: &Mutex<LinkStats>,
        max_frame_len: usize,
    ) {
        let mut framer = LineFramer::new(max_frame_len);
        let mut buf = [0u8; READ_CHUNK];

        while connected.load(Ordering::Acquire) {
            let n = match stream.read(&mut buf) {
                Ok(0) => {
                    if connected.load(Ordering::Acquire) {
                        tracing::info!("peer closed the connection");
                    }
                    break;
                }
                Ok(n) => n,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) =>
                {
                    continue;
                }
                Err(e) => {
                    if connected.load(Ordering::Acquire) {
                        tracing::warn!(error = %e, "connection lost");
                    }
                    break;
                }
            };

            framer.push(&buf[..n]);
            let (mut received, mut malformed) = (0u64, 0u64);
            while let Some(frame) = framer.next_frame() {
                match codec::decode(&frame) {
                    Ok(action) => {
                        tracing::debug!(action = action.name(), "action received");
                        inbox.push(action);
                        received += 1;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping malformed message");
                        malformed += 1;
                    }
                }
            }

            let mut s = stats.lock();
            s.bytes_received += n as u64;
            s.frames_received += received;
            s.malformed += malformed;
            s.oversized = framer.discarded();
        }

        connected.store(false, Ordering::Release);
    }
}

impl Default for PeerLink {
    fn default() -> Self {
        Self::new(LinkConfig::default())
    }
}

impl Drop for PeerLink {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for PeerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerLink")
            .field("state", &self.state())
            .field("local_addr", &self.local_addr)
            .field("peer_addr", &self.peer_addr)
            .field("queued", &self.inbox.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_link_is_idle() {
        let link = PeerLink::default();
        assert_eq!(link.state(), LinkState::Idle);
        assert!(!link.is_connected());
        assert!(link.drain().is_none());
        assert_eq!(link.stats(), LinkStats::default());
    }

    #[test]
    fn test_send_without_peer() {
        let mut link = PeerLink::default();
        assert_eq!(
            link.send(&Action::ReadyToAttack),
            Err(TransportError::NotConnected)
        );
    }

    #[test]
    fn test_host_binds_ephemeral_port() {
        let mut link = PeerLink::default();
        assert!(link.host("127.0.0.1:0"));
        assert_eq!(link.state(), LinkState::Listening);
        assert!(link.local_addr().is_some_and(|a| a.port() != 0));
        assert!(!link.poll_accept());

        assert_eq!(link.try_host("127.0.0.1:0"), Err(TransportError::AlreadyConnected));
        assert_eq!(link.try_join("127.0.0.1:1"), Err(TransportError::AlreadyConnected));

        link.close();
        assert_eq!(link.state(), LinkState::Closed);
    }

    #[test]
    fn test_join_refused_returns_to_idle() {
        // Grab a free port, then release it so nothing listens there.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let mut link = PeerLink::new(LinkConfig {
            connect_timeout: Duration::from_millis(300),
            ..LinkConfig::default()
        });
        assert!(!link.join(("127.0.0.1", port)));
        assert_eq!(link.state(), LinkState::Idle);
        assert!(!link.is_connected());
    }

    #[test]
    fn test_host_on_taken_port_fails() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();

        let mut link = PeerLink::default();
        assert!(matches!(link.try_host(addr), Err(TransportError::Bind { .. })));
        assert_eq!(link.state(), LinkState::Idle);
    }
}
