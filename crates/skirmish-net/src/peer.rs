//! The connected peer pair: handshake, clock offset, and the game-data
//! channel.
//!
//! The host announces itself and waits for one connect request on the
//! control port; its reply carries `host_time`, which becomes both the
//! client's clock reference and the shared game-start instant. After the
//! handshake each side opens its game-data socket (host on base+10,
//! client on base+11) and a background receiver thread starts feeding
//! parsed datagrams into an mpsc inbox.
//!
//! Transport errors on the game channel are swallowed with a warning to
//! keep the game alive; the receiver thread only exits on socket close
//! or peer shutdown, which is terminal for the whole process.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::clock::{self, SyncedClock};
use crate::discovery::{self, would_block, HostAnnouncer};
use crate::wire::{
    ConnectReply, ConnectRequest, EventMsg, GameDatagram, STATUS_CONNECTED,
};
use crate::{NetConfig, NetError};

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Which end of the pair this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Announces, accepts the handshake, owns the authoritative clock.
    Host,
    /// Discovers, initiates the handshake, runs on an offset clock.
    Client,
}

// ---------------------------------------------------------------------------
// Peer
// ---------------------------------------------------------------------------

/// A connected endpoint: synced clock, game-data socket, and the inbox
/// fed by the background receiver.
pub struct Peer {
    clock: SyncedClock,
    socket: UdpSocket,
    peer_addr: SocketAddr,
    /// The handshake's `host_time`: the shared game-start instant.
    game_start: f64,
    inbox: mpsc::Receiver<GameDatagram>,
    stop: Arc<AtomicBool>,
    receiver: Option<JoinHandle<()>>,
}

impl Peer {
    /// Announce, wait for one client, reply with the authoritative
    /// `host_time`, and open the game channel.
    ///
    /// # Errors
    ///
    /// [`NetError::ConnectionTimeout`] when no client connects within
    /// the handshake window.
    pub fn host(config: &NetConfig) -> Result<Self, NetError> {
        let host_ip = if config.local_test {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            discovery::local_ip()?
        };
        let mut announcer = HostAnnouncer::start(config, host_ip)?;

        let control = UdpSocket::bind((host_ip, config.control_port()))?;
        control.set_read_timeout(Some(Duration::from_millis(200)))?;
        let deadline = Instant::now() + config.handshake_timeout;
        let mut buf = [0u8; 1024];

        let (peer_ip, game_start) = loop {
            if Instant::now() >= deadline {
                announcer.stop();
                return Err(NetError::ConnectionTimeout);
            }
            match control.recv_from(&mut buf) {
                Ok((len, from)) => match serde_json::from_slice::<ConnectRequest>(&buf[..len]) {
                    Ok(request) if request.is_connect() => {
                        let host_time = clock::unix_now();
                        let reply = ConnectReply {
                            status: STATUS_CONNECTED.to_owned(),
                            host_time,
                        };
                        control.send_to(&serde_json::to_vec(&reply)?, from)?;
                        info!(client = %from, "client connected");
                        break (from.ip(), host_time);
                    }
                    Ok(request) => {
                        warn!(%from, request = %request.request, "ignoring unknown control request");
                    }
                    Err(err) => warn!(%err, %from, "dropping malformed control datagram"),
                },
                Err(err) if would_block(&err) => continue,
                Err(err) => {
                    announcer.stop();
                    return Err(err.into());
                }
            }
        };
        announcer.stop();

        Self::open_game_channel(config, Role::Host, peer_ip, SyncedClock::host(), game_start)
    }

    /// Discover an advertising host and connect to the first one found.
    pub fn client(config: &NetConfig) -> Result<Self, NetError> {
        let hosts = discovery::discover_hosts(config)?;
        let host = hosts.into_iter().next().ok_or(NetError::NoHostFound)?;
        Self::connect(config, &host)
    }

    /// Handshake with a known host address and open the game channel.
    pub fn connect(config: &NetConfig, host: &str) -> Result<Self, NetError> {
        let host_ip: IpAddr = host.parse().map_err(|_| {
            NetError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("announced host address {host:?} is not an IP"),
            ))
        })?;

        let control = UdpSocket::bind(("0.0.0.0", 0))?;
        control.set_read_timeout(Some(config.handshake_timeout))?;

        let request = serde_json::to_vec(&ConnectRequest::new())?;
        let t1 = clock::unix_now();
        control.send_to(&request, (host_ip, config.control_port()))?;

        let mut buf = [0u8; 1024];
        let (len, _) = control.recv_from(&mut buf).map_err(|err| {
            if would_block(&err) {
                NetError::ConnectionTimeout
            } else {
                err.into()
            }
        })?;
        let t3 = clock::unix_now();

        let reply: ConnectReply = serde_json::from_slice(&buf[..len])?;
        if reply.status != STATUS_CONNECTED {
            return Err(NetError::HandshakeRejected {
                status: reply.status,
            });
        }
        let offset = clock::offset_from_handshake(t1, reply.host_time, t3);
        info!(host, offset, rtt = t3 - t1, "connected to host");

        Self::open_game_channel(
            config,
            Role::Client,
            host_ip,
            SyncedClock::with_offset(offset),
            reply.host_time,
        )
    }

    fn open_game_channel(
        config: &NetConfig,
        role: Role,
        peer_ip: IpAddr,
        clock: SyncedClock,
        game_start: f64,
    ) -> Result<Self, NetError> {
        let (local_port, remote_port) = match role {
            Role::Host => (config.host_data_port(), config.client_data_port()),
            Role::Client => (config.client_data_port(), config.host_data_port()),
        };
        let socket = UdpSocket::bind(("0.0.0.0", local_port))?;
        let peer_addr = SocketAddr::new(peer_ip, remote_port);

        let reader = socket.try_clone()?;
        reader.set_read_timeout(Some(Duration::from_millis(100)))?;
        let (tx, inbox) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let receiver = thread::spawn(move || receive_loop(reader, tx, stop_flag));

        Ok(Self {
            clock,
            socket,
            peer_addr,
            game_start,
            inbox,
            stop,
            receiver: Some(receiver),
        })
    }

    /// Wrap an event message in a send-time envelope and fire it at the
    /// peer.
    pub fn send_event(&self, message: EventMsg) -> Result<(), NetError> {
        let datagram = GameDatagram {
            timestamp: self.clock.now(),
            data: message,
        };
        let bytes = serde_json::to_vec(&datagram)?;
        self.socket.send_to(&bytes, self.peer_addr)?;
        Ok(())
    }

    /// Pop the next received datagram, if any. Non-blocking; the game
    /// loop drains this once per frame.
    pub fn try_recv(&self) -> Option<GameDatagram> {
        self.inbox.try_recv().ok()
    }

    /// The negotiated clock.
    pub fn clock(&self) -> &SyncedClock {
        &self.clock
    }

    /// The shared game-start instant (the handshake's `host_time`).
    pub fn game_start(&self) -> f64 {
        self.game_start
    }

    /// Where game datagrams are sent.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl Drop for Peer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.receiver.take() {
            let _ = handle.join();
        }
    }
}

/// Receiver thread body: parse datagrams into the inbox, drop the
/// malformed ones, exit on shutdown or socket loss.
fn receive_loop(socket: UdpSocket, tx: mpsc::Sender<GameDatagram>, stop: Arc<AtomicBool>) {
    let mut buf = [0u8; 2048];
    while !stop.load(Ordering::Relaxed) {
        match socket.recv_from(&mut buf) {
            Ok((len, from)) => match serde_json::from_slice::<GameDatagram>(&buf[..len]) {
                Ok(datagram) => {
                    if tx.send(datagram).is_err() {
                        break;
                    }
                }
                Err(err) => warn!(%err, %from, "dropping malformed game datagram"),
            },
            Err(err) if would_block(&err) => continue,
            Err(err) => {
                if !stop.load(Ordering::Relaxed) {
                    warn!(%err, "game socket closed; receiver exiting");
                }
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
