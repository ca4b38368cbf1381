//! Broadcast host discovery.
//!
//! The host advertises `{"host_ip": ...}` on the discovery port once per
//! interval; a joining client listens for a window and collects the
//! announced addresses in arrival order. In `local_test` mode the
//! announcements go to the loopback variant of the control port so two
//! processes can share one machine.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::wire::DiscoveryMsg;
use crate::{NetConfig, NetError};

/// The address this machine routes external traffic from, learned by
/// pointing a connectionless socket at a public address. No packet is
/// sent.
pub fn local_ip() -> io::Result<IpAddr> {
    let socket = UdpSocket::bind(("0.0.0.0", 0))?;
    socket.connect(("8.8.8.8", 80))?;
    Ok(socket.local_addr()?.ip())
}

pub(crate) fn would_block(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn interruptible_sleep(total: Duration, stop: &AtomicBool) {
    let mut remaining = total;
    while !stop.load(Ordering::Relaxed) && remaining > Duration::ZERO {
        let chunk = remaining.min(Duration::from_millis(50));
        thread::sleep(chunk);
        remaining = remaining.saturating_sub(chunk);
    }
}

// ---------------------------------------------------------------------------
// HostAnnouncer
// ---------------------------------------------------------------------------

/// Background thread advertising the host's address until stopped.
pub struct HostAnnouncer {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl HostAnnouncer {
    /// Start announcing `host_ip` on the configured cadence.
    pub fn start(config: &NetConfig, host_ip: IpAddr) -> Result<Self, NetError> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        let target: SocketAddr = if config.local_test {
            (Ipv4Addr::LOCALHOST, config.base_port + 1).into()
        } else {
            socket.set_broadcast(true)?;
            (Ipv4Addr::BROADCAST, config.base_port).into()
        };
        let message = serde_json::to_vec(&DiscoveryMsg {
            host_ip: host_ip.to_string(),
        })?;
        let interval = config.broadcast_interval;

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                if let Err(err) = socket.send_to(&message, target) {
                    warn!(%err, "host announcement failed");
                }
                interruptible_sleep(interval, &stop_flag);
            }
        });
        debug!(%host_ip, ?target, "announcing host");
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop announcing and wait for the thread to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for HostAnnouncer {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// discover_hosts
// ---------------------------------------------------------------------------

/// Listen on the discovery port for the configured window and return the
/// announced host addresses, deduplicated, in arrival order. An empty
/// result means no host is advertising.
pub fn discover_hosts(config: &NetConfig) -> Result<Vec<String>, NetError> {
    let socket = UdpSocket::bind(("0.0.0.0", config.discovery_port()))?;
    socket.set_read_timeout(Some(Duration::from_millis(200)))?;

    let deadline = Instant::now() + config.discovery_timeout;
    let mut hosts: Vec<String> = Vec::new();
    let mut buf = [0u8; 1024];

    while Instant::now() < deadline {
        match socket.recv_from(&mut buf) {
            Ok((len, from)) => match serde_json::from_slice::<DiscoveryMsg>(&buf[..len]) {
                Ok(msg) => {
                    if !hosts.contains(&msg.host_ip) {
                        debug!(host = %msg.host_ip, %from, "host discovered");
                        hosts.push(msg.host_ip);
                    }
                }
                Err(err) => warn!(%err, %from, "dropping malformed discovery datagram"),
            },
            Err(err) if would_block(&err) => continue,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(hosts)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
