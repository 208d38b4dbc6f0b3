//! The UDP endpoint and the two external collaborators it depends on:
//! hostname resolution and local-interface enumeration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::Error;

const RESOLVE_ATTEMPTS: u32 = 5;

/// A UDP endpoint with a settable remote address, blocking send, and
/// receive-with-timeout. One endpoint per discovery session; nothing else
/// touches the socket.
pub struct Transport {
    socket: UdpSocket,
    remote: SocketAddr,
}

impl Transport {
    /// Bind to any local port on any interface.
    pub fn bind() -> Result<Self, Error> {
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(Error::Socket)?;
        Ok(Self {
            socket,
            remote: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        self.socket.local_addr().map_err(Error::Socket)
    }

    pub fn set_remote(&mut self, remote: SocketAddr) {
        self.remote = remote;
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    /// Send one datagram to the current remote. Treated as non-blocking
    /// for an MTU-sized STUN datagram.
    pub fn send(&self, bytes: &[u8]) -> Result<(), Error> {
        self.socket.send_to(bytes, self.remote).map_err(Error::Socket)?;
        Ok(())
    }

    /// Wait up to `timeout` for one datagram from any source address — a
    /// Test II response may legitimately arrive from a different address
    /// than the one the request was sent to. Returns `Ok(None)` on
    /// timeout, never an error for that case.
    pub fn recv(&self, buf: &mut [u8], timeout: Duration) -> Result<Option<usize>, Error> {
        self.socket.set_read_timeout(Some(timeout)).map_err(Error::Socket)?;

        match self.socket.recv_from(buf) {
            Ok((n, _from)) => Ok(Some(n)),
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => Err(Error::Socket(e)),
        }
    }
}

/// Resolve `host` to its first IPv4 address, retrying transient failures
/// up to [`RESOLVE_ATTEMPTS`] times.
pub fn resolve_ipv4(host: &str) -> Result<Ipv4Addr, Error> {
    let mut last_err = None;

    for _ in 0..RESOLVE_ATTEMPTS {
        match (host, 0u16).to_socket_addrs() {
            Ok(addrs) => {
                if let Some(ip) = addrs.filter_map(|a| match a.ip() {
                    IpAddr::V4(ip) => Some(ip),
                    IpAddr::V6(_) => None,
                }).next() {
                    return Ok(ip);
                }

                last_err = Some(Error::NoIpv4Address);
            }
            Err(e) => last_err = Some(Error::Socket(e)),
        }
    }

    Err(last_err.unwrap_or(Error::NoIpv4Address))
}

/// Non-loopback IPv4 addresses of local interfaces.
pub fn local_ipv4_addresses() -> Result<Vec<Ipv4Addr>, Error> {
    let interfaces = get_if_addrs::get_if_addrs().map_err(Error::Socket)?;

    Ok(interfaces
        .into_iter()
        .filter(|it| !it.is_loopback())
        .filter_map(|it| match it.addr {
            get_if_addrs::IfAddr::V4(v4) => Some(v4.ip),
            get_if_addrs::IfAddr::V6(_) => None,
        })
        .collect())
}
