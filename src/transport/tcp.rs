//! TCP provider backed by the operating system's socket API.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, ToSocketAddrs};
use std::time::Duration;

use socket2::{Domain, Protocol, SockAddr, Type};

use crate::types::{AddrInfo, AddressFamily, SocketKind};

use super::{Socket, SocketProvider};

/// Socket provider for the host network stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProvider;

impl TcpProvider {
    /// Create a new provider.
    pub fn new() -> Self {
        Self
    }
}

impl SocketProvider for TcpProvider {
    type Socket = TcpSocket;

    fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<AddrInfo>> {
        let candidates = (host, port)
            .to_socket_addrs()?
            .map(|addr| {
                AddrInfo::stream(AddressFamily::of(&addr.ip()), addr.ip().to_string(), port)
            })
            .collect();
        Ok(candidates)
    }

    fn open(&self, family: AddressFamily, kind: SocketKind) -> io::Result<TcpSocket> {
        if kind != SocketKind::Stream {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "only stream sockets are supported",
            ));
        }
        TcpSocket::open(family)
    }
}

/// An OS TCP socket that is opened before it is connected.
#[derive(Debug)]
pub struct TcpSocket {
    family: AddressFamily,
    inner: Option<socket2::Socket>,
    timeout: Option<Duration>,
    peer_addr: Option<SocketAddr>,
}

impl TcpSocket {
    /// Open an unconnected TCP socket of the given family.
    pub fn open(family: AddressFamily) -> io::Result<Self> {
        let domain = match family {
            AddressFamily::Inet => Domain::IPV4,
            AddressFamily::Inet6 => Domain::IPV6,
        };
        let inner = socket2::Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
        Ok(Self {
            family,
            inner: Some(inner),
            timeout: None,
            peer_addr: None,
        })
    }

    /// Get the address family the socket was opened with.
    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Get the connected peer address.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Check if the socket has been connected and not closed.
    pub fn is_connected(&self) -> bool {
        self.inner.is_some() && self.peer_addr.is_some()
    }

    fn socket(&self) -> io::Result<&socket2::Socket> {
        self.inner
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "socket is closed"))
    }

    fn connected(&self) -> io::Result<&socket2::Socket> {
        if self.peer_addr.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "socket is not connected",
            ));
        }
        self.socket()
    }

    fn apply_timeout(&self) -> io::Result<()> {
        let socket = self.socket()?;
        match self.timeout {
            Some(d) if d.is_zero() => socket.set_nonblocking(true),
            timeout => {
                socket.set_nonblocking(false)?;
                socket.set_read_timeout(timeout)?;
                socket.set_write_timeout(timeout)
            }
        }
    }
}

impl Socket for TcpSocket {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        let family = self.family;
        let addr = (host, port)
            .to_socket_addrs()?
            .find(|addr| AddressFamily::of(&addr.ip()) == family)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("no {family:?} address for {host}:{port}"),
                )
            })?;

        let target = SockAddr::from(addr);
        let socket = self.socket()?;
        match self.timeout {
            Some(d) if !d.is_zero() => socket.connect_timeout(&target, d)?,
            _ => socket.connect(&target)?,
        }

        self.peer_addr = Some(addr);
        self.apply_timeout()
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.timeout = timeout;
        self.apply_timeout()
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.connected()?.send(buf)
    }

    fn recv_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut socket = self.connected()?;
        socket.read(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        let Some(socket) = self.inner.take() else {
            return Ok(());
        };
        if self.peer_addr.take().is_some() {
            match socket.shutdown(Shutdown::Both) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotConnected => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl Read for TcpSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv_into(buf)
    }
}

impl Write for TcpSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.send(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
