//! Socket capabilities consumed by the pool.
//!
//! The pool never creates sockets itself. It asks a [`SocketProvider`] to
//! resolve addresses and open raw sockets, and drives every socket through the
//! minimal blocking [`Socket`] surface. [`TcpProvider`] implements both over
//! the host operating system's network stack.

pub mod tcp;

pub use tcp::{TcpProvider, TcpSocket};

use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};

use crate::types::{AddrInfo, AddressFamily, SocketKind};

/// Blocking socket surface shared by raw and secure sockets.
pub trait Socket: Send {
    /// Connect to the given host and port.
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()>;

    /// Set the timeout for connect and subsequent I/O.
    ///
    /// `None` blocks indefinitely, `Some(Duration::ZERO)` makes the socket
    /// non-blocking.
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;

    /// Send bytes, returning how many were written.
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Receive into `buf`, returning how many bytes were read.
    fn recv_into(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Close the socket.
    fn close(&mut self) -> io::Result<()>;

    /// Receive up to `max` bytes.
    fn recv(&mut self, max: usize) -> io::Result<Bytes> {
        let mut buf = BytesMut::zeroed(max);
        let n = self.recv_into(&mut buf)?;
        buf.truncate(n);
        Ok(buf.freeze())
    }

    /// Send the whole buffer.
    fn send_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.send(buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "socket accepted no bytes",
                    ));
                }
                Ok(n) => buf = &buf[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<S: Socket + ?Sized> Socket for Box<S> {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        (**self).connect(host, port)
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        (**self).set_timeout(timeout)
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).send(buf)
    }

    fn recv_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).recv_into(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Creates raw sockets and resolves addresses.
pub trait SocketProvider: Send + Sync {
    /// Socket type produced by [`open`](Self::open).
    type Socket: Socket + 'static;

    /// Resolve `host:port` into stream candidates. Only the first one is used.
    fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<AddrInfo>>;

    /// Open an unconnected socket.
    fn open(&self, family: AddressFamily, kind: SocketKind) -> io::Result<Self::Socket>;
}
