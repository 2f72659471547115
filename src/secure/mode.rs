//! Secure channel for interfaces that offload TLS.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::error::{PoolError, Result};
use crate::transport::Socket;
use crate::types::TlsMode;

use super::{close_refused, SecureChannel};

/// A network interface that may support an offloaded secure mode.
pub trait NetworkInterface {
    /// Interface name, used in logs.
    fn name(&self) -> &str;

    /// TLS mode to pass on connect, or `None` if the interface has no
    /// secure-mode capability.
    fn tls_mode(&self) -> Option<TlsMode>;
}

/// Failure reported by an interface-level connect.
#[derive(Error, Debug)]
pub enum InterfaceFault {
    /// Regular I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The interface ran out of internal resources (buffers, sockets).
    #[error("interface resources exhausted: {0}")]
    Exhausted(String),
}

impl From<InterfaceFault> for io::Error {
    fn from(fault: InterfaceFault) -> Self {
        match fault {
            InterfaceFault::Io(e) => e,
            exhausted => io::Error::new(io::ErrorKind::OutOfMemory, exhausted),
        }
    }
}

/// Raw socket whose interface accepts a secure mode on connect.
pub trait ModeConnect: Socket {
    /// Connect using the interface's non-standard mode parameter.
    fn connect_with_mode(
        &mut self,
        host: &str,
        port: u16,
        mode: TlsMode,
    ) -> std::result::Result<(), InterfaceFault>;
}

/// Secure channel that delegates TLS to the network interface.
#[derive(Debug, Clone)]
pub struct ModeSecureChannel {
    interface: String,
    tls_mode: Option<TlsMode>,
}

impl ModeSecureChannel {
    /// Create a channel for the given interface.
    pub fn for_interface<I: NetworkInterface + ?Sized>(interface: &I) -> Self {
        Self {
            interface: interface.name().to_string(),
            tls_mode: interface.tls_mode(),
        }
    }

    /// Create a channel from an explicit mode.
    pub fn new(interface: impl Into<String>, tls_mode: Option<TlsMode>) -> Self {
        Self {
            interface: interface.into(),
            tls_mode,
        }
    }

    /// Get the TLS mode, if the interface supports one.
    pub fn tls_mode(&self) -> Option<TlsMode> {
        self.tls_mode
    }

    /// Check if wrapping can succeed.
    pub fn is_supported(&self) -> bool {
        self.tls_mode.is_some()
    }
}

impl<S: ModeConnect + 'static> SecureChannel<S> for ModeSecureChannel {
    fn wrap(&self, socket: S, server_hostname: &str) -> Result<Box<dyn Socket>> {
        match self.tls_mode {
            Some(mode) => {
                tracing::trace!(
                    interface = %self.interface,
                    server = server_hostname,
                    %mode,
                    "wrapping socket in interface secure mode"
                );
                Ok(Box::new(ModeSocket::new(socket, mode)))
            }
            None => {
                close_refused(socket);
                Err(PoolError::unsupported_secure_channel(
                    "This interface does not support TLS/HTTPS",
                ))
            }
        }
    }
}

/// Socket adapter that connects in the interface's secure mode.
#[derive(Debug)]
pub struct ModeSocket<S> {
    socket: S,
    mode: TlsMode,
}

impl<S: ModeConnect> ModeSocket<S> {
    /// Wrap a raw socket.
    pub fn new(socket: S, mode: TlsMode) -> Self {
        Self { socket, mode }
    }

    /// Get the wrapped socket.
    pub fn get_ref(&self) -> &S {
        &self.socket
    }

    /// Get the mode used on connect.
    pub fn mode(&self) -> TlsMode {
        self.mode
    }
}

impl<S: ModeConnect> Socket for ModeSocket<S> {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        self.socket
            .connect_with_mode(host, port, self.mode)
            .map_err(io::Error::from)
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.socket.set_timeout(timeout)
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send(buf)
    }

    fn recv_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.recv_into(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        self.socket.close()
    }
}
