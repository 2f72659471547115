//! Core pool types and constants.

use std::net::IpAddr;
use std::time::Duration;

/// Scheme string for plain HTTP connections.
pub const SCHEME_HTTP: &str = "http:";

/// Scheme string that always forces secure mode.
pub const SCHEME_HTTPS: &str = "https:";

/// Timeout applied to new sockets unless the caller asks otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Handle to a socket owned by a [`ConnectionPool`](crate::connection::ConnectionPool).
///
/// Handles are never reused, so a handle to an evicted socket stays invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketHandle(pub u64);

impl std::fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// TLS mode understood by a network interface's non-standard connect call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TlsMode(pub u8);

impl std::fmt::Display for TlsMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Identifies one logical connection slot.
///
/// Two requests with the same key share a socket once it has been released.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    /// Destination host as given by the caller.
    pub host: String,
    /// Destination port.
    pub port: u16,
    /// Scheme, e.g. `"http:"` or `"https:"`.
    pub scheme: String,
    /// Optional session discriminator.
    pub session_id: Option<String>,
}

impl ConnectionKey {
    /// Create a new connection key.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        scheme: impl Into<String>,
        session_id: Option<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            scheme: scheme.into(),
            session_id,
        }
    }

    /// Check if the scheme alone forces secure mode.
    pub fn is_secure_scheme(&self) -> bool {
        self.scheme == SCHEME_HTTPS
    }
}

impl std::fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}//{}:{}", self.scheme, self.host, self.port)?;
        if let Some(session) = &self.session_id {
            write!(f, " (session {session})")?;
        }
        Ok(())
    }
}

/// Address family of a resolved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// IPv4.
    Inet,
    /// IPv6.
    Inet6,
}

impl AddressFamily {
    /// Get the family of an IP address.
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::Inet,
            IpAddr::V6(_) => Self::Inet6,
        }
    }
}

/// Socket type requested from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SocketKind {
    /// Connection-oriented byte stream (TCP).
    #[default]
    Stream,
    /// Datagrams (UDP).
    Datagram,
}

/// One candidate returned by address resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrInfo {
    /// Address family to open the socket with.
    pub family: AddressFamily,
    /// Socket type to open.
    pub kind: SocketKind,
    /// Resolved host, usually a numeric address.
    pub host: String,
    /// Resolved port.
    pub port: u16,
}

impl AddrInfo {
    /// Create a stream candidate for the given address.
    pub fn stream(family: AddressFamily, host: impl Into<String>, port: u16) -> Self {
        Self {
            family,
            kind: SocketKind::Stream,
            host: host.into(),
            port,
        }
    }
}
