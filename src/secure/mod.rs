//! Secure channel factories.
//!
//! A [`SecureChannel`] turns an unconnected raw socket into a socket whose
//! `connect` establishes a secure session with the named server. Two variants
//! ship with the crate:
//!
//! - [`ModeSecureChannel`] for network interfaces (co-processors, offload
//!   chips) that do TLS themselves and only need a mode flag on connect.
//! - `RustlsChannel` (feature `tls`) for hosts running TLS in software.

mod mode;
#[cfg(feature = "tls")]
mod tls;

pub use mode::{InterfaceFault, ModeConnect, ModeSecureChannel, ModeSocket, NetworkInterface};
#[cfg(feature = "tls")]
pub use tls::{RustlsChannel, TlsSocket};

use crate::error::Result;
use crate::transport::Socket;

/// Wraps raw sockets of type `S` for secure connections.
pub trait SecureChannel<S>: Send + Sync {
    /// Wrap an unconnected raw socket.
    ///
    /// `server_hostname` is the name the secure session is established for.
    /// On failure the implementation is responsible for closing `socket`.
    fn wrap(&self, socket: S, server_hostname: &str) -> Result<Box<dyn Socket>>;
}

/// Close a socket a channel refused to wrap. A failed close is logged.
pub(crate) fn close_refused<S: Socket>(mut socket: S) {
    if let Err(e) = socket.close() {
        tracing::warn!(error = %e, "failed to close socket after refused wrap");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockProvider, SocketScript};
    use crate::transport::SocketProvider;
    use crate::types::{AddressFamily, SocketKind};

    #[test]
    fn test_close_refused_tolerates_close_failure() {
        let provider = MockProvider::new();
        provider.push_socket(SocketScript::failing_close());
        provider.push_socket(SocketScript::default());

        let failing = provider.open(AddressFamily::Inet, SocketKind::Stream).unwrap();
        close_refused(failing);
        let healthy = provider.open(AddressFamily::Inet, SocketKind::Stream).unwrap();
        close_refused(healthy);

        assert_eq!(provider.probe(0).closes(), 1);
        assert_eq!(provider.probe(1).closes(), 1);
    }
}
