//! Error types for socket pool operations.

use crate::types::{ConnectionKey, SocketHandle};
use std::io;
use thiserror::Error;

/// Errors that can occur while acquiring, releasing or closing pooled sockets.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The caller asked for something the pool cannot do as configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A socket for this exact key is already checked out.
    #[error("Socket already connected to {key}")]
    ConnectionBusy { key: ConnectionKey },

    /// The handle does not belong to a socket tracked by this pool.
    #[error("Socket not managed: {0}")]
    NotManaged(SocketHandle),

    /// Address lookup failed.
    #[error("Failed to resolve {host}:{port}: {source}")]
    Resolution {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Every attempt to open and connect a new socket failed.
    #[error("Error connecting socket: {source}")]
    ConnectionFailed {
        key: ConnectionKey,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    /// The network interface has no secure-mode capability.
    #[error("{0}")]
    UnsupportedSecureChannel(String),

    /// The registry has no pool for the given provider.
    #[error("Socket provider not managed")]
    UnknownProvider,

    /// Closing an evicted socket failed. The socket is no longer tracked.
    #[error("Error closing socket {handle}: {source}")]
    Close {
        handle: SocketHandle,
        #[source]
        source: io::Error,
    },

    /// Underlying I/O error, surfaced as-is.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;

/// Flat classification of [`PoolError`], for callers that only branch on the
/// failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    ConnectionBusy,
    NotManaged,
    Resolution,
    ConnectionFailed,
    UnsupportedSecureChannel,
    UnknownProvider,
    Close,
    Io,
}

impl PoolError {
    /// Create a new configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new unsupported secure channel error.
    pub fn unsupported_secure_channel(msg: impl Into<String>) -> Self {
        Self::UnsupportedSecureChannel(msg.into())
    }

    /// Get the failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::ConnectionBusy { .. } => ErrorKind::ConnectionBusy,
            Self::NotManaged(_) => ErrorKind::NotManaged,
            Self::Resolution { .. } => ErrorKind::Resolution,
            Self::ConnectionFailed { .. } => ErrorKind::ConnectionFailed,
            Self::UnsupportedSecureChannel(_) => ErrorKind::UnsupportedSecureChannel,
            Self::UnknownProvider => ErrorKind::UnknownProvider,
            Self::Close { .. } => ErrorKind::Close,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Check if retrying the same request later could succeed.
    ///
    /// Caller bugs (configuration, unmanaged handles, unknown providers) and
    /// missing capabilities are never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionBusy { .. } | Self::ConnectionFailed { .. } => true,
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::OutOfMemory
            ),
            _ => false,
        }
    }

    /// Get the underlying I/O error, if any.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::Resolution { source, .. }
            | Self::ConnectionFailed { source, .. }
            | Self::Close { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let key = ConnectionKey::new("example.com", 80, "http:", None);
        let err = PoolError::ConnectionBusy { key };
        assert_eq!(
            format!("{err}"),
            "Socket already connected to http://example.com:80"
        );

        let err = PoolError::ConnectionFailed {
            key: ConnectionKey::new("example.com", 80, "http:", None),
            attempts: 2,
            source: io::Error::new(io::ErrorKind::Other, "OSError"),
        };
        assert_eq!(format!("{err}"), "Error connecting socket: OSError");

        assert_eq!(
            format!("{}", PoolError::UnknownProvider),
            "Socket provider not managed"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "test");
        let err: PoolError = io_err.into();
        assert!(matches!(err, PoolError::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_retryable_classes() {
        assert!(!PoolError::configuration("no secure channel").is_retryable());
        assert!(!PoolError::NotManaged(SocketHandle(7)).is_retryable());
        assert!(!PoolError::UnknownProvider.is_retryable());
        assert!(
            !PoolError::Resolution {
                host: "nowhere.invalid".into(),
                port: 80,
                source: io::Error::new(io::ErrorKind::NotFound, "no such host"),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_io_error_accessor() {
        let err = PoolError::Close {
            handle: SocketHandle(3),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "gone"),
        };
        assert_eq!(err.io_error().map(|e| e.kind()), Some(io::ErrorKind::BrokenPipe));
        assert!(PoolError::UnknownProvider.io_error().is_none());
    }
}
