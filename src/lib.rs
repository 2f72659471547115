//! Keyed socket pooling over pluggable network providers.
//!
//! This crate manages reusable client sockets for code that talks to many
//! `host:port` endpoints through a network stack it does not own: the host
//! operating system, or an interface that offloads TCP and TLS.
//!
//! # Features
//!
//! - One socket per (host, port, scheme, session) key, reused after release
//! - Recovery from socket exhaustion by closing free sockets and retrying
//! - Pluggable [`SocketProvider`](transport::SocketProvider) and
//!   [`SecureChannel`](secure::SecureChannel) capabilities
//! - A registry holding one pool per provider
//! - Software TLS via rustls (feature `tls`)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sockpool_rs::{AcquireOptions, ConnectionPool, SCHEME_HTTP};
//! use sockpool_rs::transport::TcpProvider;
//!
//! let mut pool = ConnectionPool::with_defaults(Arc::new(TcpProvider));
//!
//! let handle = pool
//!     .acquire("example.com", 80, SCHEME_HTTP, AcquireOptions::new().with_session_id(1))
//!     .unwrap();
//!
//! let socket = pool.socket_mut(handle).unwrap();
//! socket.send_all(b"GET / HTTP/1.0\r\nHost: example.com\r\n\r\n").unwrap();
//! let response = socket.recv(1024).unwrap();
//! println!("Response: {:?}", response);
//!
//! pool.release(handle).unwrap();
//! ```
//!
//! # Socket Lifecycle
//!
//! ```text
//!             acquire (new)           release
//!   (none) ----------------> busy ------------> free
//!                             ^                  |
//!                             +------------------+
//!                               acquire (reuse)
//!
//!   evict / drain(force): busy|free -> closed
//!   drain:                free      -> closed
//! ```

pub mod connection;
pub mod error;
pub mod secure;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

// Re-export commonly used types at the crate root
pub use connection::{
    AcquireOptions, ConnectionPool, Drained, PoolConfig, PoolRegistry, PoolStats, RetryPolicy,
    SharedPool,
};
pub use error::{ErrorKind, PoolError, Result};
pub use types::{ConnectionKey, SocketHandle, TlsMode, DEFAULT_TIMEOUT, SCHEME_HTTP, SCHEME_HTTPS};
