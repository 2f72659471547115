//! Socket pooling.
//!
//! This module provides:
//! - A keyed pool that reuses released sockets and reclaims free ones when
//!   opening a new socket fails
//! - A registry holding one pool per socket provider
//! - Configuration for retries and per-request options
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sockpool_rs::connection::{AcquireOptions, ConnectionPool};
//! use sockpool_rs::transport::TcpProvider;
//! use sockpool_rs::types::SCHEME_HTTP;
//!
//! let mut pool = ConnectionPool::with_defaults(Arc::new(TcpProvider));
//!
//! let handle = pool
//!     .acquire("example.com", 80, SCHEME_HTTP, AcquireOptions::new())
//!     .unwrap();
//! pool.socket_mut(handle)
//!     .unwrap()
//!     .send_all(b"HEAD / HTTP/1.0\r\n\r\n")
//!     .unwrap();
//!
//! // Hand the socket back; the next acquire for the same key reuses it
//! pool.release(handle).unwrap();
//! ```
//!
//! # Registry
//!
//! ```no_run
//! use std::sync::Arc;
//! use sockpool_rs::connection::{PoolConfig, PoolRegistry};
//! use sockpool_rs::transport::TcpProvider;
//!
//! let provider = Arc::new(TcpProvider);
//! let mut registry = PoolRegistry::with_config(PoolConfig::default().with_max_attempts(3));
//!
//! let pool = registry.get_or_create(&provider);
//! assert!(pool.ptr_eq(&registry.get_or_create(&provider)));
//!
//! // Close everything and forget the pool
//! registry.close_all(Some(&provider), true).unwrap();
//! ```

mod config;
mod pool;
mod registry;
mod stats;

pub use config::{AcquireOptions, BackoffStrategy, PoolConfig, RetryPolicy, DEFAULT_MAX_ATTEMPTS};
pub use pool::{ConnectionPool, Drained, SharedPool};
pub use registry::PoolRegistry;
pub use stats::PoolStats;
