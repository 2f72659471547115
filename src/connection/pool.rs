//! Keyed socket pool with reuse and recovery.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::error::{PoolError, Result};
use crate::secure::SecureChannel;
use crate::transport::{Socket, SocketProvider};
use crate::types::{AddrInfo, ConnectionKey, SocketHandle};

use super::config::{AcquireOptions, PoolConfig};
use super::stats::PoolStats;

/// A socket owned by the pool.
struct ManagedSocket {
    socket: Box<dyn Socket>,
    key: ConnectionKey,
}

/// Why a single open/connect attempt failed.
enum AttemptFailure {
    /// The provider could not open a socket. Retryable.
    Open(io::Error),
    /// Timeout setup or connect failed; the socket was closed. Retryable.
    Connect(io::Error),
    /// The secure channel refused the socket. Not retryable.
    Wrap(PoolError),
}

/// Why [`ConnectionPool::connect_with_retry`] gave up.
enum RetryFailure {
    /// Attempts ran out, or there was nothing left to reclaim.
    Exhausted { attempts: u32, source: io::Error },
    /// A failure that retrying cannot fix.
    Fatal(PoolError),
}

/// Outcome of [`ConnectionPool::drain`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Drained {
    /// Sockets removed from the pool.
    pub closed: usize,
    /// Removed sockets whose underlying close failed.
    pub close_failures: usize,
}

impl Drained {
    /// Add another drain outcome to this one.
    pub fn merge(&mut self, other: Drained) {
        self.closed += other.closed;
        self.close_failures += other.close_failures;
    }
}

/// A pool of sockets keyed by destination and session.
///
/// The pool:
/// - hands out at most one socket per [`ConnectionKey`] at a time
/// - reuses a socket once it has been released
/// - drains free sockets to make room when opening a new one fails
///
/// Sockets are owned by the pool. Callers hold a [`SocketHandle`] and reach the
/// socket through [`socket_mut`](Self::socket_mut).
pub struct ConnectionPool<P: SocketProvider> {
    provider: Arc<P>,
    config: PoolConfig,
    by_key: HashMap<ConnectionKey, SocketHandle>,
    sockets: HashMap<SocketHandle, ManagedSocket>,
    free: HashSet<SocketHandle>,
    next_handle: u64,
    stats: PoolStats,
}

impl<P: SocketProvider> ConnectionPool<P> {
    /// Create a new pool over the given provider.
    pub fn new(provider: Arc<P>, config: PoolConfig) -> Self {
        Self {
            provider,
            config,
            by_key: HashMap::new(),
            sockets: HashMap::new(),
            free: HashSet::new(),
            next_handle: 1,
            stats: PoolStats::default(),
        }
    }

    /// Create a new pool with default configuration.
    pub fn with_defaults(provider: Arc<P>) -> Self {
        Self::new(provider, PoolConfig::default())
    }

    /// Get the provider this pool opens sockets with.
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Get the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Get pool statistics.
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Number of sockets marked free.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of open sockets, free or busy.
    pub fn managed_count(&self) -> usize {
        self.by_key.len()
    }

    /// Check if the handle refers to a socket tracked by this pool.
    pub fn contains(&self, handle: SocketHandle) -> bool {
        self.sockets.contains_key(&handle)
    }

    /// Check if the handle refers to a free socket.
    pub fn is_free(&self, handle: SocketHandle) -> bool {
        self.free.contains(&handle)
    }

    /// Get the key a socket is registered under.
    pub fn key_of(&self, handle: SocketHandle) -> Option<&ConnectionKey> {
        self.sockets.get(&handle).map(|m| &m.key)
    }

    /// Get the socket behind a handle.
    pub fn socket_mut(&mut self, handle: SocketHandle) -> Result<&mut dyn Socket> {
        match self.sockets.get_mut(&handle) {
            Some(managed) => {
                let socket: &mut dyn Socket = &mut *managed.socket;
                Ok(socket)
            }
            None => Err(PoolError::NotManaged(handle)),
        }
    }

    /// Get a connected socket for `scheme//host:port`.
    ///
    /// Returns the free socket registered under the same key if there is one.
    /// Otherwise resolves the address and opens a new socket, draining free
    /// sockets between failed attempts.
    ///
    /// # Errors
    ///
    /// - [`PoolError::ConnectionBusy`] if the key's socket is checked out
    /// - [`PoolError::Configuration`] if secure mode is on without a secure channel
    /// - [`PoolError::Resolution`] if address lookup fails
    /// - [`PoolError::UnsupportedSecureChannel`] if the secure channel refuses
    /// - [`PoolError::ConnectionFailed`], or [`PoolError::Io`] with
    ///   `preserve_cause`, once attempts are exhausted
    pub fn acquire(
        &mut self,
        host: &str,
        port: u16,
        scheme: &str,
        options: AcquireOptions<'_, P::Socket>,
    ) -> Result<SocketHandle> {
        let AcquireOptions {
            session_id,
            timeout,
            secure,
            secure_channel,
            preserve_cause,
        } = options;
        let key = ConnectionKey::new(host, port, scheme, session_id);

        if let Some(&handle) = self.by_key.get(&key) {
            if self.free.remove(&handle) {
                self.stats.record_reuse();
                tracing::debug!(%key, %handle, "reusing free socket");
                return Ok(handle);
            }
            return Err(PoolError::ConnectionBusy { key });
        }

        let secure = secure || key.is_secure_scheme();
        let channel = match (secure, secure_channel) {
            (false, _) => None,
            (true, Some(channel)) => Some(channel),
            (true, None) => {
                return Err(PoolError::configuration(
                    "a secure channel must be set before connecting securely",
                ));
            }
        };

        let addr = self.resolve(host, port)?;

        match self.connect_with_retry(&key, &addr, channel, timeout) {
            Ok(socket) => Ok(self.register(key, socket)),
            Err(RetryFailure::Fatal(e)) => Err(e),
            Err(RetryFailure::Exhausted { attempts, source }) => {
                tracing::warn!(%key, attempts, error = %source, "giving up on new socket");
                if preserve_cause {
                    Err(PoolError::Io(source))
                } else {
                    Err(PoolError::ConnectionFailed {
                        key,
                        attempts,
                        source,
                    })
                }
            }
        }
    }

    /// Mark a socket as free so a later acquire with the same key reuses it.
    pub fn release(&mut self, handle: SocketHandle) -> Result<()> {
        if !self.sockets.contains_key(&handle) {
            return Err(PoolError::NotManaged(handle));
        }
        self.free.insert(handle);
        self.stats.record_release();
        tracing::debug!(%handle, "socket released");
        Ok(())
    }

    /// Close a socket, free or busy, and forget it.
    ///
    /// The socket is removed from the pool before it is closed. A failed close
    /// is returned as [`PoolError::Close`] but the handle is gone either way.
    pub fn evict(&mut self, handle: SocketHandle) -> Result<()> {
        let ManagedSocket { mut socket, key } = self
            .sockets
            .remove(&handle)
            .ok_or(PoolError::NotManaged(handle))?;
        self.by_key.remove(&key);
        self.free.remove(&handle);

        match socket.close() {
            Ok(()) => {
                self.stats.record_close(true);
                tracing::debug!(%key, %handle, "socket closed");
                Ok(())
            }
            Err(source) => {
                self.stats.record_close(false);
                tracing::warn!(%key, %handle, error = %source, "failed to close socket");
                Err(PoolError::Close { handle, source })
            }
        }
    }

    /// Close every free socket, and with `force` every busy one as well.
    ///
    /// Close failures are logged and counted; they never stop the drain.
    pub fn drain(&mut self, force: bool) -> Drained {
        let mut targets: Vec<SocketHandle> = if force {
            self.sockets.keys().copied().collect()
        } else {
            self.free.iter().copied().collect()
        };
        targets.sort_unstable();

        let mut drained = Drained::default();
        for handle in targets {
            match self.evict(handle) {
                Ok(()) => drained.closed += 1,
                Err(PoolError::Close { .. }) => {
                    drained.closed += 1;
                    drained.close_failures += 1;
                }
                Err(_) => {}
            }
        }

        if drained.closed > 0 {
            tracing::info!(
                closed = drained.closed,
                close_failures = drained.close_failures,
                force,
                "drained pool"
            );
        }
        drained
    }

    fn resolve(&self, host: &str, port: u16) -> Result<AddrInfo> {
        let resolution_error = |source| PoolError::Resolution {
            host: host.to_string(),
            port,
            source,
        };
        self.provider
            .resolve(host, port)
            .map_err(resolution_error)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                resolution_error(io::Error::new(
                    io::ErrorKind::NotFound,
                    "no addresses found",
                ))
            })
    }

    fn register(&mut self, key: ConnectionKey, socket: Box<dyn Socket>) -> SocketHandle {
        let handle = SocketHandle(self.next_handle);
        self.next_handle += 1;

        tracing::debug!(%key, %handle, "registered new socket");
        self.by_key.insert(key.clone(), handle);
        self.sockets.insert(handle, ManagedSocket { socket, key });
        self.stats.record_open();
        handle
    }

    /// Run attempts until one connects, the policy is exhausted, or there is
    /// nothing left to reclaim.
    fn connect_with_retry(
        &mut self,
        key: &ConnectionKey,
        addr: &AddrInfo,
        channel: Option<&dyn SecureChannel<P::Socket>>,
        timeout: Option<Duration>,
    ) -> std::result::Result<Box<dyn Socket>, RetryFailure> {
        let policy = self.config.retry_policy.clone();
        let mut attempts = 0;

        loop {
            let failure = match self.attempt(key, addr, channel, timeout) {
                Ok(socket) => return Ok(socket),
                Err(failure) => failure,
            };
            attempts += 1;

            let last_error = match failure {
                AttemptFailure::Open(e) => {
                    self.stats.record_open_failure();
                    tracing::warn!(%key, attempt = attempts, error = %e, "failed to open socket");
                    e
                }
                AttemptFailure::Connect(e) => {
                    self.stats.record_connect_failure();
                    tracing::warn!(%key, attempt = attempts, error = %e, "failed to connect socket");
                    e
                }
                AttemptFailure::Wrap(e) => return Err(RetryFailure::Fatal(e)),
            };

            let exhausted = RetryFailure::Exhausted {
                attempts,
                source: last_error,
            };
            if !policy.allows_attempt(attempts) {
                return Err(exhausted);
            }
            if self.free.is_empty() {
                tracing::debug!(%key, "no free sockets to reclaim");
                return Err(exhausted);
            }

            self.drain(false);
            self.stats.record_recovery();

            let delay = policy.backoff.delay_for_retry(attempts - 1);
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
    }

    fn attempt(
        &self,
        key: &ConnectionKey,
        addr: &AddrInfo,
        channel: Option<&dyn SecureChannel<P::Socket>>,
        timeout: Option<Duration>,
    ) -> std::result::Result<Box<dyn Socket>, AttemptFailure> {
        let raw = self
            .provider
            .open(addr.family, addr.kind)
            .map_err(AttemptFailure::Open)?;

        // Secure sockets connect by name so the session can verify the server.
        let (mut socket, connect_host) = match channel {
            Some(channel) => (
                channel.wrap(raw, &key.host).map_err(AttemptFailure::Wrap)?,
                key.host.as_str(),
            ),
            None => (Box::new(raw) as Box<dyn Socket>, addr.host.as_str()),
        };

        let connected = socket
            .set_timeout(timeout)
            .and_then(|()| socket.connect(connect_host, key.port));
        if let Err(e) = connected {
            if let Err(close_err) = socket.close() {
                tracing::warn!(%key, error = %close_err, "failed to close unconnected socket");
            }
            return Err(AttemptFailure::Connect(e));
        }
        Ok(socket)
    }
}

impl<P: SocketProvider> std::fmt::Debug for ConnectionPool<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("managed", &self.managed_count())
            .field("free", &self.free_count())
            .field("config", &self.config)
            .finish()
    }
}

/// A [`ConnectionPool`] behind a single lock, for sharing between owners.
///
/// Every pool operation runs under the lock, so the reuse check in
/// [`acquire`](ConnectionPool::acquire) cannot hand one free socket to two
/// callers.
pub struct SharedPool<P: SocketProvider> {
    inner: Arc<Mutex<ConnectionPool<P>>>,
}

impl<P: SocketProvider> SharedPool<P> {
    /// Wrap a pool.
    pub fn new(pool: ConnectionPool<P>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    /// Lock the pool.
    pub fn lock(&self) -> MutexGuard<'_, ConnectionPool<P>> {
        self.inner.lock()
    }

    /// Check if two handles share the same pool.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<P: SocketProvider> Clone for SharedPool<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: SocketProvider> std::fmt::Debug for SharedPool<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_lock() {
            Some(pool) => std::fmt::Debug::fmt(&*pool, f),
            None => f.write_str("SharedPool { <locked> }"),
        }
    }
}
