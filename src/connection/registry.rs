//! One pool per socket provider.

use std::sync::Arc;

use crate::error::{PoolError, Result};
use crate::secure::SecureChannel;
use crate::transport::SocketProvider;

use super::config::PoolConfig;
use super::pool::{ConnectionPool, Drained, SharedPool};

struct RegistryEntry<P: SocketProvider> {
    provider: Arc<P>,
    secure_channel: Option<Arc<dyn SecureChannel<P::Socket>>>,
    pool: SharedPool<P>,
}

/// Lookup from provider instance to its pool.
///
/// Providers are compared by identity, so two `Arc`s pointing at the same
/// provider share a pool while equal but distinct providers do not.
pub struct PoolRegistry<P: SocketProvider> {
    config: PoolConfig,
    entries: Vec<RegistryEntry<P>>,
}

impl<P: SocketProvider> Default for PoolRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: SocketProvider> PoolRegistry<P> {
    /// Create an empty registry whose pools use the default configuration.
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Create an empty registry whose pools use `config`.
    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
        }
    }

    /// Number of providers with a pool.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no provider has a pool.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if `provider` has a pool.
    pub fn contains(&self, provider: &Arc<P>) -> bool {
        self.position(provider).is_some()
    }

    /// Get the pool for `provider`, creating it on first use.
    pub fn get_or_create(&mut self, provider: &Arc<P>) -> SharedPool<P> {
        let index = self.entry_index(provider);
        self.entries[index].pool.clone()
    }

    /// Remember a secure channel for `provider`, replacing any previous one.
    pub fn register_secure_channel(
        &mut self,
        provider: &Arc<P>,
        channel: Arc<dyn SecureChannel<P::Socket>>,
    ) {
        let index = self.entry_index(provider);
        self.entries[index].secure_channel = Some(channel);
    }

    /// Get the secure channel registered for `provider`.
    pub fn secure_channel(&self, provider: &Arc<P>) -> Option<Arc<dyn SecureChannel<P::Socket>>> {
        self.position(provider)
            .and_then(|i| self.entries[i].secure_channel.clone())
    }

    /// Close every socket of one provider's pool, or of all pools.
    ///
    /// With `release_references` the affected entries are dropped, so the
    /// next [`get_or_create`](Self::get_or_create) builds a fresh pool and
    /// any registered secure channel is forgotten.
    ///
    /// # Errors
    ///
    /// [`PoolError::UnknownProvider`] if `provider` has no pool. Nothing is
    /// closed in that case.
    pub fn close_all(
        &mut self,
        provider: Option<&Arc<P>>,
        release_references: bool,
    ) -> Result<Drained> {
        let targets: Vec<usize> = match provider {
            Some(provider) => vec![self.position(provider).ok_or(PoolError::UnknownProvider)?],
            None => (0..self.entries.len()).collect(),
        };

        let mut drained = Drained::default();
        for &index in &targets {
            drained.merge(self.entries[index].pool.lock().drain(true));
        }

        if release_references {
            // Highest index first so earlier indices stay valid.
            for &index in targets.iter().rev() {
                self.entries.remove(index);
            }
        }

        tracing::debug!(
            pools = targets.len(),
            closed = drained.closed,
            release_references,
            "closed registry pools"
        );
        Ok(drained)
    }

    fn position(&self, provider: &Arc<P>) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| Arc::ptr_eq(&entry.provider, provider))
    }

    fn entry_index(&mut self, provider: &Arc<P>) -> usize {
        if let Some(index) = self.position(provider) {
            return index;
        }
        let pool = ConnectionPool::new(Arc::clone(provider), self.config.clone());
        self.entries.push(RegistryEntry {
            provider: Arc::clone(provider),
            secure_channel: None,
            pool: SharedPool::new(pool),
        });
        tracing::debug!(pools = self.entries.len(), "created pool for provider");
        self.entries.len() - 1
    }
}

impl<P: SocketProvider> std::fmt::Debug for PoolRegistry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("pools", &self.entries.len())
            .field("config", &self.config)
            .finish()
    }
}
