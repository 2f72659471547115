//! Pool configuration and per-request options.

use std::time::Duration;

use crate::secure::SecureChannel;
use crate::types::DEFAULT_TIMEOUT;

/// Default upper bound on open/connect attempts per acquire.
///
/// This is a ceiling, not a count: see [`RetryPolicy`] for why an acquire
/// rarely gets past its second attempt.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Delay inserted before each retry attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Retry immediately.
    #[default]
    None,
    /// Fixed delay between attempts.
    Fixed(Duration),
    /// Linear backoff with configurable parameters.
    Linear {
        /// Delay before the first retry.
        initial: Duration,
        /// Increment per retry.
        increment: Duration,
        /// Maximum delay.
        max: Duration,
    },
}

impl BackoffStrategy {
    /// Calculate the delay before retry number `retry` (0-indexed).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        match self {
            BackoffStrategy::None => Duration::ZERO,
            BackoffStrategy::Fixed(d) => *d,
            BackoffStrategy::Linear {
                initial,
                increment,
                max,
            } => initial.saturating_add(increment.saturating_mul(retry)).min(*max),
        }
    }
}

/// Bound on attempts made by a single acquire.
///
/// A retry only happens when there are free sockets to reclaim, and the
/// first retry closes all of them. The pool is not shared across threads
/// while an acquire runs, so nothing can be released in between and every
/// later check finds the free set empty. In practice an acquire makes at most
/// two attempts; `max_attempts` caps that, and only the first
/// [`BackoffStrategy`] delay (retry 0) is ever slept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffStrategy::None,
        }
    }
}

impl RetryPolicy {
    /// Create a policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: BackoffStrategy::None,
        }
    }

    /// Create a policy with the given attempt bound and no delay.
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Set the backoff strategy.
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Effective attempt bound.
    pub fn attempt_limit(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Check if attempt number `attempt` (0-indexed) is allowed.
    pub fn allows_attempt(&self, attempt: u32) -> bool {
        attempt < self.attempt_limit()
    }
}

/// Connection pool configuration.
#[derive(Debug, Clone, Default)]
pub struct PoolConfig {
    /// Retry policy for opening new sockets.
    pub retry_policy: RetryPolicy,
}

impl PoolConfig {
    /// Set the retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set the maximum number of attempts per acquire.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry_policy.max_attempts = max_attempts;
        self
    }
}

/// Options for a single [`acquire`](super::ConnectionPool::acquire) call.
///
/// `S` is the provider's raw socket type.
pub struct AcquireOptions<'a, S> {
    /// Session discriminator for the connection key.
    pub session_id: Option<String>,
    /// Timeout applied to the new socket. `None` blocks.
    pub timeout: Option<Duration>,
    /// Force secure mode regardless of scheme.
    pub secure: bool,
    /// Factory used to wrap sockets in secure mode.
    pub secure_channel: Option<&'a dyn SecureChannel<S>>,
    /// Surface the original I/O error instead of a generic connection failure
    /// once retries are exhausted.
    pub preserve_cause: bool,
}

impl<S> Default for AcquireOptions<'_, S> {
    fn default() -> Self {
        Self {
            session_id: None,
            timeout: Some(DEFAULT_TIMEOUT),
            secure: false,
            secure_channel: None,
            preserve_cause: false,
        }
    }
}

impl<'a, S> AcquireOptions<'a, S> {
    /// Create options with defaults: no session, 1 s timeout, plain mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session id. Any displayable value is accepted, so `1` and
    /// `"1"` name the same session.
    pub fn with_session_id(mut self, session_id: impl ToString) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    /// Set the socket timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Make the socket fully blocking.
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Force secure mode.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the secure channel used when secure mode is on.
    pub fn with_secure_channel(mut self, channel: &'a dyn SecureChannel<S>) -> Self {
        self.secure_channel = Some(channel);
        self
    }

    /// Keep the original error when retries are exhausted.
    pub fn preserve_cause(mut self, preserve: bool) -> Self {
        self.preserve_cause = preserve;
        self
    }
}

impl<S> std::fmt::Debug for AcquireOptions<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquireOptions")
            .field("session_id", &self.session_id)
            .field("timeout", &self.timeout)
            .field("secure", &self.secure)
            .field("secure_channel", &self.secure_channel.is_some())
            .field("preserve_cause", &self.preserve_cause)
            .finish()
    }
}
