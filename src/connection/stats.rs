//! Pool statistics.

use std::time::Instant;

/// Counters describing what a pool has done since it was created.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of new sockets connected and registered.
    pub sockets_opened: u64,
    /// Number of acquires served from a free socket.
    pub sockets_reused: u64,
    /// Number of releases.
    pub sockets_released: u64,
    /// Number of sockets removed from the pool.
    pub sockets_closed: u64,
    /// Number of failed provider `open` calls.
    pub open_failures: u64,
    /// Number of failed connects (including timeout setup).
    pub connect_failures: u64,
    /// Number of times free sockets were drained to retry an acquire.
    pub recoveries: u64,
    /// Number of underlying close calls that failed.
    pub close_failures: u64,
    /// Time of the last open or connect failure.
    pub last_failure: Option<Instant>,
}

impl PoolStats {
    /// Record a newly registered socket.
    pub fn record_open(&mut self) {
        self.sockets_opened += 1;
    }

    /// Record a socket handed out again.
    pub fn record_reuse(&mut self) {
        self.sockets_reused += 1;
    }

    /// Record a socket marked free.
    pub fn record_release(&mut self) {
        self.sockets_released += 1;
    }

    /// Record a socket removed from the pool.
    pub fn record_close(&mut self, succeeded: bool) {
        self.sockets_closed += 1;
        if !succeeded {
            self.close_failures += 1;
        }
    }

    /// Record a failed provider open.
    pub fn record_open_failure(&mut self) {
        self.open_failures += 1;
        self.last_failure = Some(Instant::now());
    }

    /// Record a failed connect.
    pub fn record_connect_failure(&mut self) {
        self.connect_failures += 1;
        self.last_failure = Some(Instant::now());
    }

    /// Record a recovery drain.
    pub fn record_recovery(&mut self) {
        self.recoveries += 1;
    }

    /// Total failed attempts.
    pub fn failures(&self) -> u64 {
        self.open_failures + self.connect_failures
    }
}
