//! Circuit breaker state machine (spec §4.4.1), per endpoint identity.
//!
//! Shape grounded on the `CircuitBreaker`/`CircuitState` types in
//! `cooprefr-bettersys`'s failover controller (`Closed`/`Open`/`HalfOpen`,
//! `failures`/`successes` counters, `opened_at`), generalized from a
//! single `HashMap` guarded by one outer lock to a `DashMap` so each
//! endpoint's breaker is independently owned (spec §5: "Circuit-breaker
//! state: one per endpoint, modified only via its own mutex").

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub half_open_max_calls: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            half_open_max_calls: 3,
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failures: u32,
    half_open_successes: u32,
    half_open_probes_issued: u32,
    opened_at: Option<Instant>,
}

impl Default for BreakerState {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: 0,
            half_open_successes: 0,
            half_open_probes_issued: 0,
            opened_at: None,
        }
    }
}

/// One breaker per endpoint identity, keyed by a `DashMap` (spec §5:
/// breakers are independently owned, not behind one shared lock).
pub struct EndpointRegistry {
    config: BreakerConfig,
    breakers: DashMap<String, Arc<Mutex<BreakerState>>>,
}

impl EndpointRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    fn entry(&self, endpoint: &str) -> Arc<Mutex<BreakerState>> {
        self.breakers
            .entry(endpoint.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(BreakerState::default())))
            .clone()
    }

    /// Whether a call is currently allowed against `endpoint`.
    ///
    /// Transitions `Open` -> `HalfOpen` when `now >= opened_at + recoveryTimeout`
    /// (spec §4.4.1).
    pub fn allow(&self, endpoint: &str) -> Result<(), CoreError> {
        let cell = self.entry(endpoint);
        let mut state = cell.lock();

        if state.state == CircuitState::Open {
            let elapsed = state
                .opened_at
                .map(|t| t.elapsed())
                .unwrap_or(Duration::MAX);
            if elapsed >= self.config.recovery_timeout {
                state.state = CircuitState::HalfOpen;
                state.half_open_successes = 0;
                state.half_open_probes_issued = 0;
            } else {
                return Err(CoreError::CircuitOpen {
                    endpoint: endpoint.to_string(),
                });
            }
        }

        if state.state == CircuitState::HalfOpen {
            if state.half_open_probes_issued >= self.config.half_open_max_calls {
                return Err(CoreError::CircuitOpen {
                    endpoint: endpoint.to_string(),
                });
            }
            state.half_open_probes_issued += 1;
        }

        Ok(())
    }

    /// Record a successful call. In `HalfOpen`, M consecutive successes
    /// close the breaker (spec §4.4.1); in `Closed`, resets the failure
    /// counter.
    pub fn record_success(&self, endpoint: &str) {
        let cell = self.entry(endpoint);
        let mut state = cell.lock();
        match state.state {
            CircuitState::HalfOpen => {
                state.half_open_successes += 1;
                if state.half_open_successes >= self.config.half_open_max_calls {
                    state.state = CircuitState::Closed;
                    state.failures = 0;
                    state.half_open_successes = 0;
                    state.half_open_probes_issued = 0;
                    state.opened_at = None;
                }
            }
            CircuitState::Closed => {
                state.failures = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failing call. In `HalfOpen`, any failure reopens the
    /// breaker and resets `openUntil` (spec §4.4.1). In `Closed`, trips
    /// open once the failure counter reaches `failureThreshold`.
    pub fn record_failure(&self, endpoint: &str) {
        let cell = self.entry(endpoint);
        let mut state = cell.lock();
        match state.state {
            CircuitState::HalfOpen => {
                state.state = CircuitState::Open;
                state.opened_at = Some(Instant::now());
                state.half_open_successes = 0;
                state.half_open_probes_issued = 0;
            }
            CircuitState::Closed => {
                state.failures += 1;
                if state.failures >= self.config.failure_threshold {
                    state.state = CircuitState::Open;
                    state.opened_at = Some(Instant::now());
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn state_of(&self, endpoint: &str) -> CircuitState {
        self.entry(endpoint).lock().state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> BreakerConfig {
        BreakerConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_millis(20),
            half_open_max_calls: 2,
        }
    }

    #[test]
    fn closed_to_open_on_threshold() {
        let reg = EndpointRegistry::new(fast_config());
        for _ in 0..3 {
            reg.record_failure("ep1");
        }
        assert_eq!(reg.state_of("ep1"), CircuitState::Open);
        assert!(reg.allow("ep1").is_err());
    }

    #[test]
    fn open_to_half_open_after_timeout() {
        let reg = EndpointRegistry::new(fast_config());
        for _ in 0..3 {
            reg.record_failure("ep1");
        }
        std::thread::sleep(Duration::from_millis(30));
        assert!(reg.allow("ep1").is_ok());
        assert_eq!(reg.state_of("ep1"), CircuitState::HalfOpen);
    }

    #[test]
    fn half_open_closes_on_consecutive_successes() {
        let reg = EndpointRegistry::new(fast_config());
        for _ in 0..3 {
            reg.record_failure("ep1");
        }
        std::thread::sleep(Duration::from_millis(30));
        reg.allow("ep1").unwrap();
        reg.record_success("ep1");
        reg.allow("ep1").unwrap();
        reg.record_success("ep1");
        assert_eq!(reg.state_of("ep1"), CircuitState::Closed);
    }

    #[test]
    fn half_open_reopens_on_failure() {
        let reg = EndpointRegistry::new(fast_config());
        for _ in 0..3 {
            reg.record_failure("ep1");
        }
        std::thread::sleep(Duration::from_millis(30));
        reg.allow("ep1").unwrap();
        reg.record_failure("ep1");
        assert_eq!(reg.state_of("ep1"), CircuitState::Open);
    }

    #[test]
    fn independent_endpoints_do_not_interfere() {
        let reg = EndpointRegistry::new(fast_config());
        for _ in 0..3 {
            reg.record_failure("ep1");
        }
        assert_eq!(reg.state_of("ep1"), CircuitState::Open);
        assert_eq!(reg.state_of("ep2"), CircuitState::Closed);
        assert!(reg.allow("ep2").is_ok());
    }
}
