//! Circuit breaker guarding the AI service

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls flow
    Closed,
    /// Calls rejected until the cooldown elapses
    Open,
    /// One trial call allowed through; others rejected until it settles
    HalfOpen,
}

#[derive(Debug, Clone)]
struct BreakerEntry {
    state: BreakerState,
    consecutive_failures: usize,
    opened_at: Option<Instant>,
    trial_started: Option<Instant>,
}

impl Default for BreakerEntry {
    fn default() -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            trial_started: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: usize,
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

/// Per-operation breaker ("classify", "explain")
///
/// A poisoned lock is recovered rather than propagated: breaker state is
/// advisory and a stale count is harmless.
pub struct CircuitBreaker {
    entries: Mutex<HashMap<String, BreakerEntry>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn with_entry<R>(&self, operation: &str, f: impl FnOnce(&mut BreakerEntry) -> R) -> R {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = entries.entry(operation.to_string()).or_default();
        f(entry)
    }

    /// Whether calls for `operation` must be rejected right now.
    /// An open breaker whose cooldown elapsed moves to half-open and lets
    /// exactly one caller through as the trial.
    pub fn is_open(&self, operation: &str) -> bool {
        let reset_timeout = self.config.reset_timeout;
        self.with_entry(operation, |entry| match entry.state {
            BreakerState::Closed => false,
            BreakerState::HalfOpen => match entry.trial_started {
                // A trial dropped mid-flight is abandoned after one cooldown
                Some(started) if started.elapsed() < reset_timeout => true,
                _ => {
                    entry.trial_started = Some(Instant::now());
                    false
                }
            },
            BreakerState::Open => match entry.opened_at {
                Some(opened_at) if opened_at.elapsed() >= reset_timeout => {
                    entry.state = BreakerState::HalfOpen;
                    entry.trial_started = Some(Instant::now());
                    false
                }
                _ => true,
            },
        })
    }

    /// Give back a half-open trial whose outcome says nothing about the service
    pub fn release_trial(&self, operation: &str) {
        self.with_entry(operation, |entry| entry.trial_started = None);
    }

    pub fn mark_success(&self, operation: &str) {
        self.with_entry(operation, |entry| *entry = BreakerEntry::default());
    }

    pub fn mark_failure(&self, operation: &str) {
        let threshold = self.config.failure_threshold;
        self.with_entry(operation, |entry| {
            entry.consecutive_failures += 1;
            // A failed half-open trial reopens immediately
            if entry.state == BreakerState::HalfOpen || entry.consecutive_failures >= threshold {
                entry.state = BreakerState::Open;
                entry.opened_at = Some(Instant::now());
                entry.trial_started = None;
            }
        });
    }

    pub fn state(&self, operation: &str) -> BreakerState {
        self.with_entry(operation, |entry| entry.state)
    }

    pub fn failure_count(&self, operation: &str) -> usize {
        self.with_entry(operation, |entry| entry.consecutive_failures)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
