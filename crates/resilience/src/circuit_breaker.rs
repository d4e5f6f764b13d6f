//! Per-dependency circuit breaker.
//!
//! State transitions:
//! ```text
//! Closed ──(failures >= threshold)──► Open ──(reset timeout elapsed,
//!   ▲                                  ▲       next call attempt)──► HalfOpen
//!   │                                  └──────── probe fails ─────────┤
//!   └──────────────────────────────────────────── probe succeeds ─────┘
//! ```
//!
//! The Open → HalfOpen transition is lazy: it happens on the first call
//! attempted after the cool-down, never on a timer. While half-open exactly
//! one probe is in flight; everyone else is rejected as if the breaker were
//! still open.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{CircuitOpenError, ExecuteError};
use crate::timeout::with_timeout;

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through.
    #[default]
    Closed,

    /// Calls fail fast until the cool-down elapses.
    Open,

    /// A single probe call is testing the dependency.
    HalfOpen,
}

impl CircuitState {
    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }

    /// Numeric encoding used for the state gauge.
    pub fn gauge_value(&self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Called with `(name, from, to)` whenever the visible state changes.
pub type StateObserver = Arc<dyn Fn(&str, CircuitState, CircuitState) + Send + Sync>;

/// Called with `(name, deadline)` whenever a guarded call times out.
pub type TimeoutObserver = Arc<dyn Fn(&str, Duration) + Send + Sync>;

/// Breaker tuning.
#[derive(Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,
    /// Cool-down after the last failure before a probe is admitted.
    pub reset_timeout: Duration,
    /// Deadline applied to every guarded call.
    pub request_timeout: Duration,
    /// Optional state-change hook (logging/metrics only).
    pub on_state_change: Option<StateObserver>,
    /// Optional timeout hook (logging/metrics only).
    pub on_timeout: Option<TimeoutObserver>,
}

impl CircuitBreakerConfig {
    /// Creates a config with the given threshold and timings and no observers.
    pub fn new(failure_threshold: u32, reset_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
            request_timeout,
            on_state_change: None,
            on_timeout: None,
        }
    }

    /// Attaches a state-change observer.
    pub fn with_state_observer(mut self, observer: StateObserver) -> Self {
        self.on_state_change = Some(observer);
        self
    }

    /// Attaches a timeout observer.
    pub fn with_timeout_observer(mut self, observer: TimeoutObserver) -> Self {
        self.on_timeout = Some(observer);
        self
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60), Duration::from_secs(10))
    }
}

impl std::fmt::Debug for CircuitBreakerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerConfig")
            .field("failure_threshold", &self.failure_threshold)
            .field("reset_timeout", &self.reset_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("on_state_change", &self.on_state_change.is_some())
            .field("on_timeout", &self.on_timeout.is_some())
            .finish()
    }
}

/// Point-in-time view of a breaker for introspection endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    /// Milliseconds of cool-down left; zero unless open.
    pub remaining_reset_ms: u64,
}

#[derive(Debug, Default)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    /// Ticket of the probe currently admitted in half-open, if any.
    probe: Option<u64>,
    next_probe: u64,
}

/// How a call got past the gate; only probes may close or reopen a half-open breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    Probe(u64),
}

/// Failure-isolation state machine for one named dependency.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Creates a closed breaker for the named dependency.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        metrics::gauge!("circuit_breaker_state", "name" => name.clone())
            .set(CircuitState::Closed.gauge_value());
        Self {
            name,
            config,
            inner: Mutex::new(BreakerState::default()),
        }
    }

    /// Returns the dependency name this breaker guards.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the breaker's configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Returns the current visible state.
    ///
    /// An open breaker whose cool-down has elapsed still reports `Open`
    /// until the next call attempt moves it to `HalfOpen`.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Returns the current consecutive-failure count.
    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Returns a snapshot for introspection.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        let remaining = match inner.state {
            CircuitState::Open => self.remaining(&inner),
            _ => Duration::ZERO,
        };
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            remaining_reset_ms: u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Forces the breaker back to `Closed` with a zero failure count.
    pub fn reset(&self) {
        let previous = {
            let mut inner = self.lock();
            let previous = inner.state;
            inner.state = CircuitState::Closed;
            inner.consecutive_failures = 0;
            inner.last_failure_at = None;
            inner.probe = None;
            previous
        };
        tracing::info!(breaker = %self.name, "circuit breaker reset");
        self.notify(previous, CircuitState::Closed);
    }

    /// Runs `operation` through the breaker and the request timeout.
    ///
    /// Fails fast with [`ExecuteError::Open`] when the breaker does not admit
    /// the call. Otherwise the outcome (including a timeout) is recorded and
    /// the original error is handed back to the caller.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, ExecuteError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let admission = match self.admit() {
            Ok(admission) => admission,
            Err(err) => {
                metrics::counter!("circuit_breaker_rejections_total", "name" => self.name.clone())
                    .increment(1);
                tracing::debug!(breaker = %self.name, remaining_ms = err.remaining.as_millis() as u64, "call rejected");
                return Err(ExecuteError::Open(err));
            }
        };
        let mut guard = AdmissionGuard {
            breaker: self,
            admission,
            settled: false,
        };

        match with_timeout(operation(), self.config.request_timeout).await {
            Ok(Ok(value)) => {
                guard.settle(true);
                Ok(value)
            }
            Ok(Err(err)) => {
                guard.settle(false);
                Err(ExecuteError::Failed(err))
            }
            Err(timeout) => {
                metrics::counter!("circuit_breaker_timeouts_total", "name" => self.name.clone())
                    .increment(1);
                tracing::warn!(breaker = %self.name, timeout_ms = timeout.duration.as_millis() as u64, "guarded call timed out");
                if let Some(observer) = &self.config.on_timeout {
                    observer(&self.name, timeout.duration);
                }
                guard.settle(false);
                Err(ExecuteError::Timeout(timeout))
            }
        }
    }

    fn admit(&self) -> Result<Admission, CircuitOpenError> {
        let mut transition = None;
        let result = {
            let mut inner = self.lock();
            match inner.state {
                CircuitState::Closed => Ok(Admission::Normal),
                CircuitState::Open => {
                    let remaining = self.remaining(&inner);
                    if remaining.is_zero() {
                        inner.state = CircuitState::HalfOpen;
                        transition = Some((CircuitState::Open, CircuitState::HalfOpen));
                        Ok(Self::claim_probe(&mut inner))
                    } else {
                        Err(self.open_error(remaining))
                    }
                }
                CircuitState::HalfOpen => {
                    if inner.probe.is_some() {
                        Err(self.open_error(Duration::ZERO))
                    } else {
                        Ok(Self::claim_probe(&mut inner))
                    }
                }
            }
        };
        if let Some((from, to)) = transition {
            self.notify(from, to);
        }
        result
    }

    fn claim_probe(inner: &mut BreakerState) -> Admission {
        let ticket = inner.next_probe;
        inner.next_probe = inner.next_probe.wrapping_add(1);
        inner.probe = Some(ticket);
        Admission::Probe(ticket)
    }

    fn record_success(&self, admission: Admission) {
        let transition = {
            let mut inner = self.lock();
            match (admission, inner.state) {
                (Admission::Probe(ticket), CircuitState::HalfOpen) if inner.probe == Some(ticket) => {
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    inner.probe = None;
                    Some((CircuitState::HalfOpen, CircuitState::Closed))
                }
                (Admission::Normal, CircuitState::Closed) => {
                    inner.consecutive_failures = 0;
                    None
                }
                // Late results from calls admitted under an earlier state.
                _ => None,
            }
        };
        if let Some((from, to)) = transition {
            tracing::info!(breaker = %self.name, "probe succeeded, circuit closed");
            self.notify(from, to);
        }
    }

    fn record_failure(&self, admission: Admission) {
        let transition = {
            let mut inner = self.lock();
            match (admission, inner.state) {
                (Admission::Probe(ticket), CircuitState::HalfOpen) if inner.probe == Some(ticket) => {
                    inner.state = CircuitState::Open;
                    inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                    inner.last_failure_at = Some(Instant::now());
                    inner.probe = None;
                    Some((CircuitState::HalfOpen, CircuitState::Open))
                }
                (Admission::Normal, CircuitState::Closed) => {
                    inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                    inner.last_failure_at = Some(Instant::now());
                    if inner.consecutive_failures >= self.config.failure_threshold {
                        inner.state = CircuitState::Open;
                        Some((CircuitState::Closed, CircuitState::Open))
                    } else {
                        None
                    }
                }
                _ => None,
            }
        };
        if let Some((from, to)) = transition {
            tracing::warn!(
                breaker = %self.name,
                from = %from,
                reset_timeout_ms = self.config.reset_timeout.as_millis() as u64,
                "circuit opened"
            );
            self.notify(from, to);
        }
    }

    /// Gives a dropped probe's slot back so the next caller can probe.
    fn release_probe(&self, admission: Admission) {
        if let Admission::Probe(ticket) = admission {
            let mut inner = self.lock();
            if inner.probe == Some(ticket) {
                inner.probe = None;
            }
        }
    }

    fn remaining(&self, inner: &BreakerState) -> Duration {
        match inner.last_failure_at {
            Some(at) => self.config.reset_timeout.saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        }
    }

    fn open_error(&self, remaining: Duration) -> CircuitOpenError {
        CircuitOpenError {
            name: self.name.clone(),
            remaining,
        }
    }

    fn notify(&self, from: CircuitState, to: CircuitState) {
        if from == to {
            return;
        }
        metrics::gauge!("circuit_breaker_state", "name" => self.name.clone()).set(to.gauge_value());
        if let Some(observer) = &self.config.on_state_change {
            observer(&self.name, from, to);
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // State updates never panic mid-way, so a poisoned lock still holds consistent data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Records the call outcome, or frees the probe slot if the caller stopped awaiting.
struct AdmissionGuard<'a> {
    breaker: &'a CircuitBreaker,
    admission: Admission,
    settled: bool,
}

impl AdmissionGuard<'_> {
    fn settle(&mut self, success: bool) {
        self.settled = true;
        if success {
            self.breaker.record_success(self.admission);
        } else {
            self.breaker.record_failure(self.admission);
        }
    }
}

impl Drop for AdmissionGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.release_probe(self.admission);
        }
    }
}
