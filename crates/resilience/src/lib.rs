//! Fault isolation for calls to flaky external dependencies.
//!
//! Every outbound call goes through two layers:
//!
//! ```text
//! caller ──► CircuitBreaker::execute ──► with_timeout ──► dependency
//!                 │ open: fail fast            │ deadline: TimeoutError
//! ```
//!
//! Breakers are keyed by dependency name and shared through a
//! [`BreakerRegistry`] built once by the application's composition root.

pub mod circuit_breaker;
pub mod error;
pub mod registry;
pub mod timeout;

pub use circuit_breaker::{
    BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState, StateObserver,
    TimeoutObserver,
};
pub use error::{CircuitOpenError, ExecuteError, TimeoutError};
pub use registry::BreakerRegistry;
pub use timeout::with_timeout;
