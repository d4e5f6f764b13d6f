//! Process-wide breaker registry keyed by dependency name.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig};

/// Shared map of named circuit breakers.
///
/// Call sites that guard the same dependency ask for the same name and so
/// share fault state. The registry lives as long as the composition root that
/// built it; there is no teardown.
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    default_config: CircuitBreakerConfig,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    /// Creates an empty registry whose breakers use `default_config`.
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self {
            default_config,
            breakers: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the config applied to breakers created without an explicit one.
    pub fn default_config(&self) -> &CircuitBreakerConfig {
        &self.default_config
    }

    /// Returns the breaker for `name`, creating it with the default config.
    pub fn get_or_create(&self, name: &str) -> Arc<CircuitBreaker> {
        self.get_or_create_with(name, || self.default_config.clone())
    }

    /// Returns the breaker for `name`, creating it from `config` if absent.
    ///
    /// `config` is only evaluated when the breaker does not exist yet.
    pub fn get_or_create_with<F>(&self, name: &str, config: F) -> Arc<CircuitBreaker>
    where
        F: FnOnce() -> CircuitBreakerConfig,
    {
        if let Some(breaker) = self.get(name) {
            return breaker;
        }
        let mut breakers = self.breakers.write().unwrap_or_else(PoisonError::into_inner);
        breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(breaker = name, "registering circuit breaker");
                Arc::new(CircuitBreaker::new(name, config()))
            })
            .clone()
    }

    /// Returns the breaker for `name` if one has been registered.
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Returns a snapshot of the named breaker.
    pub fn snapshot(&self, name: &str) -> Option<BreakerSnapshot> {
        self.get(name).map(|b| b.snapshot())
    }

    /// Returns snapshots of every registered breaker, sorted by name.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let breakers: Vec<Arc<CircuitBreaker>> = self
            .breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut snapshots: Vec<_> = breakers.iter().map(|b| b.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    /// Resets the named breaker. Returns false if it does not exist.
    pub fn reset(&self, name: &str) -> bool {
        match self.get(name) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::circuit_breaker::CircuitState;
    use crate::error::ExecuteError;

    #[test]
    fn test_same_name_shares_breaker() {
        let registry = BreakerRegistry::default();
        let a = registry.get_or_create("ppl-auth");
        let b = registry.get_or_create("ppl-auth");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.snapshots().len(), 1);
    }

    #[test]
    fn test_explicit_config_only_used_on_creation() {
        let registry = BreakerRegistry::default();
        let first = registry.get_or_create_with("dhl", || {
            CircuitBreakerConfig::new(2, Duration::from_secs(1), Duration::from_secs(1))
        });
        let second = registry.get_or_create_with("dhl", || {
            CircuitBreakerConfig::new(9, Duration::from_secs(9), Duration::from_secs(9))
        });
        assert_eq!(first.config().failure_threshold, 2);
        assert_eq!(second.config().failure_threshold, 2);
    }

    #[test]
    fn test_unknown_name() {
        let registry = BreakerRegistry::default();
        assert!(registry.get("missing").is_none());
        assert!(registry.snapshot("missing").is_none());
        assert!(!registry.reset("missing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_through_registry() {
        let registry = BreakerRegistry::new(CircuitBreakerConfig::new(
            1,
            Duration::from_secs(60),
            Duration::from_secs(1),
        ));
        let breaker = registry.get_or_create("gls");
        let _: Result<(), ExecuteError<&str>> = breaker.execute(|| async { Err("down") }).await;
        assert_eq!(
            registry.snapshot("gls").map(|s| s.state),
            Some(CircuitState::Open)
        );

        assert!(registry.reset("gls"));
        let snapshot = registry.snapshot("gls").unwrap();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.consecutive_failures, 0);
        assert_eq!(snapshot.remaining_reset_ms, 0);
    }

    #[test]
    fn test_snapshots_sorted() {
        let registry = BreakerRegistry::default();
        registry.get_or_create("ppl-auth");
        registry.get_or_create("dhl");
        let names: Vec<_> = registry.snapshots().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["dhl", "ppl-auth"]);
    }
}
