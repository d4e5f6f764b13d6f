//! Application configuration loaded from environment variables.

use std::time::Duration;

use carriers::{CarrierSettings, DhlSettings, GlsSettings, PplSettings, RefreshPolicy};
use resilience::CircuitBreakerConfig;
use tracking::TrackingConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default `0.0.0.0:3000`)
/// - `RUST_LOG`: tracing filter directive (default `"info"`)
/// - `LOG_FORMAT`: `json` for JSON logs, anything else for human-readable
/// - `TRACKING_REFRESH_MINUTES`: per-record refresh frequency (default 60)
/// - `TRACKING_SWEEP_INTERVAL_SECS`: sweep period, `0` disables (default 900)
/// - `TRACKING_SWEEP_CONCURRENCY`: parallel refreshes per sweep (default 8)
/// - `CARRIER_REQUEST_TIMEOUT_MS`: per-request deadline (default 10000)
/// - `BREAKER_FAILURE_THRESHOLD`, `BREAKER_RESET_TIMEOUT_MS`: breaker tuning
/// - `PPL_API_URL`, `PPL_TOKEN_URL`, `PPL_CLIENT_ID`, `PPL_CLIENT_SECRET`
/// - `GLS_API_URL`
/// - `DHL_API_URL`, `DHL_API_KEY`
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub refresh_minutes: u64,
    pub sweep_interval: Duration,
    pub sweep_concurrency: usize,
    pub breaker_failure_threshold: u32,
    pub breaker_reset_timeout: Duration,
    pub carriers: CarrierSettings,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// missing or unparseable values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: text("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            log_level: text("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT").as_deref().map(str::trim) {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            refresh_minutes: parsed("TRACKING_REFRESH_MINUTES").unwrap_or(defaults.refresh_minutes),
            sweep_interval: parsed("TRACKING_SWEEP_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            sweep_concurrency: parsed("TRACKING_SWEEP_CONCURRENCY")
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(defaults.sweep_concurrency),
            breaker_failure_threshold: parsed("BREAKER_FAILURE_THRESHOLD")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(defaults.breaker_failure_threshold),
            breaker_reset_timeout: parsed("BREAKER_RESET_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.breaker_reset_timeout),
            carriers: CarrierSettings {
                request_timeout: parsed("CARRIER_REQUEST_TIMEOUT_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.carriers.request_timeout),
                ppl: PplSettings {
                    api_url: text("PPL_API_URL").unwrap_or(defaults.carriers.ppl.api_url),
                    token_url: text("PPL_TOKEN_URL").unwrap_or(defaults.carriers.ppl.token_url),
                    client_id: text("PPL_CLIENT_ID"),
                    client_secret: text("PPL_CLIENT_SECRET"),
                },
                gls: GlsSettings {
                    api_url: text("GLS_API_URL").unwrap_or(defaults.carriers.gls.api_url),
                },
                dhl: DhlSettings {
                    api_url: text("DHL_API_URL").unwrap_or(defaults.carriers.dhl.api_url),
                    api_key: text("DHL_API_KEY"),
                },
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy::from_minutes(self.refresh_minutes)
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new(
            self.breaker_failure_threshold,
            self.breaker_reset_timeout,
            self.carriers.request_timeout,
        )
    }

    pub fn tracking_config(&self) -> TrackingConfig {
        TrackingConfig::new(self.sweep_concurrency)
    }

    /// The sweep period, or `None` when sweeping is disabled.
    pub fn sweep_period(&self) -> Option<Duration> {
        (!self.sweep_interval.is_zero()).then_some(self.sweep_interval)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            refresh_minutes: 60,
            sweep_interval: Duration::from_secs(900),
            sweep_concurrency: tracking::config::DEFAULT_SWEEP_CONCURRENCY,
            breaker_failure_threshold: 5,
            breaker_reset_timeout: Duration::from_secs(60),
            carriers: CarrierSettings::default(),
        }
    }
}
