//! Carrier error types.

use resilience::{CircuitOpenError, ExecuteError, TimeoutError};
use thiserror::Error;

/// Errors raised while talking to a carrier.
#[derive(Debug, Error)]
pub enum CarrierError {
    /// Credentials are missing or were refused. Needs an operator.
    #[error("{carrier} authentication failed: {reason}")]
    Auth { carrier: String, reason: String },

    /// The carrier's auth dependency is isolated by its circuit breaker.
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),

    /// The request exceeded its deadline.
    #[error("carrier request timed out: {0}")]
    Timeout(#[from] TimeoutError),

    /// Non-2xx status not covered by the explicit status mapping.
    #[error("{carrier} returned HTTP {status}")]
    Http { carrier: String, status: u16 },

    /// The request could not be sent or the body could not be read.
    #[error("{carrier} request failed: {source}")]
    Transport {
        carrier: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not match the carrier's schema.
    #[error("{carrier} response could not be decoded: {reason}")]
    Decode { carrier: String, reason: String },

    /// A token could not be obtained for a reason other than bad credentials.
    #[error("{carrier} access token unavailable: {reason}")]
    TokenUnavailable { carrier: String, reason: String },

    /// The shared HTTP client could not be constructed.
    #[error("HTTP client could not be built: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl CarrierError {
    /// Returns true if the failure must reach the caller instead of being
    /// absorbed into a degraded `unknown` result.
    pub fn propagates(&self) -> bool {
        matches!(self, CarrierError::Auth { .. } | CarrierError::CircuitOpen(_))
    }

    pub(crate) fn transport(carrier: &str, source: reqwest::Error) -> Self {
        CarrierError::Transport {
            carrier: carrier.to_string(),
            source,
        }
    }

    pub(crate) fn decode(carrier: &str, reason: impl ToString) -> Self {
        CarrierError::Decode {
            carrier: carrier.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Maps a breaker-guarded token acquisition failure.
    pub(crate) fn from_token_call(carrier: &str, err: ExecuteError<TokenError>) -> Self {
        match err {
            ExecuteError::Open(open) => CarrierError::CircuitOpen(open),
            ExecuteError::Timeout(timeout) => CarrierError::Timeout(timeout),
            ExecuteError::Failed(token) if token.is_credentials_error() => CarrierError::Auth {
                carrier: carrier.to_string(),
                reason: token.to_string(),
            },
            ExecuteError::Failed(token) => CarrierError::TokenUnavailable {
                carrier: carrier.to_string(),
                reason: token.to_string(),
            },
        }
    }
}

/// Errors raised while obtaining a carrier access token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// No client id/secret configured for the carrier.
    #[error("credentials for {0} are not configured")]
    CredentialsNotConfigured(String),

    /// The token endpoint refused the configured credentials.
    #[error("token endpoint for {carrier} rejected the credentials (HTTP {status})")]
    Rejected { carrier: String, status: u16 },

    /// The token endpoint could not be reached or answered with a server error.
    #[error("token request for {carrier} failed: {reason}")]
    Transport { carrier: String, reason: String },

    /// The token response was malformed.
    #[error("token response for {carrier} could not be decoded: {reason}")]
    Decode { carrier: String, reason: String },
}

impl TokenError {
    /// Returns true for failures only an operator can fix.
    pub fn is_credentials_error(&self) -> bool {
        matches!(
            self,
            TokenError::CredentialsNotConfigured(_) | TokenError::Rejected { .. }
        )
    }
}
