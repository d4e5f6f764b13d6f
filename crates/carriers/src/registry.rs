//! Carrier settings and name-based adapter dispatch.

use std::sync::Arc;
use std::time::Duration;

use resilience::BreakerRegistry;

use crate::adapter::{AdapterResolver, TrackingAdapter};
use crate::dhl::DhlAdapter;
use crate::error::CarrierError;
use crate::generic::GenericAdapter;
use crate::gls::GlsAdapter;
use crate::http::CarrierHttp;
use crate::kind::CarrierKind;
use crate::policy::RefreshPolicy;
use crate::ppl::{PPL_AUTH_BREAKER, PplAdapter};
use crate::token::{OAuthCredentials, TokenProvider};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// PPL CPL API endpoints and OAuth2 client credentials.
#[derive(Debug, Clone)]
pub struct PplSettings {
    pub api_url: String,
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl PplSettings {
    pub fn credentials(&self) -> OAuthCredentials {
        OAuthCredentials {
            token_url: self.token_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            scope: None,
        }
    }
}

impl Default for PplSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.dhl.com/ecs/ppl/myapi2".to_string(),
            token_url: "https://api.dhl.com/ecs/ppl/myapi2/login/getAccessToken".to_string(),
            client_id: None,
            client_secret: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GlsSettings {
    pub api_url: String,
}

impl Default for GlsSettings {
    fn default() -> Self {
        Self {
            api_url: "https://gls-group.eu/app/service/open/rest/CZ/cs/rstt001".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct DhlSettings {
    pub api_url: String,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for DhlSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DhlSettings")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Default for DhlSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api-eu.dhl.com/track/shipments".to_string(),
            api_key: None,
        }
    }
}

/// Everything needed to build the carrier adapters.
#[derive(Debug, Clone)]
pub struct CarrierSettings {
    pub request_timeout: Duration,
    pub ppl: PplSettings,
    pub gls: GlsSettings,
    pub dhl: DhlSettings,
}

impl Default for CarrierSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            ppl: PplSettings::default(),
            gls: GlsSettings::default(),
            dhl: DhlSettings::default(),
        }
    }
}

/// Holds one adapter per integrated carrier and resolves carrier names to them.
pub struct CarrierRegistry {
    ppl: Arc<dyn TrackingAdapter>,
    gls: Arc<dyn TrackingAdapter>,
    dhl: Arc<dyn TrackingAdapter>,
    policy: RefreshPolicy,
}

impl CarrierRegistry {
    /// Builds the adapters. The PPL token breaker is taken from `breakers`
    /// so its state is visible to breaker administration.
    pub fn new(
        settings: &CarrierSettings,
        policy: RefreshPolicy,
        tokens: Arc<dyn TokenProvider>,
        breakers: &BreakerRegistry,
    ) -> Result<Self, CarrierError> {
        let http = CarrierHttp::new(settings.request_timeout)?;
        let auth_breaker = breakers.get_or_create(PPL_AUTH_BREAKER);

        Ok(Self {
            ppl: Arc::new(PplAdapter::new(
                settings.ppl.api_url.clone(),
                http.clone(),
                tokens,
                auth_breaker,
                policy,
            )),
            gls: Arc::new(GlsAdapter::new(
                settings.gls.api_url.clone(),
                http.clone(),
                policy,
            )),
            dhl: Arc::new(DhlAdapter::new(
                settings.dhl.api_url.clone(),
                settings.dhl.api_key.clone(),
                http,
                policy,
            )),
            policy,
        })
    }

    pub fn adapter_for(&self, kind: &CarrierKind) -> Arc<dyn TrackingAdapter> {
        match kind {
            CarrierKind::Ppl => Arc::clone(&self.ppl),
            CarrierKind::Gls => Arc::clone(&self.gls),
            CarrierKind::Dhl => Arc::clone(&self.dhl),
            CarrierKind::Generic(name) => Arc::new(GenericAdapter::new(name.clone(), self.policy)),
        }
    }
}

impl AdapterResolver for CarrierRegistry {
    fn resolve(&self, carrier: &str) -> Arc<dyn TrackingAdapter> {
        self.adapter_for(&CarrierKind::from_carrier_name(carrier))
    }
}
