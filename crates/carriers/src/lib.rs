//! Shipment tracking adapters for third-party carriers.
//!
//! Each adapter calls one carrier's tracking endpoint and maps its response
//! onto the shared [`domain::TrackingStatus`] model:
//!
//! ```text
//! carrier name ──► CarrierKind ──► adapter ──► HTTP (timeout-bound)
//!                                     │
//!                                     └─► phrase tables ──► NormalizedTracking
//! ```
//!
//! Carrier-side failures degrade to an `unknown` result instead of erroring,
//! except authentication failures on token-authenticated carriers, which
//! propagate so the auth circuit breaker and the caller both see them.

pub mod adapter;
pub mod dhl;
pub mod error;
pub mod generic;
pub mod gls;
pub mod http;
pub mod kind;
pub mod phrases;
pub mod policy;
pub mod ppl;
pub mod registry;
mod timestamp;
pub mod token;

pub use adapter::{AdapterResolver, TrackingAdapter};
pub use dhl::DhlAdapter;
pub use error::{CarrierError, TokenError};
pub use generic::GenericAdapter;
pub use http::CarrierHttp;
pub use gls::GlsAdapter;
pub use kind::CarrierKind;
pub use policy::RefreshPolicy;
pub use ppl::PplAdapter;
pub use registry::{CarrierRegistry, CarrierSettings, DhlSettings, GlsSettings, PplSettings};
pub use token::{
    AccessToken, CachedTokenProvider, ClientCredentialsSource, OAuthCredentials, TokenProvider,
    TokenSource,
};
