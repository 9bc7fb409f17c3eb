//! Platform status providers — one adapter per streaming platform.
//!
//! Every platform (bilibili, douyu, huya) implements [`StreamProvider`].
//! Providers share an injected [`Transport`] and never see each other or
//! the status cache; the aggregator resolves them through the
//! [`ProviderRegistry`].

use async_trait::async_trait;
use common::models::{Platform, StreamStatus};
use thiserror::Error;

pub mod bilibili;
pub mod douyu;
pub mod huya;
pub mod registry;
pub mod transport;

pub use registry::ProviderRegistry;
pub use transport::{HttpTransport, Transport, TransportConfig, TransportError};

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to decode {platform} response: {source}")]
    Decode {
        platform: Platform,
        #[source]
        source: serde_json::Error,
    },

    #[error("{platform} api error: {message}")]
    Api { platform: Platform, message: String },
}

impl ProviderError {
    pub(crate) fn decode(platform: Platform) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| ProviderError::Decode { platform, source }
    }
}

// ── Provider Trait ──────────────────────────────────────────────────

/// Fetches the current status of a channel from one platform.
///
/// Implementations must either return a complete status or an error, never a
/// partially filled one.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// The platform this provider serves.
    fn platform(&self) -> Platform;

    async fn fetch_status(&self, channel_id: &str) -> Result<StreamStatus, ProviderError>;
}

/// Current unix time in seconds, used to stamp freshly read statuses.
pub(crate) fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
