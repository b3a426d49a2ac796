//! Dictionary provider client contract.

use async_trait::async_trait;

use crate::word::{ProviderFetchResult, ProviderTag};
use crate::Result;

/// One external dictionary source. Implementations fail soft: an
/// unreachable or erroring upstream should be translated to
/// `Err(core::Error::UpstreamFailure)`, never a panic, and the pipeline
/// treats any `Err` the same as `NotFound` unless every configured provider
/// fails.
#[async_trait]
pub trait ProviderClient: Send + Sync + 'static {
    fn tag(&self) -> ProviderTag;

    /// Fetches and normalizes one headword's data. Implementations enforce
    /// their own per-provider requests-per-second limit internally (a token
    /// bucket keyed by nothing but the provider itself, since a provider
    /// client is a process-wide singleton).
    async fn fetch(&self, word: &str, language: &str) -> Result<ProviderFetchResult>;

    /// Whether this provider is usable in the current deployment (e.g. a
    /// platform-local dictionary service is a capability flag, not a
    /// reachability check).
    fn is_available(&self) -> bool {
        true
    }
}
