//! Apple platform dictionary service client. Availability is a capability
//! flag rather than an error: off-platform (non-macOS) deployments report
//! `is_available() == false` and the pipeline skips this provider rather
//! than treating it as a fetch failure.

use async_trait::async_trait;

use lexiscribe_core::{ProviderClient, ProviderFetchResult, ProviderTag, Result};

pub struct AppleDictionaryClient {
    platform_compatible: bool,
}

impl AppleDictionaryClient {
    pub fn new() -> Self {
        Self {
            platform_compatible: cfg!(target_os = "macos"),
        }
    }
}

impl Default for AppleDictionaryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderClient for AppleDictionaryClient {
    fn tag(&self) -> ProviderTag {
        ProviderTag::Apple
    }

    fn is_available(&self) -> bool {
        self.platform_compatible
    }

    async fn fetch(&self, _word: &str, _language: &str) -> Result<ProviderFetchResult> {
        if !self.platform_compatible {
            return Err(lexiscribe_core::Error::ServiceUnavailable {
                service: "apple_dictionary".to_string(),
            });
        }
        // No on-platform Dictionary Services binding is wired up in this
        // deployment target; treat every lookup as a soft miss rather than
        // fabricating data.
        Ok(ProviderFetchResult::NotFound)
    }
}
