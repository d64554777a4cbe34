//! The channel: configuration plus a client, with one method per hub operation.
//!
//! Operation handlers live in their own modules as `impl DropshipChannel`
//! blocks; this module holds construction and the helpers they share.

use std::future::Future;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use iqmetrix_dropship_core::{Query, QueryDoc};
use serde_json::Value;

use crate::client::DropshipClient;
use crate::config::ChannelConfig;
use crate::error::ChannelError;

/// iQmetrix dropship channel.
#[derive(Clone)]
pub struct DropshipChannel {
    config: Arc<ChannelConfig>,
    client: DropshipClient,
}

impl DropshipChannel {
    /// Create a channel from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: ChannelConfig) -> Result<Self, ChannelError> {
        let config = Arc::new(config);
        let client = DropshipClient::new(Arc::clone(&config))?;
        Ok(Self { config, client })
    }

    /// Validate a channel profile document and create a channel from it.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::Config` if the profile is invalid.
    pub fn from_profile(profile: &Value) -> Result<Self, ChannelError> {
        Self::new(ChannelConfig::from_profile(profile)?)
    }

    #[must_use]
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    #[must_use]
    pub const fn client(&self) -> &DropshipClient {
        &self.client
    }

    /// Path under the configured company: `/v1/Companies({company}){rest}`.
    pub(crate) fn company_path(&self, rest: &str) -> String {
        format!("/v1/Companies({}){rest}", self.config.company_id)
    }

    /// Run `f` over `items` with bounded parallelism, keeping input order.
    ///
    /// Stops at the first error.
    pub(crate) async fn fan_out<I, F, Fut, T>(&self, items: I, f: F) -> Result<Vec<T>, ChannelError>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = Result<T, ChannelError>>,
    {
        stream::iter(items)
            .map(f)
            .buffered(self.config.max_concurrency.max(1))
            .try_collect()
            .await
    }
}

/// Parse and validate a query document.
pub(crate) fn parse_query(query_doc: &Value) -> Result<Query, ChannelError> {
    let doc: QueryDoc = serde_json::from_value(query_doc.clone())
        .map_err(|e| ChannelError::InvalidPayload(format!("Malformed query document: {e}")))?;
    Ok(doc.validate()?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::tests::config;
    use iqmetrix_dropship_core::QueryKind;
    use serde_json::json;

    #[test]
    fn test_company_path() {
        let channel = DropshipChannel::new(config()).unwrap();
        assert_eq!(channel.company_path("/Customers"), "/v1/Companies(13149)/Customers");
    }

    #[tokio::test]
    async fn test_fan_out_keeps_order() {
        let channel = DropshipChannel::new(config()).unwrap();
        let results = channel
            .fan_out(vec![3_u64, 1, 2], |n| async move {
                tokio::time::sleep(std::time::Duration::from_millis(n * 5)).await;
                Ok(n * 10)
            })
            .await
            .unwrap();
        assert_eq!(results, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn test_fan_out_stops_on_error() {
        let channel = DropshipChannel::new(config()).unwrap();
        let result: Result<Vec<u32>, _> = channel
            .fan_out(vec![1_u32, 2], |n| async move {
                if n == 2 {
                    Err(ChannelError::Lookup("boom".to_string()))
                } else {
                    Ok(n)
                }
            })
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_query() {
        let query = parse_query(&json!({"remoteIDs": ["1"]})).unwrap();
        assert!(matches!(query.kind, QueryKind::RemoteIds(_)));
        assert!(matches!(
            parse_query(&json!({"page": "x"})),
            Err(ChannelError::InvalidPayload(_))
        ));
        assert!(matches!(parse_query(&json!({})), Err(ChannelError::Query(_))));
    }
}
