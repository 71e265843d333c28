use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::{collections::HashMap, sync::Arc, time::Duration};

#[cfg(test)]
use mockall::automock;

use crate::{
    account::{AccountRecord, RawTokenAccount},
    config::{MetadataConfig, Network},
    constant::DAS_MAX_BATCH_SIZE,
    error::ReclaimError,
    sanitize_error,
};

/// Turns raw accounts into records, attaching display name and image where known.
/// Lookup failures leave the metadata absent and never drop an account.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn enrich(&self, accounts: Vec<RawTokenAccount>, network: Network) -> Vec<AccountRecord>;
}

#[derive(Debug, Default, Clone)]
pub struct NoMetadata;

#[async_trait]
impl MetadataProvider for NoMetadata {
    async fn enrich(&self, accounts: Vec<RawTokenAccount>, _network: Network) -> Vec<AccountRecord> {
        accounts.iter().map(AccountRecord::from_raw).collect()
    }
}

pub fn metadata_provider_from_config(
    config: &MetadataConfig,
) -> Result<Arc<dyn MetadataProvider>, ReclaimError> {
    match &config.das_url {
        Some(url) => Ok(Arc::new(DasMetadataProvider::new(
            url,
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => Ok(Arc::new(NoMetadata)),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TokenMetadata {
    name: Option<String>,
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DasResponse {
    result: Option<Vec<Option<DasAsset>>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct DasAsset {
    id: String,
    content: Option<DasContent>,
}

#[derive(Debug, Deserialize)]
struct DasContent {
    metadata: Option<DasMetadata>,
    links: Option<DasLinks>,
    #[serde(default)]
    files: Vec<DasFile>,
}

#[derive(Debug, Deserialize)]
struct DasMetadata {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DasLinks {
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DasFile {
    uri: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl DasAsset {
    fn into_metadata(self) -> (String, TokenMetadata) {
        let Some(content) = self.content else {
            return (self.id, TokenMetadata::default());
        };

        let name = non_empty(content.metadata.and_then(|m| m.name));
        let image = non_empty(content.links.and_then(|l| l.image))
            .or_else(|| non_empty(content.files.into_iter().next().and_then(|f| f.uri)));

        (self.id, TokenMetadata { name, image })
    }
}

/// Resolves mint names and images through a DAS `getAssetBatch` endpoint
pub struct DasMetadataProvider {
    client: Client,
    url: String,
}

impl DasMetadataProvider {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ReclaimError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: url.to_string() })
    }

    async fn fetch_asset_batch(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, TokenMetadata>, ReclaimError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "reclaim",
            "method": "getAssetBatch",
            "params": { "ids": ids },
        });

        let response = self.client.post(&self.url).json(&body).send().await.map_err(|e| {
            ReclaimError::FetchError(format!("DAS request failed: {}", sanitize_error!(e)))
        })?;

        if !response.status().is_success() {
            return Err(ReclaimError::FetchError(format!("DAS error: {}", response.status())));
        }

        let das_response: DasResponse = response.json().await.map_err(|e| {
            ReclaimError::FetchError(format!("Failed to parse DAS response: {}", sanitize_error!(e)))
        })?;

        if let Some(error) = das_response.error {
            return Err(ReclaimError::FetchError(format!("DAS returned an error: {error}")));
        }

        Ok(das_response
            .result
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .map(DasAsset::into_metadata)
            .collect())
    }
}

#[async_trait]
impl MetadataProvider for DasMetadataProvider {
    async fn enrich(&self, accounts: Vec<RawTokenAccount>, network: Network) -> Vec<AccountRecord> {
        let mut mints: Vec<String> = Vec::new();
        for account in &accounts {
            let mint = account.mint.to_string();
            if !mints.contains(&mint) {
                mints.push(mint);
            }
        }

        let mut metadata = HashMap::new();
        for chunk in mints.chunks(DAS_MAX_BATCH_SIZE) {
            match self.fetch_asset_batch(chunk).await {
                Ok(found) => metadata.extend(found),
                Err(e) => {
                    log::warn!("Token metadata unavailable on {network} for {} mints: {e}", chunk.len())
                }
            }
        }

        accounts
            .iter()
            .map(|raw| {
                let mut record = AccountRecord::from_raw(raw);
                if let Some(found) = metadata.get(&raw.mint.to_string()) {
                    record.display_name = found.name.clone();
                    record.image_uri = found.image.clone();
                }
                record
            })
            .collect()
    }
}
