//! Optional content-addressable metadata upload
//!
//! Configured as a capability: a working uploader when an API token is
//! present, a no-op otherwise. Issuance never blocks on upload failure.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};

#[async_trait]
pub trait MetadataUploader: Send + Sync {
    /// Upload a JSON metadata blob, returning its content hash.
    async fn upload(&self, metadata: &Value) -> Result<String>;
}

/// Pinning-service uploader (pinJSONToIPFS-style endpoint, bearer token)
pub struct IpfsUploader {
    api_url: String,
    token: String,
    http: Client,
}

impl IpfsUploader {
    pub fn new(api_url: String, token: String) -> Self {
        Self {
            api_url,
            token,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl MetadataUploader for IpfsUploader {
    async fn upload(&self, metadata: &Value) -> Result<String> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .json(metadata)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        response
            .pointer("/IpfsHash")
            .or_else(|| response.pointer("/Hash"))
            .and_then(|hash| hash.as_str())
            .map(ToString::to_string)
            .ok_or_else(|| RegistryError::remote("upload response carried no content hash"))
    }
}

/// Selected when no upload token is configured
pub struct NoopUploader;

#[async_trait]
impl MetadataUploader for NoopUploader {
    async fn upload(&self, _metadata: &Value) -> Result<String> {
        Ok(String::new())
    }
}

/// Capability selection happens once, at configuration time.
pub fn from_config(config: &RegistryConfig) -> Box<dyn MetadataUploader> {
    match &config.ipfs_api_token {
        Some(token) => {
            tracing::info!("metadata uploads enabled");
            Box::new(IpfsUploader::new(config.ipfs_api_url.clone(), token.clone()))
        }
        None => {
            tracing::info!("no upload token configured, certificates will carry an empty hash");
            Box::new(NoopUploader)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_uploader_returns_empty_hash() {
        let hash = NoopUploader
            .upload(&serde_json::json!({ "certificate": 1 }))
            .await
            .unwrap();
        assert_eq!(hash, "");
    }
}
