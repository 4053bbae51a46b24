//! Wallet provider boundary
//!
//! The wallet holds the keys and signs transactions on the user's behalf;
//! this client only ever asks it for account access. Most providers do not
//! implement a programmatic disconnect, so that path is best-effort.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::error::{RegistryError, Result};
use crate::ledger::transport::unwrap_rpc_envelope;

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Request account access; the first returned account is the primary one.
    async fn request_accounts(&self) -> Result<Vec<String>>;

    /// Provider-side disconnect. Implementations that do not support it
    /// return Ok(false); failures are for the caller to swallow.
    async fn disconnect(&self) -> Result<bool> {
        Ok(false)
    }
}

/// Wallet daemon reachable over JSON-RPC
pub struct JsonRpcWallet {
    rpc_url: String,
    http: Client,
}

impl JsonRpcWallet {
    pub fn new(rpc_url: String) -> Self {
        Self {
            rpc_url,
            http: Client::new(),
        }
    }

    async fn rpc_call(&self, method: &str) -> Result<Value> {
        let response = self
            .http
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": "certregistry-wallet",
                "method": method,
                "params": [],
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        unwrap_rpc_envelope(response)
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn request_accounts(&self) -> Result<Vec<String>> {
        let result = self.rpc_call("wallet_requestAccounts").await?;
        let accounts: Vec<String> = serde_json::from_value(result)
            .map_err(|err| RegistryError::remote(format!("malformed account list: {err}")))?;
        Ok(accounts)
    }

    async fn disconnect(&self) -> Result<bool> {
        // Not all wallet daemons expose this method; a reverted call is a
        // normal outcome here, not a failure of the disconnect flow.
        match self.rpc_call("wallet_disconnect").await {
            Ok(_) => Ok(true),
            Err(err) => {
                tracing::debug!(error = %err, "wallet provider does not support disconnect");
                Ok(false)
            }
        }
    }
}
