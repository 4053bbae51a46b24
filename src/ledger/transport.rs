//! JSON-RPC transport to the ledger node

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{RegistryError, Result};

/// Event emitted by a transaction, as reported in its receipt
#[derive(Debug, Deserialize, Clone)]
pub struct TxEvent {
    pub name: String,
    #[serde(default)]
    pub values: Vec<Value>,
}

/// Transaction receipt returned by a submitted write
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: String,
    #[serde(default = "default_status")]
    pub status: bool,
    #[serde(default)]
    pub events: Vec<TxEvent>,
}

fn default_status() -> bool {
    true
}

impl TxReceipt {
    pub fn event(&self, name: &str) -> Option<&TxEvent> {
        self.events.iter().find(|event| event.name == name)
    }
}

/// Read/write access to the deployed contract. View calls return the raw
/// positional tuple for the decoder layer; writes block until the node
/// reports a receipt. Timeouts and cancellation are the transport's concern,
/// not the client's.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    async fn call(&self, contract: &str, method: &str, args: Vec<Value>) -> Result<Value>;

    async fn submit(
        &self,
        contract: &str,
        from: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<TxReceipt>;
}

/// JSON-RPC 2.0 client over HTTP, one reused connection pool
pub struct JsonRpcLedger {
    rpc_url: String,
    http: Client,
}

impl JsonRpcLedger {
    pub fn new(rpc_url: String) -> Self {
        Self {
            rpc_url,
            http: Client::new(),
        }
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value> {
        let response = self
            .http
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": "certregistry",
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        unwrap_rpc_envelope(response)
    }
}

/// Pulls `result` out of a JSON-RPC response, preserving the node's error
/// message when the call reverted.
pub fn unwrap_rpc_envelope(response: Value) -> Result<Value> {
    if let Some(error) = response.get("error") {
        let message = error
            .pointer("/message")
            .and_then(|m| m.as_str())
            .unwrap_or("ledger call reverted")
            .to_string();
        return Err(RegistryError::RemoteCall { message });
    }

    response
        .get("result")
        .cloned()
        .ok_or_else(|| RegistryError::remote("missing result in RPC response"))
}

#[async_trait]
impl LedgerTransport for JsonRpcLedger {
    async fn call(&self, contract: &str, method: &str, args: Vec<Value>) -> Result<Value> {
        self.rpc_call(
            "registry_call",
            json!({
                "contract": contract,
                "method": method,
                "args": args,
            }),
        )
        .await
    }

    async fn submit(
        &self,
        contract: &str,
        from: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<TxReceipt> {
        let result = self
            .rpc_call(
                "registry_submit",
                json!({
                    "contract": contract,
                    "from": from,
                    "method": method,
                    "args": args,
                }),
            )
            .await?;

        serde_json::from_value(result)
            .map_err(|err| RegistryError::remote(format!("malformed receipt: {err}")))
    }
}
