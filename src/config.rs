//! Environment-driven configuration

use std::env;

use crate::ledger::decode::ContractRevision;

const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 10;
const DEFAULT_AUDIT_WINDOW: u64 = 20;

#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// JSON-RPC endpoint of the ledger node
    pub ledger_rpc_url: String,
    /// JSON-RPC endpoint of the wallet provider
    pub wallet_rpc_url: String,
    /// Address of the deployed registry contract
    pub contract_address: String,
    /// Which tuple layout the deployed contract speaks
    pub contract_revision: ContractRevision,
    /// Bearer token for the metadata upload service; unset selects the no-op uploader
    pub ipfs_api_token: Option<String>,
    pub ipfs_api_url: String,
    pub poll_interval_seconds: u64,
    pub audit_window: u64,
}

impl RegistryConfig {
    pub fn from_env() -> Self {
        Self {
            ledger_rpc_url: env::var("LEDGER_RPC_URL")
                .unwrap_or_else(|_| "http://localhost:8545".to_string()),
            wallet_rpc_url: env::var("WALLET_RPC_URL")
                .unwrap_or_else(|_| "http://localhost:8560".to_string()),
            contract_address: env::var("REGISTRY_CONTRACT_ADDRESS")
                .unwrap_or_else(|_| "0x21BFB4fE43aD82e0c5480D8AD558CFa2F3E3f7E0".to_string()),
            contract_revision: env::var("REGISTRY_CONTRACT_REVISION")
                .ok()
                .and_then(|raw| ContractRevision::parse(&raw))
                .unwrap_or_default(),
            ipfs_api_token: env::var("IPFS_API_TOKEN").ok().filter(|t| !t.is_empty()),
            ipfs_api_url: env::var("IPFS_API_URL")
                .unwrap_or_else(|_| "https://api.pinata.cloud/pinning/pinJSONToIPFS".to_string()),
            poll_interval_seconds: env::var("DASHBOARD_POLL_SECONDS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS),
            audit_window: env::var("AUDIT_LOG_WINDOW")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(DEFAULT_AUDIT_WINDOW),
        }
    }
}
