//! In-process doubles for exercising the client without a ledger node

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::ledger::decode::ContractRevision;
use crate::ledger::transport::{LedgerTransport, TxReceipt};
use crate::ledger::wallet::WalletProvider;

pub(crate) const TEACHER_ADDR: &str = "0x21BFB4fE43aD82e0c5480D8AD558CFa2F3E3f7E0";
pub(crate) const STUDENT_ADDR: &str = "0x1111111111111111111111111111111111111111";
pub(crate) const ZERO_ADDR: &str = "0x0000000000000000000000000000000000000000";

/// Scriptable transport that records every call. View stubs are keyed by
/// method plus exact argument list, with a method-only wildcard fallback.
#[derive(Default)]
pub(crate) struct MockTransport {
    views: Mutex<HashMap<String, Value>>,
    failing_views: Mutex<HashSet<String>>,
    receipt: Mutex<Option<TxReceipt>>,
    fail_submits: Mutex<bool>,
    pub(crate) view_log: Mutex<Vec<(String, Vec<Value>)>>,
    pub(crate) submit_log: Mutex<Vec<(String, Vec<Value>)>>,
}

impl MockTransport {
    pub(crate) fn stub(&self, method: &str, args: Value, result: Value) {
        self.views
            .lock()
            .unwrap()
            .insert(format!("{method}:{args}"), result);
    }

    pub(crate) fn stub_any(&self, method: &str, result: Value) {
        self.views
            .lock()
            .unwrap()
            .insert(method.to_string(), result);
    }

    pub(crate) fn fail_view(&self, method: &str, args: Value) {
        self.failing_views
            .lock()
            .unwrap()
            .insert(format!("{method}:{args}"));
    }

    pub(crate) fn stub_receipt(&self, receipt: TxReceipt) {
        *self.receipt.lock().unwrap() = Some(receipt);
    }

    pub(crate) fn fail_submits(&self) {
        *self.fail_submits.lock().unwrap() = true;
    }

    pub(crate) fn view_calls(&self, method: &str) -> usize {
        self.view_log
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    pub(crate) fn submit_calls(&self) -> usize {
        self.submit_log.lock().unwrap().len()
    }

    pub(crate) fn last_view_args(&self, method: &str) -> Option<Vec<Value>> {
        self.view_log
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .map(|(_, args)| args.clone())
    }
}

#[async_trait]
impl LedgerTransport for MockTransport {
    async fn call(&self, _contract: &str, method: &str, args: Vec<Value>) -> Result<Value> {
        self.view_log
            .lock()
            .unwrap()
            .push((method.to_string(), args.clone()));

        let keyed = format!("{method}:{}", Value::Array(args));
        if self.failing_views.lock().unwrap().contains(&keyed) {
            return Err(RegistryError::remote("stubbed view failure"));
        }

        let views = self.views.lock().unwrap();
        views
            .get(&keyed)
            .or_else(|| views.get(method))
            .cloned()
            .ok_or_else(|| RegistryError::remote(format!("no stub for {method}")))
    }

    async fn submit(
        &self,
        _contract: &str,
        _from: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<TxReceipt> {
        self.submit_log
            .lock()
            .unwrap()
            .push((method.to_string(), args));

        if *self.fail_submits.lock().unwrap() {
            return Err(RegistryError::remote("execution reverted: already verified"));
        }
        Ok(self.receipt.lock().unwrap().clone().unwrap_or(TxReceipt {
            transaction_hash: "0xfeed".to_string(),
            status: true,
            events: vec![],
        }))
    }
}

/// Wallet that always grants the same accounts
pub(crate) struct StaticWallet {
    pub(crate) accounts: Vec<String>,
}

#[async_trait]
impl WalletProvider for StaticWallet {
    async fn request_accounts(&self) -> Result<Vec<String>> {
        Ok(self.accounts.clone())
    }
}

pub(crate) fn test_config() -> RegistryConfig {
    RegistryConfig {
        ledger_rpc_url: "http://localhost:8545".to_string(),
        wallet_rpc_url: "http://localhost:8560".to_string(),
        contract_address: "0xcccccccccccccccccccccccccccccccccccccccc".to_string(),
        contract_revision: ContractRevision::R3,
        ipfs_api_token: None,
        ipfs_api_url: String::new(),
        poll_interval_seconds: 10,
        audit_window: 20,
    }
}
