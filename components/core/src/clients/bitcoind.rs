//! Bitcoin node JSON-RPC client (spec §6): `getblockcount`, `getblockhash`, `getblock`,
//! `getrawtransaction`, all over HTTP basic auth.

use config::BitcoindConfig;
use serde_json::{json, Value};

#[derive(Clone)]
pub struct BitcoindClient {
    http: reqwest::Client,
    endpoint: String,
    username: String,
    password: String,
}

impl BitcoindClient {
    pub fn new(config: &BitcoindConfig) -> BitcoindClient {
        BitcoindClient {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, String> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": "orc20-core",
            "method": method,
            "params": params,
        });
        let response = self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("bitcoind {method}: request failed: {e}"))?;
        let payload: Value = response
            .json()
            .await
            .map_err(|e| format!("bitcoind {method}: invalid response body: {e}"))?;
        if let Some(error) = payload.get("error").filter(|e| !e.is_null()) {
            return Err(format!("bitcoind {method}: rpc error: {error}"));
        }
        payload
            .get("result")
            .cloned()
            .ok_or_else(|| format!("bitcoind {method}: response missing 'result'"))
    }

    pub async fn get_block_count(&self) -> Result<u64, String> {
        let result = self.call("getblockcount", json!([])).await?;
        result.as_u64().ok_or_else(|| "getblockcount: result is not an integer".to_string())
    }

    pub async fn get_block_hash(&self, height: u64) -> Result<Option<String>, String> {
        match self.call("getblockhash", json!([height])).await {
            Ok(v) => Ok(v.as_str().map(str::to_string)),
            // Bitcoin Core returns an RPC error for a height beyond the tip; treat as "not yet mined".
            Err(_) => Ok(None),
        }
    }

    pub async fn get_block(&self, hash: &str) -> Result<Value, String> {
        self.call("getblock", json!([hash, 1])).await
    }

    pub async fn get_raw_transaction(&self, txid: &str) -> Result<Value, String> {
        self.call("getrawtransaction", json!([txid, true])).await
    }
}
