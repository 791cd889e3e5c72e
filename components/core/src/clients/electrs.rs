//! Electrs HTTP client (spec §6): transaction lookups used to confirm witness data and address
//! resolution for inscription transfers.

use config::ElectrsConfig;
use serde_json::Value;

#[derive(Clone)]
pub struct ElectrsClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ElectrsClient {
    pub fn new(config: &ElectrsConfig) -> ElectrsClient {
        ElectrsClient {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
        }
    }

    /// `GET /tx/{txid}`, returning the transaction JSON including `status.confirmed`,
    /// `vin[].witness`, `vin[].txid`, `vout[].scriptpubkey_address`.
    pub async fn get_tx(&self, txid: &str) -> Result<Value, String> {
        let url = format!("{}/tx/{txid}", self.endpoint);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("electrs get_tx({txid}): request failed: {e}"))?;
        if !response.status().is_success() {
            return Err(format!("electrs get_tx({txid}): http {}", response.status()));
        }
        response
            .json()
            .await
            .map_err(|e| format!("electrs get_tx({txid}): invalid response body: {e}"))
    }
}
