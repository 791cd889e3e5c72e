//! Ord content HTTP client (spec §6): fetches an inscription's raw content when the upstream
//! store hasn't cached it yet, and block metadata for the Producer's reorg check.

use config::OrdConfig;
use serde_json::Value;

#[derive(Clone)]
pub struct OrdClient {
    http: reqwest::Client,
    endpoint: String,
}

impl OrdClient {
    pub fn new(config: &OrdConfig) -> OrdClient {
        OrdClient {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
        }
    }

    /// `GET /content/{inscription_id}`, returning the raw inscription body.
    pub async fn get_content(&self, inscription_id: &str) -> Result<Vec<u8>, String> {
        let url = format!("{}/content/{inscription_id}", self.endpoint);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("ord get_content({inscription_id}): request failed: {e}"))?;
        if !response.status().is_success() {
            return Err(format!("ord get_content({inscription_id}): http {}", response.status()));
        }
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| format!("ord get_content({inscription_id}): failed to read body: {e}"))
    }

    /// `GET /block/{height}`, returning block metadata.
    pub async fn get_block(&self, height: u64) -> Result<Value, String> {
        let url = format!("{}/block/{height}", self.endpoint);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("ord get_block({height}): request failed: {e}"))?;
        if !response.status().is_success() {
            return Err(format!("ord get_block({height}): http {}", response.status()));
        }
        response
            .json()
            .await
            .map_err(|e| format!("ord get_block({height}): invalid response body: {e}"))
    }
}
