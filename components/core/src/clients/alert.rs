//! Alerting (spec §6A, grounded in `original_source/src/alert.py`): fires on reprocess/reorg-
//! restore failures and unrecoverable store errors. Delivery failures are logged at `warn` and
//! otherwise swallowed — alerting must never crash the indexer it is reporting on.

use config::{try_warn, AlertConfig, Context};
use serde_json::json;

#[derive(Clone)]
pub struct Alerter {
    http: reqwest::Client,
    config: AlertConfig,
}

impl Alerter {
    pub fn new(config: &AlertConfig) -> Alerter {
        Alerter {
            http: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    pub async fn fire(&self, ctx: &Context, message: &str) {
        if let Some(webhook_url) = &self.config.webhook_url {
            let body = json!({ "text": message });
            if let Err(e) = self.http.post(webhook_url).json(&body).send().await {
                try_warn!(ctx, "alert: webhook delivery failed: {e}");
            }
        }
        for token in &self.config.bark_tokens {
            let url = format!("https://api.day.app/{token}/{}", urlencode(message));
            if let Err(e) = self.http.get(&url).send().await {
                try_warn!(ctx, "alert: bark delivery failed: {e}");
            }
        }
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
