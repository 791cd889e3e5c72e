//! Redis `current_block` cache (spec §4.4): a non-authoritative mirror of the Producer's
//! progress, for operational dashboards only. `min_unhandled_event_block`/`max_event_block`
//! against the State Store remain the only source of truth for dispatch progress.

use config::{try_warn, Context, RedisConfig};
use redis::AsyncCommands;

const CURRENT_BLOCK_KEY: &str = "current_block";

#[derive(Clone)]
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    pub fn new(config: &RedisConfig) -> Result<RedisCache, String> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| format!("redis_cache: invalid REDIS_URL: {e}"))?;
        Ok(RedisCache { client })
    }

    /// Best-effort write; failures are logged and otherwise ignored per spec §4.4.
    pub async fn set_current_block(&self, ctx: &Context, height: u64) {
        let result: Result<(), redis::RedisError> = async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            conn.set(CURRENT_BLOCK_KEY, height).await
        }
        .await;
        if let Err(e) = result {
            try_warn!(ctx, "redis_cache: failed to write current_block: {e}");
        }
    }
}
