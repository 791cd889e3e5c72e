//! Event Producer (C4): turns a confirmed block's inscription transactions into an ordered
//! stream of typed events.

pub mod reorg;
pub mod upstream;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use config::{try_debug, try_info, try_warn, Context};
use serde_json::Value;
use store_postgres::models::{Event, EventType};
use store_postgres::Store;
use tokio::sync::RwLock;

use crate::clients::{BitcoindClient, OrdClient, RedisCache};
use crate::ids::random_id;
use reorg::ReorgCache;
use upstream::{InscriptionRow, InscriptionTransactionRow, UpstreamStore};

const WORKER_COUNT: usize = 20;
const NO_NEW_BLOCK_SLEEP: Duration = Duration::from_secs(5);
const UPSTREAM_NOT_READY_SLEEP: Duration = Duration::from_secs(1);

/// Shared, lock-protected status the Coordinator polls: the height of the most recently
/// fully-produced block, and whether a reorg was detected (and at what height).
#[derive(Default, Clone, Copy)]
pub struct ProducerStatus {
    pub last_produced_height: i64,
    pub reorg_detected_at: Option<i64>,
}

pub struct Producer {
    store: Store,
    upstream: UpstreamStore,
    bitcoind: BitcoindClient,
    ord: OrdClient,
    redis: Option<RedisCache>,
    status: Arc<RwLock<ProducerStatus>>,
    stop_flag: Arc<AtomicBool>,
}

impl Producer {
    pub fn new(
        store: Store,
        upstream: UpstreamStore,
        bitcoind: BitcoindClient,
        ord: OrdClient,
        redis: Option<RedisCache>,
    ) -> Producer {
        Producer {
            store,
            upstream,
            bitcoind,
            ord,
            redis,
            status: Arc::new(RwLock::new(ProducerStatus::default())),
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn status_handle(&self) -> Arc<RwLock<ProducerStatus>> {
        self.status.clone()
    }

    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Runs forever (until `stop_flag` is set), starting at `start_height`. Deletes every event
    /// at or above `start_height` first (spec §4.4: "idempotent restart").
    pub async fn run(&self, start_height: i64, ctx: &Context) -> Result<(), String> {
        self.store.delete_events_where_height_gte(start_height).await?;
        let mut reorg_cache = ReorgCache::new();
        let mut height = start_height;

        while !self.stop_flag.load(Ordering::SeqCst) {
            match self.process_block(height, &mut reorg_cache, ctx).await? {
                BlockOutcome::Produced => {
                    {
                        let mut status = self.status.write().await;
                        status.last_produced_height = height;
                    }
                    if let Some(redis) = &self.redis {
                        redis.set_current_block(ctx, height as u64).await;
                    }
                    height += 1;
                }
                BlockOutcome::NoNewBlock => {
                    tokio::time::sleep(NO_NEW_BLOCK_SLEEP).await;
                }
                BlockOutcome::Reorg => {
                    let mut status = self.status.write().await;
                    status.reorg_detected_at = Some(height);
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    async fn process_block(&self, height: i64, reorg_cache: &mut ReorgCache, ctx: &Context) -> Result<BlockOutcome, String> {
        let hash = match self.bitcoind.get_block_hash(height as u64).await? {
            Some(h) => h,
            None => return Ok(BlockOutcome::NoNewBlock),
        };
        let block = self.bitcoind.get_block(&hash).await?;
        let previous_hash = block.get("previousblockhash").and_then(Value::as_str);
        let block_time = block.get("time").and_then(Value::as_i64).unwrap_or(0);

        if height > 0 {
            if let Some(expected) = reorg_cache.hash_at(height - 1) {
                if Some(expected) != previous_hash {
                    try_warn!(ctx, "reorg detected at height {height}");
                    return Ok(BlockOutcome::Reorg);
                }
            }
        }

        self.store.delete_events_where_height_gte(height).await?;

        loop {
            if self.upstream.block_fully_handled(height).await? {
                break;
            }
            tokio::time::sleep(UPSTREAM_NOT_READY_SLEEP).await;
        }

        let txs = self.upstream.inscription_transactions_for_block(height).await?;
        let ids: Vec<String> = txs.iter().map(|t| t.inscription_id.clone()).collect();
        let inscriptions = self.upstream.inscriptions_by_ids(&ids).await?;
        let by_id: HashMap<String, InscriptionRow> = inscriptions.into_iter().map(|i| (i.inscription_id.clone(), i)).collect();

        try_debug!(ctx, "producing {} inscription transactions for block {height}", txs.len());
        self.produce_events(txs, &by_id, block_time, ctx).await?;
        self.store.mark_block_events_unhandled(height).await?;

        reorg_cache.confirm(height, hash);
        try_info!(ctx, "produced block {height}");
        Ok(BlockOutcome::Produced)
    }

    async fn produce_events(
        &self,
        txs: Vec<InscriptionTransactionRow>,
        by_id: &HashMap<String, InscriptionRow>,
        block_time: i64,
        ctx: &Context,
    ) -> Result<(), String> {
        let queue = crossbeam_channel::unbounded();
        let (tx_send, tx_recv) = queue;
        for tx in txs {
            tx_send.send(tx).expect("receiver held open by this function");
        }
        drop(tx_send);

        let mut handles = Vec::with_capacity(WORKER_COUNT);
        for _ in 0..WORKER_COUNT {
            let rx = tx_recv.clone();
            let store = self.store.clone();
            let ord = self.ord.clone();
            let by_id = by_id.clone();
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                while let Ok(tx) = rx.try_recv() {
                    if let Err(e) = process_one(&tx, &by_id, block_time, &store, &ord).await {
                        try_warn!(ctx, "failed to produce event for {}: {e}", tx.inscription_id);
                    }
                }
            }));
        }
        futures::future::try_join_all(handles)
            .await
            .map_err(|e| format!("producer worker panicked: {e}"))?;
        Ok(())
    }
}

enum BlockOutcome {
    Produced,
    NoNewBlock,
    Reorg,
}

async fn process_one(
    tx: &InscriptionTransactionRow,
    by_id: &HashMap<String, InscriptionRow>,
    block_time: i64,
    store: &Store,
    ord: &OrdClient,
) -> Result<(), String> {
    if tx.inscription_number < 0 {
        return Ok(());
    }

    let inscription = by_id.get(&tx.inscription_id);
    let (content_type, content_bytes) = match inscription {
        Some(row) if !row.content.is_empty() => (row.content_type.clone(), row.content.clone()),
        Some(row) => (row.content_type.clone(), ord.get_content(&tx.inscription_id).await?),
        None => return Ok(()),
    };

    let lower_type = content_type.to_lowercase();
    if !lower_type.contains("text") && !lower_type.contains("json") {
        return Ok(());
    }

    let parsed: Value = match serde_json::from_slice(&content_bytes) {
        Ok(v) => v,
        Err(_) => return Ok(()),
    };
    let obj = match parsed.as_object() {
        Some(o) => o,
        None => return Ok(()),
    };
    let protocol_ok = obj
        .get("p")
        .and_then(Value::as_str)
        .map(|p| p.eq_ignore_ascii_case("orc-20"))
        .unwrap_or(false);
    if !protocol_ok {
        return Ok(());
    }
    let op_non_empty = obj.get("op").and_then(Value::as_str).map(|op| !op.is_empty()).unwrap_or(false);
    if !op_non_empty {
        return Ok(());
    }

    let (event_type, sender) = if tx.genesis_tx {
        (EventType::Inscribe, tx.current_owner.clone())
    } else {
        (EventType::Transfer, tx.prev_owner.clone())
    };

    let event = Event {
        id: random_id(),
        event_type,
        block_height: tx.block_height,
        block_index: tx.block_index,
        timestamp: block_time,
        inscription_id: tx.inscription_id.clone(),
        inscription_number: tx.inscription_number,
        sender,
        receiver: tx.current_owner.clone(),
        content: parsed,
        operation: obj.get("op").and_then(Value::as_str).unwrap_or_default().to_lowercase(),
        function_id: 0,
        valid: false,
        error: String::new(),
        handled: true,
    };
    store.upsert_event(&event).await
}
