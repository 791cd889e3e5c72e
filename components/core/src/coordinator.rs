//! Coordinator (C8): drives forward progress — snapshot load, event-producer supervision, reorg
//! detection, backup/restore, and the mempool preview pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use config::{try_crit, try_info, try_warn, Context, IndexerConfig, PgDatabaseConfig};
use store_postgres::Store;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::clients::{Alerter, BitcoindClient, OrdClient, RedisCache};
use crate::dispatcher;
use crate::handlers::{self, HandlerFn};
use crate::producer::upstream::UpstreamStore;
use crate::producer::{Producer, ProducerStatus};
use crate::snapshot;

const MEMPOOL_SENTINEL_HEIGHT: i64 = -1;
const BACKUP_INTERVAL_BLOCKS: i64 = 12;
const NO_WORK_SLEEP: Duration = Duration::from_secs(10);

pub struct Coordinator {
    store: Store,
    pg_config: PgDatabaseConfig,
    indexer_config: IndexerConfig,
    registry: std::collections::HashMap<&'static str, HandlerFn>,
    alerter: Alerter,
    bitcoind: BitcoindClient,
    ord: OrdClient,
    upstream: UpstreamStore,
    redis: Option<RedisCache>,
    stop_flag: Arc<AtomicBool>,
}

impl Coordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Store,
        pg_config: PgDatabaseConfig,
        indexer_config: IndexerConfig,
        alerter: Alerter,
        bitcoind: BitcoindClient,
        ord: OrdClient,
        upstream: UpstreamStore,
        redis: Option<RedisCache>,
    ) -> Coordinator {
        Coordinator {
            store,
            pg_config,
            indexer_config,
            registry: handlers::registry(),
            alerter,
            bitcoind,
            ord,
            upstream,
            redis,
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    fn spawn_producer(&self, start: i64, ctx: &Context) -> (JoinHandle<Result<(), String>>, Arc<RwLock<ProducerStatus>>, Arc<AtomicBool>) {
        let producer = Producer::new(
            self.store.clone(),
            self.upstream.clone(),
            self.bitcoind.clone(),
            self.ord.clone(),
            self.redis.clone(),
        );
        let status = producer.status_handle();
        let stop = producer.stop_handle();
        let ctx = ctx.clone();
        let handle = tokio::spawn(async move { producer.run(start, &ctx).await });
        (handle, status, stop)
    }

    pub async fn run(&self, ctx: &Context) -> Result<(), String> {
        let has_backup = self.store.has_backup().await?;
        let mut backup_height = self.store.get_backup_height().await?.unwrap_or(0);

        let start = if has_backup {
            self.store.restore_all().await?;
            try_info!(ctx, "restored from backup at height {backup_height}");
            backup_height + 1
        } else {
            let start = self.indexer_config.core_start_block_height as i64 - 1;
            let snapshot_dir = std::path::Path::new(&self.indexer_config.snapshot_dir);
            snapshot::load(snapshot_dir, &self.store).await?;
            self.store.set_backup_height(start).await?;
            backup_height = start;
            start
        };

        let (mut producer_handle, mut producer_status, mut producer_stop) = self.spawn_producer(start, ctx);

        loop {
            if self.stop_flag.load(Ordering::SeqCst) {
                break;
            }

            match self.store.min_unhandled_event_block().await {
                Ok(None) => {
                    if let Err(e) = self.run_mempool_pass(ctx).await {
                        try_warn!(ctx, "mempool pass failed: {e}");
                    }
                    tokio::time::sleep(NO_WORK_SLEEP).await;
                    continue;
                }
                Ok(Some(h)) => {
                    let reorg_at = producer_status.read().await.reorg_detected_at;
                    if let Some(reorg_height) = reorg_at {
                        try_warn!(ctx, "reorg detected at height {reorg_height}; restoring from backup");
                        producer_stop.store(true, Ordering::SeqCst);
                        let _ = producer_handle.await;

                        if self.store.has_backup().await? {
                            if let Err(e) = self.store.restore_all().await {
                                try_crit!(ctx, "restore_all failed after reorg: {e}");
                                self.alerter.fire(ctx, &format!("orc-20 indexer: restore_all failed after reorg: {e}")).await;
                                return Err(e);
                            }
                        }
                        let restart_at = self.store.get_backup_height().await?.map(|h| h + 1).unwrap_or(start);
                        let restarted = self.spawn_producer(restart_at, ctx);
                        producer_handle = restarted.0;
                        producer_status = restarted.1;
                        producer_stop = restarted.2;
                        continue;
                    }

                    let events = self.store.events_by_block(h).await?;
                    for mut event in events {
                        if let Err(e) = dispatcher::dispatch(&mut event, &self.store, &self.indexer_config, &self.registry, ctx).await {
                            try_crit!(ctx, "dispatch failed at block {h}: {e}");
                            self.alerter.fire(ctx, &format!("orc-20 indexer: unrecoverable store error at block {h}: {e}")).await;
                            return Err(e);
                        }
                    }

                    if h - backup_height >= BACKUP_INTERVAL_BLOCKS {
                        self.store.backup_all().await?;
                        self.store.set_backup_height(h).await?;
                        backup_height = h;
                        try_info!(ctx, "backed up state at height {h}");
                    }
                }
                Err(e) => {
                    try_crit!(ctx, "state store query failed: {e}");
                    self.alerter.fire(ctx, &format!("orc-20 indexer: unrecoverable store error: {e}")).await;
                    return Err(e);
                }
            }
        }

        producer_stop.store(true, Ordering::SeqCst);
        let _ = producer_handle.await;
        Ok(())
    }

    /// Mempool preview (spec §4.8/§10): dispatches sentinel-height events against a transaction
    /// that is always rolled back, so only the event's own `valid`/`error` columns are ever
    /// persisted for real — token/balance/otc state is never observed outside this function.
    async fn run_mempool_pass(&self, ctx: &Context) -> Result<(), String> {
        let pending = self.store.pending_events_for_mempool().await?;
        if pending.is_empty() {
            return Ok(());
        }

        let dry_run_store = Store::new_single_connection(&self.pg_config)?;
        dry_run_store.begin_uncommitted().await?;
        let mut outcomes = Vec::with_capacity(pending.len());
        for mut event in pending {
            debug_assert_eq!(event.block_height, MEMPOOL_SENTINEL_HEIGHT);
            let result = dispatcher::dispatch(&mut event, &dry_run_store, &self.indexer_config, &self.registry, ctx).await;
            if let Err(e) = result {
                dry_run_store.rollback_uncommitted().await?;
                return Err(format!("mempool pass: {e}"));
            }
            outcomes.push((event.id, event.valid, event.error));
        }
        dry_run_store.rollback_uncommitted().await?;

        for (id, valid, error) in outcomes {
            self.store.set_event_verdict(&id, valid, &error).await?;
        }
        Ok(())
    }
}
