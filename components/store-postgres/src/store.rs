//! The State Store (C5): upsert-by-primary-key persistence for every entity in the data model,
//! plus the block/backup bookkeeping queries the Coordinator and Dispatcher drive off of.

use bigdecimal::BigDecimal;
use config::PgDatabaseConfig;
use deadpool_postgres::Pool;
use serde_json::Value;
use tokio_postgres::types::ToSql;

use crate::models::{Balance, BackupHeight, Event, EventType, Otc, OtcRecord, PendingInscriptions, Token};
use crate::types::PgNumeric;
use crate::{backup, pg_pool, pg_pool_client, FromPgRow};

/// `event_type` is a custom Postgres enum; casting it to `text` lets it round-trip through
/// `tokio_postgres`'s generic `String`/`&str` `FromSql` impl without a dedicated enum binding.
const EVENT_SELECT: &str = "SELECT id, event_type::text AS event_type, block_height, block_index, \
    timestamp, inscription_id, inscription_number, sender, receiver, content, operation, \
    function_id, valid, error, handled FROM event";

#[derive(Clone)]
pub struct Store {
    pool: Pool,
}

impl Store {
    pub fn new(config: &PgDatabaseConfig) -> Result<Store, String> {
        Ok(Store {
            pool: pg_pool(config)?,
        })
    }

    pub fn from_pool(pool: Pool) -> Store {
        Store { pool }
    }

    /// A `Store` pinned to a single physical connection, for the Coordinator's mempool dry run
    /// (see `pg_pool_single`).
    pub fn new_single_connection(config: &PgDatabaseConfig) -> Result<Store, String> {
        Ok(Store {
            pool: crate::pg_pool_single(config)?,
        })
    }

    /// Opens a transaction on this `Store`'s sole connection. Only meaningful on a
    /// `new_single_connection` store — calling it on a normal pooled store begins a transaction
    /// on whichever connection happens to be free, which no subsequent call is guaranteed to reuse.
    pub async fn begin_uncommitted(&self) -> Result<(), String> {
        let client = pg_pool_client(&self.pool).await?;
        client.batch_execute("BEGIN").await.map_err(|e| format!("begin_uncommitted: {e}"))
    }

    pub async fn rollback_uncommitted(&self) -> Result<(), String> {
        let client = pg_pool_client(&self.pool).await?;
        client.batch_execute("ROLLBACK").await.map_err(|e| format!("rollback_uncommitted: {e}"))
    }

    // ==================== token ====================

    pub async fn get_token(&self, id: i64) -> Result<Option<Token>, String> {
        let client = pg_pool_client(&self.pool).await?;
        let row = client
            .query_opt("SELECT * FROM token WHERE id = $1", &[&id])
            .await
            .map_err(|e| format!("get_token: {e}"))?;
        Ok(row.map(|r| Token::from_pg_row(&r)))
    }

    pub async fn upsert_token(&self, token: &Token) -> Result<(), String> {
        let client = pg_pool_client(&self.pool).await?;
        client
            .execute(
                "INSERT INTO token (
                    id, tick, max, lim, dec, ug, mp, deployer, deploy_time, inscription_id,
                    first_number, first_id, first_time, last_number, last_id, last_time,
                    minted, burned, circulating, holders, last_upgrade_time, upgrade_records
                ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22)
                ON CONFLICT (id) DO UPDATE SET
                    tick = EXCLUDED.tick, max = EXCLUDED.max, lim = EXCLUDED.lim, dec = EXCLUDED.dec,
                    ug = EXCLUDED.ug, mp = EXCLUDED.mp, deployer = EXCLUDED.deployer,
                    deploy_time = EXCLUDED.deploy_time, inscription_id = EXCLUDED.inscription_id,
                    first_number = EXCLUDED.first_number, first_id = EXCLUDED.first_id,
                    first_time = EXCLUDED.first_time, last_number = EXCLUDED.last_number,
                    last_id = EXCLUDED.last_id, last_time = EXCLUDED.last_time,
                    minted = EXCLUDED.minted, burned = EXCLUDED.burned,
                    circulating = EXCLUDED.circulating, holders = EXCLUDED.holders,
                    last_upgrade_time = EXCLUDED.last_upgrade_time,
                    upgrade_records = EXCLUDED.upgrade_records",
                &[
                    &token.id,
                    &token.tick,
                    &PgNumeric(token.max.clone()),
                    &PgNumeric(token.lim.clone()),
                    &token.dec,
                    &token.ug,
                    &token.mp,
                    &token.deployer,
                    &token.deploy_time,
                    &token.inscription_id,
                    &token.first_number,
                    &token.first_id,
                    &token.first_time,
                    &token.last_number,
                    &token.last_id,
                    &token.last_time,
                    &PgNumeric(token.minted.clone()),
                    &PgNumeric(token.burned.clone()),
                    &PgNumeric(token.circulating.clone()),
                    &token.holders,
                    &token.last_upgrade_time,
                    &token.upgrade_records,
                ],
            )
            .await
            .map_err(|e| format!("upsert_token: {e}"))?;
        Ok(())
    }

    // ==================== balance ====================

    pub async fn get_balance(&self, address: &str, tid: i64) -> Result<Option<Balance>, String> {
        let client = pg_pool_client(&self.pool).await?;
        let row = client
            .query_opt(
                "SELECT * FROM balance WHERE id = $1",
                &[&Balance::balance_key(address, tid)],
            )
            .await
            .map_err(|e| format!("get_balance: {e}"))?;
        Ok(row.map(|r| Balance::from_pg_row(&r)))
    }

    /// Returns the balance at `(address, tid)`, or a fresh zero balance if none exists yet. This
    /// is the shape every handler actually wants: balances are implicitly zero until first use.
    pub async fn get_balance_or_default(&self, address: &str, tid: i64, tick: &str, inscription_id: &str, dec: i32) -> Result<Balance, String> {
        if let Some(b) = self.get_balance(address, tid).await? {
            return Ok(b);
        }
        Ok(Balance {
            id: Balance::balance_key(address, tid),
            tick: tick.to_string(),
            tid,
            inscription_id: inscription_id.to_string(),
            address: address.to_string(),
            balance: zero(dec),
            available_balance: zero(dec),
            transferable_balance: zero(dec),
            original_balance: zero(dec),
        })
    }

    pub async fn upsert_balance(&self, balance: &Balance) -> Result<(), String> {
        let client = pg_pool_client(&self.pool).await?;
        upsert_balance_with(&client, balance).await
    }

    pub async fn batch_upsert_balances(&self, balances: &[Balance]) -> Result<(), String> {
        let client = pg_pool_client(&self.pool).await?;
        for chunk in balances.chunks(crate::BATCH_QUERY_CHUNK_SIZE) {
            for b in chunk {
                upsert_balance_with(&client, b).await?;
            }
        }
        Ok(())
    }

    // ==================== pending_inscriptions ====================

    pub async fn get_pending_inscriptions(&self, address: &str) -> Result<PendingInscriptions, String> {
        let client = pg_pool_client(&self.pool).await?;
        let row = client
            .query_opt("SELECT * FROM pending_inscriptions WHERE id = $1", &[&address])
            .await
            .map_err(|e| format!("get_pending_inscriptions: {e}"))?;
        Ok(match row {
            Some(r) => PendingInscriptions::from_pg_row(&r),
            None => PendingInscriptions {
                id: address.to_string(),
                inscriptions: vec![],
            },
        })
    }

    pub async fn upsert_pending_inscriptions(&self, p: &PendingInscriptions) -> Result<(), String> {
        let client = pg_pool_client(&self.pool).await?;
        client
            .execute(
                "INSERT INTO pending_inscriptions (id, inscriptions) VALUES ($1, $2)
                 ON CONFLICT (id) DO UPDATE SET inscriptions = EXCLUDED.inscriptions",
                &[&p.id, &p.inscriptions],
            )
            .await
            .map_err(|e| format!("upsert_pending_inscriptions: {e}"))?;
        Ok(())
    }

    /// Appends `inscription_id` to `address`'s pending set, idempotent on re-run (spec §4.6,
    /// `handle_inscribe`).
    pub async fn pending_inscribe(&self, address: &str, inscription_id: &str) -> Result<(), String> {
        let mut pending = self.get_pending_inscriptions(address).await?;
        if !pending.inscriptions.iter().any(|i| i == inscription_id) {
            pending.inscriptions.push(inscription_id.to_string());
            self.upsert_pending_inscriptions(&pending).await?;
        }
        Ok(())
    }

    /// Removes `inscription_id` from `address`'s pending set; returns whether it was present.
    pub async fn pending_consume(&self, address: &str, inscription_id: &str) -> Result<bool, String> {
        let mut pending = self.get_pending_inscriptions(address).await?;
        let before = pending.inscriptions.len();
        pending.inscriptions.retain(|i| i != inscription_id);
        let consumed = pending.inscriptions.len() != before;
        if consumed {
            self.upsert_pending_inscriptions(&pending).await?;
        }
        Ok(consumed)
    }

    // ==================== otc ====================

    pub async fn get_otc(&self, id: i64) -> Result<Option<Otc>, String> {
        let client = pg_pool_client(&self.pool).await?;
        let row = client
            .query_opt("SELECT * FROM otc WHERE id = $1", &[&id])
            .await
            .map_err(|e| format!("get_otc: {e}"))?;
        Ok(row.map(|r| Otc::from_pg_row(&r)))
    }

    pub async fn upsert_otc(&self, otc: &Otc) -> Result<(), String> {
        let client = pg_pool_client(&self.pool).await?;
        client
            .execute(
                "INSERT INTO otc (
                    id, tick1, tid1, supply, tick2, tid2, er, mba, dl, owner, deploy_time,
                    inscription_id, valid, success, received, execute_id
                ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)
                ON CONFLICT (id) DO UPDATE SET
                    tick1 = EXCLUDED.tick1, tid1 = EXCLUDED.tid1, supply = EXCLUDED.supply,
                    tick2 = EXCLUDED.tick2, tid2 = EXCLUDED.tid2, er = EXCLUDED.er, mba = EXCLUDED.mba,
                    dl = EXCLUDED.dl, owner = EXCLUDED.owner, deploy_time = EXCLUDED.deploy_time,
                    inscription_id = EXCLUDED.inscription_id, valid = EXCLUDED.valid,
                    success = EXCLUDED.success, received = EXCLUDED.received,
                    execute_id = EXCLUDED.execute_id",
                &[
                    &otc.id,
                    &otc.tick1,
                    &otc.tid1,
                    &PgNumeric(otc.supply.clone()),
                    &otc.tick2,
                    &otc.tid2,
                    &PgNumeric(otc.er.clone()),
                    &PgNumeric(otc.mba.clone()),
                    &otc.dl,
                    &otc.owner,
                    &otc.deploy_time,
                    &otc.inscription_id,
                    &otc.valid,
                    &otc.success,
                    &PgNumeric(otc.received.clone()),
                    &otc.execute_id,
                ],
            )
            .await
            .map_err(|e| format!("upsert_otc: {e}"))?;
        Ok(())
    }

    // ==================== otc_record ====================

    pub async fn get_otc_records(&self, oid: i64) -> Result<Vec<OtcRecord>, String> {
        let client = pg_pool_client(&self.pool).await?;
        let rows = client
            .query("SELECT * FROM otc_record WHERE oid = $1", &[&oid])
            .await
            .map_err(|e| format!("get_otc_records: {e}"))?;
        Ok(rows.iter().map(OtcRecord::from_pg_row).collect())
    }

    pub async fn upsert_otc_record(&self, record: &OtcRecord) -> Result<(), String> {
        let client = pg_pool_client(&self.pool).await?;
        client
            .execute(
                "INSERT INTO otc_record (id, oid, inscription_id, address, amount_out, amount_in)
                 VALUES ($1,$2,$3,$4,$5,$6)
                 ON CONFLICT (id) DO UPDATE SET
                    oid = EXCLUDED.oid, inscription_id = EXCLUDED.inscription_id,
                    address = EXCLUDED.address, amount_out = EXCLUDED.amount_out,
                    amount_in = EXCLUDED.amount_in",
                &[
                    &record.id,
                    &record.oid,
                    &record.inscription_id,
                    &record.address,
                    &PgNumeric(record.amount_out.clone()),
                    &PgNumeric(record.amount_in.clone()),
                ],
            )
            .await
            .map_err(|e| format!("upsert_otc_record: {e}"))?;
        Ok(())
    }

    // ==================== event ====================

    pub async fn upsert_event(&self, event: &Event) -> Result<(), String> {
        let client = pg_pool_client(&self.pool).await?;
        let event_type_str = event.event_type.as_str();
        client
            .execute(
                "INSERT INTO event (
                    id, event_type, block_height, block_index, timestamp, inscription_id,
                    inscription_number, sender, receiver, content, operation, function_id,
                    valid, error, handled
                ) VALUES ($1,$2::event_type,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)
                ON CONFLICT (id) DO UPDATE SET
                    event_type = EXCLUDED.event_type, block_height = EXCLUDED.block_height,
                    block_index = EXCLUDED.block_index, timestamp = EXCLUDED.timestamp,
                    inscription_id = EXCLUDED.inscription_id,
                    inscription_number = EXCLUDED.inscription_number, sender = EXCLUDED.sender,
                    receiver = EXCLUDED.receiver, content = EXCLUDED.content,
                    operation = EXCLUDED.operation, function_id = EXCLUDED.function_id,
                    valid = EXCLUDED.valid, error = EXCLUDED.error, handled = EXCLUDED.handled",
                &[
                    &event.id,
                    &event_type_str,
                    &event.block_height,
                    &event.block_index,
                    &event.timestamp,
                    &event.inscription_id,
                    &event.inscription_number,
                    &event.sender,
                    &event.receiver,
                    &event.content,
                    &event.operation,
                    &event.function_id,
                    &event.valid,
                    &event.error,
                    &event.handled,
                ],
            )
            .await
            .map_err(|e| format!("upsert_event: {e}"))?;
        Ok(())
    }

    pub async fn events_by_block(&self, height: i64) -> Result<Vec<Event>, String> {
        let client = pg_pool_client(&self.pool).await?;
        let rows = client
            .query(
                &format!("{EVENT_SELECT} WHERE block_height = $1 ORDER BY block_index ASC"),
                &[&height],
            )
            .await
            .map_err(|e| format!("events_by_block: {e}"))?;
        Ok(rows.iter().map(Event::from_pg_row).collect())
    }

    pub async fn min_unhandled_event_block(&self) -> Result<Option<i64>, String> {
        let client = pg_pool_client(&self.pool).await?;
        let row = client
            .query_opt(
                "SELECT MIN(block_height) AS h FROM event WHERE handled = false AND block_height >= 0",
                &[],
            )
            .await
            .map_err(|e| format!("min_unhandled_event_block: {e}"))?;
        Ok(row.and_then(|r| r.get::<_, Option<i64>>("h")))
    }

    pub async fn max_event_block(&self) -> Result<Option<i64>, String> {
        let client = pg_pool_client(&self.pool).await?;
        let row = client
            .query_opt("SELECT MAX(block_height) AS h FROM event WHERE block_height >= 0", &[])
            .await
            .map_err(|e| format!("max_event_block: {e}"))?;
        Ok(row.and_then(|r| r.get::<_, Option<i64>>("h")))
    }

    pub async fn delete_events_where_height_gte(&self, height: i64) -> Result<(), String> {
        let client = pg_pool_client(&self.pool).await?;
        client
            .execute("DELETE FROM event WHERE block_height >= $1", &[&height])
            .await
            .map_err(|e| format!("delete_events_where_height_gte: {e}"))?;
        Ok(())
    }

    pub async fn mark_block_events_unhandled(&self, height: i64) -> Result<(), String> {
        let client = pg_pool_client(&self.pool).await?;
        client
            .execute(
                "UPDATE event SET handled = false WHERE block_height = $1",
                &[&height],
            )
            .await
            .map_err(|e| format!("mark_block_events_unhandled: {e}"))?;
        Ok(())
    }

    pub async fn pending_events_for_mempool(&self) -> Result<Vec<Event>, String> {
        let client = pg_pool_client(&self.pool).await?;
        let rows = client
            .query(
                &format!(
                    "{EVENT_SELECT} WHERE block_height = -1 AND error = 'not processed by indexer' ORDER BY block_index ASC"
                ),
                &[],
            )
            .await
            .map_err(|e| format!("pending_events_for_mempool: {e}"))?;
        Ok(rows.iter().map(Event::from_pg_row).collect())
    }

    /// Writes back only `valid`/`error` for an event, leaving every other column untouched. Used
    /// by the Coordinator's mempool dry run to surface a preview verdict without ever persisting
    /// the ledger mutations the dry-run dispatch produced.
    pub async fn set_event_verdict(&self, id: &str, valid: bool, error: &str) -> Result<(), String> {
        let client = pg_pool_client(&self.pool).await?;
        client
            .execute(
                "UPDATE event SET valid = $1, error = $2 WHERE id = $3",
                &[&valid, &error, &id],
            )
            .await
            .map_err(|e| format!("set_event_verdict: {e}"))?;
        Ok(())
    }

    // ==================== backup_height ====================

    pub async fn get_backup_height(&self) -> Result<Option<i64>, String> {
        let client = pg_pool_client(&self.pool).await?;
        let row = client
            .query_opt("SELECT * FROM backup_height WHERE id = 1", &[])
            .await
            .map_err(|e| format!("get_backup_height: {e}"))?;
        Ok(row.map(|r| BackupHeight::from_pg_row(&r).block_height))
    }

    pub async fn set_backup_height(&self, height: i64) -> Result<(), String> {
        let client = pg_pool_client(&self.pool).await?;
        client
            .execute(
                "INSERT INTO backup_height (id, block_height) VALUES (1, $1)
                 ON CONFLICT (id) DO UPDATE SET block_height = EXCLUDED.block_height",
                &[&height],
            )
            .await
            .map_err(|e| format!("set_backup_height: {e}"))?;
        Ok(())
    }

    // ==================== backup / restore ====================

    pub async fn backup_all(&self) -> Result<(), String> {
        let mut client = pg_pool_client(&self.pool).await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| format!("backup_all: begin: {e}"))?;
        backup::backup_all(&tx).await?;
        tx.commit().await.map_err(|e| format!("backup_all: commit: {e}"))?;
        Ok(())
    }

    pub async fn restore_all(&self) -> Result<(), String> {
        let mut client = pg_pool_client(&self.pool).await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| format!("restore_all: begin: {e}"))?;
        backup::restore_all(&tx).await?;
        tx.commit().await.map_err(|e| format!("restore_all: commit: {e}"))?;
        Ok(())
    }

    pub async fn has_backup(&self) -> Result<bool, String> {
        let client = pg_pool_client(&self.pool).await?;
        let row = client
            .query_opt(
                "SELECT to_regclass('token_backup') IS NOT NULL AS present",
                &[],
            )
            .await
            .map_err(|e| format!("has_backup: {e}"))?;
        Ok(row.map(|r| r.get::<_, bool>("present")).unwrap_or(false))
    }
}

async fn upsert_balance_with(
    client: &deadpool_postgres::Object,
    balance: &Balance,
) -> Result<(), String> {
    let params: &[&(dyn ToSql + Sync)] = &[
        &balance.id,
        &balance.tick,
        &balance.tid,
        &balance.inscription_id,
        &balance.address,
        &PgNumeric(balance.balance.clone()),
        &PgNumeric(balance.available_balance.clone()),
        &PgNumeric(balance.transferable_balance.clone()),
        &PgNumeric(balance.original_balance.clone()),
    ];
    client
        .execute(
            "INSERT INTO balance (
                id, tick, tid, inscription_id, address, balance, available_balance,
                transferable_balance, original_balance
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
            ON CONFLICT (id) DO UPDATE SET
                tick = EXCLUDED.tick, tid = EXCLUDED.tid, inscription_id = EXCLUDED.inscription_id,
                address = EXCLUDED.address, balance = EXCLUDED.balance,
                available_balance = EXCLUDED.available_balance,
                transferable_balance = EXCLUDED.transferable_balance,
                original_balance = EXCLUDED.original_balance",
            params,
        )
        .await
        .map_err(|e| format!("upsert_balance: {e}"))?;
    Ok(())
}

fn zero(dec: i32) -> BigDecimal {
    BigDecimal::new(num_bigint::BigInt::from(0), dec as i64)
}

#[allow(dead_code)]
fn deep_copy_content(value: &Value) -> Value {
    value.clone()
}
