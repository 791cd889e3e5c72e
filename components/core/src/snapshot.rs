//! One-shot genesis snapshot loader (spec §6): seeds `token`/`balance` from `tokens.json` and
//! `holders.json` when no backup exists yet, i.e. on a fresh deployment or full resync.

use std::path::Path;

use bigdecimal::BigDecimal;
use serde::Deserialize;
use store_postgres::models::{Balance, Token};
use store_postgres::Store;

#[derive(Deserialize)]
struct SnapshotToken {
    id: i64,
    tick: String,
    max: BigDecimal,
    lim: BigDecimal,
    dec: i32,
    #[serde(default)]
    ug: bool,
    #[serde(default)]
    mp: bool,
    deployer: String,
    deploy_time: i64,
    inscription_id: String,
    #[serde(default)]
    first_number: i64,
    #[serde(default)]
    first_id: String,
    #[serde(default)]
    first_time: i64,
    #[serde(default)]
    last_number: i64,
    #[serde(default)]
    last_id: String,
    #[serde(default)]
    last_time: i64,
    minted: BigDecimal,
    #[serde(default)]
    holders: i64,
}

#[derive(Deserialize)]
struct SnapshotBalance {
    address: String,
    tick: String,
    tid: i64,
    inscription_id: String,
    balance: BigDecimal,
    #[serde(default)]
    available_balance: Option<BigDecimal>,
    #[serde(default)]
    transferable_balance: Option<BigDecimal>,
}

/// Loads `tokens.json` and `holders.json` from `dir` and seeds the store. Per spec §6:
/// `circulating := minted`, `original_balance := balance`.
pub async fn load(dir: &Path, store: &Store) -> Result<(), String> {
    let tokens_path = dir.join("tokens.json");
    let tokens_raw = tokio::fs::read_to_string(&tokens_path)
        .await
        .map_err(|e| format!("snapshot: reading {}: {e}", tokens_path.display()))?;
    let tokens: Vec<SnapshotToken> =
        serde_json::from_str(&tokens_raw).map_err(|e| format!("snapshot: parsing tokens.json: {e}"))?;

    for t in tokens {
        let token = Token {
            id: t.id,
            tick: t.tick,
            max: t.max,
            lim: t.lim,
            dec: t.dec,
            ug: t.ug,
            mp: t.mp,
            deployer: t.deployer,
            deploy_time: t.deploy_time,
            inscription_id: t.inscription_id,
            first_number: t.first_number,
            first_id: t.first_id,
            first_time: t.first_time,
            last_number: t.last_number,
            last_id: t.last_id,
            last_time: t.last_time,
            minted: t.minted.clone(),
            burned: crate::arithmetic::zero(t.dec),
            circulating: t.minted,
            holders: t.holders,
            last_upgrade_time: 0,
            upgrade_records: Vec::new(),
        };
        store.upsert_token(&token).await?;
    }

    let holders_path = dir.join("holders.json");
    let holders_raw = tokio::fs::read_to_string(&holders_path)
        .await
        .map_err(|e| format!("snapshot: reading {}: {e}", holders_path.display()))?;
    let holders: std::collections::HashMap<String, Vec<SnapshotBalance>> =
        serde_json::from_str(&holders_raw).map_err(|e| format!("snapshot: parsing holders.json: {e}"))?;

    for rows in holders.into_values() {
        for b in rows {
            let available = b.available_balance.clone().unwrap_or_else(|| b.balance.clone());
            let transferable = b.transferable_balance.clone().unwrap_or_else(|| crate::arithmetic::zero(available.scale() as i32));
            let balance = Balance {
                id: Balance::balance_key(&b.address, b.tid),
                tick: b.tick,
                tid: b.tid,
                inscription_id: b.inscription_id,
                address: b.address,
                balance: b.balance.clone(),
                available_balance: available,
                transferable_balance: transferable,
                original_balance: b.balance,
            };
            store.upsert_balance(&balance).await?;
        }
    }
    Ok(())
}
