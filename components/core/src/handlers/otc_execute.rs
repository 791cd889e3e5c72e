//! otc-execute (spec §4.6.8): INSCRIBE-only. Settles an OTC order either by distributing the
//! escrowed assets (sold out or under the dust threshold) or refunding everyone (deadline passed
//! with too little taken).

use std::collections::HashMap;

use store_postgres::models::{Balance, Event, EventType};
use store_postgres::Store;

use super::common::{accept, params, reject};
use super::HandlerFuture;
use crate::arithmetic;
use crate::parse::fields;

const ALLOWED: &[&str] = &["oid"];

pub fn handle<'a>(event: &'a mut Event, store: &'a Store, _cfg: &'a config::IndexerConfig) -> HandlerFuture<'a> {
    Box::pin(run(event, store))
}

async fn run(event: &mut Event, store: &Store) -> Result<(), String> {
    if event.event_type != EventType::Inscribe {
        reject(event, "otc-execute must be an INSCRIBE event");
        return Ok(());
    }

    let p = match params(event) {
        Ok(p) => p,
        Err(e) => {
            reject(event, e);
            return Ok(());
        }
    };
    if let Err(e) = fields::reject_unknown_keys(&p, ALLOWED) {
        reject(event, e.to_string());
        return Ok(());
    }
    let oid = match fields::parse_id(&p, "oid") {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };
    event.function_id = oid;

    let mut otc = match store.get_otc(oid).await? {
        Some(o) => o,
        None => {
            reject(event, format!("otc {oid} does not exist"));
            return Ok(());
        }
    };
    if !otc.valid {
        reject(event, "otc is no longer open");
        return Ok(());
    }

    let mut token1 = store
        .get_token(otc.tid1)
        .await?
        .ok_or_else(|| format!("token {} vanished from under an open otc", otc.tid1))?;
    let token2 = store
        .get_token(otc.tid2)
        .await?
        .ok_or_else(|| format!("token {} vanished from under an open otc", otc.tid2))?;

    let ask_total = arithmetic::mul(&otc.supply, &otc.er, token2.dec);
    let remaining = arithmetic::sub(&ask_total, &otc.received, token2.dec);
    let under_dust = remaining < otc.mba;

    if !under_dust && otc.dl > event.timestamp {
        reject(event, "otc is not yet due for execution");
        return Ok(());
    }

    let mut balances: HashMap<String, Balance> = HashMap::new();

    async fn fetch_or_clone(
        store: &Store,
        balances: &mut HashMap<String, Balance>,
        addr: &str,
        tid: i64,
        tick: &str,
        dec: i32,
    ) -> Result<(), String> {
        let key = Balance::balance_key(addr, tid);
        if !balances.contains_key(&key) {
            let balance = store.get_balance_or_default(addr, tid, tick, "", dec).await?;
            balances.insert(key, balance);
        }
        Ok(())
    }

    fn credit(balances: &mut HashMap<String, Balance>, addr: &str, tid: i64, amt: &bigdecimal::BigDecimal, dec: i32, holders: &mut i64) {
        let key = Balance::balance_key(addr, tid);
        let balance = balances.get_mut(&key).expect("balance preloaded by fetch_or_clone");
        let was_zero = arithmetic::is_zero(&balance.balance);
        balance.available_balance = arithmetic::add(&balance.available_balance, amt, dec);
        balance.balance = arithmetic::add(&balance.balance, amt, dec);
        if was_zero && !arithmetic::is_zero(&balance.balance) {
            *holders += 1;
        }
    }

    if under_dust {
        otc.success = true;

        fetch_or_clone(store, &mut balances, &otc.owner, token2.id, &token2.tick, token2.dec).await?;
        let mut token2_holders_delta = 0i64;
        credit(&mut balances, &otc.owner, token2.id, &otc.received, token2.dec, &mut token2_holders_delta);

        let records = store.get_otc_records(oid).await?;
        let mut distributed = arithmetic::zero(token1.dec);
        let mut token1_holders_delta = 0i64;
        for record in &records {
            fetch_or_clone(store, &mut balances, &record.address, token1.id, &token1.tick, token1.dec).await?;
            credit(&mut balances, &record.address, token1.id, &record.amount_in, token1.dec, &mut token1_holders_delta);
            distributed = arithmetic::add(&distributed, &record.amount_in, token1.dec);
        }
        let unsold = arithmetic::sub(&otc.supply, &distributed, token1.dec);
        if !arithmetic::is_zero(&unsold) {
            fetch_or_clone(store, &mut balances, &otc.owner, token1.id, &token1.tick, token1.dec).await?;
            credit(&mut balances, &otc.owner, token1.id, &unsold, token1.dec, &mut token1_holders_delta);
        }

        let mut token2 = token2;
        token2.holders += token2_holders_delta;
        token1.holders += token1_holders_delta;
        store.upsert_token(&token1).await?;
        store.upsert_token(&token2).await?;
    } else {
        otc.success = false;

        fetch_or_clone(store, &mut balances, &otc.owner, token1.id, &token1.tick, token1.dec).await?;
        let mut token1_holders_delta = 0i64;
        credit(&mut balances, &otc.owner, token1.id, &otc.supply, token1.dec, &mut token1_holders_delta);
        token1.holders += token1_holders_delta;
        store.upsert_token(&token1).await?;

        let records = store.get_otc_records(oid).await?;
        let mut token2 = token2;
        let mut token2_holders_delta = 0i64;
        for record in &records {
            fetch_or_clone(store, &mut balances, &record.address, token2.id, &token2.tick, token2.dec).await?;
            credit(&mut balances, &record.address, token2.id, &record.amount_out, token2.dec, &mut token2_holders_delta);
        }
        token2.holders += token2_holders_delta;
        store.upsert_token(&token2).await?;
    }

    otc.valid = false;
    otc.execute_id = event.inscription_id.clone();
    store.upsert_otc(&otc).await?;
    let batch: Vec<Balance> = balances.into_values().collect();
    store.batch_upsert_balances(&batch).await?;
    accept(event);
    Ok(())
}
