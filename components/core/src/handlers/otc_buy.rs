//! otc-buy (spec §4.6.7): two-phase. Escrows the buyer's tid2 offer against an open OTC order;
//! settlement happens later at otc-execute.

use store_postgres::models::{Event, EventType, OtcRecord};
use store_postgres::Store;

use super::common::{accept, handle_inscribe, params, reject};
use super::HandlerFuture;
use crate::arithmetic;
use crate::parse::fields;

const ALLOWED: &[&str] = &["oid", "tick", "tid", "amt"];

pub fn handle<'a>(event: &'a mut Event, store: &'a Store, _cfg: &'a config::IndexerConfig) -> HandlerFuture<'a> {
    Box::pin(run(event, store))
}

async fn run(event: &mut Event, store: &Store) -> Result<(), String> {
    if event.event_type == EventType::Inscribe {
        return handle_inscribe(event, store).await;
    }

    if !store.pending_consume(&event.sender, &event.inscription_id).await? {
        reject(event, "inscription is not pending for this address");
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
    if otc.dl < event.timestamp {
        reject(event, "otc has expired");
        return Ok(());
    }

    let tick = match fields::parse_tick(&p, "tick") {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };
    let tid = match fields::parse_id(&p, "tid") {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };
    if tid != otc.tid2 || tick != otc.tick2 {
        reject(event, "tick/tid must match the otc's requested asset");
        return Ok(());
    }

    let token1 = store
        .get_token(otc.tid1)
        .await?
        .ok_or_else(|| format!("token {} vanished from under an open otc", otc.tid1))?;
    let token2 = store
        .get_token(otc.tid2)
        .await?
        .ok_or_else(|| format!("token {} vanished from under an open otc", otc.tid2))?;

    let ask_total = arithmetic::mul(&otc.supply, &otc.er, token2.dec);
    let remaining = arithmetic::sub(&ask_total, &otc.received, token2.dec);
    if arithmetic::is_zero(&remaining) {
        reject(event, "otc is sold out");
        return Ok(());
    }

    let amt = match fields::parse_amount(&p, "amt", token2.dec, Some(&remaining), false) {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };
    if amt < otc.mba {
        reject(event, "amt is below the otc's minimum buy amount");
        return Ok(());
    }

    let mut buyer_balance = store
        .get_balance_or_default(&event.sender, token2.id, &token2.tick, &event.inscription_id, token2.dec)
        .await?;
    if amt > buyer_balance.available_balance {
        reject(event, "amt exceeds the buyer's available balance");
        return Ok(());
    }

    buyer_balance.available_balance = arithmetic::sub(&buyer_balance.available_balance, &amt, token2.dec);
    buyer_balance.balance = arithmetic::sub(&buyer_balance.balance, &amt, token2.dec);

    otc.received = arithmetic::add(&otc.received, &amt, token2.dec);
    let amount_in = arithmetic::div(&amt, &otc.er, token1.dec)?;
    let record = OtcRecord {
        id: crate::ids::random_id(),
        oid,
        inscription_id: event.inscription_id.clone(),
        address: event.sender.clone(),
        amount_out: amt,
        amount_in,
    };

    store.upsert_otc(&otc).await?;
    store.upsert_balance(&buyer_balance).await?;
    store.upsert_otc_record(&record).await?;
    accept(event);
    Ok(())
}
