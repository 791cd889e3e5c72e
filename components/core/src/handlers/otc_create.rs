//! otc-create (spec §4.6.6): two-phase. Escrows `supply` of tid1 and opens an order asking `er`
//! of tid2 per unit of tid1, gated on `OTC_START_BLOCK_HEIGHT`.

use bigdecimal::BigDecimal;
use store_postgres::models::{Event, EventType, Otc};
use store_postgres::Store;

use super::common::{accept, handle_inscribe, params, reject};
use super::HandlerFuture;
use crate::arithmetic;
use crate::parse::fields;
use crate::parse::parse_double_tick_and_tid;

const ALLOWED: &[&str] = &["tick1", "tid1", "tick2", "tid2", "supply", "er", "dl", "mba"];

pub fn handle<'a>(event: &'a mut Event, store: &'a Store, cfg: &'a config::IndexerConfig) -> HandlerFuture<'a> {
    Box::pin(run(event, store, cfg))
}

async fn run(event: &mut Event, store: &Store, cfg: &config::IndexerConfig) -> Result<(), String> {
    if event.block_height < cfg.otc_start_block_height as i64 {
        reject(event, "otc is not yet enabled at this block height");
        return Ok(());
    }

    if event.event_type == EventType::Inscribe {
        return handle_inscribe(event, store).await;
    }

    if !store.pending_consume(&event.sender, &event.inscription_id).await? {
        reject(event, "inscription is not pending for this address");
        return Ok(());
    }
    event.function_id = event.inscription_number;

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

    let (token1, token2) = match parse_double_tick_and_tid(store, &p).await {
        Ok(v) => v,
        Err(e) => {
            reject(event, e);
            return Ok(());
        }
    };

    let supply = match fields::parse_amount(&p, "supply", token1.dec, None, false) {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };
    let er = match fields::parse_amount(&p, "er", token2.dec, None, false) {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };
    let dl = match fields::parse_deadline(&p, "dl", event.timestamp) {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };
    let mba = match p.get("mba") {
        Some(_) => match fields::parse_amount(&p, "mba", token2.dec, None, false) {
            Ok(v) => v,
            Err(e) => {
                reject(event, e.to_string());
                return Ok(());
            }
        },
        None => arithmetic::truncate(&BigDecimal::from(1), token2.dec),
    };

    let ask_total = arithmetic::mul(&supply, &er, token2.dec);
    if ask_total < mba {
        reject(event, "supply * er must be at least mba");
        return Ok(());
    }

    let mut token1 = token1;
    let mut sender_balance = store
        .get_balance_or_default(&event.sender, token1.id, &token1.tick, &event.inscription_id, token1.dec)
        .await?;
    if supply > sender_balance.available_balance {
        reject(event, "supply exceeds the sender's available balance");
        return Ok(());
    }

    let was_zero_before = arithmetic::is_zero(&sender_balance.balance);
    sender_balance.available_balance = arithmetic::sub(&sender_balance.available_balance, &supply, token1.dec);
    sender_balance.balance = arithmetic::sub(&sender_balance.balance, &supply, token1.dec);
    if !was_zero_before && arithmetic::is_zero(&sender_balance.balance) {
        token1.holders -= 1;
    }

    let otc = Otc {
        id: event.inscription_number,
        tick1: token1.tick.clone(),
        tid1: token1.id,
        supply,
        tick2: token2.tick.clone(),
        tid2: token2.id,
        er,
        mba,
        dl,
        owner: event.sender.clone(),
        deploy_time: event.timestamp,
        inscription_id: event.inscription_id.clone(),
        valid: true,
        success: false,
        received: arithmetic::zero(token2.dec),
        execute_id: String::new(),
    };

    store.upsert_token(&token1).await?;
    store.upsert_balance(&sender_balance).await?;
    store.upsert_otc(&otc).await?;
    accept(event);
    Ok(())
}
