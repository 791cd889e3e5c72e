//! transfer (spec §4.6.4): two-phase. INSCRIBE reserves `amt` into the inscriber's transferable
//! balance; TRANSFER settles it to whichever address the inscription's UTXO actually moved to
//! (self-transfer if the chain-level receiver is empty, i.e. a cancel).

use store_postgres::models::{Event, EventType};
use store_postgres::Store;

use super::common::{accept, params, reject};
use super::HandlerFuture;
use crate::arithmetic;
use crate::parse::fields;

const ALLOWED: &[&str] = &["tick", "tid", "amt"];

pub fn handle<'a>(event: &'a mut Event, store: &'a Store, _cfg: &'a config::IndexerConfig) -> HandlerFuture<'a> {
    Box::pin(run(event, store))
}

async fn run(event: &mut Event, store: &Store) -> Result<(), String> {
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
    let tid = match fields::parse_id(&p, "tid") {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };
    event.function_id = tid;
    let tick = match fields::parse_tick(&p, "tick") {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };
    let token = match store.get_token(tid).await? {
        Some(t) => t,
        None => {
            reject(event, format!("token {tid} does not exist"));
            return Ok(());
        }
    };
    if token.tick != tick {
        reject(event, format!("tick '{tick}' does not match token {tid}"));
        return Ok(());
    }

    if event.event_type == EventType::Inscribe {
        return handle_inscribe_leg(event, store, tid, &token.tick, token.dec, &p).await;
    }
    handle_transfer_leg(event, store, tid, &token.tick, token.dec).await
}

async fn handle_inscribe_leg(
    event: &mut Event,
    store: &Store,
    tid: i64,
    tick: &str,
    dec: i32,
    p: &serde_json::Map<String, serde_json::Value>,
) -> Result<(), String> {
    let mut balance = store
        .get_balance_or_default(&event.receiver, tid, tick, &event.inscription_id, dec)
        .await?;
    let amt = match fields::parse_amount(p, "amt", dec, Some(&balance.available_balance), false) {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };
    balance.available_balance = arithmetic::sub(&balance.available_balance, &amt, dec);
    balance.transferable_balance = arithmetic::add(&balance.transferable_balance, &amt, dec);
    store.upsert_balance(&balance).await?;
    store.pending_inscribe(&event.receiver, &event.inscription_id).await?;
    accept(event);
    Ok(())
}

async fn handle_transfer_leg(event: &mut Event, store: &Store, tid: i64, tick: &str, dec: i32) -> Result<(), String> {
    if !store.pending_consume(&event.sender, &event.inscription_id).await? {
        reject(event, "inscription is not pending for this address");
        return Ok(());
    }
    if event.receiver.is_empty() {
        event.receiver = event.sender.clone();
    }

    let p = params(event)?;
    let amt = match fields::parse_amount(&p, "amt", dec, None, false) {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };

    let mut sender_balance = store.get_balance_or_default(&event.sender, tid, tick, &event.inscription_id, dec).await?;
    if amt > sender_balance.transferable_balance {
        reject(event, "amt exceeds the sender's reserved transferable balance");
        return Ok(());
    }

    if event.sender == event.receiver {
        sender_balance.transferable_balance = arithmetic::sub(&sender_balance.transferable_balance, &amt, dec);
        sender_balance.available_balance = arithmetic::add(&sender_balance.available_balance, &amt, dec);
        store.upsert_balance(&sender_balance).await?;
        accept(event);
        return Ok(());
    }

    let mut token = store
        .get_token(tid)
        .await?
        .ok_or_else(|| format!("token {tid} vanished mid-transfer"))?;

    let sender_was_zero_before = arithmetic::is_zero(&sender_balance.balance);
    sender_balance.transferable_balance = arithmetic::sub(&sender_balance.transferable_balance, &amt, dec);
    sender_balance.balance = arithmetic::sub(&sender_balance.balance, &amt, dec);
    let sender_is_zero_after = arithmetic::is_zero(&sender_balance.balance);
    token.holders += crate::handlers::common::holders_delta(sender_was_zero_before, sender_is_zero_after);

    let mut receiver_balance = store
        .get_balance_or_default(&event.receiver, tid, &sender_balance.tick, &event.inscription_id, dec)
        .await?;
    let receiver_was_zero_before = arithmetic::is_zero(&receiver_balance.balance);
    receiver_balance.available_balance = arithmetic::add(&receiver_balance.available_balance, &amt, dec);
    receiver_balance.balance = arithmetic::add(&receiver_balance.balance, &amt, dec);
    let receiver_is_zero_after = arithmetic::is_zero(&receiver_balance.balance);
    token.holders += crate::handlers::common::holders_delta(receiver_was_zero_before, receiver_is_zero_after);

    store.upsert_token(&token).await?;
    store
        .batch_upsert_balances(&[sender_balance, receiver_balance])
        .await?;
    accept(event);
    Ok(())
}
