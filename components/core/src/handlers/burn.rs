//! burn (spec §4.6.3): two-phase. The INSCRIBE leg only registers intent; the TRANSFER leg
//! actually destroys `amt` of the sender's balance.

use store_postgres::models::{Event, EventType};
use store_postgres::Store;

use super::common::{accept, handle_inscribe, params, reject};
use super::HandlerFuture;
use crate::arithmetic;
use crate::parse::fields;

const ALLOWED: &[&str] = &["tick", "tid", "amt"];

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
    let mut token = match store.get_token(tid).await? {
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

    let mut balance = store
        .get_balance_or_default(&event.sender, tid, &token.tick, &event.inscription_id, token.dec)
        .await?;
    let amt = match fields::parse_amount(&p, "amt", token.dec, Some(&balance.available_balance), false) {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };

    balance.balance = arithmetic::sub(&balance.balance, &amt, token.dec);
    balance.available_balance = arithmetic::sub(&balance.available_balance, &amt, token.dec);
    if arithmetic::is_zero(&balance.balance) {
        token.holders -= 1;
    }
    token.burned = arithmetic::add(&token.burned, &amt, token.dec);
    token.circulating = arithmetic::sub(&token.circulating, &amt, token.dec);

    store.upsert_token(&token).await?;
    store.upsert_balance(&balance).await?;
    accept(event);
    Ok(())
}
