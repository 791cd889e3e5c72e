//! mint (spec §4.6.2): INSCRIBE-only. Credits `amt` of an existing token to the receiver.

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
    if event.event_type != EventType::Inscribe {
        reject(event, "mint must be an INSCRIBE event");
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

    let amt = match fields::parse_amount(&p, "amt", token.dec, Some(&token.lim), false) {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };
    if token.mp && event.receiver != token.deployer {
        reject(event, "token minting is protected: only the deployer may mint");
        return Ok(());
    }
    let remaining = arithmetic::sub(&token.max, &token.minted, token.dec);
    if remaining < amt {
        reject(event, "amt exceeds the token's remaining mintable supply");
        return Ok(());
    }

    let was_first_mint = arithmetic::is_zero(&token.minted);
    token.minted = arithmetic::add(&token.minted, &amt, token.dec);
    token.circulating = arithmetic::add(&token.circulating, &amt, token.dec);
    if was_first_mint {
        token.first_number = event.inscription_number;
        token.first_id = event.inscription_id.clone();
        token.first_time = event.timestamp;
    }
    if arithmetic::is_zero(&arithmetic::sub(&token.max, &token.minted, token.dec)) {
        token.last_number = event.inscription_number;
        token.last_id = event.inscription_id.clone();
        token.last_time = event.timestamp;
    }

    let mut balance = store
        .get_balance_or_default(&event.receiver, tid, &token.tick, &event.inscription_id, token.dec)
        .await?;
    let prior_was_zero = arithmetic::is_zero(&balance.balance);
    balance.balance = arithmetic::add(&balance.balance, &amt, token.dec);
    balance.available_balance = arithmetic::add(&balance.available_balance, &amt, token.dec);
    if prior_was_zero {
        token.holders += 1;
    }

    store.upsert_token(&token).await?;
    store.upsert_balance(&balance).await?;
    accept(event);
    Ok(())
}
