//! upgrade (spec §4.6.5): two-phase. Only the deployer may upgrade an `ug`-enabled token's
//! `max`/`lim`/`ug`/`mp` fields.

use store_postgres::models::{Event, EventType};
use store_postgres::Store;

use super::common::{accept, handle_inscribe, params, reject};
use super::HandlerFuture;
use crate::parse::fields;

const ALLOWED: &[&str] = &["tick", "tid", "max", "lim", "ug", "mp"];

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
    if event.sender != token.deployer {
        reject(event, "only the deployer may upgrade this token");
        return Ok(());
    }
    if !token.ug {
        reject(event, "token is not upgradable");
        return Ok(());
    }

    let has_max = p.contains_key("max");
    let has_lim = p.contains_key("lim");
    let has_ug = p.contains_key("ug");
    let has_mp = p.contains_key("mp");
    if !(has_max || has_lim || has_ug || has_mp) {
        reject(event, "at least one of max, lim, ug, mp must be present");
        return Ok(());
    }

    if has_max {
        let new_max = match fields::parse_amount(&p, "max", token.dec, None, false) {
            Ok(v) => v,
            Err(e) => {
                reject(event, e.to_string());
                return Ok(());
            }
        };
        if new_max <= token.max {
            reject(event, "max must strictly increase on upgrade");
            return Ok(());
        }
        token.max = new_max;
    }
    if has_lim {
        match fields::parse_amount(&p, "lim", token.dec, Some(&token.max), false) {
            Ok(v) => token.lim = v,
            Err(e) => {
                reject(event, e.to_string());
                return Ok(());
            }
        }
    }
    if has_ug {
        match fields::parse_bool_flag(&p, "ug") {
            Ok(v) => token.ug = v,
            Err(e) => {
                reject(event, e.to_string());
                return Ok(());
            }
        }
    }
    if has_mp {
        match fields::parse_bool_flag(&p, "mp") {
            Ok(v) => token.mp = v,
            Err(e) => {
                reject(event, e.to_string());
                return Ok(());
            }
        }
    }

    token.last_upgrade_time = event.timestamp;
    token.upgrade_records.push(event.inscription_id.clone());
    store.upsert_token(&token).await?;
    accept(event);
    Ok(())
}
