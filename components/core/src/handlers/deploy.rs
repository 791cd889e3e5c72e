//! deploy (spec §4.6.1): INSCRIBE-only. Creates a new token keyed by the deploying inscription's
//! number.

use store_postgres::models::{Event, EventType, Token};
use store_postgres::Store;

use super::common::{accept, params, reject};
use super::HandlerFuture;
use crate::arithmetic;
use crate::parse::fields;

const ALLOWED: &[&str] = &["tick", "max", "lim", "dec", "ug", "mp", "tid"];

pub fn handle<'a>(event: &'a mut Event, store: &'a Store, _cfg: &'a config::IndexerConfig) -> HandlerFuture<'a> {
    Box::pin(run(event, store))
}

async fn run(event: &mut Event, store: &Store) -> Result<(), String> {
    if event.event_type != EventType::Inscribe {
        reject(event, "deploy must be an INSCRIBE event");
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

    let tick = match fields::parse_tick(&p, "tick") {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };
    let dec = match fields::parse_dec(&p, "dec") {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };
    let max = match fields::parse_amount(&p, "max", dec, None, false) {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };
    let lim = match p.get("lim") {
        Some(_) => match fields::parse_amount(&p, "lim", dec, Some(&max), false) {
            Ok(v) => v,
            Err(e) => {
                reject(event, e.to_string());
                return Ok(());
            }
        },
        None => max.clone(),
    };
    let ug = match fields::parse_bool_flag(&p, "ug") {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };
    let mp = match fields::parse_bool_flag(&p, "mp") {
        Ok(v) => v,
        Err(e) => {
            reject(event, e.to_string());
            return Ok(());
        }
    };

    let token = Token {
        id: event.inscription_number,
        tick,
        max,
        lim,
        dec,
        ug,
        mp,
        deployer: event.receiver.clone(),
        deploy_time: event.timestamp,
        inscription_id: event.inscription_id.clone(),
        first_number: 0,
        first_id: String::new(),
        first_time: 0,
        last_number: 0,
        last_id: String::new(),
        last_time: 0,
        minted: arithmetic::zero(dec),
        burned: arithmetic::zero(dec),
        circulating: arithmetic::zero(dec),
        holders: 0,
        last_upgrade_time: 0,
        upgrade_records: Vec::new(),
    };
    store.upsert_token(&token).await?;
    accept(event);
    Ok(())
}
