//! Shared plumbing for every instruction handler (C6): marking an event's outcome, pulling the
//! `params` object out of `content`, and the `handle_inscribe` routine every two-phase op
//! delegates to on its INSCRIBE leg.

use serde_json::{Map, Value};
use store_postgres::models::Event;
use store_postgres::Store;

/// Marks `event` as successfully handled.
pub fn accept(event: &mut Event) {
    event.valid = true;
    event.error = String::new();
    event.handled = true;
}

/// Marks `event` as rejected with `reason`; no state mutation has occurred (or must be rolled
/// back by the caller before calling this).
pub fn reject(event: &mut Event, reason: impl Into<String>) {
    event.valid = false;
    event.error = reason.into();
    event.handled = true;
}

/// Extracts `content.params` as a JSON object. `Dispatcher` already verified `params` is
/// non-empty before routing here, but handlers are also called directly in tests, so this stays
/// defensive.
pub fn params(event: &Event) -> Result<Map<String, Value>, String> {
    event
        .content
        .get("params")
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| "params must be a JSON object".to_string())
}

/// Shared INSCRIBE-leg routine (spec §4.6): appends the inscription id to the receiver's pending
/// set (idempotent on re-run) and marks the event accepted. The actual state mutation happens on
/// the later TRANSFER event.
pub async fn handle_inscribe(event: &mut Event, store: &Store) -> Result<(), String> {
    store.pending_inscribe(&event.receiver, &event.inscription_id).await?;
    accept(event);
    Ok(())
}

/// Applies a `holders` delta when a balance crosses the zero boundary: `before == 0 && after > 0`
/// increments, `before > 0 && after == 0` decrements, otherwise no change.
pub fn holders_delta(before_zero: bool, after_zero: bool) -> i64 {
    match (before_zero, after_zero) {
        (true, false) => 1,
        (false, true) => -1,
        _ => 0,
    }
}
