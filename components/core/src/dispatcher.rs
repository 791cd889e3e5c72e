//! Dispatcher (C7): validates an event's envelope, routes it to the registered opcode handler,
//! and persists the outcome.

use config::{try_debug, Context, IndexerConfig};
use store_postgres::models::Event;
use store_postgres::Store;

use crate::handlers::{self, HandlerFn};

const ALLOWED_TOP_LEVEL_KEYS: &[&str] = &["p", "op", "params"];

/// Dispatches one event in place: on success or rejection alike, `event` ends with `handled =
/// true` and `valid`/`error`/`function_id` set, and has already been persisted to `store`.
pub async fn dispatch(
    event: &mut Event,
    store: &Store,
    cfg: &IndexerConfig,
    registry: &std::collections::HashMap<&'static str, HandlerFn>,
    ctx: &Context,
) -> Result<(), String> {
    if let Err(reason) = validate_envelope(event, registry) {
        event.valid = false;
        event.error = reason;
        event.handled = true;
        store.upsert_event(event).await?;
        return Ok(());
    }

    let op = event
        .content
        .get("op")
        .and_then(|v| v.as_str())
        .expect("validate_envelope already confirmed op is a non-empty string")
        .to_lowercase();
    let handler = registry
        .get(op.as_str())
        .expect("validate_envelope already confirmed op is registered");

    // Handlers must not observe or leave behind a mutated `content`; defensively snapshot it.
    let original_content = event.content.clone();
    let result = handler(event, store, cfg).await;
    event.content = original_content;

    result?;
    try_debug!(ctx, "dispatched event {} (op={}, valid={})", event.id, op, event.valid);
    store.upsert_event(event).await?;
    Ok(())
}

fn validate_envelope(event: &Event, registry: &std::collections::HashMap<&'static str, HandlerFn>) -> Result<(), String> {
    let obj = event
        .content
        .as_object()
        .ok_or_else(|| "content must be a JSON object".to_string())?;
    for key in obj.keys() {
        if !ALLOWED_TOP_LEVEL_KEYS.contains(&key.as_str()) {
            return Err(format!("unknown top-level key '{key}'"));
        }
    }
    let p = obj
        .get("p")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "missing or non-string 'p'".to_string())?;
    if !p.eq_ignore_ascii_case("orc-20") {
        return Err(format!("unsupported protocol '{p}'"));
    }
    let op = obj
        .get("op")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "missing or non-string 'op'".to_string())?;
    if op.is_empty() {
        return Err("op must not be empty".to_string());
    }
    if !registry.contains_key(op.to_lowercase().as_str()) {
        return Err(format!("unknown op '{op}'"));
    }
    let params = obj
        .get("params")
        .and_then(|v| v.as_object())
        .ok_or_else(|| "missing or non-object 'params'".to_string())?;
    if params.is_empty() {
        return Err("params must not be empty".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry_stub() -> std::collections::HashMap<&'static str, HandlerFn> {
        handlers::registry()
    }

    fn base_event(content: serde_json::Value) -> Event {
        Event {
            id: "evt1".to_string(),
            event_type: store_postgres::models::EventType::Inscribe,
            block_height: 100,
            block_index: 1,
            timestamp: 1000,
            inscription_id: "i1".to_string(),
            inscription_number: 5,
            sender: "A".to_string(),
            receiver: "A".to_string(),
            content,
            operation: String::new(),
            function_id: 0,
            valid: false,
            error: String::new(),
            handled: false,
        }
    }

    #[test]
    fn test_validate_envelope_rejects_unknown_op() {
        let registry = registry_stub();
        let event = base_event(json!({"p":"orc-20","op":"frobnicate","params":{"a":"1"}}));
        assert!(validate_envelope(&event, &registry).is_err());
    }

    #[test]
    fn test_validate_envelope_rejects_empty_params() {
        let registry = registry_stub();
        let event = base_event(json!({"p":"orc-20","op":"deploy","params":{}}));
        assert!(validate_envelope(&event, &registry).is_err());
    }

    #[test]
    fn test_validate_envelope_rejects_unknown_top_level_key() {
        let registry = registry_stub();
        let event = base_event(json!({"p":"orc-20","op":"deploy","params":{"tick":"foo"},"extra":"x"}));
        assert!(validate_envelope(&event, &registry).is_err());
    }

    #[test]
    fn test_validate_envelope_accepts_well_formed() {
        let registry = registry_stub();
        let event = base_event(json!({"p":"orc-20","op":"deploy","params":{"tick":"foo","max":"100"}}));
        assert!(validate_envelope(&event, &registry).is_ok());
    }
}
