pub mod error;
pub mod fields;

pub use error::ParseError;

use serde_json::{Map, Value};
use store_postgres::models::Token;
use store_postgres::Store;

/// Validates a `tick`/`tid` pair against a loaded token: the token referenced by `tid` must
/// exist, and its `tick` must match (case-insensitively; `fields::parse_tick` already
/// lowercases). Returns the loaded token.
pub async fn parse_tick_and_tid(
    store: &Store,
    params: &Map<String, Value>,
    tick_field: &str,
    tid_field: &str,
) -> Result<Token, String> {
    let tick = fields::parse_tick(params, tick_field)?;
    let tid = fields::parse_id(params, tid_field)?;
    let token = store
        .get_token(tid)
        .await?
        .ok_or_else(|| format!("token {tid} does not exist"))?;
    if token.tick != tick {
        return Err(format!("tick '{tick}' does not match token {tid}'s tick '{}'", token.tick));
    }
    Ok(token)
}

/// OTC's two-sided tick/tid pair: loads both tokens, requiring `tid1 != tid2`.
pub async fn parse_double_tick_and_tid(
    store: &Store,
    params: &Map<String, Value>,
) -> Result<(Token, Token), String> {
    let token1 = parse_tick_and_tid(store, params, "tick1", "tid1").await?;
    let token2 = parse_tick_and_tid(store, params, "tick2", "tid2").await?;
    if token1.id == token2.id {
        return Err("tid1 and tid2 must be distinct".to_string());
    }
    Ok((token1, token2))
}

/// `parse_tick_and_tid` plus seeding `event.function_id := tid`, for handlers whose event subject
/// is the referenced token id rather than the deploy's own inscription number.
pub async fn parse_tick_and_tid_and_function_id(
    store: &Store,
    params: &Map<String, Value>,
    tick_field: &str,
    tid_field: &str,
) -> Result<(Token, i64), String> {
    let token = parse_tick_and_tid(store, params, tick_field, tid_field).await?;
    Ok((token.clone(), token.id))
}
