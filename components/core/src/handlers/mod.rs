//! Instruction Handlers (C6): one module per ORC-20 opcode.

pub mod common;

mod burn;
mod deploy;
mod mint;
mod otc_buy;
mod otc_create;
mod otc_execute;
mod transfer;
mod upgrade;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use store_postgres::models::Event;
use store_postgres::Store;

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;
pub type HandlerFn = for<'a> fn(&'a mut Event, &'a Store, &'a config::IndexerConfig) -> HandlerFuture<'a>;

/// The static registry (spec §4.7): opcode name → handler, populated once at process start so
/// the set of known opcodes is fixed and exhaustively matched.
pub fn registry() -> HashMap<&'static str, HandlerFn> {
    let mut m: HashMap<&'static str, HandlerFn> = HashMap::new();
    m.insert("deploy", deploy::handle);
    m.insert("mint", mint::handle);
    m.insert("burn", burn::handle);
    m.insert("transfer", transfer::handle);
    m.insert("upgrade", upgrade::handle);
    m.insert("otc-create", otc_create::handle);
    m.insert("otc-buy", otc_buy::handle);
    m.insert("otc-execute", otc_execute::handle);
    m
}
