//! Row models for every entity in the data model (spec §3). These are plain data, with no
//! validation logic attached — validation lives in the instruction handlers (the `core` crate).

use bigdecimal::BigDecimal;
use serde_json::Value;
use tokio_postgres::Row;

use crate::types::PgNumeric;
use crate::FromPgRow;

#[derive(Clone, Debug, PartialEq, Eq, Copy)]
pub enum EventType {
    Inscribe,
    Transfer,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Inscribe => "INSCRIBE",
            EventType::Transfer => "TRANSFER",
        }
    }

    pub fn from_str(s: &str) -> Result<EventType, String> {
        match s.to_uppercase().as_str() {
            "INSCRIBE" => Ok(EventType::Inscribe),
            "TRANSFER" => Ok(EventType::Transfer),
            other => Err(format!("unknown event_type {other}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Token {
    pub id: i64,
    pub tick: String,
    pub max: BigDecimal,
    pub lim: BigDecimal,
    pub dec: i32,
    pub ug: bool,
    pub mp: bool,
    pub deployer: String,
    pub deploy_time: i64,
    pub inscription_id: String,
    pub first_number: i64,
    pub first_id: String,
    pub first_time: i64,
    pub last_number: i64,
    pub last_id: String,
    pub last_time: i64,
    pub minted: BigDecimal,
    pub burned: BigDecimal,
    pub circulating: BigDecimal,
    pub holders: i64,
    pub last_upgrade_time: i64,
    pub upgrade_records: Vec<String>,
}

impl FromPgRow for Token {
    fn from_pg_row(row: &Row) -> Self {
        Token {
            id: row.get("id"),
            tick: row.get("tick"),
            max: row.get::<_, PgNumeric>("max").0,
            lim: row.get::<_, PgNumeric>("lim").0,
            dec: row.get("dec"),
            ug: row.get("ug"),
            mp: row.get("mp"),
            deployer: row.get("deployer"),
            deploy_time: row.get("deploy_time"),
            inscription_id: row.get("inscription_id"),
            first_number: row.get("first_number"),
            first_id: row.get("first_id"),
            first_time: row.get("first_time"),
            last_number: row.get("last_number"),
            last_id: row.get("last_id"),
            last_time: row.get("last_time"),
            minted: row.get::<_, PgNumeric>("minted").0,
            burned: row.get::<_, PgNumeric>("burned").0,
            circulating: row.get::<_, PgNumeric>("circulating").0,
            holders: row.get("holders"),
            last_upgrade_time: row.get("last_upgrade_time"),
            upgrade_records: row.get("upgrade_records"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Balance {
    pub id: String,
    pub tick: String,
    pub tid: i64,
    pub inscription_id: String,
    pub address: String,
    pub balance: BigDecimal,
    pub available_balance: BigDecimal,
    pub transferable_balance: BigDecimal,
    pub original_balance: BigDecimal,
}

impl Balance {
    pub fn balance_key(address: &str, tid: i64) -> String {
        format!("{address}-{tid}")
    }
}

impl FromPgRow for Balance {
    fn from_pg_row(row: &Row) -> Self {
        Balance {
            id: row.get("id"),
            tick: row.get("tick"),
            tid: row.get("tid"),
            inscription_id: row.get("inscription_id"),
            address: row.get("address"),
            balance: row.get::<_, PgNumeric>("balance").0,
            available_balance: row.get::<_, PgNumeric>("available_balance").0,
            transferable_balance: row.get::<_, PgNumeric>("transferable_balance").0,
            original_balance: row.get::<_, PgNumeric>("original_balance").0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PendingInscriptions {
    pub id: String,
    pub inscriptions: Vec<String>,
}

impl FromPgRow for PendingInscriptions {
    fn from_pg_row(row: &Row) -> Self {
        PendingInscriptions {
            id: row.get("id"),
            inscriptions: row.get("inscriptions"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Otc {
    pub id: i64,
    pub tick1: String,
    pub tid1: i64,
    pub supply: BigDecimal,
    pub tick2: String,
    pub tid2: i64,
    pub er: BigDecimal,
    pub mba: BigDecimal,
    pub dl: i64,
    pub owner: String,
    pub deploy_time: i64,
    pub inscription_id: String,
    pub valid: bool,
    pub success: bool,
    pub received: BigDecimal,
    pub execute_id: String,
}

impl FromPgRow for Otc {
    fn from_pg_row(row: &Row) -> Self {
        Otc {
            id: row.get("id"),
            tick1: row.get("tick1"),
            tid1: row.get("tid1"),
            supply: row.get::<_, PgNumeric>("supply").0,
            tick2: row.get("tick2"),
            tid2: row.get("tid2"),
            er: row.get::<_, PgNumeric>("er").0,
            mba: row.get::<_, PgNumeric>("mba").0,
            dl: row.get("dl"),
            owner: row.get("owner"),
            deploy_time: row.get("deploy_time"),
            inscription_id: row.get("inscription_id"),
            valid: row.get("valid"),
            success: row.get("success"),
            received: row.get::<_, PgNumeric>("received").0,
            execute_id: row.get("execute_id"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct OtcRecord {
    pub id: String,
    pub oid: i64,
    pub inscription_id: String,
    pub address: String,
    pub amount_out: BigDecimal,
    pub amount_in: BigDecimal,
}

impl FromPgRow for OtcRecord {
    fn from_pg_row(row: &Row) -> Self {
        OtcRecord {
            id: row.get("id"),
            oid: row.get("oid"),
            inscription_id: row.get("inscription_id"),
            address: row.get("address"),
            amount_out: row.get::<_, PgNumeric>("amount_out").0,
            amount_in: row.get::<_, PgNumeric>("amount_in").0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Event {
    pub id: String,
    pub event_type: EventType,
    pub block_height: i64,
    pub block_index: i64,
    pub timestamp: i64,
    pub inscription_id: String,
    pub inscription_number: i64,
    pub sender: String,
    pub receiver: String,
    pub content: Value,
    pub operation: String,
    pub function_id: i64,
    pub valid: bool,
    pub error: String,
    pub handled: bool,
}

impl FromPgRow for Event {
    fn from_pg_row(row: &Row) -> Self {
        Event {
            id: row.get("id"),
            event_type: EventType::from_str(row.get("event_type")).expect("valid event_type"),
            block_height: row.get("block_height"),
            block_index: row.get("block_index"),
            timestamp: row.get("timestamp"),
            inscription_id: row.get("inscription_id"),
            inscription_number: row.get("inscription_number"),
            sender: row.get("sender"),
            receiver: row.get("receiver"),
            content: row.get("content"),
            operation: row.get("operation"),
            function_id: row.get("function_id"),
            valid: row.get("valid"),
            error: row.get("error"),
            handled: row.get("handled"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BackupHeight {
    pub id: i32,
    pub block_height: i64,
}

impl FromPgRow for BackupHeight {
    fn from_pg_row(row: &Row) -> Self {
        BackupHeight {
            id: row.get("id"),
            block_height: row.get("block_height"),
        }
    }
}
