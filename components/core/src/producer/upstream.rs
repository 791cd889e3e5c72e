//! Upstream MySQL reads (spec §6): the read-only `inscription`/`inscription_transaction` tables
//! populated by the external inscription-transaction discovery service.

use config::MysqlConfig;
use mysql_async::prelude::*;
use mysql_async::{Pool, Row};

#[derive(Clone, Debug)]
pub struct InscriptionRow {
    pub inscription_id: String,
    pub inscription_number: i64,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct InscriptionTransactionRow {
    pub inscription_id: String,
    pub inscription_number: i64,
    pub genesis_tx: bool,
    pub prev_owner: String,
    pub current_owner: String,
    pub block_height: i64,
    pub block_index: i64,
}

#[derive(Clone)]
pub struct UpstreamStore {
    pool: Pool,
}

impl UpstreamStore {
    pub fn new(config: &MysqlConfig) -> UpstreamStore {
        let url = format!(
            "mysql://{}:{}@{}:{}/{}",
            config.user,
            config.passwd.clone().unwrap_or_default(),
            config.host,
            config.port,
            config.db,
        );
        UpstreamStore { pool: Pool::new(url.as_str()) }
    }

    /// `true` once every transaction in `[height*10000, height*10000+9999]` is `handled=true`.
    pub async fn block_fully_handled(&self, height: i64) -> Result<bool, String> {
        let mut conn = self.pool.get_conn().await.map_err(|e| format!("upstream: connect: {e}"))?;
        let (lo, hi) = block_index_range(height);
        let pending: Option<i64> = conn
            .exec_first(
                "SELECT COUNT(*) FROM inscription_transaction \
                 WHERE block_index BETWEEN ? AND ? AND handled = false",
                (lo, hi),
            )
            .await
            .map_err(|e| format!("upstream: block_fully_handled: {e}"))?;
        Ok(pending.unwrap_or(0) == 0)
    }

    pub async fn inscription_transactions_for_block(&self, height: i64) -> Result<Vec<InscriptionTransactionRow>, String> {
        let mut conn = self.pool.get_conn().await.map_err(|e| format!("upstream: connect: {e}"))?;
        let (lo, hi) = block_index_range(height);
        let rows: Vec<Row> = conn
            .exec(
                "SELECT inscription_id, inscription_number, genesis_tx, prev_owner, current_owner, \
                        block_height, block_index \
                 FROM inscription_transaction \
                 WHERE block_index BETWEEN ? AND ? \
                 ORDER BY block_index ASC",
                (lo, hi),
            )
            .await
            .map_err(|e| format!("upstream: inscription_transactions_for_block: {e}"))?;
        Ok(rows
            .into_iter()
            .map(|mut row| InscriptionTransactionRow {
                inscription_id: row.take("inscription_id").unwrap_or_default(),
                inscription_number: row.take("inscription_number").unwrap_or_default(),
                genesis_tx: row.take("genesis_tx").unwrap_or_default(),
                prev_owner: row.take("prev_owner").unwrap_or_default(),
                current_owner: row.take("current_owner").unwrap_or_default(),
                block_height: row.take("block_height").unwrap_or_default(),
                block_index: row.take("block_index").unwrap_or_default(),
            })
            .collect())
    }

    pub async fn inscriptions_by_ids(&self, ids: &[String]) -> Result<Vec<InscriptionRow>, String> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let mut conn = self.pool.get_conn().await.map_err(|e| format!("upstream: connect: {e}"))?;
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query = format!(
            "SELECT inscription_id, inscription_number, content_type, content \
             FROM inscription WHERE inscription_id IN ({placeholders})"
        );
        let params: Vec<mysql_async::Value> = ids.iter().map(|id| id.as_str().into()).collect();
        let rows: Vec<Row> = conn
            .exec(query.as_str(), mysql_async::Params::Positional(params))
            .await
            .map_err(|e| format!("upstream: inscriptions_by_ids: {e}"))?;
        Ok(rows
            .into_iter()
            .map(|mut row| InscriptionRow {
                inscription_id: row.take("inscription_id").unwrap_or_default(),
                inscription_number: row.take("inscription_number").unwrap_or_default(),
                content_type: row.take("content_type").unwrap_or_default(),
                content: row.take("content").unwrap_or_default(),
            })
            .collect())
    }
}

fn block_index_range(height: i64) -> (i64, i64) {
    (height * 10000, height * 10000 + 9999)
}
