mod config;
pub mod context;

pub use config::{
    AlertConfig, BitcoindConfig, Config, ElectrsConfig, IndexerConfig, MysqlConfig, OrdConfig,
    PgDatabaseConfig, RedisConfig,
};
pub use context::Context;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_internally_consistent() {
        let config = Config::test_default();
        assert_eq!(config.pgsql.port, 5432);
        assert_eq!(config.indexer.otc_start_block_height, 0);
    }
}
