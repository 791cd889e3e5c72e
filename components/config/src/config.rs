use std::env;

/// A Postgres configuration for the indexer's own state store.
#[derive(Clone, Debug)]
pub struct PgDatabaseConfig {
    pub user: String,
    pub passwd: Option<String>,
    pub db: String,
    pub host: String,
    pub port: u16,
}

/// The upstream, read-only MySQL database populated by the inscription-transaction indexer.
#[derive(Clone, Debug)]
pub struct MysqlConfig {
    pub user: String,
    pub passwd: Option<String>,
    pub db: String,
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct BitcoindConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct ElectrsConfig {
    pub endpoint: String,
}

#[derive(Clone, Debug)]
pub struct OrdConfig {
    pub endpoint: String,
}

#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Clone, Debug)]
pub struct AlertConfig {
    pub webhook_url: Option<String>,
    pub bark_tokens: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct IndexerConfig {
    pub core_start_block_height: u64,
    pub otc_start_block_height: u64,
    pub snapshot_dir: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bitcoind: BitcoindConfig,
    pub pgsql: PgDatabaseConfig,
    pub mysql: MysqlConfig,
    pub electrs: ElectrsConfig,
    pub ord: OrdConfig,
    pub redis: RedisConfig,
    pub alert: AlertConfig,
    pub indexer: IndexerConfig,
}

fn required(name: &str) -> Result<String, String> {
    env::var(name).map_err(|_| format!("missing required environment variable {name}"))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn optional_or(name: &str, default: &str) -> String {
    optional(name).unwrap_or_else(|| default.to_string())
}

fn required_u64(name: &str) -> Result<u64, String> {
    required(name)?
        .parse::<u64>()
        .map_err(|e| format!("{name} must be an integer: {e}"))
}

fn optional_u16(name: &str, default: u16) -> Result<u16, String> {
    match optional(name) {
        Some(v) => v.parse::<u16>().map_err(|e| format!("{name} must be a port number: {e}")),
        None => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables, per the external-interfaces contract.
    /// Also loads a `.env` file if present (development convenience), mirroring `environs`'
    /// dotenv support in the original implementation.
    pub fn from_env() -> Result<Config, String> {
        let _ = dotenvy::dotenv();

        let bitcoind = BitcoindConfig {
            endpoint: required("BITCOIND_ENDPOINT")?,
            username: required("BITCOIND_USERNAME")?,
            password: required("BITCOIND_PASSWORD")?,
        };

        let pgsql = PgDatabaseConfig {
            user: required("PGSQL_USER")?,
            passwd: optional("PGSQL_PASSWD"),
            db: required("PGSQL_DB")?,
            host: required("PGSQL_HOST")?,
            port: optional_u16("PGSQL_PORT", 5432)?,
        };

        let mysql = MysqlConfig {
            user: required("MYSQL_USER")?,
            passwd: optional("MYSQL_PASSWD"),
            db: required("MYSQL_DB")?,
            host: required("MYSQL_HOST")?,
            port: optional_u16("MYSQL_PORT", 3306)?,
        };

        let electrs = ElectrsConfig {
            endpoint: required("ELECTRS_ENDPOINT")?,
        };

        let ord = OrdConfig {
            endpoint: required("ORD_ENDPOINT")?,
        };

        let redis = RedisConfig {
            url: optional_or("REDIS_URL", "redis://127.0.0.1:6379"),
        };

        let bark_tokens = optional("BARK_TOKENS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let alert = AlertConfig {
            webhook_url: optional("ALERT_WEBHOOK_URL"),
            bark_tokens,
        };

        let indexer = IndexerConfig {
            core_start_block_height: required_u64("CORE_START_BLOCK_HEIGHT")?,
            // Unset means "always enabled": OTC handlers are gated by `height >= otc_start`, and 0
            // is always satisfied.
            otc_start_block_height: match optional("OTC_START_BLOCK_HEIGHT") {
                Some(v) => v.parse::<u64>().map_err(|e| format!("OTC_START_BLOCK_HEIGHT must be an integer: {e}"))?,
                None => 0,
            },
            snapshot_dir: optional_or("SNAPSHOT_DIR", "./snapshot"),
        };

        Ok(Config {
            bitcoind,
            pgsql,
            mysql,
            electrs,
            ord,
            redis,
            alert,
            indexer,
        })
    }

    /// A config suitable for unit tests that never touch the environment.
    pub fn test_default() -> Config {
        Config {
            bitcoind: BitcoindConfig {
                endpoint: "http://127.0.0.1:18443".into(),
                username: "devnet".into(),
                password: "devnet".into(),
            },
            pgsql: PgDatabaseConfig {
                user: "postgres".into(),
                passwd: Some("postgres".into()),
                db: "orc20_test".into(),
                host: "localhost".into(),
                port: 5432,
            },
            mysql: MysqlConfig {
                user: "root".into(),
                passwd: None,
                db: "orc20_upstream_test".into(),
                host: "localhost".into(),
                port: 3306,
            },
            electrs: ElectrsConfig {
                endpoint: "http://127.0.0.1:3002".into(),
            },
            ord: OrdConfig {
                endpoint: "http://127.0.0.1:8080".into(),
            },
            redis: RedisConfig {
                url: "redis://127.0.0.1:6379".into(),
            },
            alert: AlertConfig {
                webhook_url: None,
                bark_tokens: vec![],
            },
            indexer: IndexerConfig {
                core_start_block_height: 1,
                otc_start_block_height: 0,
                snapshot_dir: "./snapshot".into(),
            },
        }
    }
}
