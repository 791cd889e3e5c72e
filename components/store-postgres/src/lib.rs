pub mod backup;
pub mod migrations;
pub mod models;
pub mod store;
pub mod types;

use config::PgDatabaseConfig;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod, Transaction};
use tokio_postgres::{Client, Config, NoTls, Row};

pub use store::Store;

/// Standard chunk size to use when batching multiple query inserts into a single SQL statement,
/// to save on round trips without hitting Postgres' 65536 query-parameter limit.
pub const BATCH_QUERY_CHUNK_SIZE: usize = 500;

/// Creates a Postgres connection pool based on a single database config.
pub fn pg_pool(config: &PgDatabaseConfig) -> Result<Pool, String> {
    let mut pg_config = Config::new();
    pg_config
        .dbname(&config.db)
        .host(&config.host)
        .port(config.port)
        .user(&config.user);
    if let Some(password) = &config.passwd {
        pg_config.password(password);
    }
    let manager = Manager::from_config(
        pg_config,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );
    Pool::builder(manager)
        .build()
        .map_err(|e| format!("unable to build pg connection pool: {e}"))
}

/// A single-connection pool, used for the Coordinator's mempool dry-run pass: pinning the pool to
/// one connection means every `pg_pool_client` call during the pass is handed back the same
/// physical connection, so a manually-issued `BEGIN`/`ROLLBACK` around the pass actually scopes a
/// single transaction across otherwise-independent `Store` calls.
pub fn pg_pool_single(config: &PgDatabaseConfig) -> Result<Pool, String> {
    let mut pg_config = Config::new();
    pg_config
        .dbname(&config.db)
        .host(&config.host)
        .port(config.port)
        .user(&config.user);
    if let Some(password) = &config.passwd {
        pg_config.password(password);
    }
    let manager = Manager::from_config(
        pg_config,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );
    Pool::builder(manager)
        .max_size(1)
        .build()
        .map_err(|e| format!("unable to build single-connection pg pool: {e}"))
}

/// Returns a new pg connection client taken from a pool.
pub async fn pg_pool_client(pool: &Pool) -> Result<Object, String> {
    pool.get()
        .await
        .map_err(|e| format!("unable to get pg client: {e}"))
}

/// Returns a new pg transaction taken from an existing pool connection.
pub async fn pg_begin(client: &mut Object) -> Result<Transaction<'_>, String> {
    client
        .transaction()
        .await
        .map_err(|e| format!("unable to begin pg transaction: {e}"))
}

/// Connects to postgres directly (without a Pool) and returns an open client.
pub async fn pg_connect(config: &PgDatabaseConfig) -> Result<Client, String> {
    let mut pg_config = Config::new();
    pg_config
        .dbname(&config.db)
        .host(&config.host)
        .port(config.port)
        .user(&config.user);
    if let Some(password) = &config.passwd {
        pg_config.password(password);
    }
    match pg_config.connect(NoTls).await {
        Ok((client, connection)) => {
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    eprintln!("postgres connection error: {e}");
                }
            });
            Ok(client)
        }
        Err(e) => Err(format!("error connecting to postgres: {e}")),
    }
}

/// Connects to postgres with infinite retries and returns an open client.
pub async fn pg_connect_with_retry(config: &PgDatabaseConfig) -> Client {
    loop {
        match pg_connect(config).await {
            Ok(client) => return client,
            Err(e) => {
                eprintln!("error connecting to postgres: {e}");
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        }
    }
}

/// Transforms a Postgres row into a model struct.
pub trait FromPgRow {
    fn from_pg_row(row: &Row) -> Self;
}

#[cfg(test)]
pub async fn pg_test_client() -> tokio_postgres::Client {
    let (client, connection) = tokio_postgres::connect(
        "host=localhost user=postgres password=postgres dbname=postgres",
        tokio_postgres::NoTls,
    )
    .await
    .unwrap();
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("test connection error: {e}");
        }
    });
    client
}

#[cfg(test)]
pub async fn pg_test_roll_back_migrations(pg_client: &mut tokio_postgres::Client) {
    pg_client
        .batch_execute(
            "DO $$ DECLARE
                r RECORD;
            BEGIN
                FOR r IN (SELECT tablename FROM pg_tables WHERE schemaname = current_schema()) LOOP
                    EXECUTE 'DROP TABLE IF EXISTS ' || quote_ident(r.tablename) || ' CASCADE';
                END LOOP;
            END $$;",
        )
        .await
        .expect("unable to roll back test migrations");
}

#[cfg(test)]
mod tests {
    use config::PgDatabaseConfig;

    use crate::{pg_begin, pg_pool, pg_pool_client};

    #[tokio::test]
    #[ignore = "requires a live postgres instance; see pg_test_client"]
    async fn test_pg_connection_and_transaction() -> Result<(), String> {
        let pool = pg_pool(&PgDatabaseConfig {
            db: "postgres".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            passwd: Some("postgres".to_string()),
        })?;
        let mut client = pg_pool_client(&pool).await?;
        let transaction = pg_begin(&mut client).await?;
        let row = transaction
            .query_opt("SELECT 1 AS result", &[])
            .await
            .unwrap()
            .unwrap();
        let count: i32 = row.get("result");
        assert_eq!(1, count);
        transaction.commit().await.map_err(|e| e.to_string())?;
        Ok(())
    }
}
