use refinery::embed_migrations;
use tokio_postgres::Client;

embed_migrations!("migrations/orc20");

/// Applies every pending versioned migration. Safe to call on every process start: refinery
/// tracks applied versions in its own `pgmigrations` table and is a no-op once up to date.
pub async fn migrate(pg_client: &mut Client) -> Result<(), String> {
    migrations::runner()
        .set_migration_table_name("pgmigrations")
        .run_async(pg_client)
        .await
        .map(|_| ())
        .map_err(|e| format!("error running pg migrations: {e}"))
}
