//! Snapshot/restore of the five mutable tables (spec §4.5), grounded in the original indexer's
//! `backup_all_table`/`restore_all_table` pattern: a backup is a full `CREATE TABLE AS SELECT`
//! copy, and a restore is a three-way rename swap so the live table is replaced atomically.

use tokio_postgres::GenericClient;

/// Mutable tables, paired with the column list their indexes are built over. Order doesn't
/// matter for correctness (everything runs in one transaction) but is kept stable for readability
/// in logs.
const MUTABLE_TABLES: &[(&str, &[(&str, &str)])] = &[
    ("token", &[("deployer", "deployer"), ("inscription_id", "inscription_id")]),
    ("balance", &[("tid", "tid"), ("address", "address")]),
    ("pending_inscriptions", &[]),
    ("otc", &[("owner", "owner"), ("inscription_id", "inscription_id"), ("tid1", "tid1"), ("tid2", "tid2")]),
    ("otc_record", &[("oid", "oid"), ("inscription_id", "inscription_id"), ("address", "address")]),
];

/// For each mutable table, drops its backup sibling and rebuilds it as a full copy of the live
/// table, then rebuilds the backup's primary key and secondary indexes (the `CREATE TABLE ...
/// AS SELECT` form copies rows only, never constraints or indexes). Restoring this backup must
/// leave the live table with its unique index on `id` intact, since every `upsert_*` relies on
/// `ON CONFLICT (id)`.
pub async fn backup_all<C: GenericClient>(client: &C) -> Result<(), String> {
    for (table, indexes) in MUTABLE_TABLES {
        let backup = format!("{table}_backup");
        client
            .batch_execute(&format!("DROP TABLE IF EXISTS {backup};"))
            .await
            .map_err(|e| format!("backup_all: drop {backup}: {e}"))?;
        client
            .batch_execute(&format!(
                "CREATE TABLE {backup} AS SELECT * FROM {table};
                 ALTER TABLE {backup} ADD PRIMARY KEY (id);"
            ))
            .await
            .map_err(|e| format!("backup_all: create {backup}: {e}"))?;
        for (name, column) in *indexes {
            client
                .batch_execute(&format!(
                    "CREATE INDEX {backup}_{name} ON {backup} ({column});"
                ))
                .await
                .map_err(|e| format!("backup_all: index {backup}_{name}: {e}"))?;
        }
    }
    Ok(())
}

/// Atomically swaps every mutable table with its backup sibling: `live -> tmp; backup -> live;
/// tmp -> dropped`. Callers must run this inside a transaction so all five tables appear swapped
/// together from any concurrent reader's perspective.
pub async fn restore_all<C: GenericClient>(client: &C) -> Result<(), String> {
    for (table, indexes) in MUTABLE_TABLES {
        let backup = format!("{table}_backup");
        let tmp = format!("{table}_tmp_restore");
        client
            .batch_execute(&format!(
                "ALTER TABLE {table} RENAME TO {tmp};
                 ALTER TABLE {backup} RENAME TO {table};
                 DROP TABLE {tmp};"
            ))
            .await
            .map_err(|e| format!("restore_all: swap {table}: {e}"))?;
        for (name, _) in *indexes {
            client
                .batch_execute(&format!(
                    "ALTER INDEX {backup}_{name} RENAME TO {table}_{name};"
                ))
                .await
                .map_err(|e| format!("restore_all: reindex {table}_{name}: {e}"))?;
        }
    }
    Ok(())
}
