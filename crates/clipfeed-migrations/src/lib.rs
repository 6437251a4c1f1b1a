//! Schema + migrations (C13): embedded SQL files, applied in lexicographic
//! order, with per-version bookkeeping in a `schema_migrations` table.

use clipfeed_dialect::{Dialect, DialectHandle};

include!(concat!(env!("OUT_DIR"), "/migrations_generated.rs"));

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

fn migrations_for(dialect: Dialect) -> &'static [(&'static str, &'static str)] {
    match dialect {
        Dialect::Embedded => MIGRATIONS_SQLITE,
        Dialect::ClientServer => MIGRATIONS_POSTGRES,
    }
}

/// Applies every unapplied migration, in lexicographic filename order,
/// each inside its own transaction, recording the version in
/// `schema_migrations` only on success (§4.13).
///
/// A legacy database — one that already has a `users` table but no
/// `schema_migrations` bookkeeping at all — is backfilled as having
/// applied the first migration, since that migration is exactly the one
/// that would have created `users` in the first place; it is not
/// re-executed against a database that already has the tables it creates.
pub async fn run(handle: &DialectHandle) -> Result<Vec<String>, Error> {
    ensure_bookkeeping_table(handle).await?;
    backfill_legacy_database(handle).await?;

    let applied = applied_versions(handle).await?;
    let mut newly_applied = Vec::new();

    for (version, sql) in migrations_for(handle.dialect()) {
        if applied.iter().any(|v| v == version) {
            continue;
        }

        tracing::info!(version, "applying migration");
        apply_one(handle, version, sql).await?;
        newly_applied.push(version.to_string());
    }

    Ok(newly_applied)
}

async fn ensure_bookkeeping_table(handle: &DialectHandle) -> Result<(), Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (version TEXT PRIMARY KEY, applied_at TEXT)",
    )
    .execute(handle.pool())
    .await?;
    Ok(())
}

async fn backfill_legacy_database(handle: &DialectHandle) -> Result<(), Error> {
    let already_tracked: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(handle.pool())
        .await?;
    if already_tracked > 0 {
        return Ok(());
    }

    let users_table_exists = table_exists(handle, "users").await?;
    if !users_table_exists {
        return Ok(());
    }

    if let Some((first_version, _)) = migrations_for(handle.dialect()).first() {
        tracing::warn!(
            version = first_version,
            "legacy database detected; backfilling schema_migrations without re-running the initial migration"
        );
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
            .bind(*first_version)
            .bind(chrono_now_iso())
            .execute(handle.pool())
            .await
            .map_err(Error::from)?;
    }

    Ok(())
}

async fn table_exists(handle: &DialectHandle, table: &str) -> Result<bool, Error> {
    let sql = match handle.dialect() {
        Dialect::Embedded => "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = ?",
        Dialect::ClientServer => {
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?"
        }
    };
    let rewritten = handle.query(sql);
    let count: i64 = sqlx::query_scalar(rewritten.as_str())
        .bind(table)
        .fetch_one(handle.pool())
        .await?;
    Ok(count > 0)
}

async fn applied_versions(handle: &DialectHandle) -> Result<Vec<String>, Error> {
    let rows: Vec<String> = sqlx::query_scalar("SELECT version FROM schema_migrations")
        .fetch_all(handle.pool())
        .await?;
    Ok(rows)
}

async fn apply_one(handle: &DialectHandle, version: &str, sql: &str) -> Result<(), Error> {
    let mut conn = handle.pool().acquire().await?;
    sqlx::query(handle.dialect().begin_tx_sql())
        .execute(&mut *conn)
        .await?;

    // Migration files may contain several statements; sqlx's `Any` driver
    // executes a batch of semicolon-separated statements via `execute`
    // only for drivers that support it, so split defensively and run each
    // statement on its own.
    for statement in split_statements(sql) {
        if let Err(err) = sqlx::query(statement).execute(&mut *conn).await {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            return Err(err.into());
        }
    }

    let insert = "INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)";
    let rewritten = handle.query(insert);
    if let Err(err) = sqlx::query(rewritten.as_str())
        .bind(version)
        .bind(chrono_now_iso())
        .execute(&mut *conn)
        .await
    {
        let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
        return Err(err.into());
    }

    sqlx::query("COMMIT").execute(&mut *conn).await?;
    Ok(())
}

/// Splits a migration file on statement-terminating semicolons. This is a
/// plain scan, not a SQL parser: it's sufficient for the straight-line
/// DDL/trigger bodies these migrations contain, which never embed a
/// semicolon inside a string literal.
fn split_statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty())
}

fn chrono_now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod test {
    use super::*;
    use clipfeed_dialect::Dialect;

    async fn fresh_handle() -> DialectHandle {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        DialectHandle::from_pool(pool, Dialect::Embedded)
    }

    #[tokio::test]
    async fn applies_all_migrations_once() {
        let handle = fresh_handle().await;
        let applied = run(&handle).await.unwrap();
        assert_eq!(applied.len(), MIGRATIONS_SQLITE.len());

        // Running again is a no-op: nothing new gets applied.
        let applied_again = run(&handle).await.unwrap();
        assert!(applied_again.is_empty());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(handle.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn protection_trigger_round_trips() {
        let handle = fresh_handle().await;
        run(&handle).await.unwrap();

        sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES ('u1','a','a@example.com','h')")
            .execute(handle.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO sources (id, url, platform, submitted_by) VALUES ('s1','https://x','direct','u1')")
            .execute(handle.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO clips (id, source_id, title, duration_seconds, start_time, end_time, storage_key) VALUES ('c1','s1','t',1,0,1,'k')")
            .execute(handle.pool())
            .await
            .unwrap();

        sqlx::query("INSERT INTO saved_clips (user_id, clip_id) VALUES ('u1','c1')")
            .execute(handle.pool())
            .await
            .unwrap();
        let protected: i64 = sqlx::query_scalar("SELECT is_protected FROM clips WHERE id='c1'")
            .fetch_one(handle.pool())
            .await
            .unwrap();
        assert_eq!(protected, 1);

        sqlx::query("DELETE FROM saved_clips WHERE user_id='u1' AND clip_id='c1'")
            .execute(handle.pool())
            .await
            .unwrap();
        let unprotected: i64 = sqlx::query_scalar("SELECT is_protected FROM clips WHERE id='c1'")
            .fetch_one(handle.pool())
            .await
            .unwrap();
        assert_eq!(unprotected, 0);
    }
}
