use crate::Dialect;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to connect to the database")]
    Connect(#[source] sqlx::Error),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// DialectHandle wraps a single [`sqlx::AnyPool`] (itself backed by either
/// SQLite or Postgres, selected at runtime by `sqlx::Any` from the
/// connection URL scheme) alongside the [`Dialect`] tag that every
/// query-building call site consults for its fragment helpers (§4.1, §9).
///
/// On the embedded backend the pool MUST be opened with at most a single
/// writer connection (§5); [`DialectHandle::connect`] enforces this by
/// capping `max_connections` to 1 whenever the URL selects SQLite.
#[derive(Clone)]
pub struct DialectHandle {
    pool: sqlx::AnyPool,
    dialect: Dialect,
}

impl DialectHandle {
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        sqlx::any::install_default_drivers();

        let dialect = if database_url.starts_with("sqlite:") {
            Dialect::Embedded
        } else {
            Dialect::ClientServer
        };

        let mut opts = sqlx::any::AnyPoolOptions::new();
        opts = match dialect {
            // A single writer connection turns SQLite's file lock into the
            // sole source of write serialization (§5); readers still work
            // fine sharing it since sqlx queues requests on the pool.
            Dialect::Embedded => opts.max_connections(1),
            Dialect::ClientServer => opts.max_connections(10),
        };

        let pool = opts
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(Error::Connect)?;

        Ok(Self { pool, dialect })
    }

    pub fn from_pool(pool: sqlx::AnyPool, dialect: Dialect) -> Self {
        Self { pool, dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn pool(&self) -> &sqlx::AnyPool {
        &self.pool
    }

    /// Rewrites `?` placeholders per the active dialect and returns a bound
    /// query ready for `.fetch*`/`.execute`. Callers always author SQL with
    /// `?`, regardless of backend (§4.1).
    pub fn query<'q>(&self, sql: &'q str) -> RewrittenQuery {
        RewrittenQuery {
            sql: self.dialect.rewrite(sql),
        }
    }

    pub async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// A query string that has already been rewritten for the active dialect.
/// Kept as a distinct type so call sites can't accidentally pass a raw,
/// un-rewritten `?` string straight to `sqlx::query`.
pub struct RewrittenQuery {
    sql: String,
}

impl RewrittenQuery {
    pub fn as_str(&self) -> &str {
        &self.sql
    }
}
