use crate::DialectHandle;

/// Runs `f` inside a transaction on a single dedicated connection (§4.2).
///
/// A connection is acquired from the pool, `BEGIN`/`BEGIN IMMEDIATE` is
/// issued per the active dialect, `f` runs against that same connection,
/// and the transaction is committed on `Ok` or rolled back on `Err`. A
/// rollback failure is logged but never masks the original error. The
/// connection is released back to the pool when this function returns,
/// regardless of outcome — callers must not retain it beyond `f`.
pub async fn with_tx<F, Fut, T, E>(handle: &DialectHandle, f: F) -> Result<T, E>
where
    F: FnOnce(&mut sqlx::AnyConnection) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: From<sqlx::Error>,
{
    let mut conn = handle.pool().acquire().await.map_err(E::from)?;

    sqlx::query(handle.dialect().begin_tx_sql())
        .execute(&mut *conn)
        .await
        .map_err(E::from)?;

    match f(&mut conn).await {
        Ok(value) => {
            sqlx::query("COMMIT")
                .execute(&mut *conn)
                .await
                .map_err(E::from)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                tracing::error!(
                    error = %rollback_err,
                    "rollback failed after an already-failing transaction; propagating the original error"
                );
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Dialect;

    #[derive(Debug, thiserror::Error)]
    enum TestError {
        #[error(transparent)]
        Sqlx(#[from] sqlx::Error),
        #[error("boom")]
        Boom,
    }

    async fn test_handle() -> DialectHandle {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        DialectHandle::from_pool(pool, Dialect::Embedded)
    }

    #[tokio::test]
    async fn commits_on_success() {
        let handle = test_handle().await;
        with_tx::<_, _, (), TestError>(&handle, |conn| async move {
            sqlx::query("INSERT INTO t (v) VALUES ('a')")
                .execute(&mut *conn)
                .await?;
            Ok(())
        })
        .await
        .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t")
            .fetch_one(handle.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn rolls_back_on_error() {
        let handle = test_handle().await;
        let result = with_tx::<_, _, (), TestError>(&handle, |conn| async move {
            sqlx::query("INSERT INTO t (v) VALUES ('a')")
                .execute(&mut *conn)
                .await?;
            Err(TestError::Boom)
        })
        .await;
        assert!(result.is_err());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t")
            .fetch_one(handle.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
