use clipfeed_dialect::DialectHandle;
use clipfeed_models::{CookiePlatform, Id, PlatformCookie};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Stores (or replaces) the encrypted credential for `user_id`/`platform`.
/// `encrypted_value` is expected to already be the vault's base64 output —
/// this module never sees plaintext.
pub async fn upsert(
    handle: &DialectHandle,
    user_id: Id,
    platform: CookiePlatform,
    encrypted_value: &str,
) -> Result<(), Error> {
    let sql = match handle.dialect() {
        clipfeed_dialect::Dialect::Embedded => {
            "INSERT INTO platform_cookies (user_id, platform, encrypted_value, updated_at) \
             VALUES (?, ?, ?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')) \
             ON CONFLICT (user_id, platform) DO UPDATE SET \
                encrypted_value = excluded.encrypted_value, updated_at = excluded.updated_at"
        }
        clipfeed_dialect::Dialect::ClientServer => {
            "INSERT INTO platform_cookies (user_id, platform, encrypted_value, updated_at) \
             VALUES (?, ?, ?, now()) \
             ON CONFLICT (user_id, platform) DO UPDATE SET \
                encrypted_value = excluded.encrypted_value, updated_at = excluded.updated_at"
        }
    };

    sqlx::query(handle.query(sql).as_str())
        .bind(user_id.to_string())
        .bind(platform.as_db_str())
        .bind(encrypted_value)
        .execute(handle.pool())
        .await?;

    Ok(())
}

/// Loads the stored (still-encrypted) credential, if any.
pub async fn load(
    handle: &DialectHandle,
    user_id: Id,
    platform: CookiePlatform,
) -> Result<Option<PlatformCookie>, Error> {
    let row: Option<(String, String, String, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
        handle
            .query(
                "SELECT user_id, platform, encrypted_value, updated_at FROM platform_cookies \
                 WHERE user_id = ? AND platform = ?",
            )
            .as_str(),
    )
    .bind(user_id.to_string())
    .bind(platform.as_db_str())
    .fetch_optional(handle.pool())
    .await?;

    Ok(row.map(|(user_id, platform, encrypted_value, updated_at)| PlatformCookie {
        user_id: user_id.parse().expect("stored user_id is a valid Id"),
        platform,
        encrypted_value,
        updated_at,
    }))
}

/// Removes a stored credential. A no-op if none exists.
pub async fn delete(handle: &DialectHandle, user_id: Id, platform: CookiePlatform) -> Result<(), Error> {
    sqlx::query(
        handle
            .query("DELETE FROM platform_cookies WHERE user_id = ? AND platform = ?")
            .as_str(),
    )
    .bind(user_id.to_string())
    .bind(platform.as_db_str())
    .execute(handle.pool())
    .await?;

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use clipfeed_dialect::Dialect;

    async fn seeded_handle() -> DialectHandle {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let handle = DialectHandle::from_pool(pool, Dialect::Embedded);
        clipfeed_migrations::run(&handle).await.unwrap();

        sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (?, 'u', 'u@example.com', 'x')")
            .bind(Id::new().to_string())
            .execute(handle.pool())
            .await
            .unwrap();

        handle
    }

    async fn seeded_user(handle: &DialectHandle) -> Id {
        let id = Id::new();
        sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (?, 'u2', 'u2@example.com', 'x')")
            .bind(id.to_string())
            .execute(handle.pool())
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn load_returns_none_when_absent() {
        let handle = seeded_handle().await;
        let user_id = seeded_user(&handle).await;
        let loaded = load(&handle, user_id, CookiePlatform::Youtube).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn upsert_then_load_round_trips() {
        let handle = seeded_handle().await;
        let user_id = seeded_user(&handle).await;

        upsert(&handle, user_id, CookiePlatform::Tiktok, "ciphertext-blob").await.unwrap();
        let loaded = load(&handle, user_id, CookiePlatform::Tiktok).await.unwrap().unwrap();
        assert_eq!(loaded.encrypted_value, "ciphertext-blob");
    }

    #[tokio::test]
    async fn upsert_replaces_the_existing_value() {
        let handle = seeded_handle().await;
        let user_id = seeded_user(&handle).await;

        upsert(&handle, user_id, CookiePlatform::Twitter, "first").await.unwrap();
        upsert(&handle, user_id, CookiePlatform::Twitter, "second").await.unwrap();

        let loaded = load(&handle, user_id, CookiePlatform::Twitter).await.unwrap().unwrap();
        assert_eq!(loaded.encrypted_value, "second");
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let handle = seeded_handle().await;
        let user_id = seeded_user(&handle).await;

        upsert(&handle, user_id, CookiePlatform::Instagram, "blob").await.unwrap();
        delete(&handle, user_id, CookiePlatform::Instagram).await.unwrap();

        assert!(load(&handle, user_id, CookiePlatform::Instagram).await.unwrap().is_none());
    }
}
