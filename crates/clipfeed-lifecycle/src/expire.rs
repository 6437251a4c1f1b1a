use clipfeed_dialect::DialectHandle;
use clipfeed_models::Id;
use sqlx::Row;

use crate::object_store::ObjectStore;
use crate::Error;

/// Clip candidates for expiry (§4.11 step 1): `expires_at < now`, not
/// protected, currently `ready`.
async fn expired_candidates(handle: &DialectHandle) -> Result<Vec<(Id, String)>, Error> {
    let dialect = handle.dialect();
    let age_expr = dialect.age_hours_expr("expires_at");
    let sql = dialect.rewrite(&format!(
        "SELECT id, storage_key FROM clips \
         WHERE expires_at IS NOT NULL AND ({age_expr}) > 0.0 \
           AND is_protected = 0 AND status = 'ready'"
    ));

    let rows = sqlx::query(&sql).fetch_all(handle.pool()).await?;
    rows.into_iter()
        .map(|row| {
            let id: String = row.try_get("id")?;
            let storage_key: String = row.try_get("storage_key")?;
            let id = id.parse::<Id>().map_err(|err| Error::MalformedRow(format!("invalid clip id {id:?}: {err}")))?;
            Ok((id, storage_key))
        })
        .collect()
}

/// Deletes each expired clip's object, then marks it `status = 'expired'`
/// (§4.11 step 1). A store that reports "already gone" as success (per
/// the `ObjectStore` contract) keeps this idempotent across a crash
/// between the two steps.
pub async fn expire_clips(handle: &DialectHandle, store: &dyn ObjectStore) -> Result<u64, Error> {
    let candidates = expired_candidates(handle).await?;
    let dialect = handle.dialect();
    let mut expired = 0u64;

    for (id, storage_key) in candidates {
        if let Err(err) = store.delete(&storage_key).await {
            tracing::error!(clip_id = %id, error = %err, "failed to delete expired clip from object storage; leaving it ready for the next sweep");
            continue;
        }

        let sql = dialect.rewrite("UPDATE clips SET status = 'expired' WHERE id = ?");
        sqlx::query(&sql).bind(id.to_string()).execute(handle.pool()).await?;
        expired += 1;
    }

    Ok(expired)
}
