use serde::{Deserialize, Serialize};

/// OpaqueJson wraps a `serde_json::Value` that the core stores and moves
/// around without interpreting, per §9 ("Dynamic types / opaque JSON"):
/// job `payload`/`result`, source `metadata`, and preference `topic_weights`
/// are all opaque at the storage layer.
///
/// Both dialects store these columns as `TEXT` (the embedded backend has no
/// native JSON type worth the portability cost, and Postgres `TEXT` is a
/// perfectly good home for a document nobody queries into at the SQL
/// layer), so this type intentionally does *not* implement `sqlx::Type` —
/// callers serialize to a string with [`OpaqueJson::to_db_string`] before
/// binding a query parameter, and parse a fetched `String`/`Option<String>`
/// column with [`OpaqueJson::from_db_string`]. That keeps the dialect
/// boundary exactly at the rewriter (§4.1) rather than smeared across a
/// custom `Encode`/`Decode` impl per backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpaqueJson(pub serde_json::Value);

impl OpaqueJson {
    pub fn null() -> Self {
        Self(serde_json::Value::Null)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    pub fn to_db_string(&self) -> String {
        self.0.to_string()
    }

    pub fn from_db_string(s: &str) -> Result<Self, serde_json::Error> {
        Ok(Self(serde_json::from_str(s)?))
    }

    pub fn from_db_option(s: Option<String>) -> Result<Option<Self>, serde_json::Error> {
        s.map(|s| Self::from_db_string(&s)).transpose()
    }
}

impl From<serde_json::Value> for OpaqueJson {
    fn from(v: serde_json::Value) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_through_a_string_column() {
        let doc = OpaqueJson(serde_json::json!({"a": 1, "b": [1,2,3]}));
        let s = doc.to_db_string();
        let back = OpaqueJson::from_db_string(&s).unwrap();
        assert_eq!(doc, back);
    }

    #[test]
    fn nullable_column_round_trip() {
        assert_eq!(OpaqueJson::from_db_option(None).unwrap(), None);
        let some = OpaqueJson::from_db_option(Some("{}".to_string())).unwrap();
        assert_eq!(some, Some(OpaqueJson(serde_json::json!({}))));
    }
}
