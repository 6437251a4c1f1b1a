use crate::rewrite::rewrite_placeholders;

/// Dialect is the single polymorphism point of the SQL layer (§9): every
/// business query is written once, against this capability set, and the
/// two variants below supply backend-specific fragments. A third backend
/// plugs in by adding a variant and implementing each method here.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// The embedded, single-writer backend (SQLite via `sqlx::Any`).
    Embedded,
    /// The client-server, multi-writer backend (Postgres via `sqlx::Any`).
    ClientServer,
}

impl Dialect {
    /// Rewrites `?` placeholders to `$N` for the client-server backend;
    /// the embedded backend's driver already expects `?`, so the query is
    /// returned unchanged (§4.1).
    pub fn rewrite(&self, sql: &str) -> String {
        match self {
            Dialect::Embedded => sql.to_string(),
            Dialect::ClientServer => rewrite_placeholders(sql),
        }
    }

    /// ISO-8601 UTC-`Z` formatted current-time SQL expression.
    pub fn now_utc_expr(&self) -> &'static str {
        match self {
            Dialect::Embedded => r#"strftime('%Y-%m-%dT%H:%M:%fZ', 'now')"#,
            Dialect::ClientServer => {
                r#"to_char(timezone('utc', now()), 'YYYY-MM-DD"T"HH24:MI:SS.MS"Z"')"#
            }
        }
    }

    /// Floating-point hours elapsed since `col`.
    pub fn age_hours_expr(&self, col: &str) -> String {
        match self {
            Dialect::Embedded => format!("((julianday('now') - julianday({col})) * 24.0)"),
            Dialect::ClientServer => {
                format!("(extract(epoch from (now() - {col})) / 3600.0)")
            }
        }
    }

    /// A uniform float in `[0, 1)`.
    pub fn random_float_expr(&self) -> &'static str {
        match self {
            // SQLite's RANDOM() spans a signed 64-bit range; shift and
            // normalize it into [0, 1).
            Dialect::Embedded => "((random() >> 11) * (1.0 / 9007199254740992.0) + 0.5)",
            Dialect::ClientServer => "random()",
        }
    }

    /// An absolute timestamp expression: now plus the signed `"<N> <unit>"`
    /// modifier (e.g. `"-24 hours"`). The embedded backend's `datetime()`
    /// modifier grammar accepts this form directly; the client-server
    /// backend needs the leading minus stripped and turned into subtraction
    /// against a Postgres `interval` literal (§4.1).
    pub fn datetime_modifier_expr(&self, modifier: &str) -> String {
        match self {
            Dialect::Embedded => format!("datetime('now', '{modifier}')"),
            Dialect::ClientServer => {
                let (op, unsigned) = split_sign(modifier);
                format!("(now() {op} interval '{unsigned}')")
            }
        }
    }

    /// Like [`Self::datetime_modifier_expr`] but truncated to a date (no
    /// time-of-day component).
    pub fn date_expr(&self, modifier: &str) -> String {
        match self {
            Dialect::Embedded => format!("date('now', '{modifier}')"),
            Dialect::ClientServer => {
                let (op, unsigned) = split_sign(modifier);
                format!("(now() {op} interval '{unsigned}')::date")
            }
        }
    }

    /// The date portion of a timestamp column.
    pub fn date_of_expr(&self, col: &str) -> String {
        match self {
            Dialect::Embedded => format!("date({col})"),
            Dialect::ClientServer => format!("({col})::date"),
        }
    }

    /// Returns SQL containing exactly one `?` placeholder, bound to a
    /// signed integer day count, evaluating to `created_at > now + N*day`
    /// for the `col` given.
    pub fn datetime_recency_expr(&self, col: &str) -> String {
        match self {
            Dialect::Embedded => {
                format!("{col} > datetime('now', printf('%+d day', ?))")
            }
            Dialect::ClientServer => {
                format!("{col} > (now() + (? * interval '1 day'))")
            }
        }
    }

    /// Current database size in megabytes, as a float.
    pub fn db_size_expr(&self) -> &'static str {
        match self {
            Dialect::Embedded => {
                "((select * from pragma_page_count()) * (select * from pragma_page_size()) / 1048576.0)"
            }
            Dialect::ClientServer => "(pg_database_size(current_database()) / 1048576.0)",
        }
    }

    /// Builds `<coalesced> <= now + modifier`, used by the lifecycle
    /// sweeper and admin purge (§4.4, §4.11).
    pub fn purge_datetime_comparison(&self, coalesced: &str, modifier: &str) -> String {
        format!("{coalesced} <= {}", self.datetime_modifier_expr(modifier))
    }

    /// `BEGIN IMMEDIATE` on the embedded backend to eagerly take the write
    /// lock (avoiding the deadlock that arises from a read-then-upgrade
    /// transaction racing another writer); plain `BEGIN` otherwise (§4.2).
    pub fn begin_tx_sql(&self) -> &'static str {
        match self {
            Dialect::Embedded => "BEGIN IMMEDIATE",
            Dialect::ClientServer => "BEGIN",
        }
    }

    /// The `FOR UPDATE SKIP LOCKED` clause used by the job claim query
    /// (§4.4); empty on the embedded backend, where single-writer
    /// serialization makes the clause unnecessary (and unsupported).
    pub fn skip_locked_clause(&self) -> &'static str {
        match self {
            Dialect::Embedded => "",
            Dialect::ClientServer => "FOR UPDATE SKIP LOCKED",
        }
    }

    /// Projects a timestamp column as an ISO-8601 `Z`-suffixed string aliased
    /// back to its own name, so row decoding never has to special-case the
    /// backend's native timestamp wire representation. The embedded backend
    /// already stores timestamps as such strings; the client-server backend
    /// formats its `TIMESTAMPTZ` value to match via `to_char`.
    pub fn timestamp_text_expr(&self, col: &str) -> String {
        match self {
            Dialect::Embedded => col.to_string(),
            Dialect::ClientServer => {
                format!(r#"to_char({col}, 'YYYY-MM-DD"T"HH24:MI:SS.MS"Z"') as {col}"#)
            }
        }
    }
}

/// Splits a modifier like `"-24 hours"` into `("-", "24 hours")` or
/// `"7 days"` into `("+", "7 days")`, for building a signed Postgres
/// interval expression from the informal `?<N> <unit>` form.
fn split_sign(modifier: &str) -> (&'static str, String) {
    let trimmed = modifier.trim();
    if let Some(rest) = trimmed.strip_prefix('-') {
        ("-", rest.trim_start().to_string())
    } else {
        let rest = trimmed.strip_prefix('+').unwrap_or(trimmed);
        ("+", rest.trim_start().to_string())
    }
}
