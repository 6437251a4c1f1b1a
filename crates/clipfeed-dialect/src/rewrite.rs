/// Rewrites `?`-style placeholders to Postgres's `$N` style (§4.1).
///
/// The rewrite walks the query byte-by-byte (the grammar we care about —
/// single-quoted string literals and placeholders — is pure ASCII, so
/// byte-at-a-time is safe even though the query may contain UTF-8 text
/// elsewhere). A single quote toggles whether we're "inside" a string
/// literal; a doubled quote (`''`) inside a literal is SQL's standard
/// escape for a literal quote and does not end the string. Every `?`
/// encountered outside a literal becomes `$N`, with `N` incrementing from
/// 1 in encounter order.
///
/// This is intentionally not idempotent-safe: calling it twice on already
/// `$N`-rewritten SQL will not re-rewrite anything (there are no more `?`
/// to find), but nothing detects or rejects a query that's already been
/// rewritten. Callers rewrite exactly once, at the call site that also
/// binds the parameters.
pub fn rewrite_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut in_string = false;
    let mut param_index: u32 = 0;

    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c == '\'' {
            // A quote always toggles the in-string flag. A doubled quote
            // while inside a string is the SQL escape for a literal quote:
            // toggling twice (once per quote) leaves `in_string` true, so
            // no special-casing is needed beyond just flipping on each one.
            in_string = !in_string;
            out.push(c);
            i += 1;
            continue;
        }
        if c == '?' && !in_string {
            param_index += 1;
            out.push('$');
            out.push_str(&param_index.to_string());
            i += 1;
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn concrete_scenario_from_spec() {
        let input = "SELECT 'it''s' WHERE x = ? AND y = ?";
        let expected = "SELECT 'it''s' WHERE x = $1 AND y = $2";
        assert_eq!(rewrite_placeholders(input), expected);
    }

    #[test]
    fn placeholders_inside_string_literals_are_untouched() {
        let input = "SELECT '?' WHERE x = ?";
        assert_eq!(rewrite_placeholders(input), "SELECT '?' WHERE x = $1");
    }

    #[test]
    fn no_placeholders_is_a_no_op() {
        let input = "SELECT 1";
        assert_eq!(rewrite_placeholders(input), "SELECT 1");
    }

    #[test]
    fn doubled_quote_does_not_end_the_literal() {
        let input = "SELECT 'a''b?c' WHERE y = ?";
        assert_eq!(rewrite_placeholders(input), "SELECT 'a''b?c' WHERE y = $1");
    }

    #[test]
    fn many_placeholders_increment_in_order() {
        let input = "INSERT INTO t VALUES (?, ?, ?, ?)";
        assert_eq!(
            rewrite_placeholders(input),
            "INSERT INTO t VALUES ($1, $2, $3, $4)"
        );
    }
}
