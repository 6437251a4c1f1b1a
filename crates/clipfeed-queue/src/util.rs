/// Appends `message` to an existing error string, separated by `|`, or
/// returns `message` alone when there's nothing to append to (§4.4, stale
/// watchdog and requeue transitions share this convention).
pub(crate) fn append_error(existing: Option<&str>, message: &str) -> String {
    match existing {
        Some(existing) if !existing.is_empty() => format!("{existing}|{message}"),
        _ => message.to_string(),
    }
}
