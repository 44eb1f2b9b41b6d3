/// Keep at most `limit` characters of `value`
///
/// Values at or under the limit are returned unchanged.
pub fn truncate(value: &str, limit: usize) -> &str {
    match value.char_indices().nth(limit) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
