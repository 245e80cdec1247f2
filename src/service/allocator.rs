use std::cmp::Ordering;

/// Numeric value of a record key, if it is a plain non-negative integer.
pub fn parse_id(key: &str) -> Option<u64> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

/// Next record id: one past the largest numeric key, or `"1"` when there is none.
///
/// Keys that are not numeric are ignored so a store shared with other data
/// still allocates.
pub fn next_id<'a, I>(existing_keys: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing_keys.into_iter().filter_map(parse_id).max();
    match max {
        Some(max) => max.saturating_add(1).to_string(),
        None => "1".to_string(),
    }
}

/// Descending id order: numeric keys by value first, then any other keys by
/// descending string order.
pub fn descending_id_order(a: &str, b: &str) -> Ordering {
    match (parse_id(a), parse_id(b)) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.cmp(a),
    }
}
