//! Predicate for the partition keys a read is scoped to.

use std::collections::BTreeSet;

/// Build the predicate selecting the in-scope partition keys.
///
/// One key yields `col == "key"`, several yield `col in ('k1', 'k2')` in
/// sorted key order. An empty set yields `None`.
pub fn partition_predicate(partition_expr: &str, keys: &BTreeSet<String>) -> Option<String> {
    match keys.len() {
        0 => None,
        1 => keys
            .iter()
            .next()
            .map(|key| format!("{} == \"{}\"", partition_expr, key)),
        _ => {
            let list = keys
                .iter()
                .map(|k| format!("'{}'", k.replace('\'', "''")))
                .collect::<Vec<_>>()
                .join(", ");
            Some(format!("{} in ({})", partition_expr, list))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_single_key_uses_equality() {
        let predicate = partition_predicate("day", &keys(&["2024-01-01"]));
        assert_eq!(predicate.as_deref(), Some("day == \"2024-01-01\""));
    }

    #[test]
    fn test_multiple_keys_use_membership() {
        let predicate = partition_predicate("day", &keys(&["2024-01-02", "2024-01-01"]));
        assert_eq!(
            predicate.as_deref(),
            Some("day in ('2024-01-01', '2024-01-02')")
        );
    }

    #[test]
    fn test_empty_keys() {
        assert_eq!(partition_predicate("day", &BTreeSet::new()), None);
    }

    #[test]
    fn test_quote_in_key_is_doubled() {
        let predicate = partition_predicate("region", &keys(&["a'b", "c"]));
        assert_eq!(predicate.as_deref(), Some("region in ('a''b', 'c')"));
    }
}
