//! Representative labels for clustered and singleton points.

use indexmap::IndexMap;

/// Separator between the names accumulated into a cluster
pub const NAME_SEPARATOR: char = ',';

/// Append `name` to an accumulated cluster name
pub fn accumulate_name(accumulated: &mut String, name: &str) {
    accumulated.push(NAME_SEPARATOR);
    accumulated.push_str(name);
}

/// Most frequent name in an accumulated cluster name.
///
/// Ties go to the name that occurs first in `accumulated`. This is an arbitrary but
/// deterministic choice, callers should not depend on it.
pub fn cluster_label(accumulated: &str) -> String {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for name in accumulated.split(NAME_SEPARATOR) {
        *counts.entry(name).or_default() += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (name, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((name, count));
        }
    }
    best.map(|(name, _)| name.to_string()).unwrap_or_default()
}

/// Label of an unclustered point whose name field may hold several comma separated values:
/// the first value, followed by `(+N)` when `N` more values exist
pub fn singleton_label(name: &str) -> String {
    let mut segments = name.split(NAME_SEPARATOR);
    let first = segments.next().unwrap_or_default();
    match segments.count() {
        0 => first.to_string(),
        more => format!("{first} (+{more})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("X,X,Y", "X")]
    #[case("Y,X,X", "X")]
    #[case("A", "A")]
    #[case("A,B", "A")]
    #[case("B,A,A,B", "B")]
    fn test_cluster_label(#[case] accumulated: &str, #[case] expected: &str) {
        assert_eq!(cluster_label(accumulated), expected);
    }

    #[rstest]
    #[case("Paris", "Paris")]
    #[case("Paris,Lyon", "Paris (+1)")]
    #[case("a,b,c,d", "a (+3)")]
    fn test_singleton_label(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(singleton_label(name), expected);
    }

    #[test]
    fn test_accumulate_name() {
        let mut name = "X".to_string();
        accumulate_name(&mut name, "Y");
        accumulate_name(&mut name, "X");
        assert_eq!(name, "X,Y,X");
        assert_eq!(cluster_label(&name), "X");
    }
}
