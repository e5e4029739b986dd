//! Placeholder detection in command templates
//!
//! A placeholder is a marker character (`@`, `:` or `?`) directly followed by
//! an identifier. A marker that is itself preceded by another marker is not a
//! placeholder, so `::text` casts and doubled markers never match. The
//! identifier runs until the first non-identifier character, which means
//! `@id` never matches inside `@identity`.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

use crate::parameter::{PLACEHOLDER_MARKERS, names_eq};

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[@:?](\w+)").expect("valid regex"));

/// Same identifier class as `PLACEHOLDER_REGEX`, anchored to the whole name
static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+$").expect("valid regex"));

/// One placeholder occurrence in SQL text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderMatch {
    /// Byte range of the whole token, marker included
    pub range: Range<usize>,
    /// The marker character the token starts with
    pub marker: char,
    /// The identifier as written in the text
    pub name: String,
}

/// All placeholders in `sql`, in order of appearance
pub fn placeholders(sql: &str) -> Vec<PlaceholderMatch> {
    PLACEHOLDER_REGEX
        .captures_iter(sql)
        .filter_map(|cap| {
            let full = cap.get(0)?;
            let name = cap.get(1)?;
            if preceded_by_marker(sql, full.start()) {
                return None;
            }
            let marker = sql[full.start()..].chars().next()?;
            Some(PlaceholderMatch {
                range: full.range(),
                marker,
                name: name.as_str().to_string(),
            })
        })
        .collect()
}

/// First placeholder for `name` (case-insensitive), if the text references it
pub fn find_placeholder(sql: &str, name: &str) -> Option<PlaceholderMatch> {
    placeholders(sql)
        .into_iter()
        .find(|placeholder| names_eq(&placeholder.name, name))
}

/// Whether `name` can be written after a marker and matched as a whole token
pub(crate) fn is_placeholder_name(name: &str) -> bool {
    NAME_REGEX.is_match(name)
}

fn preceded_by_marker(sql: &str, start: usize) -> bool {
    sql[..start]
        .chars()
        .next_back()
        .is_some_and(|c| PLACEHOLDER_MARKERS.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_finds_each_marker_style() {
        let sql = "SELECT * FROM t WHERE a = @a AND b = :b AND c = ?c";
        let found: Vec<_> = placeholders(sql)
            .into_iter()
            .map(|p| (p.marker, p.name))
            .collect();

        assert_eq!(
            found,
            vec![('@', "a".into()), (':', "b".into()), ('?', "c".into())]
        );
    }

    #[test]
    fn test_match_range_covers_marker_and_name() {
        let sql = "WHERE id IN (@ids)";
        let found = find_placeholder(sql, "ids").unwrap();
        assert_eq!(&sql[found.range.clone()], "@ids");
        assert_eq!(found.marker, '@');
    }

    #[test]
    fn test_matching_ignores_case() {
        let found = find_placeholder("WHERE id = @Id", "id").unwrap();
        assert_eq!(found.name, "Id");
    }

    #[rstest]
    #[case::longer_identifier("WHERE x = @identity", "id")]
    #[case::doubled_marker("SELECT @@id", "id")]
    #[case::cast("SELECT col::id FROM t", "id")]
    #[case::question_then_colon("SELECT ?:id", "id")]
    #[case::suffix_of_generated_name("IN (@p_ids_0, @p_ids_1)", "ids_0")]
    #[case::no_marker("SELECT id FROM t", "id")]
    fn test_non_placeholders_do_not_match(#[case] sql: &str, #[case] name: &str) {
        assert_eq!(find_placeholder(sql, name), None);
    }

    #[rstest]
    #[case::end_of_text("WHERE id = @id", 11..14)]
    #[case::before_paren("WHERE id IN (@id)", 13..16)]
    #[case::before_comma("VALUES (@id, @name)", 8..11)]
    #[case::after_letter("x@id ", 1..4)]
    fn test_identifier_boundaries(#[case] sql: &str, #[case] range: Range<usize>) {
        assert_eq!(find_placeholder(sql, "id").unwrap().range, range);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let sql = "WHERE a = :v OR b = :v";
        assert_eq!(find_placeholder(sql, "v").unwrap().range, 10..12);
    }

    #[test]
    fn test_doubled_marker_does_not_hide_later_match() {
        let sql = "SELECT @@id, @id";
        assert_eq!(find_placeholder(sql, "id").unwrap().range, 13..16);
    }

    #[test]
    fn test_unicode_identifiers() {
        let sql = "WHERE nom = @prénom";
        let found = find_placeholder(sql, "PRÉNOM").unwrap();
        assert_eq!(&sql[found.range], "@prénom");
    }
}
