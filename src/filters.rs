use chrono::NaiveDate;

/// Parses a comma-separated id list ("1,2,3"). Non-numeric tokens are
/// dropped rather than rejected, so "1,abc,3" yields [1, 3].
pub fn parse_id_list(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|token| {
            let token = token.trim();
            if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
                token.parse().ok()
            } else {
                None
            }
        })
        .collect()
}

/// Parses an exact-date filter value in YYYY-MM-DD form.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Escapes LIKE/ILIKE wildcards so filter input matches literally.
/// Postgres treats backslash as the default ESCAPE character.
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_plain_id_list() {
        assert_eq!(parse_id_list("1,2,3"), vec![1, 2, 3]);
    }

    #[test]
    fn drops_non_numeric_tokens() {
        assert_eq!(parse_id_list("1,abc,3,,-5"), vec![1, 3]);
        assert_eq!(parse_id_list("abc"), Vec::<i64>::new());
    }

    #[test]
    fn tolerates_whitespace() {
        assert_eq!(parse_id_list(" 7 , 8 "), vec![7, 8]);
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("10%"), "10\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c\\d"), "c\\\\d");
        assert_eq!(escape_like("plain title"), "plain title");
    }

    #[test]
    fn parses_exact_date() {
        assert_eq!(
            parse_date("2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(parse_date("01-03-2024"), None);
        assert_eq!(parse_date("not a date"), None);
    }

    proptest! {
        #[test]
        fn id_list_roundtrips(ids in proptest::collection::vec(0i64..1_000_000, 0..20)) {
            let raw = ids.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(",");
            prop_assert_eq!(parse_id_list(&raw), ids);
        }

        #[test]
        fn never_panics_on_arbitrary_input(raw in ".{0,64}") {
            let _ = parse_id_list(&raw);
            let _ = parse_date(&raw);
        }
    }
}
