use regex::{Regex, RegexBuilder};

use crate::search::normalize_query;

pub fn build_highlight_regex(query: &str) -> Option<Regex> {
    let needle = normalize_query(query)?;
    RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Splits `text` into `(segment, is_match)` runs, in order.
pub fn split_matches<'t>(text: &'t str, regex: Option<&Regex>) -> Vec<(&'t str, bool)> {
    let Some(re) = regex else {
        return vec![(text, false)];
    };
    let mut runs = Vec::new();
    let mut last = 0;
    for mat in re.find_iter(text) {
        if mat.start() > last {
            runs.push((&text[last..mat.start()], false));
        }
        runs.push((mat.as_str(), true));
        last = mat.end();
    }
    if last < text.len() {
        runs.push((&text[last..], false));
    }
    if runs.is_empty() {
        runs.push((text, false));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_query_has_no_regex() {
        assert!(build_highlight_regex("  ").is_none());
    }

    #[test]
    fn keeps_whitespace_of_non_blank_query() {
        let regex = build_highlight_regex("a ").expect("regex");
        assert!(!regex.is_match("ab"));
        assert!(regex.is_match("A b"));
    }

    #[test]
    fn escapes_metacharacters() {
        let regex = build_highlight_regex("a+b").expect("regex");
        assert!(regex.is_match("xA+By"));
        assert!(!regex.is_match("aab"));
    }

    #[test]
    fn splits_case_insensitive_runs() {
        let regex = build_highlight_regex("note").expect("regex");
        let runs = split_matches("My Note and notes", Some(&regex));
        assert_eq!(
            runs,
            vec![
                ("My ", false),
                ("Note", true),
                (" and ", false),
                ("note", true),
                ("s", false)
            ]
        );
    }
}
