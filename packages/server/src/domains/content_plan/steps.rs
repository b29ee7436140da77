//! Step-level helpers shared by both pipeline tasks.
//!
//! The pipelines are resumable: a crashed or re-enqueued task walks the same
//! steps again, and any step whose output already sits on the job is skipped
//! instead of recomputed. "Already there" and "good enough to keep" are the
//! same check, [`is_valid_output`]. A fresh completion that fails the check
//! is a step failure, never a silent skip.

use std::collections::HashSet;

use crate::kernel::traits::SearchResult;

/// Minimum trimmed length for a completion output to count at all.
pub const MIN_VALID_OUTPUT_CHARS: usize = 100;

/// A completion output big enough to be a real artifact.
pub fn is_valid_output(text: &str) -> bool {
    text.trim().chars().count() >= MIN_VALID_OUTPUT_CHARS
}

/// A stored output that lets its step be skipped on re-run.
pub fn is_step_satisfied(stored: Option<&str>) -> bool {
    stored.map(is_valid_output).unwrap_or(false)
}

/// Drop everything up to and including `header`, trimming what remains.
///
/// Models usually echo the section header the prompt mandates
/// (`## Brand Brief`, `## Search Results Analysis`); stored artifacts keep
/// only the content. Without the header the whole response is kept, trimmed.
pub fn strip_section_header<'a>(response: &'a str, header: &str) -> &'a str {
    match response.split_once(header) {
        Some((_, rest)) => rest.trim(),
        None => response.trim(),
    }
}

/// Deduplicate search results by link, first occurrence wins, order
/// preserved. Results without a link are dropped.
pub fn deduplicate_results(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| !r.link.is_empty() && seen.insert(r.link.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(link: &str, position: i32) -> SearchResult {
        SearchResult {
            title: format!("Result {position}"),
            link: link.to_string(),
            snippet: "snippet".to_string(),
            position,
        }
    }

    #[test]
    fn test_output_threshold_is_one_hundred_trimmed_chars() {
        assert!(!is_valid_output(""));
        assert!(!is_valid_output("   \n  "));
        assert!(!is_valid_output(&"x".repeat(99)));
        assert!(is_valid_output(&"x".repeat(100)));
        // Padding does not help.
        let padded = format!("  {}  \n", "x".repeat(99));
        assert!(!is_valid_output(&padded));
    }

    #[test]
    fn test_satisfaction_requires_a_stored_valid_output() {
        assert!(!is_step_satisfied(None));
        assert!(!is_step_satisfied(Some("too short")));
        assert!(is_step_satisfied(Some(&"y".repeat(150))));
    }

    #[test]
    fn test_strip_section_header() {
        let response = "Sure! Here you go.\n\n## Brand Brief\nThe brand does things.\n";
        assert_eq!(
            strip_section_header(response, "## Brand Brief"),
            "The brand does things."
        );

        // No header: whole response, trimmed.
        assert_eq!(
            strip_section_header("  plain answer  ", "## Brand Brief"),
            "plain answer"
        );

        // Only the first occurrence splits; later ones stay in the content.
        let twice = "## Brand Brief\nfirst\n## Brand Brief\nsecond";
        assert_eq!(
            strip_section_header(twice, "## Brand Brief"),
            "first\n## Brand Brief\nsecond"
        );
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_in_order() {
        let results = vec![
            result("https://a.example", 1),
            result("https://b.example", 2),
            result("https://a.example", 3),
            result("https://c.example", 4),
            result("https://b.example", 5),
        ];

        let unique = deduplicate_results(results);
        let links: Vec<_> = unique.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(
            links,
            vec!["https://a.example", "https://b.example", "https://c.example"]
        );
        // First occurrence wins, so positions are from the first sighting.
        assert_eq!(unique[0].position, 1);
        assert_eq!(unique[1].position, 2);
    }

    #[test]
    fn test_dedup_drops_empty_links() {
        let results = vec![result("", 1), result("https://a.example", 2), result("", 3)];
        let unique = deduplicate_results(results);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].link, "https://a.example");
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let results = vec![
            result("https://a.example", 1),
            result("https://b.example", 2),
            result("https://a.example", 3),
        ];
        let once = deduplicate_results(results);
        let twice = deduplicate_results(once.clone());
        assert_eq!(once, twice);
    }
}
