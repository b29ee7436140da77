//! Parsing content themes out of the analysis stage's markdown output.
//!
//! The analysis prompt asks the model for a `## Content Themes` section
//! containing a numbered list of bold titles, each followed by a free-form
//! description. Model output drifts, so the parser is deliberately loose: it
//! accepts however many entries actually parse and leaves count enforcement
//! to the caller's prompt wording.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// Marker that opens the themes section of the analysis output.
const SECTION_HEADER: &str = "## Content Themes";

lazy_static! {
    /// A numbered, bold-titled list entry: `1. **Some Title**`.
    static ref THEME_HEADER: Regex =
        Regex::new(r"(?s)(\d+)\.\s+\*\*(.*?)\*\*").unwrap();
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThemeParseError {
    #[error("analysis output has no '{SECTION_HEADER}' section")]
    MissingSection,

    #[error("no themes could be parsed from the analysis output")]
    NoThemes,
}

/// One parsed theme, order-significant. Position is assigned when the
/// themes are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTheme {
    pub title: String,
    pub description: String,
}

/// Extract the ordered theme list from an analysis document.
///
/// Each entry's description is the text between its bold title and the next
/// numbered title (or the end of the section). Titles and descriptions come
/// back trimmed.
pub fn parse_themes(analysis: &str) -> Result<Vec<ParsedTheme>, ThemeParseError> {
    // Everything between the first section header and the next one, if any.
    let section = analysis
        .split(SECTION_HEADER)
        .nth(1)
        .ok_or(ThemeParseError::MissingSection)?;

    let headers: Vec<_> = THEME_HEADER.captures_iter(section).collect();
    if headers.is_empty() {
        return Err(ThemeParseError::NoThemes);
    }

    let mut themes = Vec::with_capacity(headers.len());
    for (i, caps) in headers.iter().enumerate() {
        let whole = caps.get(0).ok_or(ThemeParseError::NoThemes)?;
        let title = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        let description_end = headers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(section.len());
        let description = &section[whole.end()..description_end];

        themes.push(ParsedTheme {
            title: title.trim().to_string(),
            description: description.trim().to_string(),
        });
    }

    Ok(themes)
}
