//! Company culture values parser
//!
//! Human-authored culture documents arrive in whatever shape HR wrote
//! them: numbered lists, bullets, section headers. The parser is
//! permissive and line-oriented; output is best-effort. Malformed
//! content falls back to an empty `CompanyCultureValues` rather than
//! aborting startup; only an unreadable file is a setup error.

use std::path::Path;

use candor_common::types::CompanyCultureValues;
use candor_common::{Error, Result};

/// Which value group subsequent list items belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Core,
    Positive,
    Negative,
}

/// Load and parse a culture document from disk.
///
/// An unreadable file surfaces as a configuration error; unparseable
/// content does not.
pub fn load_culture_file(path: &Path) -> Result<CompanyCultureValues> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read culture file {}: {}",
            path.display(),
            e
        ))
    })?;

    let values = parse_culture_text(&text);
    if values.is_empty() {
        tracing::warn!(
            path = %path.display(),
            "Culture file yielded no values; proceeding without culture parameterization"
        );
    } else {
        tracing::info!(
            core = values.core_values.len(),
            positive = values.positive_values.len(),
            negative = values.negative_values.len(),
            "Company culture values loaded"
        );
    }
    Ok(values)
}

/// Parse culture text into structured values.
///
/// Recognized shapes:
/// - `Company: Acme` assigns the company name
/// - Headers (`Core Values:`, `## What we avoid`) switch the current
///   section by keyword
/// - Bullets (`-`, `*`, `•`) and numbered items (`1.`, `2)`) add a
///   value to the current section (core by default)
pub fn parse_culture_text(text: &str) -> CompanyCultureValues {
    let mut values = CompanyCultureValues {
        raw_text: text.to_string(),
        ..Default::default()
    };
    let mut section = Section::Core;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(name) = line
            .strip_prefix("Company:")
            .or_else(|| line.strip_prefix("company:"))
        {
            let name = name.trim();
            if !name.is_empty() && values.company_name.is_none() {
                values.company_name = Some(name.to_string());
            }
            continue;
        }

        if let Some(new_section) = header_section(line) {
            section = new_section;
            continue;
        }

        if let Some(item) = list_item(line) {
            push_unique(
                match section {
                    Section::Core => &mut values.core_values,
                    Section::Positive => &mut values.positive_values,
                    Section::Negative => &mut values.negative_values,
                },
                item,
            );
        }
        // Prose lines outside lists are ignored
    }

    values
}

/// Detect a section header and map it to a value group
fn header_section(line: &str) -> Option<Section> {
    let is_header = line.ends_with(':') || line.starts_with('#');
    if !is_header {
        return None;
    }
    let lowered = line.trim_start_matches('#').trim().to_lowercase();

    if lowered.contains("avoid")
        || lowered.contains("negative")
        || lowered.contains("red flag")
        || lowered.contains("don't")
        || lowered.contains("do not")
    {
        Some(Section::Negative)
    } else if lowered.contains("positive")
        || lowered.contains("encourage")
        || lowered.contains("we value")
        || lowered.contains("look for")
    {
        Some(Section::Positive)
    } else if lowered.contains("value") || lowered.contains("culture") || lowered.contains("principle")
    {
        Some(Section::Core)
    } else {
        // Unknown header: keep the current section
        None
    }
}

/// Strip bullet or numbering from a list item, if the line is one
fn list_item(line: &str) -> Option<&str> {
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return non_empty(rest);
        }
    }

    // Numbered items: "1. item" or "2) item"
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return non_empty(stripped);
        }
    }

    None
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|v| v.eq_ignore_ascii_case(item)) {
        list.push(item.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbered_core_values() {
        let values = parse_culture_text(
            "Company: Initech\n\
             Core Values:\n\
             1. Ownership\n\
             2. Customer obsession\n\
             3. Craftsmanship\n",
        );
        assert_eq!(values.company_name.as_deref(), Some("Initech"));
        assert_eq!(
            values.core_values,
            vec!["Ownership", "Customer obsession", "Craftsmanship"]
        );
        assert!(values.positive_values.is_empty());
    }

    #[test]
    fn test_parse_bulleted_sections() {
        let values = parse_culture_text(
            "## Our principles\n\
             - Bias for action\n\
             * Transparency\n\
             ## What we look for\n\
             - Curiosity\n\
             ## What we avoid\n\
             - Blame culture\n\
             - blame culture\n",
        );
        assert_eq!(values.core_values, vec!["Bias for action", "Transparency"]);
        assert_eq!(values.positive_values, vec!["Curiosity"]);
        // Case-insensitive de-dup within a section
        assert_eq!(values.negative_values, vec!["Blame culture"]);
    }

    #[test]
    fn test_unknown_header_keeps_current_section() {
        let values = parse_culture_text(
            "Values:\n\
             - Honesty\n\
             Miscellaneous:\n\
             - Teamwork\n",
        );
        assert_eq!(values.core_values, vec!["Honesty", "Teamwork"]);
    }

    #[test]
    fn test_prose_is_ignored() {
        let values = parse_culture_text(
            "We are a company that cares deeply about people.\n\
             Our office has great coffee.\n",
        );
        assert!(values.is_empty());
        assert!(!values.raw_text.is_empty());
    }

    #[test]
    fn test_malformed_input_falls_back_to_empty() {
        let values = parse_culture_text("\u{0}\u{1}\u{2} ::: ###");
        assert!(values.is_empty());
    }

    #[test]
    fn test_items_default_to_core_without_headers() {
        let values = parse_culture_text("- Humility\n- Rigor\n");
        assert_eq!(values.core_values, vec!["Humility", "Rigor"]);
    }
}
