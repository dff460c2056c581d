//! Declarative model-id canonicalization tables
//!
//! Requested ids arrive in many spellings: routing suffixes, date-stamped
//! snapshots, bare ids without a provider segment. Canonicalization rewrites
//! them to the preferred catalog form before any matching happens. The rules
//! live in tables rather than inline string surgery so each mapping is
//! visible and unit-testable.

/// Routing suffixes that carry no model semantics
const STRIP_SUFFIXES: &[&str] = &[":online", ":free", ":extended", ":nitro"];

/// Preferred-form rewrites, checked after suffix stripping and lowercasing.
/// Date-stamped variants map to their base id; bare cross-ecosystem ids map
/// to the provider-qualified form.
const CANONICAL_IDS: &[(&str, &str)] = &[
    // date-stamped snapshots -> base ids
    ("gpt-4o-2024-08-06", "openai/gpt-4o"),
    ("gpt-4o-mini-2024-07-18", "openai/gpt-4o-mini"),
    ("claude-3-5-sonnet-20241022", "anthropic/claude-3.5-sonnet"),
    ("claude-3-haiku-20240307", "anthropic/claude-3-haiku"),
    // bare ids -> provider-qualified ids
    ("gpt-4o", "openai/gpt-4o"),
    ("gpt-4o-mini", "openai/gpt-4o-mini"),
    ("claude-3.5-sonnet", "anthropic/claude-3.5-sonnet"),
    ("claude-3-haiku", "anthropic/claude-3-haiku"),
    ("gemini-2.5-flash", "google/gemini-2.5-flash"),
    ("gemini-2.5-pro", "google/gemini-2.5-pro"),
    ("gemini-2.5-flash-image", "google/gemini-2.5-flash-image"),
];

/// Lowercase, trim, and strip non-semantic routing suffixes
pub fn normalize(id: &str) -> String {
    let mut id = id.trim().to_ascii_lowercase();
    loop {
        let before = id.len();
        for suffix in STRIP_SUFFIXES {
            if let Some(stripped) = id.strip_suffix(suffix) {
                id = stripped.to_string();
            }
        }
        if id.len() == before {
            break;
        }
    }
    id
}

/// Apply the canonicalization table to a normalized id.
/// Returns the preferred form, or the input unchanged when no rule applies.
pub fn canonicalize(normalized: &str) -> String {
    CANONICAL_IDS
        .iter()
        .find(|(from, _)| *from == normalized)
        .map(|(_, to)| to.to_string())
        .unwrap_or_else(|| normalized.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("openai/gpt-4o-mini:free", "openai/gpt-4o-mini")]
    #[test_case("openai/gpt-4o-mini:online", "openai/gpt-4o-mini")]
    #[test_case("google/gemini-2.5-flash:free:online", "google/gemini-2.5-flash")]
    #[test_case("  OpenAI/GPT-4o  ", "openai/gpt-4o")]
    #[test_case("plain-id", "plain-id")]
    fn normalize_strips_suffixes_and_case(input: &str, expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[test_case("gemini-2.5-flash", "google/gemini-2.5-flash"; "bare gemini gains provider")]
    #[test_case("gpt-4o-2024-08-06", "openai/gpt-4o"; "date stamp collapses")]
    #[test_case("claude-3-5-sonnet-20241022", "anthropic/claude-3.5-sonnet"; "claude snapshot")]
    #[test_case("openai/gpt-4o", "openai/gpt-4o"; "already canonical")]
    #[test_case("unknown-model", "unknown-model"; "no rule passes through")]
    fn canonicalize_applies_table(input: &str, expected: &str) {
        assert_eq!(canonicalize(input), expected);
    }

    #[test]
    fn every_canonical_target_is_qualified() {
        for (_, target) in CANONICAL_IDS {
            assert!(
                target.contains('/'),
                "canonical target {target} lacks a provider segment"
            );
        }
    }
}
