//! First-balanced-JSON-value extraction
//!
//! Models wrap JSON in prose no matter how firmly they are told not to. The
//! scanner walks bytes from the first `{` or `[`, tracking bracket depth with
//! string-literal and escape awareness, and hands the balanced candidate to
//! serde for final validation. Prose before and after the value is tolerated;
//! an unbalanced or unparseable candidate is skipped and the scan resumes at
//! the next opening bracket.

use serde_json::Value;

/// Extract the first balanced `{...}` or `[...]` substring starting at or
/// after `from`. Returns the candidate and the byte offset just past it.
fn balanced_candidate(text: &str, from: usize) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    let start = bytes[from..]
        .iter()
        .position(|&b| b == b'{' || b == b'[')
        .map(|offset| from + offset)?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some((&text[start..=i], i + 1));
                }
            }
            _ => {}
        }
    }
    None
}

/// First balanced JSON substring of `text`, unvalidated
pub fn first_json_candidate(text: &str) -> Option<&str> {
    balanced_candidate(text, 0).map(|(candidate, _)| candidate)
}

/// Parse the first JSON value embedded in `text`.
///
/// Candidates that balance but fail to parse (`{oops}`), and opening
/// brackets that never balance, are skipped; the scan resumes at the next
/// opening bracket.
pub fn parse_first_json(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut from = 0;
    while from < bytes.len() {
        let start = bytes[from..]
            .iter()
            .position(|&b| b == b'{' || b == b'[')
            .map(|offset| from + offset)?;
        if let Some((candidate, _)) = balanced_candidate(text, start) {
            if let Ok(value) = serde_json::from_str::<Value>(candidate) {
                return Some(value);
            }
        }
        from = start + 1;
    }
    None
}
