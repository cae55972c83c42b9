//! Trigger matching over free text
//!
//! Approximates whole-word matching without a tokenizer: a keyword hit
//! counts only when both sides of the first occurrence sit on a boundary
//! (start/end of string, or one of a small punctuation set). Substring
//! search means multi-word trigger phrases work for free.

use corvid_types::TriggerTable;

/// Characters that end (or precede) a matched phrase
const BOUNDARY_CHARS: [char; 6] = [' ', '.', '!', '?', ',', '\''];

fn is_boundary(c: char) -> bool {
    BOUNDARY_CHARS.contains(&c)
}

/// Return the keywords (stored casing) matched in `text`, in trigger-table
/// iteration order. Comparison is case-insensitive.
pub fn match_triggers(text: &str, table: &TriggerTable) -> Vec<String> {
    let haystack = text.to_lowercase();
    let mut matched = Vec::new();

    for (keyword, _) in table.iter() {
        let needle = keyword.to_lowercase();
        if needle.is_empty() {
            continue;
        }
        let Some(at) = haystack.find(&needle) else {
            continue;
        };
        let end = at + needle.len();
        let left_ok = haystack[..at].chars().next_back().map_or(true, is_boundary);
        let right_ok = haystack[end..].chars().next().map_or(true, is_boundary);
        if left_ok && right_ok {
            matched.push(keyword.to_string());
        }
    }

    matched
}
