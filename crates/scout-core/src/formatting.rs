//! Text shaping for tool results handed back to the model
//!
//! Limits are in characters, not bytes, so multi-byte text never splits
//! inside a code point.

/// Cut `text` to at most `limit` characters
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Truncate command output, telling the model how to narrow the next run
pub fn truncate_output(text: &str, limit: usize) -> String {
    let head = truncate_chars(text, limit);
    if head.len() == text.len() {
        return text.to_string();
    }
    format!(
        "{}\n[the output was truncated, exceeded limit of {} chars. You probably want to rerun \
         the command with a grep/jq or similar pipe to extract the data you are looking for]",
        head, limit
    )
}

/// Collapse runs of whitespace into single spaces
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize whitespace and cap at `limit` characters with an ellipsis
pub fn snippet(text: &str, limit: usize) -> String {
    let clean = normalize_whitespace(text);
    if clean.chars().count() <= limit {
        return clean;
    }
    let head = truncate_chars(&clean, limit.saturating_sub(3));
    format!("{}...", head.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_truncate_output_hint() {
        assert_eq!(truncate_output("short", 10), "short");
        let long = "x".repeat(20);
        let out = truncate_output(&long, 5);
        assert!(out.starts_with("xxxxx\n[the output was truncated, exceeded limit of 5 chars."));
    }

    #[test]
    fn test_snippet() {
        assert_eq!(snippet("  a \n b\t c ", 240), "a b c");
        let long = "word ".repeat(100);
        let cut = snippet(&long, 20);
        assert!(cut.ends_with("..."));
        assert!(cut.chars().count() <= 20);
    }
}
