//! Small text helpers shared by classification and retrieval.

use std::collections::HashSet;

/// Whether a character belongs to one of the CJK blocks that are written
/// without word separators.
fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{3040}'..='\u{30FF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{F900}'..='\u{FAFF}')
}

/// Split text into lowercase tokens.
///
/// Latin-script text splits on anything that is not alphanumeric. CJK
/// characters have no separators, so each one becomes its own token.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if is_cjk(c) {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            tokens.push(c.to_string());
        } else if c.is_alphanumeric() {
            current.extend(c.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Token set of a text, for overlap scoring.
pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Number of `keywords` contained in the already-lowercased `haystack`.
pub fn count_hits(haystack: &str, keywords: &[&str]) -> usize {
    keywords
        .iter()
        .filter(|kw| haystack.contains(&kw.to_lowercase()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_latin() {
        assert_eq!(tokenize("Hello, World! rust-lang"), vec!["hello", "world", "rust", "lang"]);
    }

    #[test]
    fn test_tokenize_cjk() {
        assert_eq!(tokenize("鋼筋 rebar"), vec!["鋼", "筋", "rebar"]);
        assert_eq!(tokenize("abc鋼def"), vec!["abc", "鋼", "def"]);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("你好世界", 2), "你好");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_count_hits() {
        let text = "please analyze this report";
        assert_eq!(count_hits(text, &["analyze", "report", "compare"]), 2);
        assert_eq!(count_hits(text, &[]), 0);
    }
}
