//! Wildcard matching and text helpers.

use crate::casemap::irc_lower_char;

/// Match `text` against `pattern` with IRC case-insensitivity.
///
/// `*` matches any run of characters (including none), `?` matches exactly
/// one. The match is anchored at both ends.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().map(irc_lower_char).collect();
    let text: Vec<char> = text.chars().map(irc_lower_char).collect();
    match_from(&pattern, &text)
}

/// Recursive descent over the pattern. A `*` tries every possible run
/// length before giving up; patterns are short (nick masks), so the
/// worst case stays harmless.
fn match_from(pattern: &[char], text: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((&'*', rest)) => (0..=text.len()).any(|eaten| match_from(rest, &text[eaten..])),
        Some((&'?', rest)) => !text.is_empty() && match_from(rest, &text[1..]),
        Some((&literal, rest)) => {
            text.first().is_some_and(|&c| c == literal) && match_from(rest, &text[1..])
        }
    }
}

/// Expand a `nick[!user[@host]]` pattern, filling missing components
/// with `*`, so it can be matched against full `nick!user@host` strings.
pub fn expand_userhost(mask: &str) -> String {
    let mut expanded = mask.to_string();
    if !expanded.contains('!') {
        expanded.push_str("!*");
    }
    if !expanded.contains('@') {
        expanded.push_str("@*");
    }
    expanded
}

/// Truncate a string to at most `max_bytes` bytes without splitting a
/// multi-byte UTF-8 codepoint.
#[inline]
pub fn truncate_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Split text into segments of at most `max_chars` characters, preserving
/// order. Used for wrapping long MOTD lines.
pub fn split_text(s: &str, max_chars: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = s;
    while rest.chars().count() > max_chars {
        let split_at = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        out.push(&rest[..split_at]);
        rest = &rest[split_at..];
    }
    if !rest.is_empty() || out.is_empty() {
        out.push(rest);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_basics() {
        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("*", ""));
        assert!(wildcard_match("al*", "alice"));
        assert!(wildcard_match("*ce", "alice"));
        assert!(wildcard_match("a?ice", "alice"));
        assert!(!wildcard_match("a?ice", "aalice"));
        assert!(!wildcard_match("bob*", "alice"));
    }

    #[test]
    fn wildcard_is_anchored() {
        assert!(!wildcard_match("lic", "alice"));
        assert!(wildcard_match("*lic*", "alice"));
        assert!(!wildcard_match("alice", "alicex"));
    }

    #[test]
    fn wildcard_case_insensitive() {
        assert!(wildcard_match("AL*", "alice"));
        assert!(wildcard_match("nick[x]*", "NICK{X}!u@h"));
    }

    #[test]
    fn wildcard_userhost_patterns() {
        assert!(wildcard_match("*!*@*.example.net", "alice!a@irc.example.net"));
        assert!(wildcard_match("al*!*@*", "alice!alice@host"));
        assert!(!wildcard_match("bob!*@*", "alice!bob@host"));
    }

    #[test]
    fn expand_fills_missing_parts() {
        assert_eq!(expand_userhost("alice"), "alice!*@*");
        assert_eq!(expand_userhost("alice!a"), "alice!a@*");
        assert_eq!(expand_userhost("alice!a@h"), "alice!a@h");
        assert_eq!(expand_userhost("al*"), "al*!*@*");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_bytes("hello", 3), "hel");
        assert_eq!(truncate_bytes("hello", 10), "hello");
        assert_eq!(truncate_bytes("héllo", 2), "h");
    }

    #[test]
    fn split_preserves_order() {
        assert_eq!(split_text("abcdef", 2), vec!["ab", "cd", "ef"]);
        assert_eq!(split_text("abcde", 2), vec!["ab", "cd", "e"]);
        assert_eq!(split_text("ab", 5), vec!["ab"]);
        assert_eq!(split_text("", 5), vec![""]);
    }
}
