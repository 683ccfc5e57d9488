//! Nickname grammar per RFC 2812.

/// Maximum nickname length accepted by this server (policy; RFC allows
/// servers to extend the historical 9).
pub const MAX_NICK_LEN: usize = 32;

/// Characters allowed as "special" in nicknames: `[ ] \ ` _ ^ { | }`.
#[inline]
fn is_special(c: char) -> bool {
    matches!(c, '[' | ']' | '\\' | '`' | '_' | '^' | '{' | '|' | '}')
}

/// Extension trait for nickname validity checks.
pub trait NickExt {
    /// Check validity against the server's default nickname length.
    fn is_valid_nick(&self) -> bool;

    /// Check validity with an explicit maximum length.
    fn is_valid_nick_len(&self, max_len: usize) -> bool;
}

impl NickExt for str {
    fn is_valid_nick(&self) -> bool {
        self.is_valid_nick_len(MAX_NICK_LEN)
    }

    fn is_valid_nick_len(&self, max_len: usize) -> bool {
        if self.is_empty() || self.len() > max_len {
            return false;
        }
        let mut chars = self.chars();
        let first = match chars.next() {
            Some(c) => c,
            None => return false,
        };
        if !first.is_ascii_alphabetic() && !is_special(first) {
            return false;
        }
        chars.all(|c| c.is_ascii_alphanumeric() || is_special(c) || c == '-')
    }
}
