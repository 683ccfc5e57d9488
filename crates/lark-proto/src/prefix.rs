//! Message prefixes (`:server` or `:nick!user@host`).

use std::fmt;

/// The source of an IRC message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prefix {
    /// A server name.
    Server(String),
    /// A user identity, `nick!user@host`.
    User {
        nick: String,
        user: String,
        host: String,
    },
}

impl Prefix {
    /// Build a user prefix.
    pub fn user(
        nick: impl Into<String>,
        user: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Prefix::User {
            nick: nick.into(),
            user: user.into(),
            host: host.into(),
        }
    }

    /// Parse a prefix token (without the leading `:`).
    ///
    /// A token containing `!` or `@` is a user prefix; missing components
    /// are left empty. Anything else is a server name.
    pub fn parse(s: &str) -> Prefix {
        if let Some((nick, rest)) = s.split_once('!') {
            let (user, host) = rest.split_once('@').unwrap_or((rest, ""));
            Prefix::user(nick, user, host)
        } else if let Some((nick, host)) = s.split_once('@') {
            Prefix::User {
                nick: nick.to_string(),
                user: String::new(),
                host: host.to_string(),
            }
        } else {
            Prefix::Server(s.to_string())
        }
    }

    /// The nickname for user prefixes, or the server name.
    pub fn name(&self) -> &str {
        match self {
            Prefix::Server(name) => name,
            Prefix::User { nick, .. } => nick,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::Server(name) => write!(f, "{name}"),
            Prefix::User { nick, user, host } => write!(f, "{nick}!{user}@{host}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_user() {
        let p = Prefix::parse("alice!alice@example.net");
        assert_eq!(p, Prefix::user("alice", "alice", "example.net"));
        assert_eq!(p.to_string(), "alice!alice@example.net");
    }

    #[test]
    fn parse_server() {
        let p = Prefix::parse("irc.example.net");
        assert_eq!(p, Prefix::Server("irc.example.net".into()));
        assert_eq!(p.name(), "irc.example.net");
    }
}
