//! Owned IRC messages.
//!
//! A [`Message`] is the wire unit: an optional prefix, a command word (verb
//! or three-digit numeric), and parameters. The final parameter is encoded
//! in trailing form (`:...`) whenever it is empty, contains a space, or
//! begins with a colon, so any UTF-8 text round-trips.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::prefix::Prefix;
use crate::reply::Reply;

/// A parsed or constructed IRC message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message source, when present.
    pub prefix: Option<Prefix>,
    /// Command word, e.g. `PRIVMSG` or `433`.
    pub command: String,
    /// Positional parameters; the trailing parameter is the last entry.
    pub params: Vec<String>,
    /// Force `:` on the last parameter even when not syntactically
    /// required (message texts and reasons are conventionally trailing).
    trailing: bool,
}

/// Errors produced while tokenizing a raw line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageParseError {
    #[error("empty message")]
    Empty,
}

impl Message {
    /// Construct a message with no prefix. The last parameter is written
    /// in trailing form only when syntax demands it.
    pub fn cmd<S: Into<String>>(command: S, params: Vec<String>) -> Message {
        Message {
            prefix: None,
            command: command.into(),
            params,
            trailing: false,
        }
    }

    /// Construct a message whose last parameter is always written in
    /// trailing form (`:...`) - message texts, reasons, and the like.
    pub fn cmd_trailing<S: Into<String>>(command: S, params: Vec<String>) -> Message {
        Message {
            prefix: None,
            command: command.into(),
            params,
            trailing: true,
        }
    }

    /// Construct a numeric reply from a server, targeted at a client.
    ///
    /// Formatted on the wire as `:<server> NNN <target> <params…> :<text>`.
    pub fn numeric(server: &str, reply: Reply, target: &str, params: Vec<String>) -> Message {
        let mut all = Vec::with_capacity(params.len() + 1);
        all.push(target.to_string());
        all.extend(params);
        Message {
            prefix: Some(Prefix::Server(server.to_string())),
            command: format!("{:03}", reply.code()),
            params: all,
            trailing: true,
        }
    }

    /// Attach a prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Prefix) -> Message {
        self.prefix = Some(prefix);
        self
    }

    /// The trailing (last) parameter, if any.
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(line: &str) -> Result<Message, MessageParseError> {
        let mut rest = line.trim_start_matches(' ');
        if rest.is_empty() {
            return Err(MessageParseError::Empty);
        }

        let prefix = if let Some(stripped) = rest.strip_prefix(':') {
            let (token, tail) = stripped.split_once(' ').unwrap_or((stripped, ""));
            rest = tail.trim_start_matches(' ');
            Some(Prefix::parse(token))
        } else {
            None
        };

        if rest.is_empty() {
            return Err(MessageParseError::Empty);
        }

        let (command, tail) = rest.split_once(' ').unwrap_or((rest, ""));
        let mut params = Vec::new();
        let mut had_trailing = false;
        let mut tail = tail.trim_start_matches(' ');
        while !tail.is_empty() {
            if let Some(trailing) = tail.strip_prefix(':') {
                params.push(trailing.to_string());
                had_trailing = true;
                break;
            }
            let (word, next) = tail.split_once(' ').unwrap_or((tail, ""));
            params.push(word.to_string());
            tail = next.trim_start_matches(' ');
        }

        Ok(Message {
            prefix,
            command: command.to_string(),
            params,
            trailing: had_trailing,
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        write!(f, "{}", self.command)?;
        if let Some((trailing, middle)) = self.params.split_last() {
            for param in middle {
                write!(f, " {param}")?;
            }
            if self.trailing
                || trailing.is_empty()
                || trailing.contains(' ')
                || trailing.starts_with(':')
            {
                write!(f, " :{trailing}")?;
            } else {
                write!(f, " {trailing}")?;
            }
        }
        Ok(())
    }
}
