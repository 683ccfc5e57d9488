//! lark-proto - RFC 1459 / RFC 2812 line protocol support for larkd.
//!
//! This crate owns everything between the raw byte stream and typed
//! protocol values: message framing and truncation, prefix and parameter
//! grammar, typed command parsing, numeric reply formatting, RFC 1459
//! casemapping, nickname/channel-name validation, and wildcard matching.
//! The server core consumes already-typed [`Command`] values and never
//! touches wire tokenization itself.

pub mod casemap;
pub mod chan;
pub mod codec;
pub mod command;
pub mod message;
pub mod nick;
pub mod prefix;
pub mod reply;
pub mod util;

pub use casemap::{irc_eq, irc_to_lower};
pub use chan::ChannelExt;
pub use codec::LineCodec;
pub use command::{
    ChannelModeChange, Command, CommandParseError, ModeOp, ParseErrorKind, UserCommand,
};
pub use message::Message;
pub use nick::NickExt;
pub use prefix::Prefix;
pub use reply::Reply;
pub use util::{expand_userhost, split_text, truncate_bytes, wildcard_match};

/// Maximum length of an IRC line including CRLF, per RFC 2812.
pub const MAX_LINE_LEN: usize = 512;

/// Maximum line content length: [`MAX_LINE_LEN`] minus the CRLF terminator.
pub const MAX_CONTENT_LEN: usize = MAX_LINE_LEN - 2;
