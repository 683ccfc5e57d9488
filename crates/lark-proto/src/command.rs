//! Typed protocol commands.
//!
//! [`Command::parse`] turns a tokenized [`Message`] into one variant per
//! verb, with verb-specific fields already split out (channel lists, mode
//! change sequences, the two USER forms). The server core dispatches on
//! these values and never re-tokenizes parameters.

use thiserror::Error;

use crate::chan::ChannelExt;
use crate::message::Message;

/// Direction of a mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeOp {
    Add,
    Remove,
}

impl ModeOp {
    /// The wire sign for this direction.
    pub fn sign(self) -> char {
        match self {
            ModeOp::Add => '+',
            ModeOp::Remove => '-',
        }
    }
}

/// One channel mode change, with its argument when the mode takes one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelModeChange {
    pub op: ModeOp,
    pub mode: char,
    pub arg: Option<String>,
}

/// The two wire forms of USER.
///
/// RFC 1459 carries hostname and servername fields (both ignored by
/// servers); RFC 2812 replaces them with an initial user-mode bitfield.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Rfc1459 {
        username: String,
        hostname: String,
        servername: String,
        realname: String,
    },
    Rfc2812 {
        username: String,
        mode: u8,
        realname: String,
    },
}

impl UserCommand {
    pub fn username(&self) -> &str {
        match self {
            UserCommand::Rfc1459 { username, .. } => username,
            UserCommand::Rfc2812 { username, .. } => username,
        }
    }

    pub fn realname(&self) -> &str {
        match self {
            UserCommand::Rfc1459 { realname, .. } => realname,
            UserCommand::Rfc2812 { realname, .. } => realname,
        }
    }
}

/// A typed protocol command, one variant per verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Pass {
        password: String,
    },
    Cap {
        subcommand: String,
    },
    Nick {
        nickname: String,
    },
    User(UserCommand),
    Quit {
        message: Option<String>,
    },
    Join {
        /// Channel names paired with their keys, in wire order.
        channels: Vec<(String, Option<String>)>,
        /// `JOIN 0`: part all channels.
        zero: bool,
    },
    Part {
        channels: Vec<String>,
        message: Option<String>,
    },
    Topic {
        channel: String,
        /// `None` queries the topic; `Some` sets it.
        topic: Option<String>,
    },
    PrivMsg {
        target: String,
        text: String,
    },
    Notice {
        target: String,
        text: String,
    },
    UserMode {
        nickname: String,
        changes: Vec<(ModeOp, char)>,
    },
    ChannelMode {
        channel: String,
        /// Empty means a mode query.
        changes: Vec<ChannelModeChange>,
    },
    Who {
        mask: Option<String>,
    },
    Whois {
        masks: Vec<String>,
    },
    Whowas {
        nicknames: Vec<String>,
    },
    Oper {
        name: String,
        password: String,
    },
    Away {
        text: Option<String>,
    },
    Ison {
        nicks: Vec<String>,
    },
    Motd,
    Kick {
        /// `(channel, nick)` pairs in wire order.
        kicks: Vec<(String, String)>,
        comment: Option<String>,
    },
    List {
        channels: Vec<String>,
        target: Option<String>,
    },
    Names {
        channels: Vec<String>,
    },
    Ping {
        token: String,
    },
    Pong {
        token: Option<String>,
    },
    Invite {
        nickname: String,
        channel: String,
    },
    Time {
        target: Option<String>,
    },
    Version {
        target: Option<String>,
    },
    Debug {
        subcommand: String,
    },
    Kill {
        nickname: String,
        comment: String,
    },
    Proxy {
        hostname: String,
    },
    Unknown {
        verb: String,
    },
}

/// Why a message could not be turned into a [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Missing required parameters (461).
    NeedMoreParams,
    /// PRIVMSG/NOTICE without a recipient (411).
    NoRecipient,
    /// PRIVMSG/NOTICE without text (412).
    NoTextToSend,
    /// NICK/WHOIS/WHOWAS without a nickname (431).
    NoNicknameGiven,
}

/// A command that tokenized but did not parse; carries the verb so the
/// server can phase-gate it and name it in the numeric reply.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{verb}: {kind:?}")]
pub struct CommandParseError {
    pub verb: String,
    pub kind: ParseErrorKind,
}

impl CommandParseError {
    fn new(verb: &str, kind: ParseErrorKind) -> CommandParseError {
        CommandParseError {
            verb: verb.to_string(),
            kind,
        }
    }
}

impl Command {
    /// The verb this command arrived as.
    pub fn verb(&self) -> &str {
        match self {
            Command::Pass { .. } => "PASS",
            Command::Cap { .. } => "CAP",
            Command::Nick { .. } => "NICK",
            Command::User(_) => "USER",
            Command::Quit { .. } => "QUIT",
            Command::Join { .. } => "JOIN",
            Command::Part { .. } => "PART",
            Command::Topic { .. } => "TOPIC",
            Command::PrivMsg { .. } => "PRIVMSG",
            Command::Notice { .. } => "NOTICE",
            Command::UserMode { .. } | Command::ChannelMode { .. } => "MODE",
            Command::Who { .. } => "WHO",
            Command::Whois { .. } => "WHOIS",
            Command::Whowas { .. } => "WHOWAS",
            Command::Oper { .. } => "OPER",
            Command::Away { .. } => "AWAY",
            Command::Ison { .. } => "ISON",
            Command::Motd => "MOTD",
            Command::Kick { .. } => "KICK",
            Command::List { .. } => "LIST",
            Command::Names { .. } => "NAMES",
            Command::Ping { .. } => "PING",
            Command::Pong { .. } => "PONG",
            Command::Invite { .. } => "INVITE",
            Command::Time { .. } => "TIME",
            Command::Version { .. } => "VERSION",
            Command::Debug { .. } => "DEBUG",
            Command::Kill { .. } => "KILL",
            Command::Proxy { .. } => "PROXY",
            Command::Unknown { verb } => verb,
        }
    }

    /// Parse a tokenized message into a typed command.
    pub fn parse(msg: &Message) -> Result<Command, CommandParseError> {
        let verb = msg.command.to_ascii_uppercase();
        let p = &msg.params;

        let need = |n: usize| -> Result<(), CommandParseError> {
            if p.len() < n {
                Err(CommandParseError::new(&verb, ParseErrorKind::NeedMoreParams))
            } else {
                Ok(())
            }
        };

        let cmd = match verb.as_str() {
            "PASS" => {
                need(1)?;
                Command::Pass {
                    password: p[0].clone(),
                }
            }
            "CAP" => Command::Cap {
                subcommand: p.first().cloned().unwrap_or_default().to_ascii_uppercase(),
            },
            "NICK" => {
                if p.is_empty() {
                    return Err(CommandParseError::new(&verb, ParseErrorKind::NoNicknameGiven));
                }
                Command::Nick {
                    nickname: p[0].clone(),
                }
            }
            "USER" => {
                need(4)?;
                let username = p[0].clone();
                let realname = p[3].clone();
                match p[1].parse::<u8>() {
                    Ok(mode) => Command::User(UserCommand::Rfc2812 {
                        username,
                        mode,
                        realname,
                    }),
                    Err(_) => Command::User(UserCommand::Rfc1459 {
                        username,
                        hostname: p[1].clone(),
                        servername: p[2].clone(),
                        realname,
                    }),
                }
            }
            "QUIT" => Command::Quit {
                message: p.first().cloned(),
            },
            "JOIN" => {
                need(1)?;
                if p[0] == "0" {
                    Command::Join {
                        channels: Vec::new(),
                        zero: true,
                    }
                } else {
                    let keys: Vec<&str> = p
                        .get(1)
                        .map(|k| k.split(',').collect())
                        .unwrap_or_default();
                    let channels = p[0]
                        .split(',')
                        .filter(|c| !c.is_empty())
                        .enumerate()
                        .map(|(i, name)| {
                            let key = keys
                                .get(i)
                                .filter(|k| !k.is_empty())
                                .map(|k| k.to_string());
                            (name.to_string(), key)
                        })
                        .collect();
                    Command::Join {
                        channels,
                        zero: false,
                    }
                }
            }
            "PART" => {
                need(1)?;
                Command::Part {
                    channels: split_list(&p[0]),
                    message: p.get(1).cloned(),
                }
            }
            "TOPIC" => {
                need(1)?;
                Command::Topic {
                    channel: p[0].clone(),
                    topic: p.get(1).cloned(),
                }
            }
            "PRIVMSG" | "NOTICE" => {
                if p.is_empty() {
                    return Err(CommandParseError::new(&verb, ParseErrorKind::NoRecipient));
                }
                if p.len() < 2 {
                    return Err(CommandParseError::new(&verb, ParseErrorKind::NoTextToSend));
                }
                let target = p[0].clone();
                let text = p[1].clone();
                if verb == "PRIVMSG" {
                    Command::PrivMsg { target, text }
                } else {
                    Command::Notice { target, text }
                }
            }
            "MODE" => {
                need(1)?;
                if p[0].is_channel_name() {
                    Command::ChannelMode {
                        channel: p[0].clone(),
                        changes: parse_channel_modes(&verb, &p[1..])?,
                    }
                } else {
                    Command::UserMode {
                        nickname: p[0].clone(),
                        changes: parse_user_modes(&p[1..]),
                    }
                }
            }
            "WHO" => Command::Who {
                mask: p.first().filter(|m| !m.is_empty()).cloned(),
            },
            "WHOIS" => {
                if p.is_empty() {
                    return Err(CommandParseError::new(&verb, ParseErrorKind::NoNicknameGiven));
                }
                // With two params the first names a target server; only the
                // mask list matters on a single-node server.
                let masks = p.last().map(|m| split_list(m)).unwrap_or_default();
                Command::Whois { masks }
            }
            "WHOWAS" => {
                if p.is_empty() {
                    return Err(CommandParseError::new(&verb, ParseErrorKind::NoNicknameGiven));
                }
                Command::Whowas {
                    nicknames: split_list(&p[0]),
                }
            }
            "OPER" => {
                need(2)?;
                Command::Oper {
                    name: p[0].clone(),
                    password: p[1].clone(),
                }
            }
            "AWAY" => Command::Away {
                text: p.first().filter(|t| !t.is_empty()).cloned(),
            },
            "ISON" => {
                need(1)?;
                Command::Ison { nicks: p.clone() }
            }
            "MOTD" => Command::Motd,
            "KICK" => {
                need(2)?;
                let channels = split_list(&p[0]);
                let users = split_list(&p[1]);
                let kicks = if channels.len() == users.len() {
                    channels.into_iter().zip(users).collect()
                } else if channels.len() == 1 {
                    let channel = channels.into_iter().next().unwrap_or_default();
                    users
                        .into_iter()
                        .map(|nick| (channel.clone(), nick))
                        .collect()
                } else {
                    return Err(CommandParseError::new(&verb, ParseErrorKind::NeedMoreParams));
                };
                Command::Kick {
                    kicks,
                    comment: p.get(2).cloned(),
                }
            }
            "LIST" => Command::List {
                channels: p.first().map(|c| split_list(c)).unwrap_or_default(),
                target: p.get(1).cloned(),
            },
            "NAMES" => Command::Names {
                channels: p.first().map(|c| split_list(c)).unwrap_or_default(),
            },
            "PING" => {
                need(1)?;
                Command::Ping {
                    token: p[0].clone(),
                }
            }
            "PONG" => Command::Pong {
                token: p.first().cloned(),
            },
            "INVITE" => {
                need(2)?;
                Command::Invite {
                    nickname: p[0].clone(),
                    channel: p[1].clone(),
                }
            }
            "TIME" => Command::Time {
                target: p.first().cloned(),
            },
            "VERSION" => Command::Version {
                target: p.first().cloned(),
            },
            "DEBUG" => {
                need(1)?;
                Command::Debug {
                    subcommand: p[0].to_ascii_uppercase(),
                }
            }
            "KILL" => {
                need(2)?;
                Command::Kill {
                    nickname: p[0].clone(),
                    comment: p[1].clone(),
                }
            }
            "PROXY" => {
                // PROXY TCP4 <source> <dest> <sport> <dport>
                need(2)?;
                Command::Proxy {
                    hostname: p[1].clone(),
                }
            }
            _ => Command::Unknown { verb },
        };
        Ok(cmd)
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .filter(|x| !x.is_empty())
        .map(|x| x.to_string())
        .collect()
}

/// Channel modes whose argument is consumed when adding.
const CHANMODES_ARG_ON_ADD: &[char] = &['k', 'l'];
/// Channel modes whose argument is always consumed.
const CHANMODES_ARG_ALWAYS: &[char] = &['o', 'v'];

fn parse_channel_modes(
    verb: &str,
    params: &[String],
) -> Result<Vec<ChannelModeChange>, CommandParseError> {
    let mut changes = Vec::new();
    let Some(modestring) = params.first() else {
        return Ok(changes);
    };
    let mut args = params[1..].iter();
    let mut op = ModeOp::Add;
    for c in modestring.chars() {
        match c {
            '+' => op = ModeOp::Add,
            '-' => op = ModeOp::Remove,
            mode => {
                let takes_arg = CHANMODES_ARG_ALWAYS.contains(&mode)
                    || (op == ModeOp::Add && CHANMODES_ARG_ON_ADD.contains(&mode));
                let arg = if takes_arg {
                    match args.next() {
                        Some(a) => Some(a.clone()),
                        None => {
                            return Err(CommandParseError::new(
                                verb,
                                ParseErrorKind::NeedMoreParams,
                            ))
                        }
                    }
                } else {
                    None
                };
                changes.push(ChannelModeChange { op, mode, arg });
            }
        }
    }
    Ok(changes)
}

fn parse_user_modes(params: &[String]) -> Vec<(ModeOp, char)> {
    let mut changes = Vec::new();
    let Some(modestring) = params.first() else {
        return changes;
    };
    let mut op = ModeOp::Add;
    for c in modestring.chars() {
        match c {
            '+' => op = ModeOp::Add,
            '-' => op = ModeOp::Remove,
            mode => changes.push((op, mode)),
        }
    }
    changes
}
