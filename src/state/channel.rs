//! Channel state: membership, topic, modes.

use std::collections::{HashMap, HashSet};

use lark_proto::irc_to_lower;

use super::ClientId;
use crate::store::ChannelRecord;

/// Channel mode flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelModes {
    pub private: bool,     // +p
    pub secret: bool,      // +s
    pub invite_only: bool, // +i
    pub no_outside: bool,  // +n
    pub moderated: bool,   // +m
    pub topic_lock: bool,  // +t
    pub key: bool,         // +k
    pub limit: bool,       // +l
}

impl ChannelModes {
    /// All flag letters currently set, in a stable order.
    pub fn letters(self) -> String {
        let mut s = String::new();
        for (set, letter) in [
            (self.invite_only, 'i'),
            (self.key, 'k'),
            (self.limit, 'l'),
            (self.moderated, 'm'),
            (self.no_outside, 'n'),
            (self.private, 'p'),
            (self.secret, 's'),
            (self.topic_lock, 't'),
        ] {
            if set {
                s.push(letter);
            }
        }
        s
    }

    /// Read a flag by its mode letter. `None` for letters that are not
    /// channel flags (including the argument modes `o`/`v`).
    pub fn get(self, letter: char) -> Option<bool> {
        match letter {
            'i' => Some(self.invite_only),
            'k' => Some(self.key),
            'l' => Some(self.limit),
            'm' => Some(self.moderated),
            'n' => Some(self.no_outside),
            'p' => Some(self.private),
            's' => Some(self.secret),
            't' => Some(self.topic_lock),
            _ => None,
        }
    }

    /// Set a flag by letter. Returns false for unknown letters.
    pub fn set(&mut self, letter: char, on: bool) -> bool {
        match letter {
            'i' => self.invite_only = on,
            'k' => self.key = on,
            'l' => self.limit = on,
            'm' => self.moderated = on,
            'n' => self.no_outside = on,
            'p' => self.private = on,
            's' => self.secret = on,
            't' => self.topic_lock = on,
            _ => return false,
        }
        true
    }
}

/// Per-member privileges inside a channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemberModes {
    pub operator: bool, // +o (@)
    pub voice: bool,    // +v (+)
}

impl MemberModes {
    /// The NAMES/WHO prefix character, highest privilege first.
    pub fn prefix_char(self) -> Option<char> {
        if self.operator {
            Some('@')
        } else if self.voice {
            Some('+')
        } else {
            None
        }
    }

    pub fn can_speak_when_moderated(self) -> bool {
        self.operator || self.voice
    }
}

/// A named chat room.
pub struct Channel {
    /// Display name, in the case it was first created with.
    pub name: String,
    pub topic: Option<String>,
    pub key: Option<String>,
    /// 0 means unlimited.
    pub user_limit: u32,
    pub modes: ChannelModes,
    pub members: HashMap<ClientId, MemberModes>,
    pub invited: HashSet<ClientId>,
    /// Registered channels survive their membership dropping to zero.
    pub persistent: bool,
}

impl Channel {
    pub fn new(name: &str) -> Channel {
        Channel {
            name: name.to_string(),
            topic: None,
            key: None,
            user_limit: 0,
            modes: ChannelModes::default(),
            members: HashMap::new(),
            invited: HashSet::new(),
            persistent: false,
        }
    }

    /// Rehydrate a registered channel from its stored record.
    pub fn from_record(record: &ChannelRecord) -> Channel {
        let mut channel = Channel::new(&record.name);
        for letter in record.flags.chars() {
            channel.modes.set(letter, true);
        }
        if !record.key.is_empty() {
            channel.key = Some(record.key.clone());
            channel.modes.key = true;
        }
        if !record.topic.is_empty() {
            channel.topic = Some(record.topic.clone());
        }
        channel.user_limit = record.user_limit.max(0) as u32;
        if channel.user_limit > 0 {
            channel.modes.limit = true;
        }
        channel.persistent = true;
        channel
    }

    /// The stored form of this channel's current settings.
    pub fn to_record(&self) -> ChannelRecord {
        ChannelRecord {
            name: self.name.clone(),
            flags: self.modes.letters(),
            key: self.key.clone().unwrap_or_default(),
            topic: self.topic.clone().unwrap_or_default(),
            user_limit: i64::from(self.user_limit),
        }
    }

    pub fn is_full(&self) -> bool {
        self.user_limit > 0 && self.members.len() >= self.user_limit as usize
    }

    pub fn member_modes(&self, id: ClientId) -> Option<MemberModes> {
        self.members.get(&id).copied()
    }

    pub fn has_operator(&self, id: ClientId) -> bool {
        self.member_modes(id).is_some_and(|m| m.operator)
    }

    /// Current modes with arguments, as shown by RPL_CHANNELMODEIS.
    pub fn mode_params(&self) -> Vec<String> {
        let mut params = vec![format!("+{}", self.modes.letters())];
        if let Some(key) = &self.key {
            params.push(key.clone());
        }
        if self.user_limit > 0 {
            params.push(self.user_limit.to_string());
        }
        params
    }

    /// The NAMES list symbol: `@` secret, `*` private, `=` otherwise.
    pub fn names_symbol(&self) -> char {
        if self.modes.secret {
            '@'
        } else if self.modes.private {
            '*'
        } else {
            '='
        }
    }
}

/// Case-insensitive channel lookup table.
///
/// Every channel in the table is the same object referenced from its
/// members' channel sets, keyed by the lowercase name.
#[derive(Default)]
pub struct ChannelTable {
    map: HashMap<String, Channel>,
}

impl ChannelTable {
    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.map.get(&irc_to_lower(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.map.get_mut(&irc_to_lower(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(&irc_to_lower(name))
    }

    pub fn insert(&mut self, channel: Channel) {
        self.map.insert(irc_to_lower(&channel.name), channel);
    }

    pub fn remove(&mut self, name: &str) -> Option<Channel> {
        self.map.remove(&irc_to_lower(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.map.values()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
