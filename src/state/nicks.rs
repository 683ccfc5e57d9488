//! Nickname registry.
//!
//! Two correlated structures: the lowercase-nick lookup map and a
//! userhost index used for wildcard queries (WHOIS/WHO masks). Both are
//! updated together under the dispatcher, so an entry is present in one
//! iff it is present in the other. A bounded WHOWAS history is recorded
//! as clients leave.

use std::collections::{HashMap, VecDeque};

use lark_proto::{expand_userhost, irc_to_lower, wildcard_match};

use super::ClientId;
use crate::error::RegistryError;

/// Retained WHOWAS entries per nickname.
const WHOWAS_HISTORY_LEN: usize = 16;

/// A remembered identity for WHOWAS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhowasEntry {
    pub nick: String,
    pub username: String,
    pub hostname: String,
    pub realname: String,
}

/// Case-insensitive unique nick -> client mapping with wildcard lookup.
#[derive(Default)]
pub struct NickRegistry {
    by_nick: HashMap<String, ClientId>,
    /// Keyed like `by_nick`; holds the full `nick!user@host` string.
    userhosts: HashMap<String, (ClientId, String)>,
    whowas: HashMap<String, VecDeque<WhowasEntry>>,
}

impl NickRegistry {
    /// Case-insensitive lookup.
    pub fn get(&self, nick: &str) -> Option<ClientId> {
        self.by_nick.get(&irc_to_lower(nick)).copied()
    }

    /// Number of registered nicknames.
    pub fn len(&self) -> usize {
        self.by_nick.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_nick.is_empty()
    }

    /// Register a nickname for a client.
    pub fn add(&mut self, id: ClientId, nick: &str, userhost: String) -> Result<(), RegistryError> {
        if nick.is_empty() {
            return Err(RegistryError::NickMissing);
        }
        let lower = irc_to_lower(nick);
        if self.by_nick.contains_key(&lower) {
            return Err(RegistryError::NicknameInUse);
        }
        self.by_nick.insert(lower.clone(), id);
        self.userhosts.insert(lower, (id, userhost));
        Ok(())
    }

    /// Remove a client's nickname.
    ///
    /// Fails with `NicknameMismatch` when the indexed entry belongs to a
    /// different client, leaving that entry untouched.
    pub fn remove(&mut self, id: ClientId, nick: &str) -> Result<(), RegistryError> {
        if nick.is_empty() {
            return Err(RegistryError::NickMissing);
        }
        let lower = irc_to_lower(nick);
        if self.by_nick.get(&lower) != Some(&id) {
            return Err(RegistryError::NicknameMismatch);
        }
        self.by_nick.remove(&lower);
        self.userhosts.remove(&lower);
        Ok(())
    }

    /// All clients whose `nick!user@host` matches the mask.
    ///
    /// The mask is a `nick[!user[@host]]` pattern; missing components are
    /// filled with `*` before matching.
    pub fn find_all(&self, mask: &str) -> Vec<ClientId> {
        let pattern = expand_userhost(mask);
        self.userhosts
            .values()
            .filter(|(_, userhost)| wildcard_match(&pattern, userhost))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Record a departing identity for WHOWAS.
    pub fn record_whowas(&mut self, entry: WhowasEntry) {
        let history = self.whowas.entry(irc_to_lower(&entry.nick)).or_default();
        history.push_front(entry);
        history.truncate(WHOWAS_HISTORY_LEN);
    }

    /// WHOWAS history for a nickname, most recent first.
    pub fn whowas(&self, nick: &str) -> Option<&VecDeque<WhowasEntry>> {
        self.whowas.get(&irc_to_lower(nick))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(reg: &mut NickRegistry, id: u64, nick: &str) -> Result<(), RegistryError> {
        reg.add(
            ClientId(id),
            nick,
            format!("{nick}!{nick}@host.test"),
        )
    }

    #[test]
    fn add_and_lookup_case_insensitive() {
        let mut reg = NickRegistry::default();
        add(&mut reg, 1, "Alice").unwrap();
        assert_eq!(reg.get("alice"), Some(ClientId(1)));
        assert_eq!(reg.get("ALICE"), Some(ClientId(1)));
        assert_eq!(reg.get("bob"), None);
    }

    #[test]
    fn duplicate_nick_rejected() {
        let mut reg = NickRegistry::default();
        add(&mut reg, 1, "alice").unwrap();
        assert_eq!(add(&mut reg, 2, "Alice"), Err(RegistryError::NicknameInUse));
        // the original entry is untouched
        assert_eq!(reg.get("alice"), Some(ClientId(1)));
    }

    #[test]
    fn empty_nick_rejected() {
        let mut reg = NickRegistry::default();
        assert_eq!(add(&mut reg, 1, ""), Err(RegistryError::NickMissing));
        assert_eq!(
            reg.remove(ClientId(1), ""),
            Err(RegistryError::NickMissing)
        );
    }

    #[test]
    fn remove_requires_matching_client() {
        let mut reg = NickRegistry::default();
        add(&mut reg, 1, "alice").unwrap();
        assert_eq!(
            reg.remove(ClientId(2), "alice"),
            Err(RegistryError::NicknameMismatch)
        );
        assert_eq!(reg.get("alice"), Some(ClientId(1)));
        reg.remove(ClientId(1), "alice").unwrap();
        assert_eq!(reg.get("alice"), None);
        assert!(reg.find_all("alice").is_empty());
    }

    #[test]
    fn find_all_expands_and_matches() {
        let mut reg = NickRegistry::default();
        add(&mut reg, 1, "alice").unwrap();
        add(&mut reg, 2, "alice2").unwrap();
        add(&mut reg, 3, "bob").unwrap();

        let mut found = reg.find_all("al*");
        found.sort();
        assert_eq!(found, vec![ClientId(1), ClientId(2)]);

        assert_eq!(reg.find_all("*!*@host.test").len(), 3);
        assert_eq!(reg.find_all("bob!bob@*"), vec![ClientId(3)]);
        assert!(reg.find_all("carol").is_empty());
    }

    #[test]
    fn whowas_history_is_bounded() {
        let mut reg = NickRegistry::default();
        for i in 0..20 {
            reg.record_whowas(WhowasEntry {
                nick: "alice".into(),
                username: format!("u{i}"),
                hostname: "host.test".into(),
                realname: "Alice".into(),
            });
        }
        let history = reg.whowas("ALICE").unwrap();
        assert_eq!(history.len(), WHOWAS_HISTORY_LEN);
        // most recent first
        assert_eq!(history[0].username, "u19");
    }
}
