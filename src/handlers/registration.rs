//! Connection lifecycle: PROXY, PASS, NICK, USER, and nick changes.

use lark_proto::{Message, NickExt, UserCommand};
use tracing::{debug, info, warn};

use crate::error::RegistryError;
use crate::server::Server;
use crate::state::{ClientId, Phase};

/// PROXY supplies the client's real source address; it replaces the
/// connection-level peer address before any other command is processed.
pub(crate) fn proxy(server: &mut Server, id: ClientId, hostname: String) {
    if let Some(client) = server.clients.get_mut(&id) {
        debug!(client = %id, %hostname, "proxy source applied");
        client.hostname = hostname;
    }
}

/// PASS during authorization. A match advances to registration; a
/// mismatch answers 464 and disconnects, matching historical behavior.
pub(crate) fn pass_authorize(server: &mut Server, id: ClientId, password: String) {
    if server.password.as_deref() != Some(password.as_str()) {
        if let Some(client) = server.clients.get(&id) {
            client.err_passwd_mismatch(&server.info);
        }
        server.quit(id, "bad password");
        return;
    }
    if let Some(client) = server.clients.get_mut(&id) {
        client.phase = Phase::Registration;
    }
}

/// NICK during registration.
pub(crate) fn nick_register(server: &mut Server, id: ClientId, nickname: String) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    if nickname.is_empty() {
        client.err_no_nickname_given(&server.info);
        return;
    }
    if server.nicks.get(&nickname).is_some() {
        client.err_nickname_in_use(&server.info, &nickname);
        return;
    }
    if !nickname.is_valid_nick() {
        client.err_erroneus_nickname(&server.info, &nickname);
        return;
    }
    if let Some(client) = server.clients.get_mut(&id) {
        client.nick = Some(nickname);
    }
    try_register(server, id);
}

/// USER during registration. The RFC 2812 form additionally applies
/// initial user modes from its bitfield (bit 3 -> +i, bit 2 -> +w).
pub(crate) fn user_register(server: &mut Server, id: ClientId, user: UserCommand) {
    if let Some(client) = server.clients.get_mut(&id) {
        client.username = Some(user.username().to_string());
        client.realname = user.realname().to_string();
        if let UserCommand::Rfc2812 { mode, .. } = user {
            let mut applied = false;
            if mode & 0x8 != 0 {
                client.modes.invisible = true;
                applied = true;
            }
            if mode & 0x4 != 0 {
                client.modes.wall_ops = true;
                applied = true;
            }
            if applied {
                let modes = client.modes;
                client.rpl_umodeis(&server.info, modes);
            }
        }
    }
    try_register(server, id);
}

/// Complete registration once both NICK and USER have arrived: insert
/// into the nickname registry, enter the normal phase, and emit the
/// welcome burst followed by the MOTD.
fn try_register(server: &mut Server, id: ClientId) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    if !(client.has_nick() && client.has_username()) {
        return;
    }
    let nick = client.nick().to_string();
    let userhost = client.userhost();
    match server.nicks.add(id, &nick, userhost) {
        Ok(()) => {}
        Err(RegistryError::NicknameInUse) => {
            // raced with another registering client; pick again
            client.err_nickname_in_use(&server.info, &nick);
            if let Some(client) = server.clients.get_mut(&id) {
                client.nick = None;
            }
            return;
        }
        Err(e) => {
            warn!(client = %id, error = %e, "registration failed");
            return;
        }
    }
    if let Some(client) = server.clients.get_mut(&id) {
        client.phase = Phase::Normal;
    }
    info!(client = %id, nick = %nick, "client registered");

    if let Some(client) = server.clients.get(&id) {
        client.rpl_welcome(&server.info);
        client.rpl_yourhost(&server.info);
        client.rpl_created(&server.info);
        client.rpl_myinfo(&server.info);
        client.rpl_isupport(&server.info);
    }
    crate::handlers::query::motd(server, id);
}

/// NICK after registration: validate, update the registry atomically,
/// and broadcast the change to everyone sharing a channel plus self.
pub(crate) fn nick_change(server: &mut Server, id: ClientId, nickname: String) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    if nickname.is_empty() {
        client.err_no_nickname_given(&server.info);
        return;
    }
    if !nickname.is_valid_nick() {
        client.err_erroneus_nickname(&server.info, &nickname);
        return;
    }
    let Some(old) = client.nick.clone() else {
        return;
    };
    if nickname == old {
        return;
    }
    if let Some(other) = server.nicks.get(&nickname) {
        if other != id {
            client.err_nickname_in_use(&server.info, &nickname);
            return;
        }
    }

    let prefix = client.prefix();
    let username = client.username().to_string();
    let hostname = client.hostname.clone();
    if let Err(e) = server.nicks.remove(id, &old) {
        warn!(client = %id, error = %e, "nick change: stale registry entry");
        return;
    }
    let userhost = format!("{nickname}!{username}@{hostname}");
    if let Err(e) = server.nicks.add(id, &nickname, userhost) {
        warn!(client = %id, error = %e, "nick change: re-add failed");
        return;
    }
    if let Some(client) = server.clients.get_mut(&id) {
        client.nick = Some(nickname.clone());
    }

    let msg = Message::cmd("NICK", vec![nickname]).with_prefix(prefix);
    let mut audience = server.friends(id);
    audience.insert(id);
    for peer in audience {
        if let Some(client) = server.clients.get(&peer) {
            client.reply(msg.clone());
        }
    }
}
