//! PRIVMSG, NOTICE, AWAY, ISON.

use lark_proto::{ChannelExt, Message};

use crate::server::Server;
use crate::state::ClientId;

/// PRIVMSG and NOTICE share delivery; only the verb differs (and NOTICE
/// skips the away advisory).
pub(crate) fn message(server: &mut Server, id: ClientId, target: String, text: String, notice: bool) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    let verb = if notice { "NOTICE" } else { "PRIVMSG" };
    let msg = Message::cmd_trailing(verb, vec![target.clone(), text]).with_prefix(client.prefix());

    if target.is_channel_name() {
        let Some(channel) = server.channels.get(&target) else {
            client.err_no_such_channel(&server.info, &target);
            return;
        };
        let member = channel.member_modes(id);
        if channel.modes.no_outside && member.is_none() {
            client.err_cannot_send_to_chan(&server.info, &channel.name);
            return;
        }
        if channel.modes.moderated && !member.is_some_and(|m| m.can_speak_when_moderated()) {
            client.err_cannot_send_to_chan(&server.info, &channel.name);
            return;
        }
        // everyone but the sender
        server.broadcast_to_channel(&target, &msg, Some(id));
    } else {
        let Some(peer) = server.nicks.get(&target) else {
            client.err_no_such_nick(&server.info, &target);
            return;
        };
        let Some(peer_client) = server.clients.get(&peer) else {
            return;
        };
        peer_client.reply(msg);
        if !notice && peer_client.modes.away {
            client.rpl_away(
                &server.info,
                peer_client.nick(),
                peer_client.away_message.as_deref().unwrap_or(""),
            );
        }
    }
}

pub(crate) fn away(server: &mut Server, id: ClientId, text: Option<String>) {
    let going_away = text.is_some();
    if let Some(client) = server.clients.get_mut(&id) {
        client.modes.away = going_away;
        client.away_message = text;
    }
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    if going_away {
        client.rpl_nowaway(&server.info);
    } else {
        client.rpl_unaway(&server.info);
    }
}

pub(crate) fn ison(server: &mut Server, id: ClientId, nicks: Vec<String>) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    let mut present = Vec::new();
    for nick in &nicks {
        if let Some(peer) = server.nicks.get(nick) {
            if let Some(peer_client) = server.clients.get(&peer) {
                present.push(peer_client.nick().to_string());
            }
        }
    }
    client.rpl_ison(&server.info, &present);
}
