//! Informational queries: PING, MOTD, WHO, WHOIS, WHOWAS, TIME, VERSION.

use lark_proto::{split_text, ChannelExt, Message, Reply};

use crate::server::Server;
use crate::state::{Client, ClientId, MemberModes, ServerInfo};

/// MOTD lines wrap at this many characters.
const MOTD_WIDTH: usize = 80;

pub(crate) fn ping(server: &mut Server, id: ClientId, token: String) {
    if let Some(client) = server.clients.get(&id) {
        client.reply(
            Message::cmd_trailing("PONG", vec![server.info.name.clone(), token])
                .with_prefix(lark_proto::Prefix::Server(server.info.name.clone())),
        );
    }
}

pub(crate) fn motd(server: &Server, id: ClientId) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    let Some(lines) = &server.motd else {
        client.err_no_motd(&server.info);
        return;
    };
    client.rpl_motd_start(&server.info);
    for line in lines {
        for segment in split_text(line, MOTD_WIDTH) {
            client.rpl_motd(&server.info, segment);
        }
    }
    client.rpl_motd_end(&server.info);
}

pub(crate) fn time(server: &mut Server, id: ClientId, target: Option<String>) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    if let Some(target) = target {
        if target != server.info.name {
            client.err_no_such_server(&server.info, &target);
            return;
        }
    }
    let now = chrono::Utc::now().format("%a %b %e %Y %T UTC").to_string();
    client.rpl_time(&server.info, &now);
}

pub(crate) fn version(server: &mut Server, id: ClientId, target: Option<String>) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    if let Some(target) = target {
        if target != server.info.name {
            client.err_no_such_server(&server.info, &target);
            return;
        }
    }
    client.rpl_version(&server.info);
}

pub(crate) fn who(server: &mut Server, id: ClientId, mask: Option<String>) {
    let friends = server.friends(id);
    match &mask {
        None => {
            let mut names: Vec<String> = server.channels.iter().map(|c| c.name.clone()).collect();
            names.sort();
            for name in names {
                who_channel(server, id, &name, &friends);
            }
        }
        Some(mask) if mask.is_channel_name() => {
            who_channel(server, id, mask, &friends);
        }
        Some(mask) => {
            let Some(client) = server.clients.get(&id) else {
                return;
            };
            for peer in server.nicks.find_all(mask) {
                if let Some(target) = server.clients.get(&peer) {
                    who_reply(client, &server.info, None, target);
                }
            }
        }
    }
    if let Some(client) = server.clients.get(&id) {
        client.rpl_endofwho(&server.info, mask.as_deref().unwrap_or("*"));
    }
}

fn who_channel(
    server: &Server,
    id: ClientId,
    name: &str,
    friends: &std::collections::HashSet<ClientId>,
) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    let Some(channel) = server.channels.get(name) else {
        return;
    };
    for (member, modes) in &channel.members {
        let Some(target) = server.clients.get(member) else {
            continue;
        };
        // invisible users are only visible to those sharing a channel
        if target.modes.invisible && *member != id && !friends.contains(member) {
            continue;
        }
        who_reply(client, &server.info, Some((&channel.name, *modes)), target);
    }
}

fn who_reply(
    client: &Client,
    srv: &ServerInfo,
    channel: Option<(&str, MemberModes)>,
    target: &Client,
) {
    let mut flags = String::from(if target.modes.away { "G" } else { "H" });
    if target.modes.operator {
        flags.push('*');
    }
    if let Some((_, modes)) = channel {
        if let Some(prefix) = modes.prefix_char() {
            flags.push(prefix);
        }
    }
    client.numeric(
        srv,
        Reply::RPL_WHOREPLY,
        vec![
            channel.map(|(name, _)| name.to_string()).unwrap_or_else(|| "*".to_string()),
            target.username().to_string(),
            target.hostname.clone(),
            srv.name.clone(),
            target.nick().to_string(),
            flags,
            format!("0 {}", target.realname),
        ],
    );
}

pub(crate) fn whois(server: &mut Server, id: ClientId, masks: Vec<String>) {
    for mask in masks {
        let mut matches = server.nicks.find_all(&mask);
        matches.sort();
        let Some(client) = server.clients.get(&id) else {
            return;
        };
        if matches.is_empty() {
            client.err_no_such_nick(&server.info, &mask);
            continue;
        }
        for peer in matches {
            let Some(target) = server.clients.get(&peer) else {
                continue;
            };
            whois_reply(server, client, target);
        }
    }
}

/// One WHOIS group per matched client, terminated by 318.
fn whois_reply(server: &Server, client: &Client, target: &Client) {
    let srv = &server.info;
    client.rpl_whoisuser(
        srv,
        target.nick(),
        target.username(),
        &target.hostname,
        &target.realname,
    );
    client.rpl_whoisserver(srv, target.nick());
    if target.modes.operator {
        client.rpl_whoisoperator(srv, target.nick());
    }
    client.rpl_whoisidle(srv, target.nick(), target.idle_seconds());

    let mut chstrs: Vec<String> = target
        .channels
        .iter()
        .filter_map(|name| {
            let channel = server.channels.get(name)?;
            let modes = channel.member_modes(target.id)?;
            Some(match modes.prefix_char() {
                Some(prefix) => format!("{prefix}{}", channel.name),
                None => channel.name.clone(),
            })
        })
        .collect();
    chstrs.sort();
    client.rpl_whoischannels(srv, target.nick(), &chstrs.join(" "));

    if target.modes.away {
        client.rpl_away(
            srv,
            target.nick(),
            target.away_message.as_deref().unwrap_or(""),
        );
    }
    client.rpl_endofwhois(srv, target.nick());
}

pub(crate) fn whowas(server: &mut Server, id: ClientId, nicknames: Vec<String>) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    for nick in nicknames {
        match server.nicks.whowas(&nick) {
            Some(history) if !history.is_empty() => {
                for entry in history {
                    client.rpl_whowasuser(
                        &server.info,
                        &entry.nick,
                        &entry.username,
                        &entry.hostname,
                        &entry.realname,
                    );
                }
            }
            _ => client.err_was_no_such_nick(&server.info, &nick),
        }
        client.rpl_endofwhowas(&server.info, &nick);
    }
}
