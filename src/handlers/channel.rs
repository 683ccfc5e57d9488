//! Channel operations: JOIN, PART, TOPIC, MODE, KICK, INVITE, NAMES, LIST.

use lark_proto::{irc_to_lower, ChannelExt, ChannelModeChange, Message, ModeOp};

use crate::server::Server;
use crate::state::{Channel, ClientId, MemberModes};

/// Nicks per RPL_NAMREPLY line.
const NAMES_CHUNK: usize = 16;

pub(crate) fn join(
    server: &mut Server,
    id: ClientId,
    channels: Vec<(String, Option<String>)>,
    zero: bool,
) {
    if zero {
        // JOIN 0: part every channel, with the nick as the part message
        let (names, nick) = match server.clients.get(&id) {
            Some(client) => {
                let mut names: Vec<String> = client.channels.iter().cloned().collect();
                names.sort();
                (names, client.nick().to_string())
            }
            None => return,
        };
        for name in names {
            remove_member(server, id, &name, &nick);
        }
        return;
    }
    for (name, key) in channels {
        join_one(server, id, &name, key.as_deref());
    }
}

fn join_one(server: &mut Server, id: ClientId, name: &str, key: Option<&str>) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    if !name.is_valid_channel() {
        client.err_no_such_channel(&server.info, name);
        return;
    }
    let lower = irc_to_lower(name);
    if client.channels.contains(&lower) {
        return;
    }

    if let Some(channel) = server.channels.get(name) {
        // a key is required only when the channel has one; an unneeded
        // key on the command line is ignored
        if let Some(chan_key) = &channel.key {
            if key != Some(chan_key.as_str()) {
                client.err_bad_channel_key(&server.info, &channel.name);
                return;
            }
        }
        if channel.is_full() {
            client.err_channel_is_full(&server.info, &channel.name);
            return;
        }
        if channel.modes.invite_only && !channel.invited.contains(&id) {
            client.err_invite_only_chan(&server.info, &channel.name);
            return;
        }
    } else {
        server.channels.insert(Channel::new(name));
    }

    let Some(channel) = server.channels.get_mut(name) else {
        return;
    };
    let display = channel.name.clone();
    let first = channel.members.is_empty();
    channel.members.insert(
        id,
        MemberModes {
            operator: first,
            voice: false,
        },
    );
    channel.invited.remove(&id);

    let prefix = match server.clients.get_mut(&id) {
        Some(client) => {
            client.channels.insert(lower.clone());
            client.prefix()
        }
        None => return,
    };

    let join_msg = Message::cmd("JOIN", vec![display.clone()]).with_prefix(prefix);
    server.broadcast_to_channel(&lower, &join_msg, None);

    if let Some(client) = server.clients.get(&id) {
        if let Some(channel) = server.channels.get(&lower) {
            if let Some(topic) = &channel.topic {
                client.rpl_topic(&server.info, &channel.name, topic);
            }
        }
    }
    send_names(server, id, &lower);
}

pub(crate) fn part(
    server: &mut Server,
    id: ClientId,
    channels: Vec<String>,
    message: Option<String>,
) {
    let reason = match (&message, server.clients.get(&id)) {
        (Some(text), _) => text.clone(),
        (None, Some(client)) => client.nick().to_string(),
        (None, None) => return,
    };
    for name in channels {
        let Some(client) = server.clients.get(&id) else {
            return;
        };
        if !server.channels.contains(&name) {
            client.err_no_such_channel(&server.info, &name);
            continue;
        }
        let lower = irc_to_lower(&name);
        if !client.channels.contains(&lower) {
            client.err_not_on_channel(&server.info, &name);
            continue;
        }
        remove_member(server, id, &lower, &reason);
    }
}

/// Broadcast PART and remove the member bidirectionally; an emptied
/// non-persistent channel leaves the table.
fn remove_member(server: &mut Server, id: ClientId, lower: &str, reason: &str) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    let Some(channel) = server.channels.get(lower) else {
        return;
    };
    let display = channel.name.clone();
    let msg =
        Message::cmd_trailing("PART", vec![display, reason.to_string()]).with_prefix(client.prefix());
    server.broadcast_to_channel(lower, &msg, None);

    let mut delete = false;
    if let Some(channel) = server.channels.get_mut(lower) {
        channel.members.remove(&id);
        delete = channel.members.is_empty() && !channel.persistent;
    }
    if delete {
        server.channels.remove(lower);
    }
    if let Some(client) = server.clients.get_mut(&id) {
        client.channels.remove(lower);
    }
}

pub(crate) fn topic(server: &mut Server, id: ClientId, name: String, topic: Option<String>) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    let Some(channel) = server.channels.get(&name) else {
        client.err_no_such_channel(&server.info, &name);
        return;
    };
    if !channel.members.contains_key(&id) {
        client.err_not_on_channel(&server.info, &channel.name);
        return;
    }

    let Some(text) = topic else {
        match &channel.topic {
            Some(text) => client.rpl_topic(&server.info, &channel.name, text),
            None => client.rpl_notopic(&server.info, &channel.name),
        }
        return;
    };

    if channel.modes.topic_lock && !channel.has_operator(id) {
        client.err_chanop_privs_needed(&server.info, &channel.name);
        return;
    }
    let display = channel.name.clone();
    let prefix = client.prefix();
    if let Some(channel) = server.channels.get_mut(&name) {
        channel.topic = if text.is_empty() {
            None
        } else {
            Some(text.clone())
        };
    }
    let msg = Message::cmd_trailing("TOPIC", vec![display, text]).with_prefix(prefix);
    server.broadcast_to_channel(&name, &msg, None);
    if let Some(channel) = server.channels.get(&name) {
        server.save_channel(channel);
    }
}

pub(crate) fn mode(
    server: &mut Server,
    id: ClientId,
    name: String,
    changes: Vec<ChannelModeChange>,
) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    let Some(channel) = server.channels.get(&name) else {
        client.err_no_such_channel(&server.info, &name);
        return;
    };
    let display = channel.name.clone();

    if changes.is_empty() {
        client.rpl_channelmodeis(&server.info, &display, channel.mode_params());
        return;
    }
    if !channel.has_operator(id) {
        client.err_chanop_privs_needed(&server.info, &display);
        return;
    }
    let prefix = client.prefix();

    // apply left-to-right, accumulating the changes that took effect
    let mut applied: Vec<(ModeOp, char, Option<String>)> = Vec::new();
    for change in changes {
        match change.mode {
            'o' | 'v' => {
                let Some(nick_arg) = change.arg else { continue };
                let Some(target) = server.nicks.get(&nick_arg) else {
                    if let Some(client) = server.clients.get(&id) {
                        client.err_no_such_nick(&server.info, &nick_arg);
                    }
                    continue;
                };
                let Some(channel) = server.channels.get_mut(&name) else {
                    return;
                };
                let Some(member) = channel.members.get_mut(&target) else {
                    if let Some(client) = server.clients.get(&id) {
                        client.err_user_not_in_channel(&server.info, &nick_arg, &display);
                    }
                    continue;
                };
                let on = change.op == ModeOp::Add;
                let slot = if change.mode == 'o' {
                    &mut member.operator
                } else {
                    &mut member.voice
                };
                if *slot != on {
                    *slot = on;
                    applied.push((change.op, change.mode, Some(nick_arg)));
                }
            }
            'k' => {
                let Some(channel) = server.channels.get_mut(&name) else {
                    return;
                };
                match change.op {
                    ModeOp::Add => {
                        if let Some(new_key) = change.arg {
                            if channel.key.as_deref() != Some(new_key.as_str()) {
                                channel.key = Some(new_key.clone());
                                channel.modes.key = true;
                                applied.push((change.op, 'k', Some(new_key)));
                            }
                        }
                    }
                    ModeOp::Remove => {
                        if channel.key.take().is_some() {
                            channel.modes.key = false;
                            applied.push((change.op, 'k', None));
                        }
                    }
                }
            }
            'l' => {
                let Some(channel) = server.channels.get_mut(&name) else {
                    return;
                };
                match change.op {
                    ModeOp::Add => {
                        let Some(arg) = change.arg else { continue };
                        if let Ok(limit) = arg.parse::<u32>() {
                            if limit > 0 && channel.user_limit != limit {
                                channel.user_limit = limit;
                                channel.modes.limit = true;
                                applied.push((change.op, 'l', Some(arg)));
                            }
                        }
                    }
                    ModeOp::Remove => {
                        if channel.user_limit != 0 {
                            channel.user_limit = 0;
                            channel.modes.limit = false;
                            applied.push((change.op, 'l', None));
                        }
                    }
                }
            }
            letter @ ('i' | 'm' | 'n' | 'p' | 's' | 't') => {
                let Some(channel) = server.channels.get_mut(&name) else {
                    return;
                };
                let on = change.op == ModeOp::Add;
                if channel.modes.get(letter) != Some(on) {
                    channel.modes.set(letter, on);
                    applied.push((change.op, letter, None));
                }
            }
            letter => {
                if let Some(client) = server.clients.get(&id) {
                    client.err_unknown_mode(&server.info, letter, &display);
                }
            }
        }
    }

    if applied.is_empty() {
        return;
    }

    // one aggregated MODE notice for the whole command
    let mut modestring = String::new();
    let mut args = Vec::new();
    let mut current = None;
    for (op, letter, arg) in &applied {
        if current != Some(*op) {
            modestring.push(op.sign());
            current = Some(*op);
        }
        modestring.push(*letter);
        if let Some(arg) = arg {
            args.push(arg.clone());
        }
    }
    let mut params = vec![display, modestring];
    params.extend(args);
    let msg = Message::cmd("MODE", params).with_prefix(prefix);
    server.broadcast_to_channel(&name, &msg, None);

    if let Some(channel) = server.channels.get(&name) {
        server.save_channel(channel);
    }
}

pub(crate) fn kick(
    server: &mut Server,
    id: ClientId,
    kicks: Vec<(String, String)>,
    comment: Option<String>,
) {
    for (name, nickname) in kicks {
        let Some(client) = server.clients.get(&id) else {
            return;
        };
        let Some(channel) = server.channels.get(&name) else {
            client.err_no_such_channel(&server.info, &name);
            continue;
        };
        let display = channel.name.clone();
        let Some(target) = server.nicks.get(&nickname) else {
            client.err_no_such_nick(&server.info, &nickname);
            continue;
        };
        if !channel.members.contains_key(&id) {
            client.err_not_on_channel(&server.info, &display);
            continue;
        }
        if !channel.has_operator(id) {
            client.err_chanop_privs_needed(&server.info, &display);
            continue;
        }
        if !channel.members.contains_key(&target) {
            client.err_user_not_in_channel(&server.info, &nickname, &display);
            continue;
        }

        let target_nick = server
            .clients
            .get(&target)
            .map(|c| c.nick().to_string())
            .unwrap_or_else(|| nickname.clone());
        let reason = comment.clone().unwrap_or_else(|| client.nick().to_string());
        let msg = Message::cmd_trailing("KICK", vec![display, target_nick, reason])
            .with_prefix(client.prefix());
        server.broadcast_to_channel(&name, &msg, None);

        let lower = irc_to_lower(&name);
        let mut delete = false;
        if let Some(channel) = server.channels.get_mut(&name) {
            channel.members.remove(&target);
            delete = channel.members.is_empty() && !channel.persistent;
        }
        if delete {
            server.channels.remove(&name);
        }
        if let Some(target_client) = server.clients.get_mut(&target) {
            target_client.channels.remove(&lower);
        }
    }
}

pub(crate) fn invite(server: &mut Server, id: ClientId, nickname: String, name: String) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    let Some(target) = server.nicks.get(&nickname) else {
        client.err_no_such_nick(&server.info, &nickname);
        return;
    };
    let target_nick = server
        .clients
        .get(&target)
        .map(|c| c.nick().to_string())
        .unwrap_or_else(|| nickname.clone());
    let invite_msg = Message::cmd("INVITE", vec![target_nick.clone(), name.clone()])
        .with_prefix(client.prefix());

    let Some(channel) = server.channels.get(&name) else {
        // inviting to a channel that does not exist yet still relays
        client.rpl_inviting(&server.info, &target_nick, &name);
        if let Some(target_client) = server.clients.get(&target) {
            target_client.reply(invite_msg);
        }
        return;
    };
    let display = channel.name.clone();
    if !channel.members.contains_key(&id) {
        client.err_not_on_channel(&server.info, &display);
        return;
    }
    if channel.modes.invite_only && !channel.has_operator(id) {
        client.err_chanop_privs_needed(&server.info, &display);
        return;
    }
    if channel.members.contains_key(&target) {
        client.err_user_on_channel(&server.info, &target_nick, &display);
        return;
    }

    if let Some(channel) = server.channels.get_mut(&name) {
        channel.invited.insert(target);
    }
    if let Some(client) = server.clients.get(&id) {
        client.rpl_inviting(&server.info, &target_nick, &display);
    }
    if let Some(target_client) = server.clients.get(&target) {
        target_client.reply(invite_msg);
    }
}

pub(crate) fn names(server: &mut Server, id: ClientId, channels: Vec<String>) {
    if channels.is_empty() {
        // no arguments: only the channels this client is a member of
        let mut mine: Vec<String> = server
            .clients
            .get(&id)
            .map(|c| c.channels.iter().cloned().collect())
            .unwrap_or_default();
        mine.sort();
        for name in mine {
            send_names(server, id, &name);
        }
        return;
    }
    for name in channels {
        if server.channels.contains(&name) {
            send_names(server, id, &name);
        } else if let Some(client) = server.clients.get(&id) {
            client.err_no_such_channel(&server.info, &name);
        }
    }
}

pub(crate) fn send_names(server: &Server, id: ClientId, name: &str) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    let Some(channel) = server.channels.get(name) else {
        return;
    };
    let mut names: Vec<String> = channel
        .members
        .iter()
        .filter_map(|(member, modes)| {
            let nick = server.clients.get(member)?.nick().to_string();
            Some(match modes.prefix_char() {
                Some(prefix) => format!("{prefix}{nick}"),
                None => nick,
            })
        })
        .collect();
    names.sort();
    let symbol = channel.names_symbol();
    for chunk in names.chunks(NAMES_CHUNK) {
        client.rpl_namreply(&server.info, symbol, &channel.name, &chunk.join(" "));
    }
    client.rpl_endofnames(&server.info, &channel.name);
}

pub(crate) fn list(
    server: &mut Server,
    id: ClientId,
    channels: Vec<String>,
    target: Option<String>,
) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    if let Some(target) = target {
        client.err_no_such_server(&server.info, &target);
        return;
    }
    let is_oper = client.modes.operator;
    client.rpl_liststart(&server.info);
    if channels.is_empty() {
        let mut visible: Vec<&Channel> = server
            .channels
            .iter()
            .filter(|c| is_oper || !c.modes.private)
            .collect();
        visible.sort_by(|a, b| a.name.cmp(&b.name));
        for channel in visible {
            client.rpl_list(
                &server.info,
                &channel.name,
                channel.members.len(),
                channel.topic.as_deref().unwrap_or(""),
            );
        }
    } else {
        for name in channels {
            match server.channels.get(&name) {
                Some(channel) if is_oper || !channel.modes.private => {
                    client.rpl_list(
                        &server.info,
                        &channel.name,
                        channel.members.len(),
                        channel.topic.as_deref().unwrap_or(""),
                    );
                }
                _ => client.err_no_such_channel(&server.info, &name),
            }
        }
    }
    client.rpl_listend(&server.info);
}
