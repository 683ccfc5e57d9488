//! Operator commands and user modes: OPER, MODE (user), KILL, DEBUG.

use lark_proto::{Message, ModeOp, Prefix};
use tracing::info;

use crate::server::Server;
use crate::state::{Client, ClientId, ServerInfo};

pub(crate) fn oper(server: &mut Server, id: ClientId, name: String, password: String) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    if !server.config.operators.contains_key(&name) {
        client.err_no_oper_host(&server.info);
        return;
    }
    if !server.config.verify_oper(&name, &password) {
        client.err_passwd_mismatch(&server.info);
        return;
    }
    info!(client = %id, oper = %name, "operator authenticated");
    if let Some(client) = server.clients.get_mut(&id) {
        client.modes.operator = true;
    }
    if let Some(client) = server.clients.get(&id) {
        client.rpl_youreoper(&server.info);
        client.rpl_umodeis(&server.info, client.modes);
    }
}

/// MODE on a user target. Only the client itself (or an operator) may be
/// targeted; +i/+w/+s toggle freely, while o/O can only be removed.
/// A single aggregated MODE reply reports the net change.
pub(crate) fn user_mode(
    server: &mut Server,
    id: ClientId,
    nickname: String,
    changes: Vec<(ModeOp, char)>,
) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    let Some(target) = server.nicks.get(&nickname) else {
        client.err_no_such_nick(&server.info, &nickname);
        return;
    };
    if target != id && !client.modes.operator {
        client.err_users_dont_match(&server.info);
        return;
    }
    if changes.is_empty() {
        if let Some(target_client) = server.clients.get(&target) {
            client.rpl_umodeis(&server.info, target_client.modes);
        }
        return;
    }

    let before = match server.clients.get(&target) {
        Some(c) => c.modes,
        None => return,
    };
    let mut after = before;
    for (op, letter) in changes {
        let on = op == ModeOp::Add;
        match letter {
            'i' => after.invisible = on,
            'w' => after.wall_ops = on,
            's' => after.server_notice = on,
            // operator status is only ever granted through OPER
            'o' if !on => after.operator = false,
            'O' if !on => after.local_operator = false,
            _ => {}
        }
    }
    if let Some(target_client) = server.clients.get_mut(&target) {
        target_client.modes = after;
    }

    let mut adds = String::new();
    let mut removes = String::new();
    for (letter, was, is) in [
        ('i', before.invisible, after.invisible),
        ('w', before.wall_ops, after.wall_ops),
        ('s', before.server_notice, after.server_notice),
        ('o', before.operator, after.operator),
        ('O', before.local_operator, after.local_operator),
    ] {
        if !was && is {
            adds.push(letter);
        } else if was && !is {
            removes.push(letter);
        }
    }
    if adds.is_empty() && removes.is_empty() {
        return;
    }
    let mut modestring = String::new();
    if !adds.is_empty() {
        modestring.push('+');
        modestring.push_str(&adds);
    }
    if !removes.is_empty() {
        modestring.push('-');
        modestring.push_str(&removes);
    }

    let target_nick = server
        .clients
        .get(&target)
        .map(|c| c.nick().to_string())
        .unwrap_or(nickname);
    if let Some(client) = server.clients.get(&id) {
        client.reply(
            Message::cmd("MODE", vec![target_nick, modestring]).with_prefix(client.prefix()),
        );
    }
}

pub(crate) fn kill(server: &mut Server, id: ClientId, nickname: String, comment: String) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    if !client.modes.operator {
        client.err_no_privileges(&server.info);
        return;
    }
    let Some(target) = server.nicks.get(&nickname) else {
        client.err_no_such_nick(&server.info, &nickname);
        return;
    };
    let reason = format!("KILLed by {}: {}", client.nick(), comment);
    info!(client = %id, target = %nickname, "KILL");
    server.quit(target, &reason);
}

/// Operator introspection. Non-operators are ignored outright.
pub(crate) fn debug(server: &mut Server, id: ClientId, subcommand: String) {
    let Some(client) = server.clients.get(&id) else {
        return;
    };
    if !client.modes.operator {
        return;
    }
    match subcommand.as_str() {
        "STATS" => {
            server_message(client, &server.info, &format!("clients: {}", server.clients.len()));
            server_message(
                client,
                &server.info,
                &format!("channels: {}", server.channels.len()),
            );
            server_message(
                client,
                &server.info,
                &format!("registered nicks: {}", server.nicks.len()),
            );
        }
        "UPTIME" => {
            server_message(
                client,
                &server.info,
                &format!("up since {}", server.info.created.format("%a %b %e %Y %T UTC")),
            );
        }
        _ => {}
    }
}

fn server_message(client: &Client, srv: &ServerInfo, text: &str) {
    client.reply(
        Message::cmd_trailing("PRIVMSG", vec![client.nick().to_string(), text.to_string()])
            .with_prefix(Prefix::Server(srv.name.clone())),
    );
}
