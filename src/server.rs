//! The event loop - the single serializer for all state mutation.
//!
//! Every change to shared state (clients, channels, the nickname
//! registry) happens on this loop, one event at a time. Connection tasks
//! and listeners only enqueue events; replies leave through per-client
//! bounded queues. Fan-out therefore appears atomic with respect to other
//! events, and commands from one connection are processed in wire order.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use lark_proto::{Command, CommandParseError, Message, ParseErrorKind};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::handlers;
use crate::network::connection;
use crate::state::{Channel, ChannelTable, Client, ClientId, NickRegistry, Phase, ServerInfo, WhowasEntry};
use crate::store::{ChannelRecord, ChannelStore};

/// Outbound queue capacity per client. A consumer that falls this far
/// behind is killed rather than allowed to stall the loop.
pub(crate) const SEND_QUEUE_LIMIT: usize = 128;

/// Capacity of the central event queue.
pub(crate) const EVENT_QUEUE_LIMIT: usize = 1024;

/// One unit of work for the event loop.
pub enum Event {
    /// A freshly accepted connection.
    Accept(TcpStream, SocketAddr),
    /// A parsed command from a connection, in wire order.
    Command(ClientId, Command),
    /// A line that tokenized but failed command parsing.
    Malformed(ClientId, CommandParseError),
    /// The client has been idle past its idle budget.
    Idle(ClientId),
    /// No PONG (or anything else) arrived within the timeout window.
    Timeout(ClientId),
    /// Terminate: notify clients, close the store, exit the loop.
    Shutdown,
}

/// The server: configuration plus the authoritative in-memory state.
pub struct Server {
    pub(crate) info: ServerInfo,
    pub(crate) config: Config,
    pub(crate) password: Option<String>,
    pub(crate) motd: Option<Vec<String>>,
    pub(crate) idle_timeout: Duration,
    pub(crate) quit_timeout: Duration,
    pub(crate) clients: HashMap<ClientId, Client>,
    pub(crate) channels: ChannelTable,
    pub(crate) nicks: NickRegistry,
    pub(crate) store: ChannelStore,
    events_tx: mpsc::Sender<Event>,
    next_id: u64,
}

impl Server {
    pub fn new(
        config: Config,
        motd: Option<Vec<String>>,
        registered: Vec<ChannelRecord>,
        store: ChannelStore,
        events_tx: mpsc::Sender<Event>,
    ) -> Server {
        let info = ServerInfo::new(&config.server.name);
        let mut channels = ChannelTable::default();
        for record in &registered {
            channels.insert(Channel::from_record(record));
        }
        if !registered.is_empty() {
            info!(count = registered.len(), "loaded registered channels");
        }

        Server {
            password: config.server.password.clone(),
            idle_timeout: Duration::from_secs(config.server.timeouts.idle),
            quit_timeout: Duration::from_secs(config.server.timeouts.quit),
            motd,
            info,
            config,
            clients: HashMap::new(),
            channels,
            nicks: NickRegistry::default(),
            store,
            events_tx,
            next_id: 0,
        }
    }

    /// Run the loop until shutdown.
    pub async fn run(mut self, mut events: mpsc::Receiver<Event>) {
        info!(server = %self.info.name, "event loop running");
        while let Some(event) = events.recv().await {
            if matches!(event, Event::Shutdown) {
                self.shutdown().await;
                break;
            }
            self.handle_event(event);
            self.reap_overflowed();
        }
        info!(server = %self.info.name, "event loop stopped");
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Accept(stream, addr) => self.accept(stream, addr),
            Event::Command(id, cmd) => {
                // A handler panic must not take down the loop: log it,
                // drop the offending client, keep serving everyone else.
                let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                    self.process_command(id, cmd);
                }));
                if result.is_err() {
                    error!(client = %id, "handler panicked");
                    self.quit(id, "internal error");
                }
            }
            Event::Malformed(id, err) => self.reject(id, err),
            Event::Idle(id) => self.notify_idle(id),
            Event::Timeout(id) => self.quit(id, "connection timeout"),
            Event::Shutdown => unreachable!("handled in run"),
        }
    }

    fn accept(&mut self, stream: TcpStream, addr: SocketAddr) {
        self.next_id += 1;
        let id = ClientId(self.next_id);
        let (tx, rx) = mpsc::channel(SEND_QUEUE_LIMIT);
        let phase = if self.password.is_some() {
            Phase::Authorization
        } else {
            Phase::Registration
        };
        let client = Client::new(id, addr.ip().to_string(), phase, tx);
        connection::spawn(
            id,
            stream,
            addr,
            self.events_tx.clone(),
            rx,
            self.idle_timeout,
            self.quit_timeout,
        );
        self.clients.insert(id, client);
        info!(client = %id, %addr, "connection accepted");
    }

    /// Phase-gated dispatch.
    pub(crate) fn process_command(&mut self, id: ClientId, cmd: Command) {
        let Some(client) = self.clients.get(&id) else {
            return;
        };
        debug!(client = %id, nick = %client.nick(), verb = cmd.verb(), "dispatch");

        match client.phase {
            Phase::Authorization => match cmd {
                Command::Proxy { hostname } => handlers::registration::proxy(self, id, hostname),
                Command::Cap { .. } => {}
                Command::Pass { password } => {
                    handlers::registration::pass_authorize(self, id, password)
                }
                Command::Quit { message } => {
                    self.quit(id, message.as_deref().unwrap_or("Client Quit"))
                }
                _ => self.quit(id, "unexpected command"),
            },

            Phase::Registration => match cmd {
                Command::Proxy { hostname } => handlers::registration::proxy(self, id, hostname),
                Command::Cap { .. } => {}
                Command::Nick { nickname } => {
                    handlers::registration::nick_register(self, id, nickname)
                }
                Command::User(user) => handlers::registration::user_register(self, id, user),
                Command::Quit { message } => {
                    self.quit(id, message.as_deref().unwrap_or("Client Quit"))
                }
                _ => self.quit(id, "unexpected command"),
            },

            Phase::Normal => {
                if let Some(client) = self.clients.get_mut(&id) {
                    match &cmd {
                        Command::Ping { .. } | Command::Pong { .. } => client.touch(),
                        Command::Quit { .. } => {}
                        _ => {
                            client.active();
                            client.touch();
                        }
                    }
                }
                self.dispatch_normal(id, cmd);
            }

            Phase::Terminated => {}
        }
    }

    fn dispatch_normal(&mut self, id: ClientId, cmd: Command) {
        match cmd {
            Command::Ping { token } => handlers::query::ping(self, id, token),
            Command::Pong { .. } => {}
            Command::Quit { message } => {
                self.quit(id, message.as_deref().unwrap_or("Client Quit"))
            }
            Command::Nick { nickname } => handlers::registration::nick_change(self, id, nickname),
            Command::Pass { .. } | Command::User(_) => {
                if let Some(client) = self.clients.get(&id) {
                    client.err_already_registered(&self.info);
                }
            }
            Command::Cap { .. } => {}
            Command::Join { channels, zero } => handlers::channel::join(self, id, channels, zero),
            Command::Part { channels, message } => {
                handlers::channel::part(self, id, channels, message)
            }
            Command::Topic { channel, topic } => handlers::channel::topic(self, id, channel, topic),
            Command::PrivMsg { target, text } => {
                handlers::messaging::message(self, id, target, text, false)
            }
            Command::Notice { target, text } => {
                handlers::messaging::message(self, id, target, text, true)
            }
            Command::UserMode { nickname, changes } => {
                handlers::oper::user_mode(self, id, nickname, changes)
            }
            Command::ChannelMode { channel, changes } => {
                handlers::channel::mode(self, id, channel, changes)
            }
            Command::Who { mask } => handlers::query::who(self, id, mask),
            Command::Whois { masks } => handlers::query::whois(self, id, masks),
            Command::Whowas { nicknames } => handlers::query::whowas(self, id, nicknames),
            Command::Oper { name, password } => handlers::oper::oper(self, id, name, password),
            Command::Away { text } => handlers::messaging::away(self, id, text),
            Command::Ison { nicks } => handlers::messaging::ison(self, id, nicks),
            Command::Motd => handlers::query::motd(self, id),
            Command::Kick { kicks, comment } => handlers::channel::kick(self, id, kicks, comment),
            Command::List { channels, target } => {
                handlers::channel::list(self, id, channels, target)
            }
            Command::Names { channels } => handlers::channel::names(self, id, channels),
            Command::Invite { nickname, channel } => {
                handlers::channel::invite(self, id, nickname, channel)
            }
            Command::Time { target } => handlers::query::time(self, id, target),
            Command::Version { target } => handlers::query::version(self, id, target),
            Command::Debug { subcommand } => handlers::oper::debug(self, id, subcommand),
            Command::Kill { nickname, comment } => {
                handlers::oper::kill(self, id, nickname, comment)
            }
            Command::Proxy { .. } => {
                if let Some(client) = self.clients.get(&id) {
                    client.err_unknown_command(&self.info, "PROXY");
                }
            }
            Command::Unknown { verb } => {
                if let Some(client) = self.clients.get(&id) {
                    client.err_unknown_command(&self.info, &verb);
                }
            }
        }
    }

    /// A line that tokenized but failed command parsing. Inside the
    /// authorization and registration phases, verbs outside the admitted
    /// set still terminate the connection; admitted verbs get their
    /// numeric and the connection stays open.
    fn reject(&mut self, id: ClientId, err: CommandParseError) {
        let Some(client) = self.clients.get(&id) else {
            return;
        };
        let admitted: &[&str] = match client.phase {
            Phase::Authorization => &["PROXY", "CAP", "PASS", "QUIT"],
            Phase::Registration => &["PROXY", "CAP", "NICK", "USER", "QUIT"],
            Phase::Normal => {
                self.parse_error_reply(id, &err);
                return;
            }
            Phase::Terminated => return,
        };
        if admitted.contains(&err.verb.as_str()) {
            self.parse_error_reply(id, &err);
        } else {
            self.quit(id, "unexpected command");
        }
    }

    fn parse_error_reply(&self, id: ClientId, err: &CommandParseError) {
        let Some(client) = self.clients.get(&id) else {
            return;
        };
        match err.kind {
            ParseErrorKind::NeedMoreParams => client.err_need_more_params(&self.info, &err.verb),
            ParseErrorKind::NoRecipient => client.err_no_recipient(&self.info, &err.verb),
            ParseErrorKind::NoTextToSend => client.err_no_text_to_send(&self.info),
            ParseErrorKind::NoNicknameGiven => client.err_no_nickname_given(&self.info),
        }
    }

    /// Idle budget elapsed: ping the client; the connection task opens
    /// the timeout window.
    fn notify_idle(&mut self, id: ClientId) {
        let Some(client) = self.clients.get(&id) else {
            return;
        };
        debug!(
            client = %id,
            nick = %client.nick(),
            quiet_secs = client.touched_seconds(),
            "idle, sending PING"
        );
        client.reply(Message::cmd_trailing("PING", vec![self.info.name.clone()]));
    }

    /// The set of clients sharing at least one channel with `id`,
    /// excluding `id` itself.
    pub(crate) fn friends(&self, id: ClientId) -> HashSet<ClientId> {
        let mut friends = HashSet::new();
        if let Some(client) = self.clients.get(&id) {
            for name in &client.channels {
                if let Some(channel) = self.channels.get(name) {
                    friends.extend(channel.members.keys().copied());
                }
            }
        }
        friends.remove(&id);
        friends
    }

    /// Send a message to every member of a channel, optionally skipping
    /// one client (the sender, for PRIVMSG/NOTICE fan-out).
    pub(crate) fn broadcast_to_channel(&self, name: &str, msg: &Message, skip: Option<ClientId>) {
        let Some(channel) = self.channels.get(name) else {
            return;
        };
        for member in channel.members.keys() {
            if Some(*member) == skip {
                continue;
            }
            if let Some(client) = self.clients.get(member) {
                client.reply(msg.clone());
            }
        }
    }

    /// Write back a registered channel's settings, off the loop. Errors
    /// are logged and never touch in-memory state.
    pub(crate) fn save_channel(&self, channel: &Channel) {
        if !channel.persistent {
            return;
        }
        let store = self.store.clone();
        let record = channel.to_record();
        tokio::spawn(async move {
            if let Err(e) = store.save(&record).await {
                warn!(channel = %record.name, error = %e, "failed to persist channel");
            }
        });
    }

    /// The unified termination path. Broadcasts QUIT to everyone sharing
    /// a channel, removes the client from every channel and the nickname
    /// registry, and drops its outbound queue (which lets the connection
    /// task drain and close the socket).
    pub(crate) fn quit(&mut self, id: ClientId, reason: &str) {
        let Some(client) = self.clients.get_mut(&id) else {
            return;
        };
        if client.phase == Phase::Terminated {
            return;
        }
        client.phase = Phase::Terminated;

        let prefix = client.prefix();
        let hostname = client.hostname.clone();
        let nick = client.nick.clone();
        let username = client.username().to_string();
        let realname = client.realname.clone();
        let channel_names: Vec<String> = client.channels.iter().cloned().collect();
        info!(client = %id, nick = %client.nick(), %reason, "client quit");

        client.reply(Message::cmd_trailing(
            "ERROR",
            vec![format!("Closing Link: {hostname} ({reason})")],
        ));

        let friends = self.friends(id);
        let quit_msg =
            Message::cmd_trailing("QUIT", vec![reason.to_string()]).with_prefix(prefix);
        for friend in friends {
            if let Some(peer) = self.clients.get(&friend) {
                peer.reply(quit_msg.clone());
            }
        }

        for name in channel_names {
            let mut delete = false;
            if let Some(channel) = self.channels.get_mut(&name) {
                channel.members.remove(&id);
                channel.invited.remove(&id);
                delete = channel.members.is_empty() && !channel.persistent;
            }
            if delete {
                self.channels.remove(&name);
            }
        }

        if let Some(nick) = nick {
            match self.nicks.remove(id, &nick) {
                Ok(()) => self.nicks.record_whowas(WhowasEntry {
                    nick,
                    username,
                    hostname,
                    realname,
                }),
                // nick chosen but registration never completed
                Err(e) => debug!(client = %id, error = %e, "nick not registered at quit"),
            }
        }

        self.clients.remove(&id);
    }

    /// Kill clients whose outbound queue overflowed during this event.
    fn reap_overflowed(&mut self) {
        let overflowed: Vec<ClientId> = self
            .clients
            .iter()
            .filter(|(_, c)| c.overflowed() && c.phase != Phase::Terminated)
            .map(|(id, _)| *id)
            .collect();
        for id in overflowed {
            warn!(client = %id, "send queue exceeded");
            self.quit(id, "send queue exceeded");
        }
    }

    async fn shutdown(&mut self) {
        info!("shutting down");
        let notice = |nick: &str| {
            Message::cmd_trailing(
                "NOTICE",
                vec![nick.to_string(), "shutting down".to_string()],
            )
            .with_prefix(lark_proto::Prefix::Server(self.info.name.clone()))
        };
        for client in self.clients.values() {
            client.reply(notice(client.nick()));
        }
        self.store.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServerConfig, TimeoutsConfig};
    use lark_proto::UserCommand;

    async fn test_server() -> Server {
        let config = Config {
            server: ServerConfig {
                name: "irc.test".into(),
                listen: vec![],
                password: None,
                motd: None,
                database: ":memory:".into(),
                timeouts: TimeoutsConfig::default(),
            },
            operators: HashMap::new(),
        };
        let store = ChannelStore::open(":memory:").await.unwrap();
        let (events_tx, _events_rx) = mpsc::channel(EVENT_QUEUE_LIMIT);
        Server::new(config, None, vec![], store, events_tx)
    }

    /// Attach a client directly (no socket) and register it.
    fn register(server: &mut Server, nick: &str) -> (ClientId, mpsc::Receiver<Message>) {
        let (id, rx) = attach(server, Phase::Registration);
        server.process_command(
            id,
            Command::Nick {
                nickname: nick.to_string(),
            },
        );
        server.process_command(
            id,
            Command::User(UserCommand::Rfc2812 {
                username: nick.to_string(),
                mode: 0,
                realname: nick.to_string(),
            }),
        );
        (id, rx)
    }

    fn attach(server: &mut Server, phase: Phase) -> (ClientId, mpsc::Receiver<Message>) {
        server.next_id += 1;
        let id = ClientId(server.next_id);
        let (tx, rx) = mpsc::channel(SEND_QUEUE_LIMIT);
        let client = Client::new(id, "host.test".into(), phase, tx);
        server.clients.insert(id, client);
        (id, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<Message>) -> Vec<Message> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn registration_emits_welcome_burst_in_order() {
        let mut server = test_server().await;
        let (_id, mut rx) = register(&mut server, "alice");
        let burst = drain(&mut rx);
        let codes: Vec<&str> = burst.iter().map(|m| m.command.as_str()).collect();
        assert_eq!(codes, vec!["001", "002", "003", "004", "005", "422"]);
        assert_eq!(burst[0].params[0], "alice");
    }

    #[tokio::test]
    async fn nick_collision_rejected_with_433() {
        let mut server = test_server().await;
        let (_alice, _rx) = register(&mut server, "alice");
        let (bob, mut rx) = attach(&mut server, Phase::Registration);
        server.process_command(
            bob,
            Command::Nick {
                nickname: "ALICE".to_string(),
            },
        );
        let replies = drain(&mut rx);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].command, "433");
        assert_eq!(replies[0].params, vec!["*", "ALICE", "Nickname is already in use"]);
        // alice keeps her registration
        assert!(server.nicks.get("alice").is_some());
    }

    #[tokio::test]
    async fn no_two_clients_share_a_lowercase_nick() {
        let mut server = test_server().await;
        let (_alice, _rx1) = register(&mut server, "Alice");
        let (_bob, _rx2) = register(&mut server, "aLiCe");
        assert_eq!(server.nicks.len(), 1);
    }

    #[tokio::test]
    async fn join_then_part_restores_membership_state() {
        let mut server = test_server().await;
        let (alice, _rx) = register(&mut server, "alice");
        server.process_command(
            alice,
            Command::Join {
                channels: vec![("#x".into(), None)],
                zero: false,
            },
        );
        assert!(server.channels.contains("#x"));
        assert!(server.clients[&alice].channels.contains("#x"));
        assert!(server.channels.get("#x").unwrap().has_operator(alice));

        server.process_command(
            alice,
            Command::Part {
                channels: vec!["#x".into()],
                message: None,
            },
        );
        // empty non-persistent channel is gone, membership is gone
        assert!(!server.channels.contains("#x"));
        assert!(server.clients[&alice].channels.is_empty());
    }

    #[tokio::test]
    async fn membership_is_bidirectional() {
        let mut server = test_server().await;
        let (alice, _rx1) = register(&mut server, "alice");
        let (bob, _rx2) = register(&mut server, "bob");
        for id in [alice, bob] {
            server.process_command(
                id,
                Command::Join {
                    channels: vec![("#x".into(), None)],
                    zero: false,
                },
            );
        }
        let channel = server.channels.get("#x").unwrap();
        for (member, _) in &channel.members {
            assert!(server.clients[member].channels.contains("#x"));
        }
        for (id, client) in &server.clients {
            for name in &client.channels {
                assert!(server.channels.get(name).unwrap().members.contains_key(id));
            }
        }
    }

    #[tokio::test]
    async fn quit_removes_client_everywhere() {
        let mut server = test_server().await;
        let (alice, _rx1) = register(&mut server, "alice");
        let (bob, mut rx2) = register(&mut server, "bob");
        for id in [alice, bob] {
            server.process_command(
                id,
                Command::Join {
                    channels: vec![("#x".into(), None)],
                    zero: false,
                },
            );
        }
        drain(&mut rx2);

        server.process_command(
            alice,
            Command::Quit {
                message: Some("bye".into()),
            },
        );
        assert!(server.nicks.get("alice").is_none());
        assert!(!server.clients.contains_key(&alice));
        let channel = server.channels.get("#x").unwrap();
        assert!(!channel.members.contains_key(&alice));

        // bob saw the QUIT
        let msgs = drain(&mut rx2);
        assert!(msgs
            .iter()
            .any(|m| m.command == "QUIT" && m.params == vec!["bye"]));

        // and WHOWAS now knows alice
        assert!(server.nicks.whowas("alice").is_some());
    }

    #[tokio::test]
    async fn unexpected_command_during_authorization_disconnects() {
        let mut server = test_server().await;
        server.password = Some("secret".into());
        let (id, _rx) = attach(&mut server, Phase::Authorization);
        server.process_command(
            id,
            Command::Join {
                channels: vec![("#x".into(), None)],
                zero: false,
            },
        );
        assert!(!server.clients.contains_key(&id));
    }

    #[tokio::test]
    async fn bad_pass_gets_464_then_disconnect() {
        let mut server = test_server().await;
        server.password = Some("secret".into());
        let (id, mut rx) = attach(&mut server, Phase::Authorization);
        server.process_command(
            id,
            Command::Pass {
                password: "wrong".into(),
            },
        );
        assert!(!server.clients.contains_key(&id));
        let msgs = drain(&mut rx);
        assert_eq!(msgs[0].command, "464");
        assert!(msgs.iter().any(|m| m.command == "ERROR"));
    }

    #[tokio::test]
    async fn pass_in_normal_phase_yields_462_without_disconnect() {
        let mut server = test_server().await;
        let (alice, mut rx) = register(&mut server, "alice");
        drain(&mut rx);
        server.process_command(
            alice,
            Command::Pass {
                password: "x".into(),
            },
        );
        let msgs = drain(&mut rx);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].command, "462");
        assert!(server.clients.contains_key(&alice));
    }

    #[tokio::test]
    async fn privmsg_fans_out_to_everyone_but_the_sender() {
        let mut server = test_server().await;
        let (alice, mut arx) = register(&mut server, "alice");
        let (bob, mut brx) = register(&mut server, "bob");
        for id in [alice, bob] {
            server.process_command(
                id,
                Command::Join {
                    channels: vec![("#x".into(), None)],
                    zero: false,
                },
            );
        }
        drain(&mut arx);
        drain(&mut brx);

        server.process_command(
            alice,
            Command::PrivMsg {
                target: "#x".into(),
                text: "hi".into(),
            },
        );
        let bob_msgs = drain(&mut brx);
        assert_eq!(bob_msgs.len(), 1);
        assert_eq!(
            bob_msgs[0].to_string(),
            ":alice!alice@host.test PRIVMSG #x :hi"
        );
        assert!(drain(&mut arx).is_empty());
    }

    #[tokio::test]
    async fn nick_to_same_nick_is_a_noop() {
        let mut server = test_server().await;
        let (alice, mut rx) = register(&mut server, "alice");
        drain(&mut rx);
        server.process_command(
            alice,
            Command::Nick {
                nickname: "alice".into(),
            },
        );
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn self_mode_round_trip_broadcasts_net_change_only() {
        let mut server = test_server().await;
        let (alice, mut rx) = register(&mut server, "alice");
        drain(&mut rx);

        use lark_proto::ModeOp;
        server.process_command(
            alice,
            Command::UserMode {
                nickname: "alice".into(),
                changes: vec![(ModeOp::Add, 'i'), (ModeOp::Remove, 'i')],
            },
        );
        assert!(drain(&mut rx).is_empty());
        assert!(!server.clients[&alice].modes.invisible);

        server.process_command(
            alice,
            Command::UserMode {
                nickname: "alice".into(),
                changes: vec![(ModeOp::Add, 'i')],
            },
        );
        let msgs = drain(&mut rx);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].command, "MODE");
        assert_eq!(msgs[0].params, vec!["alice", "+i"]);
    }

    #[tokio::test]
    async fn send_queue_overflow_reaps_the_client() {
        let mut server = test_server().await;
        let (alice, _rx) = register(&mut server, "alice");
        // rx never drained: flood until the bounded queue overflows
        for _ in 0..SEND_QUEUE_LIMIT + 8 {
            server.process_command(
                alice,
                Command::PrivMsg {
                    target: "alice".into(),
                    text: "echo".into(),
                },
            );
        }
        server.reap_overflowed();
        assert!(!server.clients.contains_key(&alice));
    }
}
