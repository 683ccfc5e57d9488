//! Per-connection client state and reply formatting.

use std::cell::Cell;
use std::collections::HashSet;
use std::time::Instant;

use lark_proto::{Message, Prefix, Reply};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::ServerInfo;

/// Stable handle for a connection; all shared state is keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a connection in the protocol lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Authorization,
    Registration,
    Normal,
    Terminated,
}

/// User mode flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UserModes {
    pub invisible: bool,      // +i
    pub wall_ops: bool,       // +w
    pub server_notice: bool,  // +s
    pub operator: bool,       // +o
    pub local_operator: bool, // +O
    pub away: bool,           // +a, set via AWAY rather than MODE
}

impl UserModes {
    /// Wire form, e.g. `+iw`. A client with no modes yields `+`.
    pub fn to_modestring(self) -> String {
        let mut s = String::from("+");
        for (set, letter) in [
            (self.invisible, 'i'),
            (self.wall_ops, 'w'),
            (self.server_notice, 's'),
            (self.operator, 'o'),
            (self.local_operator, 'O'),
            (self.away, 'a'),
        ] {
            if set {
                s.push(letter);
            }
        }
        s
    }
}

/// One connected user.
///
/// The dispatcher owns every field; the outbound sender is the only thing
/// shared with the connection task. Replies go through a bounded queue so
/// a stalled consumer can never block the dispatcher: when the queue is
/// full the client is flagged and reaped with "send queue exceeded".
pub struct Client {
    pub id: ClientId,
    pub hostname: String,
    pub nick: Option<String>,
    pub username: Option<String>,
    pub realname: String,
    pub modes: UserModes,
    pub away_message: Option<String>,
    /// Lowercase names of channels this client is a member of.
    pub channels: HashSet<String>,
    pub phase: Phase,
    last_active: Instant,
    last_touched: Instant,
    outgoing: mpsc::Sender<Message>,
    overflowed: Cell<bool>,
}

impl Client {
    pub fn new(
        id: ClientId,
        hostname: String,
        phase: Phase,
        outgoing: mpsc::Sender<Message>,
    ) -> Client {
        let now = Instant::now();
        Client {
            id,
            hostname,
            nick: None,
            username: None,
            realname: String::new(),
            modes: UserModes::default(),
            away_message: None,
            channels: HashSet::new(),
            phase,
            last_active: now,
            last_touched: now,
            outgoing,
            overflowed: Cell::new(false),
        }
    }

    pub fn has_nick(&self) -> bool {
        self.nick.is_some()
    }

    pub fn has_username(&self) -> bool {
        self.username.is_some()
    }

    /// The nickname, or `*` before one is set (the placeholder used as
    /// the target of pre-registration numerics).
    pub fn nick(&self) -> &str {
        self.nick.as_deref().unwrap_or("*")
    }

    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or("unknown")
    }

    /// Full identity, `nick!user@host`.
    pub fn userhost(&self) -> String {
        format!("{}!{}@{}", self.nick(), self.username(), self.hostname)
    }

    /// Message prefix carrying this client's identity.
    pub fn prefix(&self) -> Prefix {
        Prefix::user(self.nick(), self.username(), self.hostname.clone())
    }

    /// Record protocol activity (everything but PING/PONG/QUIT).
    pub fn active(&mut self) {
        self.last_active = Instant::now();
    }

    /// Record liveness without counting as activity.
    pub fn touch(&mut self) {
        self.last_touched = Instant::now();
    }

    /// Seconds since the last activity, for WHOIS idle reporting.
    pub fn idle_seconds(&self) -> u64 {
        self.last_active.elapsed().as_secs()
    }

    /// Seconds since the last touch (liveness, including PING/PONG).
    pub fn touched_seconds(&self) -> u64 {
        self.last_touched.elapsed().as_secs()
    }

    /// Enqueue a message on the outbound queue.
    ///
    /// Overflow marks the client instead of blocking; the dispatcher
    /// reaps marked clients after the current event.
    pub fn reply(&self, msg: Message) {
        if self.overflowed.get() {
            return;
        }
        match self.outgoing.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => self.overflowed.set(true),
            // Connection task already gone; its EOF quit is in flight.
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Whether the outbound queue overflowed.
    pub fn overflowed(&self) -> bool {
        self.overflowed.get()
    }

    /// Format and enqueue a numeric reply targeted at this client.
    pub fn numeric(&self, srv: &ServerInfo, reply: Reply, params: Vec<String>) {
        self.reply(Message::numeric(&srv.name, reply, self.nick(), params));
    }

    // ------------------------------------------------------------------
    // Registration burst
    // ------------------------------------------------------------------

    pub fn rpl_welcome(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::RPL_WELCOME,
            vec![format!(
                "Welcome to the Internet Relay Network {}",
                self.userhost()
            )],
        );
    }

    pub fn rpl_yourhost(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::RPL_YOURHOST,
            vec![format!(
                "Your host is {}, running version {}",
                srv.name, srv.version
            )],
        );
    }

    pub fn rpl_created(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::RPL_CREATED,
            vec![format!(
                "This server was created {}",
                srv.created.format("%a %b %e %Y at %T UTC")
            )],
        );
    }

    pub fn rpl_myinfo(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::RPL_MYINFO,
            vec![
                srv.name.clone(),
                srv.version.clone(),
                "aiwsoO".to_string(),
                "iklmnopstv".to_string(),
            ],
        );
    }

    pub fn rpl_isupport(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::RPL_ISUPPORT,
            vec![
                format!("NICKLEN={}", lark_proto::nick::MAX_NICK_LEN),
                format!("CHANNELLEN={}", lark_proto::chan::MAX_CHANNEL_LEN),
                "CHANTYPES=#&".to_string(),
                "PREFIX=(ov)@+".to_string(),
                "CHANMODES=,k,l,imnpst".to_string(),
                "CASEMAPPING=rfc1459".to_string(),
                "are supported by this server".to_string(),
            ],
        );
    }

    // ------------------------------------------------------------------
    // Command replies
    // ------------------------------------------------------------------

    pub fn rpl_umodeis(&self, srv: &ServerInfo, modes: UserModes) {
        self.numeric(srv, Reply::RPL_UMODEIS, vec![modes.to_modestring()]);
    }

    pub fn rpl_away(&self, srv: &ServerInfo, nick: &str, text: &str) {
        self.numeric(
            srv,
            Reply::RPL_AWAY,
            vec![nick.to_string(), text.to_string()],
        );
    }

    pub fn rpl_unaway(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::RPL_UNAWAY,
            vec!["You are no longer marked as being away".to_string()],
        );
    }

    pub fn rpl_nowaway(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::RPL_NOWAWAY,
            vec!["You have been marked as being away".to_string()],
        );
    }

    pub fn rpl_ison(&self, srv: &ServerInfo, nicks: &[String]) {
        self.numeric(srv, Reply::RPL_ISON, vec![nicks.join(" ")]);
    }

    pub fn rpl_motd_start(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::RPL_MOTDSTART,
            vec![format!("- {} Message of the day - ", srv.name)],
        );
    }

    pub fn rpl_motd(&self, srv: &ServerInfo, line: &str) {
        self.numeric(srv, Reply::RPL_MOTD, vec![format!("- {line}")]);
    }

    pub fn rpl_motd_end(&self, srv: &ServerInfo) {
        self.numeric(srv, Reply::RPL_ENDOFMOTD, vec!["End of MOTD command".to_string()]);
    }

    pub fn rpl_youreoper(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::RPL_YOUREOPER,
            vec!["You are now an IRC operator".to_string()],
        );
    }

    pub fn rpl_time(&self, srv: &ServerInfo, time: &str) {
        self.numeric(
            srv,
            Reply::RPL_TIME,
            vec![srv.name.clone(), time.to_string()],
        );
    }

    pub fn rpl_version(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::RPL_VERSION,
            vec![srv.version.clone(), srv.name.clone()],
        );
    }

    pub fn rpl_inviting(&self, srv: &ServerInfo, nick: &str, channel: &str) {
        self.numeric(
            srv,
            Reply::RPL_INVITING,
            vec![nick.to_string(), channel.to_string()],
        );
    }

    pub fn rpl_liststart(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::RPL_LISTSTART,
            vec!["Channel".to_string(), "Users Name".to_string()],
        );
    }

    pub fn rpl_list(&self, srv: &ServerInfo, channel: &str, visible: usize, topic: &str) {
        self.numeric(
            srv,
            Reply::RPL_LIST,
            vec![channel.to_string(), visible.to_string(), topic.to_string()],
        );
    }

    pub fn rpl_listend(&self, srv: &ServerInfo) {
        self.numeric(srv, Reply::RPL_LISTEND, vec!["End of LIST".to_string()]);
    }

    pub fn rpl_channelmodeis(&self, srv: &ServerInfo, channel: &str, modes: Vec<String>) {
        let mut params = vec![channel.to_string()];
        params.extend(modes);
        self.numeric(srv, Reply::RPL_CHANNELMODEIS, params);
    }

    pub fn rpl_notopic(&self, srv: &ServerInfo, channel: &str) {
        self.numeric(
            srv,
            Reply::RPL_NOTOPIC,
            vec![channel.to_string(), "No topic is set".to_string()],
        );
    }

    pub fn rpl_topic(&self, srv: &ServerInfo, channel: &str, topic: &str) {
        self.numeric(
            srv,
            Reply::RPL_TOPIC,
            vec![channel.to_string(), topic.to_string()],
        );
    }

    pub fn rpl_namreply(&self, srv: &ServerInfo, symbol: char, channel: &str, names: &str) {
        self.numeric(
            srv,
            Reply::RPL_NAMREPLY,
            vec![symbol.to_string(), channel.to_string(), names.to_string()],
        );
    }

    pub fn rpl_endofnames(&self, srv: &ServerInfo, channel: &str) {
        self.numeric(
            srv,
            Reply::RPL_ENDOFNAMES,
            vec![channel.to_string(), "End of NAMES list".to_string()],
        );
    }

    pub fn rpl_endofwho(&self, srv: &ServerInfo, mask: &str) {
        self.numeric(
            srv,
            Reply::RPL_ENDOFWHO,
            vec![mask.to_string(), "End of WHO list".to_string()],
        );
    }

    pub fn rpl_whoisuser(
        &self,
        srv: &ServerInfo,
        nick: &str,
        user: &str,
        host: &str,
        realname: &str,
    ) {
        self.numeric(
            srv,
            Reply::RPL_WHOISUSER,
            vec![
                nick.to_string(),
                user.to_string(),
                host.to_string(),
                "*".to_string(),
                realname.to_string(),
            ],
        );
    }

    pub fn rpl_whoisserver(&self, srv: &ServerInfo, nick: &str) {
        self.numeric(
            srv,
            Reply::RPL_WHOISSERVER,
            vec![nick.to_string(), srv.name.clone(), srv.version.clone()],
        );
    }

    pub fn rpl_whoisoperator(&self, srv: &ServerInfo, nick: &str) {
        self.numeric(
            srv,
            Reply::RPL_WHOISOPERATOR,
            vec![nick.to_string(), "is an IRC operator".to_string()],
        );
    }

    pub fn rpl_whoisidle(&self, srv: &ServerInfo, nick: &str, idle: u64) {
        self.numeric(
            srv,
            Reply::RPL_WHOISIDLE,
            vec![
                nick.to_string(),
                idle.to_string(),
                "seconds idle".to_string(),
            ],
        );
    }

    pub fn rpl_whoischannels(&self, srv: &ServerInfo, nick: &str, channels: &str) {
        self.numeric(
            srv,
            Reply::RPL_WHOISCHANNELS,
            vec![nick.to_string(), channels.to_string()],
        );
    }

    pub fn rpl_endofwhois(&self, srv: &ServerInfo, mask: &str) {
        self.numeric(
            srv,
            Reply::RPL_ENDOFWHOIS,
            vec![mask.to_string(), "End of WHOIS list".to_string()],
        );
    }

    pub fn rpl_whowasuser(
        &self,
        srv: &ServerInfo,
        nick: &str,
        user: &str,
        host: &str,
        realname: &str,
    ) {
        self.numeric(
            srv,
            Reply::RPL_WHOWASUSER,
            vec![
                nick.to_string(),
                user.to_string(),
                host.to_string(),
                "*".to_string(),
                realname.to_string(),
            ],
        );
    }

    pub fn rpl_endofwhowas(&self, srv: &ServerInfo, nick: &str) {
        self.numeric(
            srv,
            Reply::RPL_ENDOFWHOWAS,
            vec![nick.to_string(), "End of WHOWAS".to_string()],
        );
    }

    // ------------------------------------------------------------------
    // Error replies
    // ------------------------------------------------------------------

    pub fn err_no_such_nick(&self, srv: &ServerInfo, nick: &str) {
        self.numeric(
            srv,
            Reply::ERR_NOSUCHNICK,
            vec![nick.to_string(), "No such nick/channel".to_string()],
        );
    }

    pub fn err_no_such_server(&self, srv: &ServerInfo, server: &str) {
        self.numeric(
            srv,
            Reply::ERR_NOSUCHSERVER,
            vec![server.to_string(), "No such server".to_string()],
        );
    }

    pub fn err_no_such_channel(&self, srv: &ServerInfo, channel: &str) {
        self.numeric(
            srv,
            Reply::ERR_NOSUCHCHANNEL,
            vec![channel.to_string(), "No such channel".to_string()],
        );
    }

    pub fn err_cannot_send_to_chan(&self, srv: &ServerInfo, channel: &str) {
        self.numeric(
            srv,
            Reply::ERR_CANNOTSENDTOCHAN,
            vec![channel.to_string(), "Cannot send to channel".to_string()],
        );
    }

    pub fn err_was_no_such_nick(&self, srv: &ServerInfo, nick: &str) {
        self.numeric(
            srv,
            Reply::ERR_WASNOSUCHNICK,
            vec![nick.to_string(), "There was no such nickname".to_string()],
        );
    }

    pub fn err_no_recipient(&self, srv: &ServerInfo, verb: &str) {
        self.numeric(
            srv,
            Reply::ERR_NORECIPIENT,
            vec![format!("No recipient given ({verb})")],
        );
    }

    pub fn err_no_text_to_send(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::ERR_NOTEXTTOSEND,
            vec!["No text to send".to_string()],
        );
    }

    pub fn err_unknown_command(&self, srv: &ServerInfo, verb: &str) {
        self.numeric(
            srv,
            Reply::ERR_UNKNOWNCOMMAND,
            vec![verb.to_string(), "Unknown command".to_string()],
        );
    }

    pub fn err_no_motd(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::ERR_NOMOTD,
            vec!["MOTD File is missing".to_string()],
        );
    }

    pub fn err_no_nickname_given(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::ERR_NONICKNAMEGIVEN,
            vec!["No nickname given".to_string()],
        );
    }

    pub fn err_erroneus_nickname(&self, srv: &ServerInfo, nick: &str) {
        self.numeric(
            srv,
            Reply::ERR_ERRONEUSNICKNAME,
            vec![nick.to_string(), "Erroneous nickname".to_string()],
        );
    }

    pub fn err_nickname_in_use(&self, srv: &ServerInfo, nick: &str) {
        self.numeric(
            srv,
            Reply::ERR_NICKNAMEINUSE,
            vec![nick.to_string(), "Nickname is already in use".to_string()],
        );
    }

    pub fn err_user_not_in_channel(&self, srv: &ServerInfo, nick: &str, channel: &str) {
        self.numeric(
            srv,
            Reply::ERR_USERNOTINCHANNEL,
            vec![
                nick.to_string(),
                channel.to_string(),
                "They aren't on that channel".to_string(),
            ],
        );
    }

    pub fn err_not_on_channel(&self, srv: &ServerInfo, channel: &str) {
        self.numeric(
            srv,
            Reply::ERR_NOTONCHANNEL,
            vec![
                channel.to_string(),
                "You're not on that channel".to_string(),
            ],
        );
    }

    pub fn err_user_on_channel(&self, srv: &ServerInfo, nick: &str, channel: &str) {
        self.numeric(
            srv,
            Reply::ERR_USERONCHANNEL,
            vec![
                nick.to_string(),
                channel.to_string(),
                "is already on channel".to_string(),
            ],
        );
    }

    pub fn err_need_more_params(&self, srv: &ServerInfo, verb: &str) {
        self.numeric(
            srv,
            Reply::ERR_NEEDMOREPARAMS,
            vec![verb.to_string(), "Not enough parameters".to_string()],
        );
    }

    pub fn err_already_registered(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::ERR_ALREADYREGISTRED,
            vec!["You may not reregister".to_string()],
        );
    }

    pub fn err_passwd_mismatch(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::ERR_PASSWDMISMATCH,
            vec!["Password incorrect".to_string()],
        );
    }

    pub fn err_channel_is_full(&self, srv: &ServerInfo, channel: &str) {
        self.numeric(
            srv,
            Reply::ERR_CHANNELISFULL,
            vec![channel.to_string(), "Cannot join channel (+l)".to_string()],
        );
    }

    pub fn err_unknown_mode(&self, srv: &ServerInfo, mode: char, channel: &str) {
        self.numeric(
            srv,
            Reply::ERR_UNKNOWNMODE,
            vec![
                mode.to_string(),
                format!("is unknown mode char to me for {channel}"),
            ],
        );
    }

    pub fn err_invite_only_chan(&self, srv: &ServerInfo, channel: &str) {
        self.numeric(
            srv,
            Reply::ERR_INVITEONLYCHAN,
            vec![channel.to_string(), "Cannot join channel (+i)".to_string()],
        );
    }

    pub fn err_bad_channel_key(&self, srv: &ServerInfo, channel: &str) {
        self.numeric(
            srv,
            Reply::ERR_BADCHANNELKEY,
            vec![channel.to_string(), "Cannot join channel (+k)".to_string()],
        );
    }

    pub fn err_no_privileges(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::ERR_NOPRIVILEGES,
            vec!["Permission Denied - You're not an IRC operator".to_string()],
        );
    }

    pub fn err_chanop_privs_needed(&self, srv: &ServerInfo, channel: &str) {
        self.numeric(
            srv,
            Reply::ERR_CHANOPRIVSNEEDED,
            vec![
                channel.to_string(),
                "You're not channel operator".to_string(),
            ],
        );
    }

    pub fn err_no_oper_host(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::ERR_NOOPERHOST,
            vec!["No O-lines for your host".to_string()],
        );
    }

    pub fn err_users_dont_match(&self, srv: &ServerInfo) {
        self.numeric(
            srv,
            Reply::ERR_USERSDONTMATCH,
            vec!["Cannot change mode for other users".to_string()],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> (Client, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(4);
        (
            Client::new(ClientId(1), "host.test".into(), Phase::Registration, tx),
            rx,
        )
    }

    #[test]
    fn nick_placeholder_before_registration() {
        let (client, _rx) = test_client();
        assert_eq!(client.nick(), "*");
        assert_eq!(client.userhost(), "*!unknown@host.test");
    }

    #[test]
    fn modestring() {
        let mut modes = UserModes::default();
        assert_eq!(modes.to_modestring(), "+");
        modes.invisible = true;
        modes.operator = true;
        assert_eq!(modes.to_modestring(), "+io");
    }

    #[test]
    fn reply_formats_numeric() {
        let (client, mut rx) = test_client();
        let srv = ServerInfo::new("irc.test");
        client.err_nickname_in_use(&srv, "alice");
        let msg = rx.try_recv().unwrap();
        assert_eq!(
            msg.to_string(),
            ":irc.test 433 * alice :Nickname is already in use"
        );
    }

    #[test]
    fn overflow_marks_client() {
        let (client, _rx) = test_client();
        for _ in 0..10 {
            client.reply(Message::cmd("PING", vec!["x".into()]));
        }
        assert!(client.overflowed());
    }
}
