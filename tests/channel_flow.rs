//! Channel membership, fan-out, modes, and privileges.

mod common;

use std::time::Duration;

use common::{command_of, TestClient, TestServer};

#[tokio::test]
async fn privmsg_fans_out_to_members_but_not_sender() {
    let server = TestServer::spawn().await;
    let mut alice = TestClient::connect(server.addr).await;
    let mut bob = TestClient::connect(server.addr).await;
    alice.register("alice").await;
    bob.register("bob").await;

    alice.join("#x").await;
    bob.join("#x").await;
    alice.drain().await;
    bob.drain().await;

    alice.send("PRIVMSG #x :hi").await;
    let line = bob.expect(|l| l.contains("PRIVMSG")).await;
    assert_eq!(line, ":alice!alice@127.0.0.1 PRIVMSG #x :hi");

    // the sender's socket sees nothing
    assert!(alice.recv_timeout(Duration::from_millis(300)).await.is_none());
}

#[tokio::test]
async fn first_joiner_is_op_and_non_ops_cannot_set_modes() {
    let server = TestServer::spawn().await;
    let mut alice = TestClient::connect(server.addr).await;
    let mut bob = TestClient::connect(server.addr).await;
    alice.register("alice").await;
    bob.register("bob").await;

    alice.join("#y").await;
    bob.join("#y").await;
    alice.drain().await;
    bob.drain().await;

    bob.send("MODE #y +t").await;
    let line = bob.expect(|l| command_of(l) == Some("482")).await;
    assert_eq!(line, ":irc.test 482 bob #y :You're not channel operator");

    alice.send("MODE #y +t").await;
    let to_alice = alice.expect(|l| l.contains("MODE")).await;
    let to_bob = bob.expect(|l| l.contains("MODE")).await;
    assert_eq!(to_alice, ":alice!alice@127.0.0.1 MODE #y +t");
    assert_eq!(to_bob, to_alice);
}

#[tokio::test]
async fn join_checks_key_limit_and_invite() {
    let server = TestServer::spawn().await;
    let mut alice = TestClient::connect(server.addr).await;
    let mut bob = TestClient::connect(server.addr).await;
    alice.register("alice").await;
    bob.register("bob").await;

    // key
    alice.join("#k").await;
    alice.send("MODE #k +k sesame").await;
    alice.drain().await;
    bob.send("JOIN #k").await;
    bob.expect(|l| command_of(l) == Some("475")).await;
    bob.send("JOIN #k wrong").await;
    bob.expect(|l| command_of(l) == Some("475")).await;
    bob.send("JOIN #k sesame").await;
    bob.expect(|l| command_of(l) == Some("366")).await;

    // a key on a keyless channel is ignored
    alice.join("#open").await;
    bob.send("JOIN #open ignored").await;
    bob.expect(|l| command_of(l) == Some("366")).await;

    // limit
    alice.join("#l").await;
    alice.send("MODE #l +l 1").await;
    alice.drain().await;
    bob.send("JOIN #l").await;
    bob.expect(|l| command_of(l) == Some("471")).await;

    // invite-only
    alice.join("#i").await;
    alice.send("MODE #i +i").await;
    alice.drain().await;
    bob.send("JOIN #i").await;
    bob.expect(|l| command_of(l) == Some("473")).await;
    alice.send("INVITE bob #i").await;
    alice.expect(|l| command_of(l) == Some("341")).await;
    bob.expect(|l| l.contains("INVITE")).await;
    bob.send("JOIN #i").await;
    bob.expect(|l| command_of(l) == Some("366")).await;
}

#[tokio::test]
async fn topic_lock_requires_op() {
    let server = TestServer::spawn().await;
    let mut alice = TestClient::connect(server.addr).await;
    let mut bob = TestClient::connect(server.addr).await;
    alice.register("alice").await;
    bob.register("bob").await;

    alice.join("#t").await;
    bob.join("#t").await;
    alice.send("MODE #t +t").await;
    alice.drain().await;
    bob.drain().await;

    bob.send("TOPIC #t :bob was here").await;
    bob.expect(|l| command_of(l) == Some("482")).await;

    alice.send("TOPIC #t :release planning").await;
    let seen = bob.expect(|l| l.contains("TOPIC")).await;
    assert_eq!(seen, ":alice!alice@127.0.0.1 TOPIC #t :release planning");

    // topic query yields 332
    bob.send("TOPIC #t").await;
    let line = bob.expect(|l| command_of(l) == Some("332")).await;
    assert!(line.ends_with(":release planning"));
}

#[tokio::test]
async fn moderated_channel_requires_voice() {
    let server = TestServer::spawn().await;
    let mut alice = TestClient::connect(server.addr).await;
    let mut bob = TestClient::connect(server.addr).await;
    alice.register("alice").await;
    bob.register("bob").await;

    alice.join("#m").await;
    bob.join("#m").await;
    alice.send("MODE #m +m").await;
    alice.drain().await;
    bob.drain().await;

    bob.send("PRIVMSG #m :muted?").await;
    bob.expect(|l| command_of(l) == Some("404")).await;

    alice.send("MODE #m +v bob").await;
    bob.expect(|l| l.contains("MODE") && l.contains("+v")).await;
    bob.send("PRIVMSG #m :voiced").await;
    alice
        .expect(|l| l.contains("PRIVMSG") && l.contains("voiced"))
        .await;
}

#[tokio::test]
async fn no_outside_messages_when_n_is_set() {
    let server = TestServer::spawn().await;
    let mut alice = TestClient::connect(server.addr).await;
    let mut bob = TestClient::connect(server.addr).await;
    alice.register("alice").await;
    bob.register("bob").await;

    alice.join("#n").await;
    alice.send("MODE #n +n").await;
    alice.drain().await;

    bob.send("PRIVMSG #n :outside").await;
    bob.expect(|l| command_of(l) == Some("404")).await;
}

#[tokio::test]
async fn kick_requires_op_and_removes_target() {
    let server = TestServer::spawn().await;
    let mut alice = TestClient::connect(server.addr).await;
    let mut bob = TestClient::connect(server.addr).await;
    alice.register("alice").await;
    bob.register("bob").await;

    alice.join("#k").await;
    bob.join("#k").await;
    alice.drain().await;
    bob.drain().await;

    bob.send("KICK #k alice :coup").await;
    bob.expect(|l| command_of(l) == Some("482")).await;

    alice.send("KICK #k bob :out").await;
    let line = bob.expect(|l| l.contains("KICK")).await;
    assert_eq!(line, ":alice!alice@127.0.0.1 KICK #k bob :out");

    // bob is no longer listed
    alice.send("NAMES #k").await;
    let names = alice.expect(|l| command_of(l) == Some("353")).await;
    assert!(!names.contains("bob"));
}

#[tokio::test]
async fn mode_aggregates_into_one_broadcast() {
    let server = TestServer::spawn().await;
    let mut alice = TestClient::connect(server.addr).await;
    let mut bob = TestClient::connect(server.addr).await;
    alice.register("alice").await;
    bob.register("bob").await;

    alice.join("#agg").await;
    bob.join("#agg").await;
    alice.drain().await;
    bob.drain().await;

    alice.send("MODE #agg +tn+v bob").await;
    let line = bob.expect(|l| l.contains("MODE")).await;
    assert_eq!(line, ":alice!alice@127.0.0.1 MODE #agg +tnv bob");
    // exactly one MODE line
    assert!(bob.recv_timeout(Duration::from_millis(300)).await.is_none());
}

#[tokio::test]
async fn join_zero_parts_everything() {
    let server = TestServer::spawn().await;
    let mut alice = TestClient::connect(server.addr).await;
    let mut bob = TestClient::connect(server.addr).await;
    alice.register("alice").await;
    bob.register("bob").await;

    alice.join("#a").await;
    alice.join("#b").await;
    bob.join("#a").await;
    alice.drain().await;
    bob.drain().await;

    alice.send("JOIN 0").await;
    let line = bob.expect(|l| l.contains("PART")).await;
    assert_eq!(line, ":alice!alice@127.0.0.1 PART #a :alice");

    // NAMES with no arguments lists only the client's own channels:
    // alice is nowhere now, so the first reply is to a later PING
    alice.drain().await;
    alice.send("NAMES").await;
    alice.send("PING done").await;
    let next = alice.expect(|l| l.contains("PONG") || command_of(l) == Some("353")).await;
    assert!(next.contains("PONG"), "NAMES should list nothing: {next}");
}

#[tokio::test]
async fn part_returns_channel_to_nonexistence() {
    let server = TestServer::spawn().await;
    let mut alice = TestClient::connect(server.addr).await;
    alice.register("alice").await;

    alice.join("#gone").await;
    alice.send("PART #gone").await;
    alice.expect(|l| l.contains("PART")).await;

    // the empty channel is deleted; NAMES now errors
    alice.send("NAMES #gone").await;
    alice.expect(|l| command_of(l) == Some("403")).await;
}

#[tokio::test]
async fn list_shows_channels_and_hides_private_ones() {
    let server = TestServer::spawn().await;
    let mut alice = TestClient::connect(server.addr).await;
    let mut bob = TestClient::connect(server.addr).await;
    alice.register("alice").await;
    bob.register("bob").await;

    alice.join("#pub").await;
    alice.join("#priv").await;
    alice.send("MODE #priv +p").await;
    alice.drain().await;

    bob.send("LIST").await;
    let mut listed = Vec::new();
    loop {
        let line = bob
            .recv_timeout(Duration::from_secs(5))
            .await
            .expect("LIST cut short");
        match command_of(&line) {
            Some("321") => continue,
            Some("322") => listed.push(line),
            Some("323") => break,
            other => panic!("unexpected reply in LIST: {other:?}"),
        }
    }
    assert_eq!(listed.len(), 1);
    assert!(listed[0].contains("#pub"));
}
