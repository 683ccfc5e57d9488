//! Test server harness.

use std::collections::HashMap;
use std::net::SocketAddr;

use larkd::config::{ServerConfig, TimeoutsConfig};
use larkd::Config;

/// A larkd instance bound to an ephemeral loopback port, serving in a
/// background task with an in-memory channel store.
pub struct TestServer {
    pub addr: SocketAddr,
}

impl TestServer {
    /// Spawn with defaults: no password, no MOTD, long timeouts.
    pub async fn spawn() -> TestServer {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn after letting the caller adjust the config.
    pub async fn spawn_with(adjust: impl FnOnce(&mut Config)) -> TestServer {
        let mut config = Config {
            server: ServerConfig {
                name: "irc.test".to_string(),
                listen: vec!["127.0.0.1:0".to_string()],
                password: None,
                motd: None,
                database: ":memory:".to_string(),
                timeouts: TimeoutsConfig::default(),
            },
            operators: HashMap::new(),
        };
        adjust(&mut config);

        let bound = larkd::bind(config).await.expect("failed to bind test server");
        let addr = *bound
            .local_addrs()
            .first()
            .expect("test server has no listener");
        tokio::spawn(bound.run());
        TestServer { addr }
    }
}
