//! In-memory server state.
//!
//! Everything in this module is owned exclusively by the dispatcher task;
//! connection tasks only ever hold the sending half of a client's
//! outbound queue.

mod channel;
mod client;
mod nicks;

pub use channel::{Channel, ChannelModes, ChannelTable, MemberModes};
pub use client::{Client, ClientId, Phase, UserModes};
pub use nicks::{NickRegistry, WhowasEntry};

use chrono::{DateTime, Utc};

/// This server's identity, threaded through reply formatting.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub created: DateTime<Utc>,
}

impl ServerInfo {
    pub fn new(name: &str) -> ServerInfo {
        ServerInfo {
            name: name.to_string(),
            version: format!("larkd-{}", env!("CARGO_PKG_VERSION")),
            created: Utc::now(),
        }
    }
}
