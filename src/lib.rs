//! larkd - a single-node IRC daemon.
//!
//! The architecture is a single serialized event loop owning all shared
//! state, fed by listener and per-connection tasks ([`server`]), a typed
//! protocol layer (`lark-proto`), and a SQLite-backed store of
//! registered channels ([`store`]).

pub mod config;
pub mod error;
mod handlers;
mod network;
pub mod server;
pub mod state;
pub mod store;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;

pub use config::Config;
use server::{Event, Server, EVENT_QUEUE_LIMIT};
use store::ChannelStore;

/// A server that has opened its store and bound its listeners but not
/// yet started serving. Splitting bind from run lets callers (tests in
/// particular) learn the actual listen addresses before startup.
pub struct Bound {
    server: Server,
    events_tx: mpsc::Sender<Event>,
    events_rx: mpsc::Receiver<Event>,
    listeners: Vec<TcpListener>,
}

/// Open the store, load registered channels, and bind every configured
/// listen address. Store failures at this stage are fatal.
pub async fn bind(config: Config) -> anyhow::Result<Bound> {
    let store = ChannelStore::open(&config.server.database).await?;
    let registered = store.load_channels().await?;
    let motd = config.server.load_motd();

    let mut listeners = Vec::new();
    for addr in &config.server.listen {
        let listener = TcpListener::bind(addr).await?;
        if let Ok(local) = listener.local_addr() {
            info!(addr = %local, "listening");
        }
        listeners.push(listener);
    }

    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_LIMIT);
    let server = Server::new(config, motd, registered, store, events_tx.clone());

    Ok(Bound {
        server,
        events_tx,
        events_rx,
        listeners,
    })
}

impl Bound {
    /// The addresses actually bound (with ports resolved).
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.listeners
            .iter()
            .filter_map(|l| l.local_addr().ok())
            .collect()
    }

    /// Serve until shutdown (signal or operator request).
    pub async fn run(self) {
        let Bound {
            server,
            events_tx,
            events_rx,
            listeners,
        } = self;
        for listener in listeners {
            tokio::spawn(network::listener::accept_loop(listener, events_tx.clone()));
        }
        #[cfg(unix)]
        spawn_signal_task(events_tx);
        server.run(events_rx).await;
    }
}

/// SIGINT/SIGHUP/SIGTERM/SIGQUIT all initiate shutdown.
#[cfg(unix)]
fn spawn_signal_task(events: mpsc::Sender<Event>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let signals = [
            SignalKind::interrupt(),
            SignalKind::hangup(),
            SignalKind::terminate(),
            SignalKind::quit(),
        ];
        let mut streams = Vec::new();
        for kind in signals {
            match signal(kind) {
                Ok(stream) => streams.push(stream),
                Err(e) => tracing::warn!(error = %e, "failed to install signal handler"),
            }
        }
        if streams.is_empty() {
            return;
        }
        let wait_any = futures_util::future::select_all(
            streams.iter_mut().map(|s| Box::pin(s.recv())),
        );
        wait_any.await;
        info!("signal received, shutting down");
        let _ = events.send(Event::Shutdown).await;
    });
}
