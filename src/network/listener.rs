//! Accept loop for one listen address.

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::server::Event;

/// Accept connections forever, handing each to the event loop. A failed
/// accept is logged and never halts the acceptor.
pub(crate) async fn accept_loop(listener: TcpListener, events: mpsc::Sender<Event>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!(%addr, "accepted connection");
                if events.send(Event::Accept(stream, addr)).await.is_err() {
                    // event loop has shut down
                    return;
                }
            }
            Err(e) => {
                error!(error = %e, "accept failed");
            }
        }
    }
}
