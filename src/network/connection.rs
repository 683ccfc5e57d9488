//! Per-connection task.
//!
//! One task per client multiplexes three things: inbound lines (parsed
//! into typed commands and submitted to the event loop), the outbound
//! reply queue (written to the socket), and the idle/timeout heartbeat.
//! The task touches no shared state; its only channels to the rest of
//! the server are the event queue and its own reply queue. It ends when
//! the dispatcher drops the reply sender (after a quit) or the socket
//! dies.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use lark_proto::{Command, LineCodec, Message};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_util::codec::Framed;
use tracing::debug;

use crate::server::Event;
use crate::state::ClientId;

pub(crate) fn spawn(
    id: ClientId,
    stream: TcpStream,
    addr: SocketAddr,
    events: mpsc::Sender<Event>,
    outgoing: mpsc::Receiver<Message>,
    idle_timeout: Duration,
    quit_timeout: Duration,
) {
    tokio::spawn(run(
        id,
        stream,
        addr,
        events,
        outgoing,
        idle_timeout,
        quit_timeout,
    ));
}

async fn run(
    id: ClientId,
    stream: TcpStream,
    addr: SocketAddr,
    events: mpsc::Sender<Event>,
    mut outgoing: mpsc::Receiver<Message>,
    idle_timeout: Duration,
    quit_timeout: Duration,
) {
    let mut framed = Framed::new(stream, LineCodec::new());
    let mut reading = true;
    let mut ping_pending = false;
    let mut idle_deadline = Instant::now() + idle_timeout;
    let mut quit_deadline = far_future();

    loop {
        tokio::select! {
            line = framed.next(), if reading => match line {
                Some(Ok(line)) => {
                    // any inbound line counts as liveness
                    idle_deadline = Instant::now() + idle_timeout;
                    quit_deadline = far_future();
                    ping_pending = false;

                    let Ok(msg) = line.parse::<Message>() else {
                        continue;
                    };
                    let event = match Command::parse(&msg) {
                        Ok(cmd) => Event::Command(id, cmd),
                        Err(e) => Event::Malformed(id, e),
                    };
                    if events.send(event).await.is_err() {
                        return;
                    }
                }
                Some(Err(e)) => {
                    debug!(client = %id, %addr, error = %e, "read error");
                    reading = false;
                    let quit = Command::Quit {
                        message: Some(format!("error: {e}")),
                    };
                    if events.send(Event::Command(id, quit)).await.is_err() {
                        return;
                    }
                }
                None => {
                    debug!(client = %id, %addr, "peer closed connection");
                    reading = false;
                    let quit = Command::Quit {
                        message: Some("connection closed".to_string()),
                    };
                    if events.send(Event::Command(id, quit)).await.is_err() {
                        return;
                    }
                }
            },

            msg = outgoing.recv() => match msg {
                Some(msg) => {
                    if framed.send(msg).await.is_err() {
                        return;
                    }
                }
                // dispatcher dropped our sender: client terminated, the
                // queue has been drained, close the socket
                None => return,
            },

            _ = sleep_until(idle_deadline), if reading && !ping_pending => {
                ping_pending = true;
                quit_deadline = Instant::now() + quit_timeout;
                if events.send(Event::Idle(id)).await.is_err() {
                    return;
                }
            },

            _ = sleep_until(quit_deadline), if reading && ping_pending => {
                ping_pending = false;
                idle_deadline = far_future();
                // the loop quits us; we keep draining until it does
                let _ = events.send(Event::Timeout(id)).await;
            },
        }
    }
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(60 * 60 * 24 * 365)
}
