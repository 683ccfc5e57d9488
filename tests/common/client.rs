//! Line-level IRC test client.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Default wait for an expected line.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

#[allow(dead_code)]
impl TestClient {
    pub async fn connect(addr: SocketAddr) -> TestClient {
        let stream = TcpStream::connect(addr).await.expect("connect failed");
        let (read, writer) = stream.into_split();
        TestClient {
            reader: BufReader::new(read),
            writer,
        }
    }

    /// Send one raw line (CRLF appended).
    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .expect("write failed");
    }

    /// Receive one line within `wait`; `None` on timeout or EOF.
    pub async fn recv_timeout(&mut self, wait: Duration) -> Option<String> {
        let mut line = String::new();
        match timeout(wait, self.reader.read_line(&mut line)).await {
            Ok(Ok(0)) => None,
            Ok(Ok(_)) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Ok(Err(_)) | Err(_) => None,
        }
    }

    /// Read lines until one matches, panicking on timeout. Returns the
    /// matching line.
    pub async fn expect(&mut self, pred: impl Fn(&str) -> bool) -> String {
        self.expect_within(pred, RECV_TIMEOUT).await
    }

    pub async fn expect_within(
        &mut self,
        pred: impl Fn(&str) -> bool,
        wait: Duration,
    ) -> String {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let remaining = deadline
                .checked_duration_since(tokio::time::Instant::now())
                .unwrap_or(Duration::ZERO);
            match self.recv_timeout(remaining).await {
                Some(line) if pred(&line) => return line,
                Some(_) => continue,
                None => panic!("timed out waiting for expected line"),
            }
        }
    }

    /// Like [`expect`], but answers any server PING along the way so
    /// this client does not time out while waiting.
    pub async fn expect_ponging(
        &mut self,
        pred: impl Fn(&str) -> bool,
        wait: Duration,
    ) -> String {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let remaining = deadline
                .checked_duration_since(tokio::time::Instant::now())
                .unwrap_or(Duration::ZERO);
            match self.recv_timeout(remaining).await {
                Some(line) if pred(&line) => return line,
                Some(line) => {
                    if line.starts_with("PING") || line.contains(" PING ") {
                        self.send("PONG :irc.test").await;
                    }
                }
                None => panic!("timed out waiting for expected line"),
            }
        }
    }

    /// True if the server closed the connection (EOF) within `wait`.
    pub async fn closed_within(&mut self, wait: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let remaining = deadline
                .checked_duration_since(tokio::time::Instant::now())
                .unwrap_or(Duration::ZERO);
            let mut line = String::new();
            match timeout(remaining, self.reader.read_line(&mut line)).await {
                Ok(Ok(0)) => return true,
                Ok(Ok(_)) => continue,
                Ok(Err(_)) => return true,
                Err(_) => return false,
            }
        }
    }

    /// Discard everything already queued.
    pub async fn drain(&mut self) {
        tokio::time::sleep(Duration::from_millis(100)).await;
        while self
            .recv_timeout(Duration::from_millis(20))
            .await
            .is_some()
        {}
    }

    /// NICK + USER, waiting for the end of the welcome burst (376 or 422).
    pub async fn register(&mut self, nick: &str) {
        self.send(&format!("NICK {nick}")).await;
        self.send(&format!("USER {nick} 0 * :{nick}")).await;
        self.expect(|l| {
            super::command_of(l) == Some("376") || super::command_of(l) == Some("422")
        })
        .await;
    }

    /// JOIN and wait for the end of the NAMES burst.
    pub async fn join(&mut self, channel: &str) {
        self.send(&format!("JOIN {channel}")).await;
        self.expect(|l| super::command_of(l) == Some("366")).await;
    }
}
