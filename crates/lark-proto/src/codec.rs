//! Line framing for IRC byte streams.
//!
//! Decoding splits the stream on newlines, tolerating bare `LF` and
//! stripping `CR`. Lines longer than the 510-byte content limit are
//! truncated rather than rejected: the first 510 bytes are delivered as
//! the line and the remainder up to the next newline is discarded. The
//! encoder serializes a [`Message`] and appends `CRLF`, truncating
//! overlong output at the same limit.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::message::Message;
use crate::util::truncate_bytes;
use crate::MAX_CONTENT_LEN;

/// Tokio codec framing IRC lines.
#[derive(Debug, Default)]
pub struct LineCodec {
    /// Set after emitting a truncated line; the rest of that wire line is
    /// dropped up to the next newline.
    discarding: bool,
}

impl LineCodec {
    pub fn new() -> LineCodec {
        LineCodec::default()
    }
}

fn strip_line(bytes: &[u8]) -> String {
    let bytes = match bytes.last() {
        Some(b'\r') => &bytes[..bytes.len() - 1],
        _ => bytes,
    };
    let line = String::from_utf8_lossy(bytes);
    truncate_bytes(&line, MAX_CONTENT_LEN).to_string()
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        loop {
            if self.discarding {
                match src.iter().position(|&b| b == b'\n') {
                    Some(pos) => {
                        src.advance(pos + 1);
                        self.discarding = false;
                    }
                    None => {
                        src.clear();
                        return Ok(None);
                    }
                }
                continue;
            }

            match src.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    let line = src.split_to(pos);
                    src.advance(1);
                    return Ok(Some(strip_line(&line)));
                }
                None if src.len() > MAX_CONTENT_LEN => {
                    let line = src.split_to(MAX_CONTENT_LEN);
                    self.discarding = true;
                    return Ok(Some(strip_line(&line)));
                }
                None => return Ok(None),
            }
        }
    }
}

impl Encoder<Message> for LineCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let wire = item.to_string();
        let wire = truncate_bytes(&wire, MAX_CONTENT_LEN);
        dst.reserve(wire.len() + 2);
        dst.put_slice(wire.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
