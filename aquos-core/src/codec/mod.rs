//! `tokio_util` codec for the AQUOS text protocol.
//!
//! Outbound frames are fixed-width commands or the login answer.
//! Inbound framing is selectable:
//!
//! - [`Framing::Line`] reassembles replies on `\r` / `\n` and flushes an
//!   unterminated prompt (text ending in `:`) so the login handshake still
//!   sees `Login:`.
//! - [`Framing::Chunk`] yields whatever one socket read delivered, which is
//!   how the device was historically driven.

use bytes::{Buf, BytesMut};
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::AquosError;
use crate::protocol::Command;

/// Longest unterminated reply accepted in line mode.
pub const MAX_LINE_LENGTH: usize = 1024;

/// How inbound bytes are split into messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// One message per terminated line.
    #[default]
    Line,
    /// One message per transport read.
    Chunk,
}

/// Anything the client writes to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Answer to the login prompt: `username\npassword\n`.
    Login { username: String, password: String },
    Command(Command),
}

impl Outbound {
    pub fn wire(&self) -> String {
        match self {
            Self::Login { username, password } => format!("{username}\n{password}\n"),
            Self::Command(cmd) => cmd.encode(),
        }
    }
}

impl From<Command> for Outbound {
    fn from(cmd: Command) -> Self {
        Self::Command(cmd)
    }
}

// ── Codec ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct AquosCodec {
    framing: Framing,
}

impl AquosCodec {
    pub fn new(framing: Framing) -> Self {
        Self { framing }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

fn is_prompt(bytes: &[u8]) -> bool {
    String::from_utf8_lossy(bytes).trim_end().ends_with(':')
}

impl Decoder for AquosCodec {
    type Item = String;
    type Error = AquosError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.framing {
            Framing::Chunk => {
                if src.is_empty() {
                    return Ok(None);
                }
                let chunk = src.split();
                Ok(Some(lossy(&chunk)))
            }
            Framing::Line => loop {
                let Some(pos) = src.iter().position(|b| matches!(b, b'\r' | b'\n')) else {
                    if src.len() > MAX_LINE_LENGTH {
                        return Err(AquosError::FrameTooLarge {
                            size: src.len(),
                            max: MAX_LINE_LENGTH,
                        });
                    }
                    if !is_blank(src) && is_prompt(src) {
                        let prompt = src.split();
                        return Ok(Some(lossy(&prompt)));
                    }
                    return Ok(None);
                };

                let line = src.split_to(pos);
                src.advance(1);
                // CRLF leaves an empty line behind
                if is_blank(&line) {
                    continue;
                }
                return Ok(Some(lossy(&line)));
            },
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        if is_blank(buf) {
            buf.clear();
            return Ok(None);
        }
        let rest = buf.split();
        Ok(Some(lossy(&rest)))
    }
}

impl Encoder<Outbound> for AquosCodec {
    type Error = AquosError;

    fn encode(&mut self, item: Outbound, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(item.wire().as_bytes());
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
