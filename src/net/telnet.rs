//! Telnet negotiation and keystroke decoding

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::game::geometry::Direction;

pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
pub const SB: u8 = 250;
pub const SE: u8 = 240;
pub const ECHO: u8 = 1;
pub const SUPPRESS_GO_AHEAD: u8 = 3;

const CTRL_C: u8 = 3;
const ESC: u8 = 0x1b;

/// Server echoes and suppresses go-ahead: the client sends every key at once
pub const CHARACTER_MODE: &[u8] = &[IAC, WILL, ECHO, IAC, WILL, SUPPRESS_GO_AHEAD];

/// A decoded keystroke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Steer(Direction),
    Bomb,
    Quit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum DecodeState {
    #[default]
    Ground,
    Escape,
    /// Inside `ESC [` or `ESC O`
    Sequence,
    /// After `IAC`
    Command,
    /// After `IAC WILL|WONT|DO|DONT`
    Negotiation,
    Subnegotiation,
    SubnegotiationIac,
}

/// Byte-at-a-time decoder for arrows, space and Ctrl-C, skipping telnet commands
#[derive(Debug, Default)]
pub struct KeyDecoder {
    state: DecodeState,
}

impl KeyDecoder {
    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        use DecodeState::*;

        let (next, key) = match (self.state, byte) {
            (Ground, IAC) => (Command, None),
            (Ground, CTRL_C) => (Ground, Some(Key::Quit)),
            (Ground, b' ') => (Ground, Some(Key::Bomb)),
            (Ground, ESC) => (Escape, None),
            (Ground, _) => (Ground, None),

            (Escape, b'[' | b'O') => (Sequence, None),
            (Escape, ESC) => (Escape, None),
            (Escape, _) => (Ground, None),

            (Sequence, b'A') => (Ground, Some(Key::Steer(Direction::Up))),
            (Sequence, b'B') => (Ground, Some(Key::Steer(Direction::Down))),
            (Sequence, b'C') => (Ground, Some(Key::Steer(Direction::Right))),
            (Sequence, b'D') => (Ground, Some(Key::Steer(Direction::Left))),
            (Sequence, b'0'..=b'9' | b';') => (Sequence, None),
            (Sequence, _) => (Ground, None),

            (Command, WILL | WONT | DO | DONT) => (Negotiation, None),
            (Command, SB) => (Subnegotiation, None),
            (Command, _) => (Ground, None),
            (Negotiation, _) => (Ground, None),

            (Subnegotiation, IAC) => (SubnegotiationIac, None),
            (Subnegotiation, _) => (Subnegotiation, None),
            (SubnegotiationIac, SE) => (Ground, None),
            (SubnegotiationIac, _) => (Subnegotiation, None),
        };
        self.state = next;
        key
    }

    /// Read until a full keystroke arrives. EOF is an error.
    pub async fn read_key<R>(&mut self, reader: &mut R) -> io::Result<Key>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        loop {
            let byte = reader.read_u8().await?;
            if let Some(key) = self.feed(byte) {
                return Ok(key);
            }
        }
    }
}

/// Text typed in line mode with telnet commands and control bytes removed
pub fn printable_text(bytes: &[u8]) -> String {
    let mut text = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied();
    while let Some(byte) = iter.next() {
        match byte {
            IAC => match iter.next() {
                Some(WILL | WONT | DO | DONT) => {
                    iter.next();
                }
                Some(SB) => {
                    let mut previous = 0;
                    for b in iter.by_ref() {
                        if previous == IAC && b == SE {
                            break;
                        }
                        previous = b;
                    }
                }
                _ => {}
            },
            b if b < 0x20 || b == 0x7f => {}
            b => text.push(b),
        }
    }
    String::from_utf8_lossy(&text).trim().to_string()
}
