//! HTTP request parser state machine (§4.5).
//!
//! Grounded on `AmakeSashaDev-maker_web`'s `Parser`/`HttpConnection::parse`
//! byte-position idiom (`find_char`/`get_slice`/`update_position` in its own
//! `http/request.rs`), pared down to the single request shape this wire protocol
//! accepts: `GET /metrics HTTP/1.1` followed by any headers, no body, no keep-alive,
//! no HTTP/0.9.

use crate::config::limits;
use crate::errors::ErrorKind;

// `memchr` is used below in `Hdr2` to skip header content in bulk.

/// Parser sub-states, advanced byte-by-byte (or chunk-by-chunk) as bytes arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Path,
    Version,
    Hdr1,
    Hdr2,
}

/// Outcome of feeding more bytes into the parser.
#[derive(Debug, PartialEq, Eq)]
pub enum Progress {
    /// Not enough bytes yet; keep reading.
    NeedMore,
    /// The request was fully parsed and accepted.
    Accepted,
    /// The request is malformed; stop reading and respond with 400.
    Rejected(ErrorKind),
}

/// Byte-by-byte state machine matching exactly `GET /metrics HTTP/1.1\r\n` plus any
/// number of header lines terminated by an empty line (§4.5).
pub struct RequestParser {
    state: State,
    field: Vec<u8>,
    consumed: usize,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            state: State::Start,
            field: Vec::with_capacity(32),
            consumed: 0,
        }
    }

    pub fn reset(&mut self) {
        self.state = State::Start;
        self.field.clear();
        self.consumed = 0;
    }

    /// How many bytes of `buf` have already been examined; the caller should not
    /// re-feed them.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Feeds all currently-available bytes starting at `self.consumed()`. Returns the
    /// parse outcome; on `NeedMore`, call again once more bytes have arrived.
    pub fn advance(&mut self, buf: &[u8]) -> Progress {
        let mut pos = self.consumed;
        loop {
            if pos >= buf.len() {
                self.consumed = pos;
                return Progress::NeedMore;
            }
            let b = buf[pos];
            if b == b'\r' {
                pos += 1;
                continue;
            }
            match self.state {
                State::Start => match self.feed_start(b) {
                    Ok(done) => {
                        pos += 1;
                        if done {
                            self.state = State::Path;
                        }
                    }
                    Err(e) => return Progress::Rejected(e),
                },
                State::Path => match self.feed_path(b) {
                    Ok(done) => {
                        pos += 1;
                        if done {
                            self.state = State::Version;
                        }
                    }
                    Err(e) => return Progress::Rejected(e),
                },
                State::Version => match self.feed_version(b) {
                    Ok(done) => {
                        pos += 1;
                        if done {
                            self.state = State::Hdr1;
                        }
                    }
                    Err(e) => return Progress::Rejected(e),
                },
                State::Hdr1 => {
                    pos += 1;
                    if b == b'\n' {
                        self.consumed = pos;
                        return Progress::Accepted;
                    }
                    self.state = State::Hdr2;
                }
                State::Hdr2 => {
                    // Header field content isn't validated, only scanned past; jump
                    // straight to the line terminator instead of stepping byte-by-byte.
                    match memchr::memchr(b'\n', &buf[pos..]) {
                        Some(offset) => {
                            pos += offset + 1;
                            self.state = State::Hdr1;
                        }
                        None => {
                            self.consumed = buf.len();
                            return Progress::NeedMore;
                        }
                    }
                }
            }
        }
    }

    fn feed_start(&mut self, b: u8) -> Result<bool, ErrorKind> {
        if b == b' ' {
            return if self.field == b"GET" {
                self.field.clear();
                Ok(true)
            } else {
                Err(ErrorKind::InvalidMethod)
            };
        }
        if !b.is_ascii_alphanumeric() || self.field.len() >= limits::MAX_METHOD_LEN {
            return Err(ErrorKind::InvalidMethod);
        }
        self.field.push(b);
        Ok(false)
    }

    fn feed_path(&mut self, b: u8) -> Result<bool, ErrorKind> {
        if b == b' ' {
            return if self.field == b"/metrics" {
                self.field.clear();
                Ok(true)
            } else {
                Err(ErrorKind::InvalidPath)
            };
        }
        if b == b'\n' || !(0x20..=0x7e).contains(&b) || self.field.len() >= limits::MAX_PATH_LEN {
            return Err(ErrorKind::InvalidPath);
        }
        self.field.push(b);
        Ok(false)
    }

    fn feed_version(&mut self, b: u8) -> Result<bool, ErrorKind> {
        if b == b'\n' {
            return if self.field == b"HTTP/1.1" {
                self.field.clear();
                Ok(true)
            } else {
                Err(ErrorKind::InvalidVersion)
            };
        }
        if !b.is_ascii_graphic() || self.field.len() >= limits::MAX_VERSION_LEN {
            return Err(ErrorKind::InvalidVersion);
        }
        self.field.push(b);
        Ok(false)
    }
}
