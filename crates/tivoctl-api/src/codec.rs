//! Framing for the appliance's response stream.
//!
//! The appliance terminates lines with `\r\n` but several firmware versions
//! send a bare `\r`, so either byte ends a frame and empty frames are
//! skipped. Bytes are decoded lossily: a stray non-UTF-8 byte must not take
//! down the read loop.

use std::io;

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::protocol::{ResponseEvent, parse_line};

/// Upper bound on a single response line. Real responses are a few dozen bytes.
pub const MAX_LINE_LENGTH: usize = 4096;

/// Code reported for a line that exceeded [`MAX_LINE_LENGTH`].
pub const LINE_TOO_LONG: &str = "LINE_TOO_LONG";

/// Decodes raw socket bytes into [`ResponseEvent`]s, one per line.
#[derive(Debug, Default)]
pub struct ResponseCodec {
    /// Offset up to which the buffer is known to contain no terminator.
    next_index: usize,
    /// Set while skipping the remainder of an oversized line.
    discarding: bool,
}

impl ResponseCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_terminator(byte: u8) -> bool {
    byte == b'\r' || byte == b'\n'
}

impl Decoder for ResponseCodec {
    type Item = ResponseEvent;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<ResponseEvent>, io::Error> {
        loop {
            let found = buf
                .get(self.next_index..)
                .and_then(|tail| tail.iter().position(|b| is_terminator(*b)))
                .map(|pos| self.next_index + pos);

            let Some(end) = found else {
                if buf.len() > MAX_LINE_LENGTH {
                    buf.clear();
                    self.next_index = 0;
                    if !self.discarding {
                        self.discarding = true;
                        tracing::warn!(
                            max = MAX_LINE_LENGTH,
                            "response line too long, discarding"
                        );
                        return Ok(Some(ResponseEvent::GenericError {
                            code: LINE_TOO_LONG.into(),
                        }));
                    }
                } else {
                    self.next_index = buf.len();
                }
                return Ok(None);
            };

            let line = buf.split_to(end);
            buf.advance(1);
            self.next_index = 0;

            if self.discarding {
                // Tail of an oversized line that was already reported.
                self.discarding = false;
                continue;
            }

            if line.len() > MAX_LINE_LENGTH {
                tracing::warn!(
                    len = line.len(),
                    max = MAX_LINE_LENGTH,
                    "response line too long, discarding"
                );
                return Ok(Some(ResponseEvent::GenericError {
                    code: LINE_TOO_LONG.into(),
                }));
            }

            let text = String::from_utf8_lossy(&line);
            tracing::trace!(line = %text.trim(), "received line");
            if let Some(event) = parse_line(&text) {
                return Ok(Some(event));
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<ResponseEvent>, io::Error> {
        if let Some(event) = self.decode(buf)? {
            return Ok(Some(event));
        }

        // Unterminated trailing fragment: treat it as a final line.
        let rest = buf.split();
        self.next_index = 0;
        if self.discarding {
            self.discarding = false;
            return Ok(None);
        }
        Ok(parse_line(&String::from_utf8_lossy(&rest)))
    }
}

// ── Tests ────────────────────────────────────────────────────────────
