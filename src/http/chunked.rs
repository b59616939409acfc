//! Chunked transfer encoding.
//!
//! Body framing of the shape `<hex-size>\r\n<bytes>\r\n`, terminated by a
//! zero-size chunk. The encoder is used by the response builder on every
//! flush; the decoder is a standalone nested state machine
//! (size-hex, optional extension, CRLF, data, CRLF, looped until the zero
//! chunk) for callers that receive chunked request bodies.

use crate::error::ParseError;

/// `0\r\n\r\n`
pub const CLOSING_CHUNK: &[u8] = b"0\r\n\r\n";

/// Frame one chunk onto `out`.
pub fn encode_chunk(payload: &[u8], out: &mut Vec<u8>) {
    use std::io::Write;
    // hex size never fails to format into a vec
    let _ = write!(out, "{:x}\r\n", payload.len());
    out.extend_from_slice(payload);
    out.extend_from_slice(b"\r\n");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Size,
    Ext,
    SizeLf,
    Data,
    DataCr,
    DataLf,
    EndCr,
    EndLf,
    Done,
}

/// Incremental chunk decoder.
///
/// Feed arbitrary slices of the wire stream; decoded payload bytes are
/// appended to the caller's vec. Tolerant of any split points, including
/// mid-size and mid-CRLF.
#[derive(Debug)]
pub struct ChunkDecoder {
    state: State,
    size: u64,
    have_digit: bool,
}

impl ChunkDecoder {
    #[inline]
    pub const fn new() -> Self {
        Self {
            state: State::Size,
            size: 0,
            have_digit: false,
        }
    }

    /// True once the zero chunk and its terminator have been consumed.
    #[inline]
    pub const fn is_done(&self) -> bool { matches!(self.state, State::Done) }

    /// Consume as much of `input` as possible, appending payload bytes to
    /// `out`. Returns the number of input bytes consumed; all input is
    /// consumed unless the decoder is done.
    pub fn feed(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<usize, ParseError> {
        let mut pos = 0;

        while pos < input.len() {
            match self.state {
                State::Size => {
                    let b = input[pos];
                    let digit = match b {
                        b'0'..=b'9' => Some((b - b'0') as u64),
                        b'a'..=b'f' => Some((b - b'a' + 10) as u64),
                        b'A'..=b'F' => Some((b - b'A' + 10) as u64),
                        _ => None,
                    };
                    match (digit, b) {
                        (Some(d), _) => {
                            // a size line long enough to overflow is garbage
                            self.size = self
                                .size
                                .checked_mul(16)
                                .and_then(|s| s.checked_add(d))
                                .ok_or(ParseError::BadChunkSize)?;
                            self.have_digit = true;
                        }
                        (None, b';') if self.have_digit => self.state = State::Ext,
                        (None, b'\r') if self.have_digit => self.state = State::SizeLf,
                        _ => return Err(ParseError::BadChunkSize),
                    }
                    pos += 1;
                }
                State::Ext => {
                    // skip the extension up to CR
                    if input[pos] == b'\r' {
                        self.state = State::SizeLf;
                    }
                    pos += 1;
                }
                State::SizeLf => {
                    if input[pos] != b'\n' {
                        return Err(ParseError::BadChunkTerminator);
                    }
                    pos += 1;
                    self.state = if self.size == 0 { State::EndCr } else { State::Data };
                }
                State::Data => {
                    let take = ((input.len() - pos) as u64).min(self.size) as usize;
                    out.extend_from_slice(&input[pos..pos + take]);
                    pos += take;
                    self.size -= take as u64;
                    if self.size == 0 {
                        self.state = State::DataCr;
                    }
                }
                State::DataCr => {
                    if input[pos] != b'\r' {
                        return Err(ParseError::BadChunkTerminator);
                    }
                    pos += 1;
                    self.state = State::DataLf;
                }
                State::DataLf => {
                    if input[pos] != b'\n' {
                        return Err(ParseError::BadChunkTerminator);
                    }
                    pos += 1;
                    self.state = State::Size;
                    self.have_digit = false;
                }
                // the zero chunk is followed by a bare CRLF
                // (trailers are not supported)
                State::EndCr => {
                    if input[pos] != b'\r' {
                        return Err(ParseError::BadChunkTerminator);
                    }
                    pos += 1;
                    self.state = State::EndLf;
                }
                State::EndLf => {
                    if input[pos] != b'\n' {
                        return Err(ParseError::BadChunkTerminator);
                    }
                    pos += 1;
                    self.state = State::Done;
                }
                State::Done => return Ok(pos),
            }
        }

        Ok(pos)
    }
}

impl Default for ChunkDecoder {
    fn default() -> Self { Self::new() }
}
