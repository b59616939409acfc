//! Incremental request parser.
//!
//! One parser per connection, operating in place on the connection's
//! [`ReadBuf`] at an internal cursor. Request-line and headers go through
//! [`httparse`] with a fixed table of [`MAX_REQUEST_HEADERS`] slots; body
//! framing (`Content-Length`) is handled here. Chunked request bodies are
//! flagged and delimited; the body span keeps the chunk framing and
//! payload decoding is left to the caller (see [`chunked`](super::chunked)).
//!
//! Call [`parse`](Parser::parse) after every read:
//!
//! - `Complete`: a full request is buffered, dispatch it; buffer holds no
//!   surplus.
//! - `Pipelined`: a full request is buffered and more bytes follow it;
//!   dispatch, then re-invoke `parse` without reading to extract the next
//!   request.
//! - `Incomplete`: read more bytes first.
//! - `Err(_)`: malformed input; answer with a stock 400 and close.

use crate::buffer::{ReadBuf, Span};
use crate::error::ParseError;

use super::MAX_REQUEST_HEADERS;
use super::chunked::ChunkDecoder;
use super::request::Request;

/// Outcome of a parse call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    Complete,
    Pipelined,
    Incomplete,
}

#[derive(Debug)]
pub struct Parser {
    /// Offset where the current request begins.
    cursor: usize,
    /// Offset of the current request's body, valid while `in_body`.
    body_off: usize,
    /// Headers are done, waiting for content-length bytes.
    in_body: bool,
    pub request: Request,
}

impl Parser {
    #[inline]
    pub const fn new() -> Self {
        Self {
            cursor: 0,
            body_off: 0,
            in_body: false,
            request: Request::new(),
        }
    }

    /// True when the parser sits at a request boundary, i.e. no partially
    /// parsed body is pending. Only then may the caller recycle the buffer.
    #[inline]
    pub const fn at_boundary(&self) -> bool { !self.in_body }

    /// Bytes consumed by completed requests so far.
    #[inline]
    pub const fn consumed(&self) -> usize { self.cursor }

    /// Drop consumed bytes from the buffer and rebase the cursor.
    /// Must only be called at a request boundary, between exchanges.
    pub fn recycle(&mut self, buf: &mut ReadBuf) {
        debug_assert!(self.at_boundary());
        buf.consume(self.cursor);
        self.cursor = 0;
        self.request.reset();
    }

    pub fn parse(&mut self, buf: &ReadBuf) -> Result<ParseStatus, ParseError> {
        if self.in_body {
            return self.parse_body(buf);
        }

        self.request.reset();

        let data = &buf.filled()[self.cursor..];
        let mut headers = [httparse::EMPTY_HEADER; MAX_REQUEST_HEADERS];
        let mut req = httparse::Request::new(&mut headers);

        let head_len = match req.parse(data) {
            Ok(httparse::Status::Complete(n)) => n,
            Ok(httparse::Status::Partial) => return Ok(ParseStatus::Incomplete),
            Err(httparse::Error::TooManyHeaders) => return Err(ParseError::TooManyHeaders),
            Err(httparse::Error::HeaderName) | Err(httparse::Error::HeaderValue) => {
                return Err(ParseError::BadHeader)
            }
            Err(_) => return Err(ParseError::BadRequestLine),
        };

        self.fill_request(buf, &req)?;
        self.body_off = self.cursor + head_len;
        self.in_body = true;
        self.parse_body(buf)
    }

    fn parse_body(&mut self, buf: &ReadBuf) -> Result<ParseStatus, ParseError> {
        let have = buf.len() - self.body_off;

        if self.request.chunked {
            // delimit the chunked body; decoding the payload is the
            // caller's job, the body span keeps the chunk framing
            let window = &buf.filled()[self.body_off..self.body_off + have];
            let mut scan = ChunkDecoder::new();
            let mut sink = Vec::new();
            let used = scan.feed(window, &mut sink)?;
            if !scan.is_done() {
                return Ok(ParseStatus::Incomplete);
            }

            self.request.body = Span::new(self.body_off, used);
            self.in_body = false;
            self.cursor = self.body_off + used;

            return Ok(if buf.len() > self.cursor {
                ParseStatus::Pipelined
            } else {
                ParseStatus::Complete
            });
        }

        let need = self.request.content_length as usize;
        if have < need {
            return Ok(ParseStatus::Incomplete);
        }

        self.request.body = Span::new(self.body_off, need);
        self.in_body = false;
        self.cursor = self.body_off + need;

        if buf.len() > self.cursor {
            Ok(ParseStatus::Pipelined)
        } else {
            Ok(ParseStatus::Complete)
        }
    }

    fn fill_request(&mut self, buf: &ReadBuf, req: &httparse::Request) -> Result<(), ParseError> {
        let base = buf.filled().as_ptr() as usize;
        let span_of = |s: &[u8]| Span::new(s.as_ptr() as usize - base, s.len());

        let method = req.method.ok_or(ParseError::BadRequestLine)?;
        let target = req.path.ok_or(ParseError::BadRequestLine)?;

        self.request.method = span_of(method.as_bytes());
        self.request.target = span_of(target.as_bytes());
        self.request.minor_version = req.version.unwrap_or(1);

        // split the target at '?'
        match target.find('?') {
            Some(q) => {
                self.request.path = span_of(&target.as_bytes()[..q]);
                self.request.query = span_of(&target.as_bytes()[q + 1..]);
            }
            None => {
                self.request.path = self.request.target;
                self.request.query = Span::new(0, 0);
            }
        }

        let mut upgrade_ws = false;
        let mut connection_upgrade = false;

        for h in req.headers.iter() {
            let name = span_of(h.name.as_bytes());
            let value = span_of(h.value);
            self.request.push_header(name, value);

            if h.name.eq_ignore_ascii_case("content-length") {
                let text = std::str::from_utf8(h.value)
                    .map_err(|_| ParseError::BadContentLength)?;
                self.request.content_length = text
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ParseError::BadContentLength)?;
            } else if h.name.eq_ignore_ascii_case("transfer-encoding") {
                if h.value.eq_ignore_ascii_case(b"chunked") {
                    self.request.chunked = true;
                }
            } else if h.name.eq_ignore_ascii_case("upgrade") {
                if h.value.eq_ignore_ascii_case(b"websocket") {
                    upgrade_ws = true;
                }
            } else if h.name.eq_ignore_ascii_case("connection") {
                // value may be a token list, e.g. "keep-alive, Upgrade",
                // and the header may repeat
                connection_upgrade |= h
                    .value
                    .split(|&b| b == b',')
                    .any(|t| t.trim_ascii().eq_ignore_ascii_case(b"upgrade"));
            } else if h.name.eq_ignore_ascii_case("sec-websocket-key") {
                self.request.sec_key = value;
            }
        }

        if upgrade_ws && connection_upgrade && !self.request.sec_key.is_empty() {
            self.request.upgrade = true;
        }

        Ok(())
    }
}

impl Default for Parser {
    fn default() -> Self { Self::new() }
}
