//! Parsed request view.
//!
//! All text fields are [`Span`]s into the connection's read buffer, taken
//! by the parser and resolved at the moment of use. A request is mutated
//! only by its connection's parser and is reset between pipelined
//! exchanges.

use crate::buffer::{ReadBuf, Span};

use super::MAX_REQUEST_HEADERS;

/// One header, name and value spans.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderSpan {
    pub name: Span,
    pub value: Span,
}

/// A parsed http request.
#[derive(Debug)]
pub struct Request {
    pub method: Span,
    pub target: Span,
    pub path: Span,
    pub query: Span,
    pub minor_version: u8,
    pub content_length: u64,
    pub chunked: bool,
    pub body: Span,
    pub upgrade: bool,
    pub sec_key: Span,
    headers: [HeaderSpan; MAX_REQUEST_HEADERS],
    num_headers: usize,
}

impl Request {
    #[inline]
    pub const fn new() -> Self {
        Self {
            method: Span::new(0, 0),
            target: Span::new(0, 0),
            path: Span::new(0, 0),
            query: Span::new(0, 0),
            minor_version: 1,
            content_length: 0,
            chunked: false,
            body: Span::new(0, 0),
            upgrade: false,
            sec_key: Span::new(0, 0),
            headers: [HeaderSpan {
                name: Span::new(0, 0),
                value: Span::new(0, 0),
            }; MAX_REQUEST_HEADERS],
            num_headers: 0,
        }
    }

    #[inline]
    pub fn method_str<'b>(&self, buf: &'b ReadBuf) -> &'b str { self.method.resolve_str(buf) }

    #[inline]
    pub fn path_str<'b>(&self, buf: &'b ReadBuf) -> &'b str { self.path.resolve_str(buf) }

    #[inline]
    pub fn query_str<'b>(&self, buf: &'b ReadBuf) -> &'b str { self.query.resolve_str(buf) }

    #[inline]
    pub fn body_bytes<'b>(&self, buf: &'b ReadBuf) -> &'b [u8] { self.body.resolve(buf) }

    /// Case-insensitive header lookup, first match wins.
    pub fn header<'b>(&self, buf: &'b ReadBuf, name: &str) -> Option<&'b [u8]> {
        self.headers[..self.num_headers]
            .iter()
            .find(|h| h.name.resolve(buf).eq_ignore_ascii_case(name.as_bytes()))
            .map(|h| h.value.resolve(buf))
    }

    pub fn headers<'r>(&'r self) -> impl Iterator<Item = &'r HeaderSpan> {
        self.headers[..self.num_headers].iter()
    }

    #[inline]
    pub const fn num_headers(&self) -> usize { self.num_headers }

    /// True if the request asked for a websocket upgrade
    /// (`Upgrade: websocket`, `Connection: upgrade`, nonempty key).
    #[inline]
    pub const fn is_upgrade(&self) -> bool { self.upgrade }

    pub(super) fn push_header(&mut self, name: Span, value: Span) {
        debug_assert!(self.num_headers < MAX_REQUEST_HEADERS);
        self.headers[self.num_headers] = HeaderSpan { name, value };
        self.num_headers += 1;
    }

    /// Back to a blank state, ready for the next pipelined request.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Request {
    fn default() -> Self { Self::new() }
}
