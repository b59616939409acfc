//! Response builder.
//!
//! Accumulates status, headers and body, then renders to a scatter list of
//! segments (head, body, optional closing chunk) so the writer can use
//! vectored io instead of one big copy.
//!
//! Two framing modes:
//!
//! - content-length: the whole buffered body is rendered at
//!   [`finish`](Response::finish); bodies over [`GZIP_THRESHOLD`] are
//!   gzip-compressed once.
//! - chunked: every [`flush_chunk`](Response::flush_chunk) frames the bytes
//!   accumulated so far as `<hex-size>\r\n<bytes>\r\n`. The compression
//!   decision is taken per flush, so a response may start uncompressed and
//!   switch once a flush crosses the threshold.
//!
//! Once the first body byte has been flushed the headers are frozen:
//! further [`add_header`](Response::add_header) calls are not wire-visible.

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;

use super::chunked::{encode_chunk, CLOSING_CHUNK};
use super::status::reason;

/// 2048, bodies over this many bytes are gzip-compressed.
pub const GZIP_THRESHOLD: usize = 2048;

/// Rendered wire output as a list of buffer segments.
#[derive(Debug, Default)]
pub struct Segments {
    pub parts: Vec<Vec<u8>>,
}

impl Segments {
    #[inline]
    pub fn io_slices(&self) -> Vec<std::io::IoSlice<'_>> {
        self.parts.iter().map(|p| std::io::IoSlice::new(p)).collect()
    }

    #[inline]
    pub fn total_len(&self) -> usize { self.parts.iter().map(Vec::len).sum() }

    /// Flatten, for tests and single-buffer writers.
    pub fn concat(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_len());
        for p in &self.parts {
            out.extend_from_slice(p);
        }
        out
    }
}

/// An http response under construction.
#[derive(Debug)]
pub struct Response {
    status: u16,
    minor_version: u8,
    keepalive: bool,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    chunked: bool,
    streamed: bool,
    gzip: bool,
}

impl Response {
    #[inline]
    pub fn new() -> Self {
        Self {
            status: 200,
            minor_version: 1,
            keepalive: true,
            headers: Vec::new(),
            body: Vec::new(),
            chunked: false,
            streamed: false,
            gzip: false,
        }
    }

    #[inline]
    pub const fn status(&self) -> u16 { self.status }

    #[inline]
    pub fn set_status(&mut self, status: u16) { self.status = status; }

    #[inline]
    pub fn minor_version(&mut self, version: u8) { self.minor_version = version; }

    /// Turning keepalive off (or http/1.0) adds `Connection: close`.
    pub fn keepalive(&mut self, keepalive: bool) {
        if keepalive && self.minor_version != 0 {
            self.keepalive = true;
        } else {
            self.keepalive = false;
            self.add_header("Connection", "close");
        }
    }

    #[inline]
    pub const fn is_keepalive(&self) -> bool { self.keepalive }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    pub fn has_header(&self, name: &str) -> bool { self.header(name).is_some() }

    /// Insertion order is preserved on the wire. Ignored once the body
    /// stream has started.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        if self.streamed {
            return;
        }
        self.headers.push((name.into(), value.into()));
    }

    pub fn remove_header(&mut self, name: &str) {
        if let Some(i) = self.headers.iter().position(|(n, _)| n.eq_ignore_ascii_case(name)) {
            self.headers.remove(i);
        }
    }

    pub fn content_type(&mut self, value: impl Into<String>) {
        self.add_header("Content-Type", value);
    }

    /// Switch to chunked framing.
    pub fn chunked(&mut self) {
        if !self.chunked {
            self.chunked = true;
            self.add_header("Transfer-Encoding", "chunked");
        }
    }

    #[inline]
    pub const fn is_chunked(&self) -> bool { self.chunked }

    /// True once the first body byte has been flushed; headers are frozen.
    #[inline]
    pub const fn is_streamed(&self) -> bool { self.streamed }

    /// Append to the body accumulator.
    #[inline]
    pub fn write(&mut self, bytes: &[u8]) { self.body.extend_from_slice(bytes); }

    pub fn set_body(&mut self, bytes: impl Into<Vec<u8>>) { self.body = bytes.into(); }

    #[inline]
    pub fn body_len(&self) -> usize { self.body.len() }

    /// Frame the accumulated body as one chunk for an in-flight chunked
    /// response. The first flush renders the head and freezes the headers.
    pub fn flush_chunk(&mut self, date: &str) -> Segments {
        debug_assert!(self.chunked);
        let mut segments = Segments::default();

        let payload = std::mem::take(&mut self.body);
        self.decide_gzip(payload.len());

        if !self.streamed {
            self.streamed = true;
            segments.parts.push(self.render_head(date, None));
        }

        if !payload.is_empty() {
            let mut framed = Vec::with_capacity(payload.len() + 16);
            if self.gzip {
                encode_chunk(&gzip_once(&payload), &mut framed);
            } else {
                encode_chunk(&payload, &mut framed);
            }
            segments.parts.push(framed);
        }

        segments
    }

    /// Render the complete wire output and reset nothing; the caller
    /// resets the response after the exchange.
    pub fn finish(&mut self, date: &str) -> Segments {
        let mut segments = Segments::default();

        if self.chunked {
            let flushed = self.flush_chunk(date);
            segments.parts.extend(flushed.parts);
            segments.parts.push(CLOSING_CHUNK.to_vec());
            return segments;
        }

        let mut body = std::mem::take(&mut self.body);
        if body.len() > GZIP_THRESHOLD && !self.has_header("Content-Encoding") {
            body = gzip_once(&body);
            self.add_header("Content-Encoding", "gzip");
        }

        // 1xx, 204 and 304 carry neither body nor length
        let bodyless = matches!(self.status, 100..=199 | 204 | 304);
        let length = if bodyless { None } else { Some(body.len() as u64) };
        segments.parts.push(self.render_head(date, length));
        self.streamed = true;
        if !bodyless && !body.is_empty() {
            segments.parts.push(body);
        }
        segments
    }

    /// Back to a blank state after a full exchange.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    // compression is sticky once on; the header can only be added while
    // headers are still open
    fn decide_gzip(&mut self, flush_len: usize) {
        if !self.gzip && flush_len > GZIP_THRESHOLD {
            self.gzip = true;
            self.add_header("Content-Encoding", "gzip");
        }
    }

    fn render_head(&self, date: &str, content_length: Option<u64>) -> Vec<u8> {
        let mut head = Vec::with_capacity(256);
        let _ = write!(
            head,
            "HTTP/1.{} {} {}\r\nDate: {}\r\n",
            self.minor_version,
            self.status,
            reason(self.status),
            date
        );
        for (name, value) in &self.headers {
            let _ = write!(head, "{}: {}\r\n", name, value);
        }
        match content_length {
            Some(n) => {
                let _ = write!(head, "Content-Length: {}\r\n\r\n", n);
            }
            None => head.extend_from_slice(b"\r\n"),
        }
        head
    }
}

impl Default for Response {
    fn default() -> Self { Self::new() }
}

fn gzip_once(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 16), Compression::default());
    // writing into a vec cannot fail
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::http::chunked::ChunkDecoder;
    use flate2::read::GzDecoder;
    use std::io::Read;

    const DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

    #[test]
    fn content_length_render() {
        let mut res = Response::new();
        res.set_status(200);
        res.content_type("text/plain");
        res.write(b"hello");

        let segments = res.finish(DATE);
        let wire = segments.concat();
        let text = std::str::from_utf8(&wire).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/plain\r\n"));
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn header_order_preserved() {
        let mut res = Response::new();
        res.add_header("X-First", "1");
        res.add_header("X-Second", "2");
        res.add_header("X-Third", "3");

        let wire = res.finish(DATE).concat();
        let text = std::str::from_utf8(&wire).unwrap();
        let first = text.find("X-First").unwrap();
        let second = text.find("X-Second").unwrap();
        let third = text.find("X-Third").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn headers_frozen_after_flush() {
        let mut res = Response::new();
        res.chunked();
        res.write(b"part one");
        let _ = res.flush_chunk(DATE);

        res.add_header("X-Late", "ignored");
        res.write(b"part two");
        let wire = res.finish(DATE).concat();
        let text = String::from_utf8_lossy(&wire);
        assert!(!text.contains("X-Late"));
    }

    fn decode_chunked(wire: &[u8]) -> Vec<u8> {
        let body_at = wire
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .map(|p| p + 4)
            .unwrap();
        let mut decoder = ChunkDecoder::new();
        let mut out = Vec::new();
        let n = decoder.feed(&wire[body_at..], &mut out).unwrap();
        assert_eq!(n, wire.len() - body_at);
        assert!(decoder.is_done());
        out
    }

    #[test]
    fn chunk_roundtrip_small() {
        for &size in &[0_usize, 1, 1024] {
            let body: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let mut res = Response::new();
            res.chunked();
            res.write(&body);
            let wire = res.finish(DATE).concat();
            assert_eq!(decode_chunked(&wire), body);
        }
    }

    #[test]
    fn chunk_roundtrip_compressed() {
        // crossing the threshold turns on per-flush gzip
        for &size in &[4095_usize, 4096, 1_000_000] {
            let body: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let mut res = Response::new();
            res.chunked();
            res.write(&body);
            let wire = res.finish(DATE).concat();
            assert!(String::from_utf8_lossy(&wire).contains("Content-Encoding: gzip"));

            let compressed = decode_chunked(&wire);
            let mut decoder = GzDecoder::new(&compressed[..]);
            let mut out = Vec::new();
            decoder.read_to_end(&mut out).unwrap();
            assert_eq!(out, body);
        }
    }

    #[test]
    fn streaming_switches_to_gzip() {
        let mut res = Response::new();
        res.chunked();

        // first flush below threshold stays raw
        res.write(b"small");
        let first = res.flush_chunk(DATE).concat();
        assert!(String::from_utf8_lossy(&first).contains("5\r\nsmall\r\n"));
        assert!(!String::from_utf8_lossy(&first).contains("Content-Encoding"));

        // a later flush over the threshold switches framing
        let big = vec![b'x'; GZIP_THRESHOLD * 2];
        res.write(&big);
        let second = res.flush_chunk(DATE).concat();
        let mut decoder = ChunkDecoder::new();
        let mut compressed = Vec::new();
        let _ = decoder.feed(&second, &mut compressed).unwrap();

        let mut gz = GzDecoder::new(&compressed[..]);
        let mut out = Vec::new();
        gz.read_to_end(&mut out).unwrap();
        assert_eq!(out, big);
    }

    #[test]
    fn large_body_compressed_once() {
        let body = vec![b'a'; GZIP_THRESHOLD * 4];
        let mut res = Response::new();
        res.write(&body);
        let segments = res.finish(DATE);

        // head + compressed body
        assert_eq!(segments.parts.len(), 2);
        let head = std::str::from_utf8(&segments.parts[0]).unwrap();
        assert!(head.contains("Content-Encoding: gzip"));
        assert!(segments.parts[1].len() < body.len());

        let mut gz = GzDecoder::new(&segments.parts[1][..]);
        let mut out = Vec::new();
        gz.read_to_end(&mut out).unwrap();
        assert_eq!(out, body);
    }

    #[test]
    fn connection_close_header() {
        let mut res = Response::new();
        res.keepalive(false);
        let wire = res.finish(DATE).concat();
        assert!(String::from_utf8_lossy(&wire).contains("Connection: close"));
    }
}
