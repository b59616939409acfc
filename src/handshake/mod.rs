//! Websocket opening handshake, server side.
//!
//! [RFC-6455 Section 4](https://datatracker.ietf.org/doc/html/rfc6455#section-4)
//!
//! The request side is handled by the http parser (upgrade detection and
//! `sec-websocket-key` capture); this module derives the accept key and
//! fills in the `101 Switching Protocols` response.

pub mod key;

pub use key::derive_accept_key;

use crate::http::Response;

/// Magic string appended to the key before hashing.
pub const GUID: &[u8; 36] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Turn a response into a `101 Switching Protocols` reply for the
/// given `sec-websocket-key`.
pub fn upgrade_response(res: &mut Response, sec_key: &[u8]) {
    let accept = derive_accept_key(sec_key);

    res.set_status(101);
    res.add_header("Upgrade", "websocket");
    res.add_header("Connection", "Upgrade");
    res.add_header(
        "Sec-WebSocket-Accept",
        String::from_utf8_lossy(&accept).into_owned(),
    );
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn switching_protocols() {
        let mut res = Response::new();
        upgrade_response(&mut res, b"dGhlIHNhbXBsZSBub25jZQ==");

        let wire = res.finish("Thu, 01 Jan 1970 00:00:00 GMT").concat();
        let text = std::str::from_utf8(&wire).unwrap();
        assert!(text.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(text.contains("Upgrade: websocket\r\n"));
        assert!(text.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
    }
}
