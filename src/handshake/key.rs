//! Key exchange.

use super::GUID;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha1::{Digest, Sha1};

/// Generate a new `sec-websocket-key`.
#[inline]
pub fn new_sec_key() -> [u8; 24] {
    let input: [u8; 16] = rand::random();
    let mut output = [0_u8; 24];
    // 16 raw bytes always encode to 24
    let _ = Engine::encode_slice(&STANDARD, input, &mut output);
    output
}

/// Derive `sec-websocket-accept` from `sec-websocket-key`.
#[inline]
pub fn derive_accept_key(sec_key: &[u8]) -> [u8; 28] {
    let mut sha1 = Sha1::default();
    sha1.update(sec_key);
    sha1.update(GUID);
    let input = sha1.finalize();
    let mut output = [0_u8; 28];
    // a 20-byte digest always encodes to 28
    let _ = Engine::encode_slice(&STANDARD, input, &mut output);
    output
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generate_sec_key() {
        let key = new_sec_key();
        assert!(key.iter().all(|b| b.is_ascii()));
        assert_eq!(key[22..], [b'=', b'=']);
    }

    #[test]
    fn derive_sec_key() {
        // rfc-6455 section 1.3 sample
        assert_eq!(
            &derive_accept_key(b"dGhlIHNhbXBsZSBub25jZQ=="),
            b"s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }
}
