//! Websocket data frame.
//!
//! [RFC-6455 Section 5](https://datatracker.ietf.org/doc/html/rfc6455#section-5)
//!
//! A frame header is 2 bytes, followed by 0, 2 or 8 bytes of extended
//! payload length, followed by a 4-byte mask key when the mask bit is set.
//! [`FrameHead`] encodes and decodes this prefix; payload handling is
//! left to the caller.

pub mod flag;
pub mod length;
pub mod mask;

pub use flag::{Fin, OpCode};
pub use length::PayloadLen;
pub use mask::Mask;

use crate::error::FrameError;

/// Longest possible frame head: 2 + 8 + 4.
pub const MAX_HEAD_SIZE: usize = 14;

/// Websocket frame head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHead {
    pub fin: Fin,
    pub opcode: OpCode,
    pub mask: Mask,
    pub length: PayloadLen,
}

impl FrameHead {
    #[inline]
    pub const fn new(fin: Fin, opcode: OpCode, mask: Mask, length: PayloadLen) -> Self {
        Self {
            fin,
            opcode,
            mask,
            length,
        }
    }

    /// Unmasked frame with the fin bit set, what a server sends.
    #[inline]
    pub const fn standalone(opcode: OpCode, length: PayloadLen) -> Self {
        Self::new(Fin::Y, opcode, Mask::None, length)
    }

    /// Count of bytes [`encode`](Self::encode) will write.
    #[inline]
    pub const fn encoded_len(&self) -> usize {
        let mask_len = match self.mask {
            Mask::None => 0,
            _ => 4,
        };
        2 + self.length.extra_len() + mask_len
    }

    /// Encode to the provided buffer, returns the count of written bytes.
    /// Fails with [`FrameError::NotEnoughCapacity`] if the buffer is
    /// too small.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, FrameError> {
        let need = self.encoded_len();
        if buf.len() < need {
            return Err(FrameError::NotEnoughCapacity);
        }

        buf[0] = self.fin as u8 | self.opcode as u8;
        buf[1] = self.mask.to_flag() | self.length.to_flag();
        let mut n = 2;

        match self.length {
            PayloadLen::Standard(_) => {}
            PayloadLen::Extended1(v) => {
                buf[n..n + 2].copy_from_slice(&v.to_be_bytes());
                n += 2;
            }
            PayloadLen::Extended2(v) => {
                buf[n..n + 8].copy_from_slice(&v.to_be_bytes());
                n += 8;
            }
        }

        match self.mask {
            Mask::Key(k) => {
                buf[n..n + 4].copy_from_slice(&k);
                n += 4;
            }
            Mask::Skip => {
                buf[n..n + 4].copy_from_slice(&[0u8; 4]);
                n += 4;
            }
            Mask::None => {}
        }

        Ok(n)
    }

    /// Encode, appending to a vec.
    pub fn encode_to_vec(&self, out: &mut Vec<u8>) {
        let mut head = [0u8; MAX_HEAD_SIZE];
        // MAX_HEAD_SIZE always fits
        if let Ok(n) = self.encode(&mut head) {
            out.extend_from_slice(&head[..n]);
        }
    }

    /// Parse from the provided buffer, returns [`FrameHead`] and the count
    /// of consumed bytes. Fails with [`FrameError::NotEnoughData`] until
    /// the full head has arrived.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), FrameError> {
        if buf.len() < 2 {
            return Err(FrameError::NotEnoughData);
        }

        let fin = Fin::from_flag(buf[0])?;
        let opcode = OpCode::from_flag(buf[0])?;
        let mut mask = Mask::from_flag(buf[1])?;
        let mut length = PayloadLen::from_flag(buf[1]);

        let mut n = 2;

        match length.extra_len() {
            0 => {}
            2 => {
                if buf.len() < n + 2 {
                    return Err(FrameError::NotEnoughData);
                }
                length = PayloadLen::from_byte2([buf[n], buf[n + 1]]);
                n += 2;
            }
            _ => {
                if buf.len() < n + 8 {
                    return Err(FrameError::NotEnoughData);
                }
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&buf[n..n + 8]);
                length = PayloadLen::from_byte8(bytes);
                n += 8;
            }
        }

        if !matches!(mask, Mask::None) {
            if buf.len() < n + 4 {
                return Err(FrameError::NotEnoughData);
            }
            let key = [buf[n], buf[n + 1], buf[n + 2], buf[n + 3]];
            mask = if key == [0u8; 4] { Mask::Skip } else { Mask::Key(key) };
            n += 4;
        }

        Ok((
            FrameHead {
                fin,
                opcode,
                mask,
                length,
            },
            n,
        ))
    }
}
