//! Fin flag and opcode.

use crate::error::FrameError;

/// Fin flag, stored as the first header byte's leading bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fin {
    Y = 0x80,
    N = 0x00,
}

/// Frame opcode, stored in the low nibble of the first header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Continue = 0x00,
    Text = 0x01,
    Binary = 0x02,
    Close = 0x08,
    Ping = 0x09,
    Pong = 0x0a,
}

impl Fin {
    /// Parse from the first header byte. Set rsv bits are rejected.
    #[inline]
    pub const fn from_flag(b: u8) -> Result<Self, FrameError> {
        match b & 0xf0 {
            0x80 => Ok(Fin::Y),
            0x00 => Ok(Fin::N),
            _ => Err(FrameError::IllegalFin),
        }
    }

    #[inline]
    pub const fn is_set(self) -> bool { matches!(self, Fin::Y) }
}

impl OpCode {
    /// Parse from the first header byte.
    #[inline]
    pub const fn from_flag(b: u8) -> Result<Self, FrameError> {
        use OpCode::*;
        match b & 0x0f {
            0x00 => Ok(Continue),
            0x01 => Ok(Text),
            0x02 => Ok(Binary),
            0x08 => Ok(Close),
            0x09 => Ok(Ping),
            0x0a => Ok(Pong),
            _ => Err(FrameError::IllegalOpCode),
        }
    }

    /// Close, ping and pong. Control frames may not be fragmented and
    /// carry at most 125 bytes of payload.
    #[inline]
    pub const fn is_control(self) -> bool {
        use OpCode::*;
        matches!(self, Close | Ping | Pong)
    }

    #[inline]
    pub const fn is_data(self) -> bool {
        use OpCode::*;
        matches!(self, Text | Binary)
    }
}
