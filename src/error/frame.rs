use std::fmt::{Display, Formatter};

/// Websocket protocol violation. The connection is closed at once,
/// no reply is possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    IllegalFin,

    IllegalMask,

    IllegalOpCode,

    OversizedControlFrame,

    OversizedMessage,

    UnexpectedContinue,

    NotEnoughData,

    NotEnoughCapacity,
}

impl Display for FrameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use FrameError::*;
        match self {
            IllegalFin => write!(f, "Illegal fin value"),
            IllegalMask => write!(f, "Illegal mask value"),
            IllegalOpCode => write!(f, "Illegal opcode value"),
            OversizedControlFrame => write!(f, "Control frame payload over 125 bytes"),
            OversizedMessage => write!(f, "Message payload over the configured limit"),
            UnexpectedContinue => write!(f, "Continuation frame without a pending message"),
            NotEnoughData => write!(f, "Not enough data to parse"),
            NotEnoughCapacity => write!(f, "Not enough space to write to"),
        }
    }
}

// use default impl
impl std::error::Error for FrameError {}
