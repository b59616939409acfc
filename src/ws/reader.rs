//! Inbound frame reader.
//!
//! Reads one frame at a time in phases (2-byte head, extended length,
//! mask key, payload), unmasks in place and reassembles fragmented
//! messages. A fragmented message is surfaced exactly once, when the
//! frame with the fin bit set arrives; intermediate fragments only
//! grow the reassembly buffer.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, FrameError};
use crate::frame::{Fin, FrameHead, Mask, OpCode, PayloadLen};
use crate::frame::mask::apply_mask4;

use super::Message;

/// Control frame payloads are capped at 125 bytes.
pub const MAX_CONTROL_PAYLOAD: u64 = 125;

/// Default cap on a reassembled message, 16 MiB. The declared frame
/// length is checked against it before anything is allocated.
pub const MAX_MESSAGE_SIZE: usize = 16 << 20;

/// What the read loop saw on the wire.
#[derive(Debug, PartialEq, Eq)]
pub enum WsEvent {
    /// A complete data message, reassembled if it was fragmented.
    Message(Message),
    /// A ping; the caller answers with a pong carrying the same payload.
    Ping(Vec<u8>),
    /// A close frame, payload included (status code plus reason).
    Close(Vec<u8>),
}

/// Per-connection frame reader with fragment reassembly state.
#[derive(Debug)]
pub struct FrameReader {
    assembly: Vec<u8>,
    message_opcode: Option<OpCode>,
    max_message_size: usize,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    pub fn new() -> Self {
        Self::with_limit(MAX_MESSAGE_SIZE)
    }

    /// A reader with a custom message size cap.
    pub fn with_limit(max_message_size: usize) -> Self {
        Self {
            assembly: Vec::new(),
            message_opcode: None,
            max_message_size,
        }
    }

    /// Read frames until one produces an event. Pongs are absorbed
    /// silently. Returns `Err` on protocol violations and io errors;
    /// the caller closes the connection either way.
    pub async fn next_event<R>(&mut self, reader: &mut R) -> Result<WsEvent, Error>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            let head = read_head(reader).await?;
            let len = head.length.to_num();

            if head.opcode.is_control() {
                if len > MAX_CONTROL_PAYLOAD {
                    return Err(FrameError::OversizedControlFrame.into());
                }
                if !head.fin.is_set() {
                    // control frames may not be fragmented
                    return Err(FrameError::IllegalFin.into());
                }
            } else {
                // cap the declared length before allocating, counting
                // fragments already assembled
                let room = (self.max_message_size as u64).saturating_sub(self.assembly.len() as u64);
                if len > room {
                    return Err(FrameError::OversizedMessage.into());
                }
            }

            let payload = read_payload(reader, &head, len as usize).await?;

            match head.opcode {
                OpCode::Ping => return Ok(WsEvent::Ping(payload)),
                OpCode::Pong => continue,
                OpCode::Close => return Ok(WsEvent::Close(payload)),
                OpCode::Text | OpCode::Binary => {
                    if self.message_opcode.is_some() {
                        // previous message still unfinished
                        return Err(FrameError::IllegalOpCode.into());
                    }
                    if head.fin.is_set() {
                        return Ok(WsEvent::Message(assemble(head.opcode, payload)));
                    }
                    self.message_opcode = Some(head.opcode);
                    self.assembly = payload;
                }
                OpCode::Continue => {
                    let opcode = self
                        .message_opcode
                        .ok_or(FrameError::UnexpectedContinue)?;
                    self.assembly.extend_from_slice(&payload);
                    if head.fin.is_set() {
                        self.message_opcode = None;
                        let complete = std::mem::take(&mut self.assembly);
                        return Ok(WsEvent::Message(assemble(opcode, complete)));
                    }
                }
            }
        }
    }
}

fn assemble(opcode: OpCode, payload: Vec<u8>) -> Message {
    match opcode {
        OpCode::Text => Message::Text(payload),
        _ => Message::Binary(payload),
    }
}

async fn read_head<R>(reader: &mut R) -> Result<FrameHead, Error>
where
    R: AsyncRead + Unpin,
{
    let mut fixed = [0u8; 2];
    reader.read_exact(&mut fixed).await?;

    let fin = Fin::from_flag(fixed[0])?;
    let opcode = OpCode::from_flag(fixed[0])?;
    let mut mask = Mask::from_flag(fixed[1])?;
    let mut length = PayloadLen::from_flag(fixed[1]);

    match length.extra_len() {
        0 => {}
        2 => {
            let mut ext = [0u8; 2];
            reader.read_exact(&mut ext).await?;
            length = PayloadLen::from_byte2(ext);
        }
        _ => {
            let mut ext = [0u8; 8];
            reader.read_exact(&mut ext).await?;
            length = PayloadLen::from_byte8(ext);
        }
    }

    if !matches!(mask, Mask::None) {
        let mut key = [0u8; 4];
        reader.read_exact(&mut key).await?;
        mask = if key == [0u8; 4] { Mask::Skip } else { Mask::Key(key) };
    }

    Ok(FrameHead::new(fin, opcode, mask, length))
}

async fn read_payload<R>(reader: &mut R, head: &FrameHead, len: usize) -> Result<Vec<u8>, Error>
where
    R: AsyncRead + Unpin,
{
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    if let Mask::Key(key) = head.mask {
        apply_mask4(key, &mut payload);
    }
    Ok(payload)
}
