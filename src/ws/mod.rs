//! Websocket runtime, server side.
//!
//! After the opening handshake a connection splits into two halves:
//! [`reader::FrameReader`] pulls frames off the socket, unmasks and
//! reassembles them into [`Message`]s, while [`queue::FrameQueue`]
//! collects outbound frames from any task holding a
//! [`queue::FrameSender`] and hands them to the single socket writer.

pub mod queue;
pub mod reader;

pub use queue::{FrameQueue, FrameSender};
pub use reader::{FrameReader, WsEvent, MAX_MESSAGE_SIZE};

/// A complete, reassembled data message.
///
/// Text payloads are kept as raw bytes, utf-8 validation is left to
/// the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(Vec<u8>),
    Binary(Vec<u8>),
}

impl Message {
    #[inline]
    pub fn payload(&self) -> &[u8] {
        match self {
            Message::Text(p) | Message::Binary(p) => p,
        }
    }

    #[inline]
    pub fn into_payload(self) -> Vec<u8> {
        match self {
            Message::Text(p) | Message::Binary(p) => p,
        }
    }
}
