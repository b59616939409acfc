//! Outbound frame queue.
//!
//! Producers (handler tasks, pong replies) push frames through a cloned
//! [`FrameSender`]; the connection's write loop drains them in fifo
//! order, so a pong enqueued between two data frames goes out between
//! them. The [`Notify`] wakes a parked write loop without spinning.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::frame::{FrameHead, OpCode, PayloadLen};

/// One queued outbound frame, always sent unmasked with fin set.
#[derive(Debug)]
pub struct OutFrame {
    pub opcode: OpCode,
    pub payload: Vec<u8>,
}

impl OutFrame {
    /// Head plus payload, ready for the socket.
    pub fn to_wire(&self) -> Vec<u8> {
        let head = FrameHead::standalone(self.opcode, PayloadLen::from_num(self.payload.len() as u64));
        let mut wire = Vec::with_capacity(head.encoded_len() + self.payload.len());
        head.encode_to_vec(&mut wire);
        wire.extend_from_slice(&self.payload);
        wire
    }
}

#[derive(Debug, Default)]
struct Shared {
    frames: Mutex<VecDeque<OutFrame>>,
    notify: Notify,
}

impl Shared {
    fn push(&self, opcode: OpCode, payload: Vec<u8>) {
        if let Ok(mut frames) = self.frames.lock() {
            frames.push_back(OutFrame { opcode, payload });
        }
        self.notify.notify_one();
    }
}

/// Cloneable producer handle, given to the session on open.
#[derive(Debug, Clone)]
pub struct FrameSender {
    shared: Arc<Shared>,
}

impl FrameSender {
    #[inline]
    pub fn send_text(&self, payload: impl Into<Vec<u8>>) {
        self.shared.push(OpCode::Text, payload.into());
    }

    #[inline]
    pub fn send_binary(&self, payload: impl Into<Vec<u8>>) {
        self.shared.push(OpCode::Binary, payload.into());
    }

    /// Enqueue a close frame; the write loop shuts the connection down
    /// after sending it.
    #[inline]
    pub fn send_close(&self) {
        self.shared.push(OpCode::Close, Vec::new());
    }

    #[inline]
    pub(crate) fn send_pong(&self, payload: Vec<u8>) {
        self.shared.push(OpCode::Pong, payload);
    }

    #[inline]
    pub(crate) fn send_close_with(&self, payload: Vec<u8>) {
        self.shared.push(OpCode::Close, payload);
    }
}

/// Consumer half, owned by the connection's write loop.
#[derive(Debug)]
pub struct FrameQueue {
    shared: Arc<Shared>,
}

impl FrameQueue {
    pub fn new() -> (Self, FrameSender) {
        let shared = Arc::new(Shared::default());
        (
            Self {
                shared: shared.clone(),
            },
            FrameSender { shared },
        )
    }

    /// Park until a producer pushes. A push that raced ahead of the
    /// park is not lost, [`Notify`] stores the permit.
    #[inline]
    pub async fn wait(&self) {
        self.shared.notify.notified().await;
    }

    #[inline]
    pub fn pop(&self) -> Option<OutFrame> {
        self.shared.frames.lock().ok()?.pop_front()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fifo_order() {
        let (queue, sender) = FrameQueue::new();

        sender.send_text("one");
        sender.send_pong(b"ping payload".to_vec());
        sender.send_binary(vec![0xff]);

        assert_eq!(queue.pop().unwrap().opcode, OpCode::Text);
        assert_eq!(queue.pop().unwrap().opcode, OpCode::Pong);
        assert_eq!(queue.pop().unwrap().opcode, OpCode::Binary);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn wire_frame() {
        let frame = OutFrame {
            opcode: OpCode::Text,
            payload: b"hello".to_vec(),
        };
        let wire = frame.to_wire();
        assert_eq!(&wire[..2], &[0x81, 0x05]);
        assert_eq!(&wire[2..], b"hello");
    }

    #[tokio::test]
    async fn push_before_wait_is_kept() {
        let (queue, sender) = FrameQueue::new();
        sender.send_text("early");
        // the permit from the earlier push must satisfy this wait
        queue.wait().await;
        assert!(queue.pop().is_some());
    }
}
