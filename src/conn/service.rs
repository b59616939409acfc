//! Dispatch boundary: the handler trait a routed request lands on and
//! the session trait an upgraded connection talks to.

use std::future::Future;
use std::pin::Pin;

use crate::buffer::ReadBuf;
use crate::error::Result;
use crate::http::{Request, Response};
use crate::ws::{FrameSender, Message};

/// Boxed future a handler returns; it borrows the context.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Boxed future a websocket session returns from a callback.
pub type SessionFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// A routed request handler.
///
/// Returning `Err` makes the connection answer with a stock
/// `500 Internal Server Error` instead of the half-built response.
pub trait Handler: Send + Sync {
    fn handle<'a>(&'a self, ctx: &'a mut Context<'_>) -> HandlerFuture<'a>;
}

/// Callbacks for one upgraded websocket connection.
pub trait WsSession: Send {
    /// Called once after the `101` goes out. The sender may be cloned
    /// and moved to other tasks; frames go out in push order.
    fn on_open(&mut self, sender: FrameSender) {
        let _ = sender;
    }

    /// Called per complete (reassembled) data message.
    fn on_message(&mut self, message: Message) -> SessionFuture<'_>;

    /// Called once when the connection ends, however it ends.
    fn on_close(&mut self) {}
}

/// Per-request view handed to a handler: the parsed request, the buffer
/// its spans resolve against, and the response under construction.
pub struct Context<'a> {
    request: &'a Request,
    buf: &'a ReadBuf,
    pub response: &'a mut Response,
    params: Vec<(&'a str, String)>,
    session: Option<Box<dyn WsSession>>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        request: &'a Request,
        buf: &'a ReadBuf,
        response: &'a mut Response,
        params: Vec<(&'a str, String)>,
    ) -> Self {
        Self {
            request,
            buf,
            response,
            params,
            session: None,
        }
    }

    #[inline]
    pub fn method(&self) -> &str {
        self.request.method_str(self.buf)
    }

    #[inline]
    pub fn path(&self) -> &str {
        self.request.path_str(self.buf)
    }

    #[inline]
    pub fn query(&self) -> &str {
        self.request.query_str(self.buf)
    }

    #[inline]
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.request.header(self.buf, name)
    }

    /// Raw body window. For chunked requests this still carries the
    /// chunk framing, see [`decoded_body`](Self::decoded_body).
    #[inline]
    pub fn body(&self) -> &[u8] {
        self.request.body_bytes(self.buf)
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        self.request.chunked
    }

    /// Body payload with any chunk framing stripped.
    pub fn decoded_body(&self) -> Result<Vec<u8>> {
        let raw = self.request.body_bytes(self.buf);
        if !self.request.chunked {
            return Ok(raw.to_vec());
        }
        let mut decoder = crate::http::ChunkDecoder::new();
        let mut body = Vec::with_capacity(raw.len());
        decoder.feed(raw, &mut body)?;
        Ok(body)
    }

    /// A `:name` capture from the matched route pattern.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    pub fn is_upgrade(&self) -> bool {
        self.request.is_upgrade()
    }

    /// Accept a websocket upgrade. The accumulated response is
    /// discarded, a `101` goes out instead and the connection switches
    /// to frame io driving `session`. Ignored for non-upgrade requests.
    pub fn accept_websocket(&mut self, session: Box<dyn WsSession>) {
        if self.request.is_upgrade() {
            self.session = Some(session);
        }
    }

    pub(crate) fn take_session(&mut self) -> Option<Box<dyn WsSession>> {
        self.session.take()
    }
}
