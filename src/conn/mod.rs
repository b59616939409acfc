//! Per-connection actor.
//!
//! A [`Connection`] owns exactly one socket plus its read buffer,
//! parser, and response builder, and runs the whole exchange loop on
//! the event loop its socket was pinned to:
//!
//! ```text
//! read -> parse -> dispatch -> write -+-> read (keepalive)
//!                                     +-> websocket loop (upgrade)
//!                                     +-> close
//! ```
//!
//! Pipelined requests surfaced by one read are dispatched and answered
//! strictly in arrival order, one at a time. A parse error answers with
//! a stock `400` and closes; a handler error answers `500` and keeps
//! the connection; io errors close silently.

pub mod service;

pub use service::{Context, Handler, HandlerFuture, SessionFuture, WsSession};

use std::future::Future;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::buffer::ReadBuf;
use crate::error::{Error, Result};
use crate::frame::OpCode;
use crate::handshake;
use crate::http::status::stock_reply;
use crate::http::{DateCache, ParseStatus, Parser, Request, Response, Segments};
use crate::router::Router;
use crate::ws::{FrameQueue, FrameReader, FrameSender, WsEvent};

/// The routing table a connection dispatches on.
pub type HandlerTable = Router<Box<dyn Handler>>;

enum Flow {
    Continue,
    Close,
    Upgrade(Box<dyn WsSession>),
}

/// One accepted socket and all of its per-connection state.
pub struct Connection<IO> {
    io: IO,
    buf: ReadBuf,
    parser: Parser,
    response: Response,
    date: DateCache,
    router: Arc<HandlerTable>,
    closed: bool,
}

impl<IO> Connection<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(io: IO, router: Arc<HandlerTable>) -> Self {
        Self {
            io,
            buf: ReadBuf::new(),
            parser: Parser::new(),
            response: Response::new(),
            date: DateCache::new(),
            router,
            closed: false,
        }
    }

    /// Drive the connection to completion.
    pub async fn serve(self) -> Result<()> {
        self.serve_until(std::future::pending::<()>()).await
    }

    /// Drive the connection until `stop` resolves. A stop between
    /// requests closes right away; an exchange already dispatched is
    /// answered first.
    pub async fn serve_until<F>(mut self, stop: F) -> Result<()>
    where
        F: Future,
    {
        tokio::pin!(stop);
        loop {
            let read = tokio::select! {
                read = self.io.read(self.buf.spare()) => read,
                _ = &mut stop => {
                    trace!("stop while idle");
                    self.close().await;
                    return Ok(());
                }
            };
            let n = match read {
                Ok(0) => {
                    trace!("peer closed");
                    self.close().await;
                    return Ok(());
                }
                Ok(n) => n,
                Err(e) => {
                    debug!("read error: {}", e);
                    self.close().await;
                    return Ok(());
                }
            };
            self.buf.advance(n);

            loop {
                let status = match self.parser.parse(&self.buf) {
                    Ok(status) => status,
                    Err(e) => {
                        debug!("parse error: {}", e);
                        let _ = self.io.write_all(&stock_reply(400)).await;
                        self.close().await;
                        return Err(Error::Parse(e));
                    }
                };

                let surplus = match status {
                    ParseStatus::Incomplete => break,
                    ParseStatus::Pipelined => true,
                    ParseStatus::Complete => false,
                };

                match self.exchange().await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Close) => {
                        self.close().await;
                        return Ok(());
                    }
                    Ok(Flow::Upgrade(session)) => {
                        self.parser.recycle(&mut self.buf);
                        return self.websocket(session, stop).await;
                    }
                    Err(e) => {
                        self.close().await;
                        return Err(e);
                    }
                }

                self.parser.recycle(&mut self.buf);
                if !surplus {
                    break;
                }
            }
        }
    }

    /// One request/response exchange over the parsed request.
    async fn exchange(&mut self) -> Result<Flow> {
        let minor_version = self.parser.request.minor_version;
        trace!(
            "{} {}",
            self.parser.request.method_str(&self.buf),
            self.parser.request.path_str(&self.buf)
        );

        self.response.minor_version(minor_version);
        self.response.keepalive(!wants_close(&self.parser.request, &self.buf));

        let mut session = None;
        let outcome = {
            let matched = self.router.matches(
                self.parser.request.method_str(&self.buf),
                self.parser.request.path_str(&self.buf),
            );
            match matched {
                Some(m) => {
                    let mut ctx =
                        Context::new(&self.parser.request, &self.buf, &mut self.response, m.params);
                    let outcome = m.handler.handle(&mut ctx).await;
                    session = ctx.take_session();
                    outcome
                }
                None => match self.router.fallback() {
                    Some(handler) => {
                        let mut ctx = Context::new(
                            &self.parser.request,
                            &self.buf,
                            &mut self.response,
                            Vec::new(),
                        );
                        let outcome = handler.handle(&mut ctx).await;
                        session = ctx.take_session();
                        outcome
                    }
                    None => {
                        self.response.set_status(404);
                        Ok(())
                    }
                },
            }
        };

        if let Err(e) = outcome {
            warn!("handler error: {}", e);
            session = None;
            let keepalive = self.response.is_keepalive();
            self.response.reset();
            self.response.minor_version(minor_version);
            self.response.keepalive(keepalive);
            self.response.set_status(500);
        }

        if let Some(session) = session {
            let sec_key = self.parser.request.sec_key.resolve(&self.buf).to_vec();
            self.response.reset();
            handshake::upgrade_response(&mut self.response, &sec_key);
            let segments = self.response.finish(self.date.get());
            self.write_segments(&segments).await?;
            self.response.reset();
            return Ok(Flow::Upgrade(session));
        }

        let keepalive = self.response.is_keepalive();
        let segments = self.response.finish(self.date.get());
        self.write_segments(&segments).await?;
        self.response.reset();

        Ok(if keepalive { Flow::Continue } else { Flow::Close })
    }

    async fn write_segments(&mut self, segments: &Segments) -> Result<()> {
        for part in &segments.parts {
            self.io.write_all(part).await?;
        }
        self.io.flush().await?;
        Ok(())
    }

    /// Frame io after a completed upgrade. Bytes the client sent right
    /// behind the handshake are already buffered and are replayed ahead
    /// of the socket. A stop sends a close frame and ends the session.
    async fn websocket<F>(
        self,
        mut session: Box<dyn WsSession>,
        mut stop: Pin<&mut F>,
    ) -> Result<()>
    where
        F: Future,
    {
        let leftover = self.buf.filled().to_vec();
        let (rd, wr) = tokio::io::split(self.io);
        let mut rd = Cursor::new(leftover).chain(rd);

        let (queue, sender) = FrameQueue::new();
        session.on_open(sender.clone());

        let mut writer = tokio::spawn(write_loop(queue, wr));
        let mut reader = FrameReader::new();

        let writer_done = loop {
            tokio::select! {
                _ = &mut writer => break true,
                _ = &mut stop => {
                    trace!("stop during session");
                    sender.send_close();
                    break false;
                }
                event = reader.next_event(&mut rd) => match event {
                    Ok(WsEvent::Message(message)) => session.on_message(message).await,
                    Ok(WsEvent::Ping(payload)) => sender.send_pong(payload),
                    Ok(WsEvent::Close(payload)) => {
                        echo_close(&sender, payload);
                        break false;
                    }
                    Err(e) => {
                        debug!("ws read: {}", e);
                        sender.send_close();
                        break false;
                    }
                },
            }
        };

        if !writer_done {
            // give the write loop a moment to flush the close frame
            let _ = tokio::time::timeout(Duration::from_secs(5), &mut writer).await;
        }

        session.on_close();
        Ok(())
    }

    /// Shut the transport down; further calls are no-ops.
    pub async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.io.shutdown().await;
        }
    }
}

fn echo_close(sender: &FrameSender, payload: Vec<u8>) {
    // echo at most the 2-byte status code back
    let mut echo = payload;
    echo.truncate(2);
    sender.send_close_with(echo);
}

async fn write_loop<W>(queue: FrameQueue, mut wr: W)
where
    W: AsyncWrite + Unpin,
{
    loop {
        while let Some(frame) = queue.pop() {
            let is_close = matches!(frame.opcode, OpCode::Close);
            if wr.write_all(&frame.to_wire()).await.is_err() {
                return;
            }
            if is_close {
                let _ = wr.shutdown().await;
                return;
            }
        }
        queue.wait().await;
    }
}

fn wants_close(request: &Request, buf: &ReadBuf) -> bool {
    match request.header(buf, "connection") {
        Some(value) => value
            .split(|&b| b == b',')
            .any(|token| token.trim_ascii().eq_ignore_ascii_case(b"close")),
        None => request.minor_version == 0,
    }
}
