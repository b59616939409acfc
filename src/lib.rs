//! Asynchronous http/1.1 and websocket connection engine.
//!
//! ## Features
//! - Incremental, zero-copy request parsing over a growable read buffer.
//! - Pipelined requests, answered strictly in arrival order.
//! - Chunked and gzip response framing behind one builder.
//! - In-place websocket upgrade with fragment reassembly and an
//!   ordered outbound frame queue.
//! - Segment-trie routing with captures, wildcards and priorities.
//! - One socket, one event loop: connections are pinned at accept
//!   time and never migrate.
//!
//! ## High-level API
//!
//! - [`engine`]
//! - [`conn`]
//! - [`router`]
//!
//! ```ignore
//! {
//!     let mut server = Server::new();
//!     server.route(&["GET"], "/hello/:name", Priority::Medium, Hello);
//!     server.serve("0.0.0.0:8080").await?;
//! }
//! ```
//!
//! ## Low-level API
//!
//! - [`http`]
//! - [`frame`]
//! - [`handshake`]
//! - [`ws`]
//!
//! Parsing:
//!
//! ```ignore
//! {
//!     let n = io.read(buf.spare()).await?;
//!     buf.advance(n);
//!     match parser.parse(&buf)? {
//!         ParseStatus::Complete | ParseStatus::Pipelined => { /* dispatch */ }
//!         ParseStatus::Incomplete => { /* read more */ }
//!     }
//! }
//! ```
//!
//! Frames:
//!
//! ```ignore
//! {
//!     let head = FrameHead::standalone(OpCode::Text, PayloadLen::from_num(5));
//!     let offset = head.encode(&mut buf)?;
//!
//!     let (head, offset) = FrameHead::decode(&buf)?;
//! }
//! ```

pub mod buffer;
pub mod conn;
pub mod engine;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod http;
pub mod router;
pub mod ws;

pub use conn::{Connection, Context, Handler, HandlerFuture, WsSession};
pub use engine::{Engines, Server};
pub use error::{Error, Result};
pub use http::{Request, Response};
pub use router::{HandlerId, Priority, Router};
pub use ws::{FrameSender, Message};
