//! Http/1.1 request parsing and response serialization.
//!
//! The parser is incremental: it operates in place on a connection's
//! [`ReadBuf`](crate::buffer::ReadBuf) and is re-invoked as bytes arrive,
//! yielding [`ParseStatus`] until a full request (including any
//! content-length body) is buffered. Pipelined requests are surfaced one
//! at a time, strictly in arrival order.
//!
//! The response builder accumulates status, headers and body, then renders
//! to a scatter list of segments, with `Content-Length` or chunked framing
//! and optional gzip compression.

pub mod chunked;
pub mod date;
pub mod parser;
pub mod request;
pub mod response;
pub mod status;

pub use chunked::ChunkDecoder;
pub use date::DateCache;
pub use parser::{Parser, ParseStatus};
pub use request::Request;
pub use response::{Response, Segments};

/// 64, matches the fixed header-slot table of the parser.
pub const MAX_REQUEST_HEADERS: usize = 64;
