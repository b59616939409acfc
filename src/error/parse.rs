use std::fmt::{Display, Formatter};

/// Malformed http input. Always answered with a stock 400, then close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    BadRequestLine,

    BadHeader,

    TooManyHeaders,

    BadContentLength,

    BadChunkSize,

    BadChunkTerminator,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use ParseError::*;
        match self {
            BadRequestLine => write!(f, "Malformed request line"),
            BadHeader => write!(f, "Malformed header"),
            TooManyHeaders => write!(f, "Header table overflow"),
            BadContentLength => write!(f, "Non-numeric content-length"),
            BadChunkSize => write!(f, "Malformed chunk size"),
            BadChunkTerminator => write!(f, "Missing chunk terminator"),
        }
    }
}

// use default impl
impl std::error::Error for ParseError {}
