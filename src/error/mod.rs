#![allow(missing_docs)]
//! Errors

mod parse;
mod frame;

pub use parse::ParseError;
pub use frame::FrameError;

use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum Error {
    Parse(ParseError),

    Frame(FrameError),

    Io(std::io::Error),
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self { Error::Parse(e) }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self { Error::Frame(e) }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error { Error::Io(e) }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use Error::*;
        match self {
            Parse(e) => write!(f, "Parse error: {}", e),
            Frame(e) => write!(f, "Frame error: {}", e),
            Io(e) => write!(f, "Io error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use Error::*;

        match self {
            Parse(e) => Some(e),
            Frame(e) => Some(e),
            Io(e) => Some(e),
        }
    }
}

/// Crate level result, used at the dispatch boundary.
pub type Result<T> = std::result::Result<T, Error>;
