use std::io;

use thiserror::Error;

use crate::chunk::MAX_CHUNKS;

/// A failure somewhere in the encode, split, send pipeline.
///
/// [`GelfHandler::handle`](crate::GelfHandler) contains all of these; they only surface through
/// [`GelfHandler::try_handle`](crate::GelfHandler::try_handle) and the
/// [diagnostics channel](crate::DiagnosticSink).
#[derive(Debug, Error)]
pub enum Error {
    /// The log event cannot be turned into a GELF message.
    #[error("invalid log event: {0}")]
    Validation(&'static str),
    /// The payload needs more chunks than a GELF receiver will reassemble.
    #[error("message of {size} bytes needs {chunks} chunks, limit is {limit}", limit = MAX_CHUNKS)]
    MessageTooLarge { size: usize, chunks: usize },
    /// Serialization or compression failed.
    #[error("failed to encode message")]
    Encoding(#[source] io::Error),
    /// The datagram could not be handed to the network.
    #[error("failed to send datagram")]
    Transport(#[source] io::Error),
}

impl Error {
    /// A short, stable label for the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::MessageTooLarge { .. } => "message_too_large",
            Error::Encoding(_) => "encoding",
            Error::Transport(_) => "transport",
        }
    }
}

/// Errors raised while building a [`GelfHandler`](crate::GelfHandler).
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to resolve local hostname")]
    HostnameResolution(#[source] io::Error),
    #[error("local hostname is not valid UTF-8: {0:?}")]
    OsString(std::ffi::OsString),
    #[error("max chunk size {0} leaves no room for the chunk header")]
    ChunkSizeTooSmall(usize),
}
