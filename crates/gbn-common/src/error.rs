//! Terminal error kinds — the entries in the protocol's error table that
//! abort the process rather than being logged and absorbed inline.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GbnError {
    #[error("handshake did not complete within the timeout budget")]
    HandshakeTimeout,

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
