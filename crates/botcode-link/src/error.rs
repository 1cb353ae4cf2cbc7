//! Error types for the upload link

use botcode_compiler::error::MAX_PROGRAM_LEN;
use thiserror::Error;

use crate::packet::Command;

/// A malformed frame in a received byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("invalid escape sequence 0xDB 0x{0:02X}")]
    InvalidEscape(u8),

    #[error("frame ended inside an escape sequence")]
    DanglingEscape,

    #[error("frame is not enclosed in 0xC0 delimiters")]
    MissingDelimiter,

    #[error("delimiter inside frame body at offset {0}")]
    StrayDelimiter(usize),
}

#[derive(Debug, Error)]
pub enum LinkError {
    /// The transport rejected a write. The upload stops at that packet.
    #[error("failed to send {packet} packet: {source}")]
    Transport {
        packet: Command,
        #[source]
        source: std::io::Error,
    },

    /// The program does not fit the runner's 16-bit address space.
    #[error("program is {len} bytes; the runner accepts at most {MAX_PROGRAM_LEN}")]
    ProgramTooLarge { len: usize },

    #[error("invalid link configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;
