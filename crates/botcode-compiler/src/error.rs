//! Compiler errors and diagnostics

use std::fmt;

use thiserror::Error;

/// Largest program the runner can address with 16-bit jump targets.
pub const MAX_PROGRAM_LEN: usize = u16::MAX as usize;

/// Fatal compile errors. No program is produced when one of these occurs.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("no \"start_hat\" block in the workspace")]
    NoStartBlock,

    #[error("program is {len} bytes; the runner addresses at most {MAX_PROGRAM_LEN}")]
    ProgramTooLarge { len: usize },

    #[error("failed to read workspace: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed workspace JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CompileError>;

/// A non-fatal problem noticed while generating code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Type tag of the offending block
    pub block_type: String,
    pub message: String,
}

impl Diagnostic {
    pub fn unknown_block(block_type: &str) -> Self {
        Self {
            block_type: block_type.to_string(),
            message: format!("unknown block \"{block_type}\" skipped"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Failure to decode a byte sequence back into instructions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode 0x{byte:02X} at offset {offset}")]
    UnknownOpcode { offset: usize, byte: u8 },

    #[error("{op} at offset {offset} is missing operand bytes")]
    Truncated { offset: usize, op: &'static str },
}
