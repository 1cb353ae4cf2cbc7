//! Code buffer with two-phase address patching
//!
//! Forward jumps are emitted before their target is known. [`CodeBuffer::reserve16`]
//! writes a zero placeholder and hands back a [`PatchToken`]; the token is
//! consumed by one of the resolve calls once the target offset exists. Tokens
//! cannot be cloned, so an address can only be resolved once, and the buffer
//! counts the ones still outstanding.

use crate::error::{CompileError, MAX_PROGRAM_LEN, Result};
use crate::opcode::Op;

/// Largest motor speed magnitude the runner accepts.
pub const SPEED_LIMIT: f64 = 100.0;

/// Reserved, not yet resolved 16-bit address slot.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a reserved address must be resolved"]
pub struct PatchToken {
    offset: usize,
}

impl PatchToken {
    /// Offset of the placeholder's high byte
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Append-only program bytes.
#[derive(Debug, Default)]
pub struct CodeBuffer {
    code: Vec<u8>,
    outstanding: usize,
}

/// Round half towards positive infinity, matching the editor's `Math.round`.
pub(crate) fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current program counter: the offset the next byte will land at.
    pub fn pc(&self) -> usize {
        self.code.len()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Number of reserved addresses not yet resolved.
    pub fn unresolved(&self) -> usize {
        self.outstanding
    }

    pub fn emit(&mut self, byte: u8) {
        self.code.push(byte);
    }

    pub fn emit_op(&mut self, op: Op) {
        self.code.push(op.into());
    }

    /// Emit a big-endian 16-bit operand. The value is rounded; negatives are
    /// stored in two's complement and values above 65535 saturate.
    pub fn emit16(&mut self, value: f64) {
        let word = if value.is_nan() {
            0
        } else {
            let v = round_half_up(value);
            if v < 0.0 {
                ((v as i64) & 0xFFFF) as u16
            } else if v > f64::from(u16::MAX) {
                u16::MAX
            } else {
                v as u16
            }
        };
        self.emit_word(word);
    }

    pub fn emit_word(&mut self, word: u16) {
        self.code.extend_from_slice(&word.to_be_bytes());
    }

    /// Emit a known (backward) program address.
    pub fn emit_address(&mut self, address: usize) {
        self.emit_word(u16::try_from(address).unwrap_or(u16::MAX));
    }

    /// Emit a signed speed byte clamped to [-100, 100].
    pub fn emit_signed8(&mut self, value: f64) {
        let v = if value.is_nan() { 0.0 } else { value.clamp(-SPEED_LIMIT, SPEED_LIMIT) };
        self.code.push(round_half_up(v) as i8 as u8);
    }

    /// Emit a percentage byte clamped to [0, 100].
    pub fn emit_percent(&mut self, value: f64) {
        let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 100.0) };
        self.code.push(round_half_up(v) as u8);
    }

    /// Emit a duration given in seconds as milliseconds clamped to [0, 65535].
    pub fn emit_millis(&mut self, seconds: f64) {
        let ms = seconds * 1000.0;
        let ms = if ms.is_nan() { 0.0 } else { ms.clamp(0.0, f64::from(u16::MAX)) };
        self.emit_word(round_half_up(ms) as u16);
    }

    /// Reserve a 16-bit address slot to be filled in later.
    pub fn reserve16(&mut self) -> PatchToken {
        let offset = self.code.len();
        self.code.extend_from_slice(&[0, 0]);
        self.outstanding += 1;
        PatchToken { offset }
    }

    /// Point a reserved slot at the current program counter.
    pub fn resolve_to_here(&mut self, token: PatchToken) {
        let here = self.pc();
        self.resolve_to_address(token, here);
    }

    /// Point a reserved slot at `address`.
    pub fn resolve_to_address(&mut self, token: PatchToken, address: usize) {
        let word = u16::try_from(address).unwrap_or(u16::MAX);
        self.code[token.offset..token.offset + 2].copy_from_slice(&word.to_be_bytes());
        self.outstanding -= 1;
    }

    /// Hand out the finished program.
    pub fn finish(self) -> Result<Vec<u8>> {
        debug_assert_eq!(self.outstanding, 0, "unresolved patch tokens at finish");
        if self.code.len() > MAX_PROGRAM_LEN {
            return Err(CompileError::ProgramTooLarge { len: self.code.len() });
        }
        Ok(self.code)
    }
}
