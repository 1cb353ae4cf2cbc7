//! Bytecode disassembler for debugging

use std::fmt::{self, Write};

use crate::error::DecodeError;
use crate::opcode::{Op, OperandKind};

/// A decoded operand value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Speed(i8),
    Byte(u8),
    Word(u16),
    Address(u16),
    Count(u16),
    Millis(u16),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Speed(v) => write!(f, "{v}"),
            Operand::Byte(v) => write!(f, "{v}"),
            // Constants are signed on the runner
            Operand::Word(v) => write!(f, "{}", *v as i16),
            Operand::Address(v) => write!(f, "@{v:04}"),
            Operand::Count(v) => write!(f, "x{v}"),
            Operand::Millis(v) => write!(f, "{v}ms"),
        }
    }
}

/// One decoded instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub offset: usize,
    pub op: Op,
    pub operands: Vec<Operand>,
}

impl Instruction {
    /// Jump target for JUMP, JUMP_IF_F and LOOP_END.
    pub fn target(&self) -> Option<usize> {
        self.operands.iter().find_map(|operand| match operand {
            Operand::Address(addr) => Some(usize::from(*addr)),
            _ => None,
        })
    }

    /// Encoded length in bytes
    pub fn len(&self) -> usize {
        self.op.size()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}  {:<12}", self.offset, self.op.name())?;
        for operand in &self.operands {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

/// Decode a whole program into instructions
pub fn decode(code: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    let mut instructions = Vec::new();
    let mut offset = 0;
    while offset < code.len() {
        let instruction = decode_at(code, offset)?;
        offset += instruction.len();
        instructions.push(instruction);
    }
    Ok(instructions)
}

/// Decode the instruction starting at `offset`.
///
/// Panics if `offset` is past the end of `code`.
pub fn decode_at(code: &[u8], offset: usize) -> Result<Instruction, DecodeError> {
    let byte = code[offset];
    let op = Op::try_from(byte).map_err(|byte| DecodeError::UnknownOpcode { offset, byte })?;
    if offset + op.size() > code.len() {
        return Err(DecodeError::Truncated {
            offset,
            op: op.name(),
        });
    }

    let mut cursor = offset + 1;
    let operands = op
        .operands()
        .iter()
        .map(|kind| {
            let operand = match kind {
                OperandKind::Speed => Operand::Speed(code[cursor] as i8),
                OperandKind::Byte => Operand::Byte(code[cursor]),
                OperandKind::Word => Operand::Word(read_u16(code, cursor)),
                OperandKind::Address => Operand::Address(read_u16(code, cursor)),
                OperandKind::Count => Operand::Count(read_u16(code, cursor)),
                OperandKind::Millis => Operand::Millis(read_u16(code, cursor)),
            };
            cursor += kind.width();
            operand
        })
        .collect();

    Ok(Instruction {
        offset,
        op,
        operands,
    })
}

fn read_u16(code: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([code[offset], code[offset + 1]])
}

/// Render a program listing. Undecodable tails are shown as raw bytes.
pub fn disassemble(code: &[u8], name: &str) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "== {name} ({} bytes) ==", code.len());

    let mut offset = 0;
    while offset < code.len() {
        match decode_at(code, offset) {
            Ok(instruction) => {
                let _ = writeln!(output, "{instruction}");
                offset += instruction.len();
            }
            Err(err) => {
                let _ = writeln!(output, "{offset:04}  ?? {err}: {:02X?}", &code[offset..]);
                break;
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_example_program() {
        let code = [0x01, 50, 50, 0x07, 0x03, 0xE8, 0x06, 0xFF];
        let instructions = decode(&code).unwrap();
        let ops: Vec<Op> = instructions.iter().map(|i| i.op).collect();
        assert_eq!(ops, vec![Op::DriveSet, Op::Wait, Op::Stop, Op::End]);
        assert_eq!(instructions[1].operands, vec![Operand::Millis(1000)]);
        assert_eq!(instructions[2].offset, 6);
    }

    #[test]
    fn test_decode_negative_speed_and_target() {
        let code = [0x02, 0xB0, 80, 0x01, 0xF4, 0x14, 0x00, 0x00];
        let instructions = decode(&code).unwrap();
        assert_eq!(
            instructions[0].operands,
            vec![Operand::Speed(-80), Operand::Speed(80), Operand::Millis(500)]
        );
        assert_eq!(instructions[1].target(), Some(0));
        assert_eq!(instructions[0].target(), None);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            decode(&[0x06, 0x99]),
            Err(DecodeError::UnknownOpcode { offset: 1, byte: 0x99 })
        );
        assert_eq!(
            decode(&[0x10, 0x00]),
            Err(DecodeError::Truncated { offset: 0, op: "JUMP" })
        );
    }

    #[test]
    fn test_listing() {
        let listing = disassemble(&[0x20, 0xFF, 0xFE, 0x10, 0x00, 0x00, 0xFF], "test");
        assert!(listing.starts_with("== test (7 bytes) =="));
        assert!(listing.contains("PUSH_CONST   -2"));
        assert!(listing.contains("0003  JUMP         @0000"));
        assert!(listing.contains("0006  END"));
    }
}
