//! Opcode table shared with the on-board program runner.
//!
//! Byte values must match the runner's `program_runner.h`; changing one here
//! without the firmware breaks every uploaded program.

use std::fmt;

/// A single VM operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Op {
    // Motion
    DriveSet = 0x01,
    Drive = 0x02,
    Drive4Set = 0x03,
    Drive4 = 0x04,
    SetMotor = 0x05,
    Stop = 0x06,
    Wait = 0x07,
    SetSpeed = 0x08,

    // Control flow
    Jump = 0x10,
    JumpIfFalse = 0x11,
    RepeatStart = 0x12,
    RepeatEnd = 0x13,
    LoopEnd = 0x14,

    // Stack
    PushConst = 0x20,
    PushSensor = 0x21,
    PushBool = 0x22,
    PushTimer = 0x23,
    TimerReset = 0x24,

    // Comparison
    CmpLt = 0x30,
    CmpGt = 0x31,
    CmpEq = 0x32,
    CmpNeq = 0x33,
    CmpLte = 0x34,
    CmpGte = 0x35,

    // Logic
    And = 0x38,
    Or = 0x39,
    Not = 0x3A,

    // Arithmetic
    Add = 0x40,
    Sub = 0x41,
    Mul = 0x42,
    Div = 0x43,

    End = 0xFF,
}

/// How an operand is encoded and what it means to the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// Signed speed byte, [-100, 100].
    Speed,
    /// Unsigned byte: motor/sensor id, flag or percentage.
    Byte,
    /// Big-endian 16-bit constant.
    Word,
    /// Big-endian 16-bit program address.
    Address,
    /// Big-endian 16-bit repeat count.
    Count,
    /// Big-endian 16-bit duration in milliseconds.
    Millis,
}

impl OperandKind {
    /// Encoded width in bytes
    pub const fn width(self) -> usize {
        match self {
            OperandKind::Speed | OperandKind::Byte => 1,
            OperandKind::Word | OperandKind::Address | OperandKind::Count | OperandKind::Millis => 2,
        }
    }
}

impl Op {
    /// Operand layout following the opcode byte.
    pub const fn operands(self) -> &'static [OperandKind] {
        use OperandKind::*;
        match self {
            Op::DriveSet => &[Speed, Speed],
            Op::Drive => &[Speed, Speed, Millis],
            Op::Drive4Set => &[Speed, Speed, Speed, Speed],
            Op::Drive4 => &[Speed, Speed, Speed, Speed, Millis],
            Op::SetMotor => &[Byte, Speed],
            Op::Wait => &[Millis],
            Op::SetSpeed => &[Byte],
            Op::Jump | Op::JumpIfFalse | Op::LoopEnd => &[Address],
            Op::RepeatStart => &[Count],
            Op::PushConst => &[Word],
            Op::PushSensor | Op::PushBool => &[Byte],
            Op::Stop
            | Op::RepeatEnd
            | Op::PushTimer
            | Op::TimerReset
            | Op::CmpLt
            | Op::CmpGt
            | Op::CmpEq
            | Op::CmpNeq
            | Op::CmpLte
            | Op::CmpGte
            | Op::And
            | Op::Or
            | Op::Not
            | Op::Add
            | Op::Sub
            | Op::Mul
            | Op::Div
            | Op::End => &[],
        }
    }

    /// Total encoded size including operands
    pub fn size(self) -> usize {
        1 + self.operands().iter().map(|kind| kind.width()).sum::<usize>()
    }

    /// Mnemonic used in disassembly listings
    pub const fn name(self) -> &'static str {
        match self {
            Op::DriveSet => "DRIVE_SET",
            Op::Drive => "DRIVE",
            Op::Drive4Set => "DRIVE4_SET",
            Op::Drive4 => "DRIVE4",
            Op::SetMotor => "SET_MOTOR",
            Op::Stop => "STOP",
            Op::Wait => "WAIT",
            Op::SetSpeed => "SET_SPEED",
            Op::Jump => "JUMP",
            Op::JumpIfFalse => "JUMP_IF_F",
            Op::RepeatStart => "REPEAT_START",
            Op::RepeatEnd => "REPEAT_END",
            Op::LoopEnd => "LOOP_END",
            Op::PushConst => "PUSH_CONST",
            Op::PushSensor => "PUSH_SENSOR",
            Op::PushBool => "PUSH_BOOL",
            Op::PushTimer => "PUSH_TIMER",
            Op::TimerReset => "TIMER_RESET",
            Op::CmpLt => "CMP_LT",
            Op::CmpGt => "CMP_GT",
            Op::CmpEq => "CMP_EQ",
            Op::CmpNeq => "CMP_NEQ",
            Op::CmpLte => "CMP_LTE",
            Op::CmpGte => "CMP_GTE",
            Op::And => "AND",
            Op::Or => "OR",
            Op::Not => "NOT",
            Op::Add => "ADD",
            Op::Sub => "SUB",
            Op::Mul => "MUL",
            Op::Div => "DIV",
            Op::End => "END",
        }
    }

    /// Comparison opcode for a `logic_compare` / `wait_until_sensor` operator
    /// name. Unrecognised names fall back to less-than, as the runner's
    /// block set has always done.
    pub fn comparison(name: &str) -> Op {
        match name {
            "LT" => Op::CmpLt,
            "GT" => Op::CmpGt,
            "EQ" => Op::CmpEq,
            "NEQ" => Op::CmpNeq,
            "LTE" => Op::CmpLte,
            "GTE" => Op::CmpGte,
            _ => Op::CmpLt,
        }
    }

    /// Arithmetic opcode for a `math_arithmetic` operator name, defaulting to add.
    pub fn arithmetic(name: &str) -> Op {
        match name {
            "MINUS" => Op::Sub,
            "MULTIPLY" => Op::Mul,
            "DIVIDE" => Op::Div,
            _ => Op::Add,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Op> for u8 {
    fn from(op: Op) -> u8 {
        op as u8
    }
}

impl TryFrom<u8> for Op {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        let op = match byte {
            0x01 => Op::DriveSet,
            0x02 => Op::Drive,
            0x03 => Op::Drive4Set,
            0x04 => Op::Drive4,
            0x05 => Op::SetMotor,
            0x06 => Op::Stop,
            0x07 => Op::Wait,
            0x08 => Op::SetSpeed,
            0x10 => Op::Jump,
            0x11 => Op::JumpIfFalse,
            0x12 => Op::RepeatStart,
            0x13 => Op::RepeatEnd,
            0x14 => Op::LoopEnd,
            0x20 => Op::PushConst,
            0x21 => Op::PushSensor,
            0x22 => Op::PushBool,
            0x23 => Op::PushTimer,
            0x24 => Op::TimerReset,
            0x30 => Op::CmpLt,
            0x31 => Op::CmpGt,
            0x32 => Op::CmpEq,
            0x33 => Op::CmpNeq,
            0x34 => Op::CmpLte,
            0x35 => Op::CmpGte,
            0x38 => Op::And,
            0x39 => Op::Or,
            0x3A => Op::Not,
            0x40 => Op::Add,
            0x41 => Op::Sub,
            0x42 => Op::Mul,
            0x43 => Op::Div,
            0xFF => Op::End,
            other => return Err(other),
        };
        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_round_trip_for_every_opcode() {
        for byte in 0..=u8::MAX {
            if let Ok(op) = Op::try_from(byte) {
                assert_eq!(u8::from(op), byte);
            }
        }
        assert_eq!(Op::try_from(0x00), Err(0x00));
        assert_eq!(Op::try_from(0x15), Err(0x15));
    }

    #[test]
    fn test_sizes() {
        assert_eq!(Op::Stop.size(), 1);
        assert_eq!(Op::DriveSet.size(), 3);
        assert_eq!(Op::Drive.size(), 5);
        assert_eq!(Op::Drive4.size(), 7);
        assert_eq!(Op::JumpIfFalse.size(), 3);
        assert_eq!(Op::PushSensor.size(), 2);
    }

    #[test]
    fn test_operator_names() {
        assert_eq!(Op::comparison("GTE"), Op::CmpGte);
        assert_eq!(Op::comparison("bogus"), Op::CmpLt);
        assert_eq!(Op::arithmetic("DIVIDE"), Op::Div);
        assert_eq!(Op::arithmetic("POWER"), Op::Add);
    }
}
