//! Code generation module
//!
//! Lowers a block program into bytecode for the on-board program runner.
//! Statement chains are walked through their `next` links; expressions are
//! handled in [`crate::expr`].

use std::borrow::Cow;

use crate::buffer::{CodeBuffer, round_half_up};
use crate::error::{CompileError, Diagnostic, Result};
use crate::node::{FieldValue, Mutation, Node, NodeTree};
use crate::opcode::Op;

/// Block type that marks the program entry point.
pub const START_BLOCK: &str = "start_hat";

/// Speeds used by `robot_turn_timed`.
const TURN_SPEED: f64 = 80.0;

/// Whether the chain continues after a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    /// Nothing chained after this statement is reachable.
    Terminal,
}

/// Bytecode generator
pub struct CodeGenerator {
    pub(crate) buf: CodeBuffer,
    diagnostics: Vec<Diagnostic>,
    chain: Vec<String>,
}

impl CodeGenerator {
    /// Create a new code generator
    pub fn new() -> Self {
        Self {
            buf: CodeBuffer::new(),
            diagnostics: Vec::new(),
            chain: Vec::new(),
        }
    }

    /// Generate the program rooted at the tree's first start block.
    pub fn generate<T: NodeTree>(&mut self, tree: &T) -> Result<Vec<u8>> {
        let starts = tree.roots_of_kind(START_BLOCK);
        let Some(start) = starts.first() else {
            return Err(CompileError::NoStartBlock);
        };

        let head = start.next();
        self.chain = chain_kinds(head);
        if self.chain.is_empty() {
            tracing::debug!("start block has no blocks attached");
        } else {
            tracing::debug!(chain = %self.chain.join(" -> "), "compiling block chain");
        }

        self.compile_chain(head);
        self.buf.emit_op(Op::End);

        std::mem::take(&mut self.buf).finish()
    }

    /// Diagnostics collected so far, in emission order
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Types of the top-level blocks in the last generated chain.
    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    /// Bytes emitted so far
    pub fn buffer(&self) -> &CodeBuffer {
        &self.buf
    }

    /// Compile a statement chain starting at `head`.
    pub fn compile_chain<N: Node>(&mut self, head: Option<&N>) {
        let mut current = head;
        while let Some(node) = current {
            if self.compile_statement(node) == Flow::Terminal {
                return;
            }
            current = node.next();
        }
    }

    /// Compile a single statement block
    fn compile_statement<N: Node>(&mut self, node: &N) -> Flow {
        match node.kind() {
            // Motion
            "robot_move" => {
                let left = static_number(node.input("L"), 0.0);
                let right = static_number(node.input("R"), 0.0);
                self.buf.emit_op(Op::DriveSet);
                self.buf.emit_signed8(left);
                self.buf.emit_signed8(right);
            }
            "robot_move_soft" => {
                let target = static_number(node.input("TARGET"), 100.0);
                let seconds = static_number(node.input("SEC"), 1.0);
                self.buf.emit_op(Op::Drive);
                self.buf.emit_signed8(target);
                self.buf.emit_signed8(target);
                self.buf.emit_millis(seconds);
            }
            "robot_turn_timed" => {
                let seconds = static_number(node.input("SEC"), 0.5);
                let (left, right) = if text_field(node, "DIR", "") == "LEFT" {
                    (-TURN_SPEED, TURN_SPEED)
                } else {
                    (TURN_SPEED, -TURN_SPEED)
                };
                self.buf.emit_op(Op::Drive);
                self.buf.emit_signed8(left);
                self.buf.emit_signed8(right);
                self.buf.emit_millis(seconds);
                self.buf.emit_op(Op::Stop);
            }
            "robot_stop" => self.buf.emit_op(Op::Stop),
            "robot_set_speed" => {
                let speed = static_number(node.input("SPEED"), 100.0);
                self.buf.emit_op(Op::SetSpeed);
                self.buf.emit_percent(speed);
            }
            "move_4_motors" => {
                self.buf.emit_op(Op::Drive4Set);
                for slot in ["M1", "M2", "M3", "M4"] {
                    let speed = static_number(node.input(slot), 0.0);
                    self.buf.emit_signed8(speed);
                }
            }
            "motor_single" => {
                let motor = int_field(node, "MOTOR", 1);
                let speed = static_number(node.input("SPEED"), 0.0);
                self.buf.emit_op(Op::SetMotor);
                self.buf.emit(motor as u8);
                self.buf.emit_signed8(speed);
            }

            // Waiting
            "wait_seconds" => {
                let seconds = static_number(node.input("SECONDS"), 1.0);
                self.buf.emit_op(Op::Wait);
                self.buf.emit_millis(seconds);
            }
            "wait_until_sensor" => self.compile_wait_until(node),
            "timer_reset" => self.buf.emit_op(Op::TimerReset),

            // Control flow
            "controls_if" => self.compile_if(node),
            "controls_repeat_ext" => self.compile_repeat(node, false),
            "loop_repeat_pause" => self.compile_repeat(node, true),
            "controls_forever" | "loop_forever" => {
                self.compile_forever(node);
                return Flow::Terminal;
            }
            "controls_whileUntil" => self.compile_while(node),

            other => {
                tracing::warn!(block = other, "unknown block skipped");
                self.diagnostics.push(Diagnostic::unknown_block(other));
            }
        }
        Flow::Continue
    }

    /// if / else if* / else
    fn compile_if<N: Node>(&mut self, node: &N) {
        let Mutation {
            else_if_count,
            has_else,
        } = node.mutation();
        let mut end_jumps = Vec::new();

        for arm in 0..=else_if_count {
            self.compile_expr(node.input(&format!("IF{arm}")));
            self.buf.emit_op(Op::JumpIfFalse);
            let next_arm = self.buf.reserve16();

            self.compile_chain(node.input(&format!("DO{arm}")));
            self.buf.emit_op(Op::Jump);
            end_jumps.push(self.buf.reserve16());

            self.buf.resolve_to_here(next_arm);
        }

        if has_else {
            self.compile_chain(node.input("ELSE"));
        }

        for jump in end_jumps {
            self.buf.resolve_to_here(jump);
        }
    }

    /// Counted loop. The runner records the body start itself when it
    /// executes REPEAT_START, so no loop-back address is encoded.
    fn compile_repeat<N: Node>(&mut self, node: &N, with_pause: bool) {
        let count = round_half_up(static_number(node.input("TIMES"), 1.0)).max(1.0);
        self.buf.emit_op(Op::RepeatStart);
        self.buf.emit16(count);

        self.compile_chain(node.input("DO"));

        if with_pause {
            let pause = static_number(node.input("PAUSE"), 0.0);
            if pause > 0.0 {
                self.buf.emit_op(Op::Wait);
                self.buf.emit_millis(pause);
            }
        }
        self.buf.emit_op(Op::RepeatEnd);
    }

    fn compile_forever<N: Node>(&mut self, node: &N) {
        let loop_start = self.buf.pc();
        self.compile_chain(node.input("DO"));
        self.buf.emit_op(Op::LoopEnd);
        self.buf.emit_address(loop_start);
    }

    /// while / until loop
    fn compile_while<N: Node>(&mut self, node: &N) {
        let until = text_field(node, "MODE", "WHILE") == "UNTIL";
        let loop_start = self.buf.pc();

        self.compile_expr(node.input("BOOL"));
        if until {
            self.buf.emit_op(Op::Not);
        }
        self.buf.emit_op(Op::JumpIfFalse);
        let exit = self.buf.reserve16();

        self.compile_chain(node.input("DO"));
        self.buf.emit_op(Op::LoopEnd);
        self.buf.emit_address(loop_start);

        self.buf.resolve_to_here(exit);
    }

    /// Busy-wait on a sensor comparison.
    fn compile_wait_until<N: Node>(&mut self, node: &N) {
        let sensor = int_field(node, "SENS", 0);
        let op = Op::comparison(&text_field(node, "OP", "LT"));
        let value = static_number(node.input("VAL"), 50.0);

        let loop_start = self.buf.pc();
        self.buf.emit_op(Op::PushSensor);
        self.buf.emit(sensor as u8);
        self.buf.emit_op(Op::PushConst);
        self.buf.emit16(value);
        self.buf.emit_op(op);

        self.buf.emit_op(Op::JumpIfFalse);
        let exit = self.buf.reserve16();
        self.buf.emit_op(Op::Jump);
        self.buf.emit_address(loop_start);

        self.buf.resolve_to_here(exit);
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a block is a literal the compiler can read at compile time.
pub(crate) fn is_number_literal<N: Node>(node: &N) -> bool {
    matches!(node.kind(), "math_number" | "math_number_limited")
}

/// Value of a numeric input, when it is a literal block. Anything else
/// (missing input, computed expression, unreadable literal) gives `default`.
pub(crate) fn static_number<N: Node>(node: Option<&N>, default: f64) -> f64 {
    node.filter(|n| is_number_literal(*n))
        .and_then(|n| n.field("NUM"))
        .and_then(FieldValue::to_number)
        .unwrap_or(default)
}

/// Text field, with `default` standing in for a missing or empty value.
pub(crate) fn text_field<'a, N: Node>(node: &'a N, name: &str, default: &'a str) -> Cow<'a, str> {
    match node.field_text(name) {
        Some(text) if !text.is_empty() => text,
        _ => Cow::Borrowed(default),
    }
}

pub(crate) fn int_field<N: Node>(node: &N, name: &str, default: i64) -> i64 {
    node.field(name)
        .and_then(FieldValue::to_integer)
        .unwrap_or(default)
}

fn chain_kinds<N: Node>(head: Option<&N>) -> Vec<String> {
    let mut kinds = Vec::new();
    let mut current = head;
    while let Some(node) = current {
        kinds.push(node.kind().to_string());
        current = node.next();
    }
    kinds
}
