//! Expression lowering
//!
//! Every expression compiles to postfix code that leaves exactly one value on
//! the runner's operand stack. Missing or unrecognised blocks push 0.

use crate::codegen::{CodeGenerator, int_field, text_field};
use crate::node::{FieldValue, Node};
use crate::opcode::Op;

/// Runner timer ticks per second; the timer counts milliseconds.
const TIMER_TICKS_PER_SECOND: u16 = 1000;

impl CodeGenerator {
    /// Compile an expression, or a zero constant when `node` is absent.
    pub fn compile_expr<N: Node>(&mut self, node: Option<&N>) {
        let Some(node) = node else {
            self.push_zero();
            return;
        };

        match node.kind() {
            "math_number" | "math_number_limited" => {
                let value = node.field("NUM").and_then(FieldValue::to_number).unwrap_or(0.0);
                self.buf.emit_op(Op::PushConst);
                self.buf.emit16(value);
            }
            "logic_boolean" => {
                let value = text_field(node, "BOOL", "") == "TRUE";
                self.buf.emit_op(Op::PushBool);
                self.buf.emit(u8::from(value));
            }
            "logic_compare" => {
                let op = Op::comparison(&text_field(node, "OP", "EQ"));
                self.compile_binary(node, op);
            }
            "logic_operation" => {
                let op = if text_field(node, "OP", "AND") == "AND" {
                    Op::And
                } else {
                    Op::Or
                };
                self.compile_binary(node, op);
            }
            "logic_negate" => {
                self.compile_expr(node.input("BOOL"));
                self.buf.emit_op(Op::Not);
            }
            "sensor_get" => {
                let sensor = int_field(node, "SENS", 0);
                self.buf.emit_op(Op::PushSensor);
                self.buf.emit(sensor as u8);
            }
            "math_arithmetic" => {
                let op = Op::arithmetic(&text_field(node, "OP", "ADD"));
                self.compile_binary(node, op);
            }
            "timer_get" => {
                // Scale the millisecond timer to seconds
                self.buf.emit_op(Op::PushTimer);
                self.buf.emit_op(Op::PushConst);
                self.buf.emit_word(TIMER_TICKS_PER_SECOND);
                self.buf.emit_op(Op::Div);
            }
            _ => self.push_zero(),
        }
    }

    /// Operands `A` then `B`, then the operator.
    fn compile_binary<N: Node>(&mut self, node: &N, op: Op) {
        self.compile_expr(node.input("A"));
        self.compile_expr(node.input("B"));
        self.buf.emit_op(op);
    }

    fn push_zero(&mut self) {
        self.buf.emit_op(Op::PushConst);
        self.buf.emit_word(0);
    }
}
