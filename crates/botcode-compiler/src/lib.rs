//! Botcode compiler
//!
//! Lowers Blockly robot programs into bytecode for the on-board program
//! runner: a flat byte program with 16-bit big-endian addresses, ending in
//! an explicit END opcode.

pub mod buffer;
pub mod codegen;
pub mod disasm;
pub mod driver;
pub mod error;
pub mod expr;
pub mod node;
pub mod opcode;
pub mod workspace;

pub use buffer::{CodeBuffer, PatchToken};
pub use codegen::CodeGenerator;
pub use driver::{CompileOptions, CompileOutput, Compiler, compile_tree};
pub use error::{CompileError, DecodeError, Diagnostic, Result};
pub use node::{FieldValue, Mutation, Node, NodeTree};
pub use opcode::Op;
pub use workspace::{Block, Workspace};
