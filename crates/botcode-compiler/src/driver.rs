//! Compiler driver
//!
//! Ties workspace loading and code generation together.

use std::path::PathBuf;

use crate::codegen::CodeGenerator;
use crate::error::{Diagnostic, Result};
use crate::node::NodeTree;
use crate::workspace::Workspace;

/// Options for a file-based compile
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Saved workspace JSON
    pub input: PathBuf,
    pub verbose: bool,
}

impl CompileOptions {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Result of a successful compile
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// Workspace file the program came from, when compiled from disk
    pub source_file: Option<PathBuf>,
    /// Program bytes, ending in END
    pub program: Vec<u8>,
    /// Non-fatal problems, in the order they were found
    pub diagnostics: Vec<Diagnostic>,
    /// Types of the top-level blocks that were compiled
    pub chain: Vec<String>,
}

impl CompileOutput {
    /// Number of upload packets needed at `chunk_size` bytes per packet.
    pub fn chunk_count(&self, chunk_size: usize) -> usize {
        self.program.len().div_ceil(chunk_size)
    }
}

/// File-based compiler front end
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Load the workspace named in the options and compile it.
    pub fn compile(&self) -> Result<CompileOutput> {
        let input = &self.options.input;
        tracing::info!(input = %input.display(), "compiling workspace");

        let workspace = Workspace::load(input)?;
        let mut output = compile_tree(&workspace)?;
        output.source_file = Some(input.clone());

        if self.options.verbose {
            tracing::info!(
                bytes = output.program.len(),
                blocks = output.chain.len(),
                diagnostics = output.diagnostics.len(),
                "compilation finished"
            );
        }
        Ok(output)
    }
}

/// Compile an in-memory block tree.
pub fn compile_tree<T: NodeTree>(tree: &T) -> Result<CompileOutput> {
    let mut generator = CodeGenerator::new();
    let program = generator.generate(tree)?;
    Ok(CompileOutput {
        source_file: None,
        program,
        diagnostics: generator.take_diagnostics(),
        chain: generator.chain().to_vec(),
    })
}
