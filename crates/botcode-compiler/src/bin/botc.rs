//! botc: compile a saved Blockly workspace into runner bytecode

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use botcode_compiler::disasm::disassemble;
use botcode_compiler::{CompileOptions, CompileOutput, Compiler};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Bytes per line of hex output
const HEX_LINE: usize = 16;

#[derive(Parser, Debug)]
#[command(name = "botc")]
#[command(about = "Block program compiler - turns a saved Blockly workspace into runner bytecode")]
#[command(version)]
struct Args {
    /// Saved workspace JSON
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Write the raw program bytes to this file
    #[arg(short, long, value_name = "OUT")]
    output: Option<PathBuf>,

    /// Print the program as hex (default when no output file is given)
    #[arg(long)]
    hex: bool,

    /// Print a disassembly listing
    #[arg(long)]
    disasm: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = CompileOptions::new(args.input.clone()).verbose(args.verbose);
    let compiler = Compiler::new(options);

    let output = compiler.compile().context("compilation failed")?;

    if args.verbose {
        eprintln!("Blocks: {}", describe_chain(&output));
        eprintln!("Compiled {} bytes", output.program.len());
    }

    if let Some(ref path) = args.output {
        fs::write(path, &output.program)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote {} bytes to {}", output.program.len(), path.display());
    }

    if args.hex || (args.output.is_none() && !args.disasm) {
        for line in output.program.chunks(HEX_LINE) {
            println!("{}", hex::encode_upper(line));
        }
    }

    if args.disasm {
        let name = args.input.display().to_string();
        print!("{}", disassemble(&output.program, &name));
    }

    Ok(())
}

fn describe_chain(output: &CompileOutput) -> String {
    if output.chain.is_empty() {
        "(none)".to_string()
    } else {
        output.chain.join(" -> ")
    }
}
