//! botlink: send programs and commands to the robot's program runner.
//!
//! The transport is a serial device opened as a file, or a TCP bridge that
//! forwards bytes to one. Everything written is SLIP-framed and paced.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio::io::AsyncWrite;
use tracing_subscriber::EnvFilter;

use botcode_compiler::disasm::disassemble;
use botcode_compiler::{CompileOptions, Compiler};
use botcode_link::frame::FrameDecoder;
use botcode_link::{Command, LinkConfig, Packet, Uploader};

type Transport = Box<dyn AsyncWrite + Unpin + Send>;

#[derive(Parser, Debug)]
#[command(name = "botlink")]
#[command(about = "Upload botcode programs and control the program runner")]
#[command(version)]
struct Args {
    /// Serial device to write to
    #[arg(long, value_name = "PATH", conflicts_with = "tcp")]
    port: Option<PathBuf>,

    /// TCP serial bridge to connect to
    #[arg(long, value_name = "ADDR")]
    tcp: Option<String>,

    /// Link configuration (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pause after BEGIN and END, overriding the config file
    #[arg(long, value_name = "MS")]
    settle_ms: Option<u64>,

    /// Pause after each chunk, overriding the config file
    #[arg(long, value_name = "MS")]
    inter_packet_ms: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Compile (if given a .json workspace) and upload a program
    Upload {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Start the stored program
    Run,
    /// Halt the running program
    Stop,
    /// Erase the stored program
    Clear,
    /// Print the packets in a captured byte stream
    Decode {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Action::Decode { file } = &args.command {
        return decode(file);
    }

    let config = load_config(&args)?;
    let transport = open_transport(&args).await?;
    let mut uploader = Uploader::new(transport, config);

    match &args.command {
        Action::Upload { file } => {
            let program = load_program(file, args.verbose)?;
            let report = uploader
                .upload(&program)
                .await
                .with_context(|| format!("upload stopped while {}", uploader.state()))?;
            println!("Uploaded {} bytes in {} chunks", report.bytes, report.chunks);
        }
        Action::Run => uploader.run().await?,
        Action::Stop => uploader.stop().await?,
        Action::Clear => uploader.clear().await?,
        Action::Decode { .. } => unreachable!("handled above"),
    }

    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<LinkConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            LinkConfig::from_json(&text).with_context(|| format!("in config {}", path.display()))?
        }
        None => LinkConfig::default(),
    };

    if let Some(ms) = args.settle_ms {
        config.settle_ms = ms;
    }
    if let Some(ms) = args.inter_packet_ms {
        config.inter_packet_ms = ms;
    }
    Ok(config)
}

async fn open_transport(args: &Args) -> anyhow::Result<Transport> {
    if let Some(addr) = &args.tcp {
        let stream = tokio::net::TcpStream::connect(addr)
            .await
            .with_context(|| format!("failed to connect to {addr}"))?;
        tracing::info!("connected to {addr}");
        return Ok(Box::new(stream));
    }

    let Some(port) = &args.port else {
        bail!("no transport given; pass --port or --tcp");
    };
    let device = tokio::fs::OpenOptions::new()
        .write(true)
        .open(port)
        .await
        .with_context(|| format!("failed to open {}", port.display()))?;
    tracing::info!("opened {}", port.display());
    Ok(Box::new(device))
}

/// Workspace JSON is compiled first; anything else is sent as raw bytes.
fn load_program(path: &Path, verbose: bool) -> anyhow::Result<Vec<u8>> {
    if path.extension().is_some_and(|ext| ext == "json") {
        let output = Compiler::new(CompileOptions::new(path).verbose(verbose))
            .compile()
            .with_context(|| format!("failed to compile {}", path.display()))?;
        Ok(output.program)
    } else {
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
    }
}

fn decode(path: &Path) -> anyhow::Result<()> {
    let capture = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    let mut program = Vec::new();
    let mut uploads = 0;
    for frame in FrameDecoder::new().push(&capture) {
        let bytes = match frame {
            Ok(bytes) => bytes,
            Err(err) => {
                println!("!! {err}");
                continue;
            }
        };
        let Some(packet) = Packet::parse(&bytes) else {
            println!("?? unknown packet {bytes:02X?}");
            continue;
        };
        println!("{packet}");

        match packet.command {
            Command::Begin => program.clear(),
            Command::Chunk => program.extend_from_slice(&packet.payload),
            Command::End => {
                uploads += 1;
                print!("{}", disassemble(&program, &format!("upload {uploads}")));
            }
            _ => {}
        }
    }
    Ok(())
}
