//! Botcode link
//!
//! Sends compiled botcode programs to the robot's program runner over any
//! byte stream: packets are SLIP-framed and paced with fixed delays, since the
//! receiver sends no acknowledgements.

pub mod config;
pub mod error;
pub mod frame;
pub mod packet;
pub mod protocol;

pub use config::LinkConfig;
pub use error::{FrameError, LinkError, Result};
pub use frame::FrameDecoder;
pub use packet::{Command, Packet};
pub use protocol::{CHUNK_SIZE, UploadReport, UploadState, Uploader};
