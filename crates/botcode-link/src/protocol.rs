//! Paced program upload
//!
//! An upload is `BEGIN`, the program split into `CHUNK` packets of at most
//! [`CHUNK_SIZE`] bytes, then `END`. The receiver never acknowledges, so the
//! only flow control is a fixed pause after each packet. A failed write stops
//! the sequence where it is; nothing is retried.

use std::fmt;

use botcode_compiler::error::MAX_PROGRAM_LEN;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::frame;
use crate::packet::{Command, Packet};

/// Largest program slice carried by one CHUNK packet
pub const CHUNK_SIZE: usize = 18;

/// Progress through an upload. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UploadState {
    Idle,
    Begun,
    Transferring,
    Ended,
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadState::Idle => "idle",
            UploadState::Begun => "begun",
            UploadState::Transferring => "transferring",
            UploadState::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// Summary of a finished upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub bytes: usize,
    pub chunks: usize,
    pub state: UploadState,
}

/// Split a program into upload chunks, in send order.
pub fn chunks(program: &[u8]) -> impl ExactSizeIterator<Item = &[u8]> {
    program.chunks(CHUNK_SIZE)
}

/// Drives the upload protocol over a byte transport it owns.
///
/// Every operation takes `&mut self`, so two uploads can never interleave
/// on the same transport.
pub struct Uploader<W> {
    transport: W,
    config: LinkConfig,
    state: UploadState,
}

impl<W: AsyncWrite + Unpin> Uploader<W> {
    pub fn new(transport: W, config: LinkConfig) -> Self {
        Self {
            transport,
            config,
            state: UploadState::Idle,
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn get_ref(&self) -> &W {
        &self.transport
    }

    pub fn into_inner(self) -> W {
        self.transport
    }

    /// Send a whole program.
    ///
    /// Programs longer than the runner's address space are refused before
    /// anything is written.
    ///
    /// On a transport error the remaining packets are not sent and
    /// [`Uploader::state`] reports how far the upload got. The receiver may
    /// then hold a partial program and should be sent CLEAR before retrying.
    pub async fn upload(&mut self, program: &[u8]) -> Result<UploadReport> {
        self.state = UploadState::Idle;
        if program.len() > MAX_PROGRAM_LEN {
            return Err(LinkError::ProgramTooLarge { len: program.len() });
        }
        let total = program.len().div_ceil(CHUNK_SIZE);
        tracing::info!(bytes = program.len(), chunks = total, "starting upload");

        self.send(&Packet::command(Command::Begin)).await?;
        self.state = UploadState::Begun;
        tokio::time::sleep(self.config.settle()).await;

        self.state = UploadState::Transferring;
        for (i, chunk) in chunks(program).enumerate() {
            self.send(&Packet::chunk(chunk)).await?;
            tokio::time::sleep(self.config.inter_packet()).await;

            let sent = i + 1;
            if self.config.reports_progress(sent, total) {
                tracing::info!("sent chunk {sent}/{total}");
            } else {
                tracing::debug!("sent chunk {sent}/{total}");
            }
        }

        self.send(&Packet::command(Command::End)).await?;
        self.state = UploadState::Ended;
        tokio::time::sleep(self.config.settle()).await;

        tracing::info!(bytes = program.len(), chunks = total, "upload complete");
        Ok(UploadReport {
            bytes: program.len(),
            chunks: total,
            state: self.state,
        })
    }

    /// Start the stored program.
    pub async fn run(&mut self) -> Result<()> {
        self.send(&Packet::command(Command::Run)).await
    }

    /// Halt a running program.
    pub async fn stop(&mut self) -> Result<()> {
        self.send(&Packet::command(Command::Stop)).await
    }

    /// Erase the stored program.
    pub async fn clear(&mut self) -> Result<()> {
        self.send(&Packet::command(Command::Clear)).await
    }

    async fn send(&mut self, packet: &Packet) -> Result<()> {
        let framed = frame::encode(&packet.to_bytes());
        let written = match self.transport.write_all(&framed).await {
            Ok(()) => self.transport.flush().await,
            Err(err) => Err(err),
        };

        written.map_err(|source| {
            tracing::error!(packet = %packet.command, state = %self.state, "send failed: {source}");
            LinkError::Transport {
                packet: packet.command,
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> LinkConfig {
        LinkConfig {
            settle_ms: 0,
            inter_packet_ms: 0,
            progress_every: 5,
        }
    }

    #[test]
    fn test_chunk_lengths() {
        let program = vec![0u8; 40];
        let lengths: Vec<usize> = chunks(&program).map(<[u8]>::len).collect();
        assert_eq!(lengths, vec![18, 18, 4]);

        let program = vec![0u8; 36];
        assert_eq!(chunks(&program).len(), 2);
        assert_eq!(chunks(&[]).len(), 0);
    }

    #[test]
    fn test_state_order() {
        assert!(UploadState::Idle < UploadState::Begun);
        assert!(UploadState::Begun < UploadState::Transferring);
        assert!(UploadState::Transferring < UploadState::Ended);
    }

    #[tokio::test]
    async fn test_upload_packet_sequence() {
        let mut uploader = Uploader::new(Vec::new(), quick());
        let report = uploader.upload(&[0x06, 0xFF]).await.unwrap();
        assert_eq!(
            report,
            UploadReport {
                bytes: 2,
                chunks: 1,
                state: UploadState::Ended
            }
        );
        assert_eq!(
            uploader.into_inner(),
            vec![0xC0, 0xA0, 0xC0, 0xC0, 0xB0, 0x06, 0xFF, 0xC0, 0xC0, 0xA1, 0xC0]
        );
    }

    #[tokio::test]
    async fn test_single_packet_commands() {
        let mut uploader = Uploader::new(Vec::new(), quick());
        uploader.run().await.unwrap();
        uploader.stop().await.unwrap();
        uploader.clear().await.unwrap();
        assert_eq!(uploader.state(), UploadState::Idle);
        assert_eq!(
            uploader.get_ref(),
            &vec![0xC0, 0xA2, 0xC0, 0xC0, 0xA3, 0xC0, 0xC0, 0xA4, 0xC0]
        );
    }

    #[tokio::test]
    async fn test_chunk_payload_is_escaped() {
        let mut uploader = Uploader::new(Vec::new(), quick());
        uploader.upload(&[0xC0, 0xDB]).await.unwrap();
        let sent = uploader.into_inner();
        assert_eq!(&sent[3..10], &[0xC0, 0xB0, 0xDB, 0xDC, 0xDB, 0xDD, 0xC0]);
    }
}
