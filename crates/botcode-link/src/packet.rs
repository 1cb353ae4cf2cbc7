//! Command packets understood by the program runner

use std::fmt;

/// Packet command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Start receiving a new program; discards any partial one.
    Begin = 0xA0,
    /// All chunks sent.
    End = 0xA1,
    Run = 0xA2,
    Stop = 0xA3,
    /// Erase the stored program.
    Clear = 0xA4,
    /// A slice of program bytes follows.
    Chunk = 0xB0,
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Command::Begin => "BEGIN",
            Command::End => "END",
            Command::Run => "RUN",
            Command::Stop => "STOP",
            Command::Clear => "CLEAR",
            Command::Chunk => "CHUNK",
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0xA0 => Ok(Command::Begin),
            0xA1 => Ok(Command::End),
            0xA2 => Ok(Command::Run),
            0xA3 => Ok(Command::Stop),
            0xA4 => Ok(Command::Clear),
            0xB0 => Ok(Command::Chunk),
            other => Err(other),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One command byte and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub command: Command,
    pub payload: Vec<u8>,
}

impl Packet {
    /// A packet with no payload
    pub fn command(command: Command) -> Self {
        Self {
            command,
            payload: Vec::new(),
        }
    }

    pub fn chunk(bytes: &[u8]) -> Self {
        Self {
            command: Command::Chunk,
            payload: bytes.to_vec(),
        }
    }

    /// Unframed wire bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.payload.len());
        bytes.push(self.command as u8);
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Interpret de-framed bytes as a packet. Unknown command bytes and
    /// empty input give `None`.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let (&first, payload) = bytes.split_first()?;
        let command = Command::try_from(first).ok()?;
        Some(Self {
            command,
            payload: payload.to_vec(),
        })
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.payload.is_empty() {
            write!(f, "{}", self.command)
        } else {
            write!(f, "{} [{} bytes] {:02X?}", self.command, self.payload.len(), self.payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bytes() {
        assert_eq!(Packet::command(Command::Begin).to_bytes(), vec![0xA0]);
        assert_eq!(Packet::command(Command::Clear).to_bytes(), vec![0xA4]);
        assert_eq!(Packet::chunk(&[1, 2, 3]).to_bytes(), vec![0xB0, 1, 2, 3]);
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            Packet::parse(&[0xB0, 0x06, 0xFF]),
            Some(Packet::chunk(&[0x06, 0xFF]))
        );
        assert_eq!(Packet::parse(&[0xA2]), Some(Packet::command(Command::Run)));
        assert_eq!(Packet::parse(&[0x42]), None);
        assert_eq!(Packet::parse(&[]), None);
    }
}
