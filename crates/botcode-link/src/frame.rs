//! Delimiter framing with byte stuffing (SLIP)
//!
//! A frame is `END body END`, where any `END` or `ESC` byte in the packet is
//! replaced by `ESC ESC_END` / `ESC ESC_ESC`. The delimiter therefore never
//! appears inside a frame body.

use crate::error::FrameError;

pub const END: u8 = 0xC0;
pub const ESC: u8 = 0xDB;
pub const ESC_END: u8 = 0xDC;
pub const ESC_ESC: u8 = 0xDD;

/// Frame a packet.
pub fn encode(packet: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(packet.len() + 2);
    encode_into(packet, &mut out);
    out
}

/// Frame a packet, appending to `out`.
pub fn encode_into(packet: &[u8], out: &mut Vec<u8>) {
    out.push(END);
    for &byte in packet {
        match byte {
            END => out.extend_from_slice(&[ESC, ESC_END]),
            ESC => out.extend_from_slice(&[ESC, ESC_ESC]),
            other => out.push(other),
        }
    }
    out.push(END);
}

/// Incremental de-framer for a received byte stream.
///
/// Feed bytes with [`FrameDecoder::push`]; each call returns the frames
/// completed by those bytes. Empty frames (back-to-back delimiters) are
/// dropped. A bad escape poisons the current frame, which is reported once
/// its closing delimiter arrives; decoding resumes with the next frame.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    current: Vec<u8>,
    escaped: bool,
    error: Option<FrameError>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<Vec<u8>, FrameError>> {
        let mut frames = Vec::new();
        for &byte in bytes {
            if let Some(frame) = self.push_byte(byte) {
                frames.push(frame);
            }
        }
        frames
    }

    fn push_byte(&mut self, byte: u8) -> Option<Result<Vec<u8>, FrameError>> {
        if byte == END {
            let error = self.error.take();
            let dangling = std::mem::take(&mut self.escaped);
            let frame = std::mem::take(&mut self.current);
            return match (error, dangling) {
                (Some(err), _) => Some(Err(err)),
                (None, true) => Some(Err(FrameError::DanglingEscape)),
                (None, false) if frame.is_empty() => None,
                (None, false) => Some(Ok(frame)),
            };
        }

        if self.error.is_some() {
            return None;
        }

        if self.escaped {
            self.escaped = false;
            match byte {
                ESC_END => self.current.push(END),
                ESC_ESC => self.current.push(ESC),
                other => self.error = Some(FrameError::InvalidEscape(other)),
            }
        } else if byte == ESC {
            self.escaped = true;
        } else {
            self.current.push(byte);
        }
        None
    }

    /// Bytes received since the last delimiter
    pub fn pending(&self) -> usize {
        self.current.len()
    }
}

/// Inverse of [`encode`] for exactly one frame.
///
/// Unlike [`FrameDecoder`], an empty frame is kept: `[END, END]` decodes to
/// an empty packet.
pub fn decode(frame: &[u8]) -> Result<Vec<u8>, FrameError> {
    let body = frame
        .strip_prefix(&[END])
        .and_then(|rest| rest.strip_suffix(&[END]))
        .ok_or(FrameError::MissingDelimiter)?;

    let mut packet = Vec::with_capacity(body.len());
    let mut bytes = body.iter().enumerate();
    while let Some((offset, &byte)) = bytes.next() {
        match byte {
            END => return Err(FrameError::StrayDelimiter(offset + 1)),
            ESC => match bytes.next() {
                Some((_, &ESC_END)) => packet.push(END),
                Some((_, &ESC_ESC)) => packet.push(ESC),
                Some((_, &other)) => return Err(FrameError::InvalidEscape(other)),
                None => return Err(FrameError::DanglingEscape),
            },
            other => packet.push(other),
        }
    }
    Ok(packet)
}

/// De-frame a complete capture, returning every well-formed frame.
pub fn decode_all(bytes: &[u8]) -> Vec<Result<Vec<u8>, FrameError>> {
    FrameDecoder::new().push(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_encode_plain() {
        assert_eq!(encode(&[0xA0]), vec![END, 0xA0, END]);
        assert_eq!(encode(&[]), vec![END, END]);
    }

    #[test]
    fn test_encode_escapes() {
        assert_eq!(
            encode(&[0x01, END, 0x02, ESC, 0x03]),
            vec![END, 0x01, ESC, ESC_END, 0x02, ESC, ESC_ESC, 0x03, END]
        );
        // The continuation codes themselves are not special
        assert_eq!(encode(&[ESC_END, ESC_ESC]), vec![END, ESC_END, ESC_ESC, END]);
    }

    #[test]
    fn test_decoder_across_pushes() {
        let framed = encode(&[0xB0, END, ESC, 0x07]);
        let mut decoder = FrameDecoder::new();
        let (head, tail) = framed.split_at(3);
        assert!(decoder.push(head).is_empty());
        assert_eq!(decoder.pending(), 1);
        let frames = decoder.push(tail);
        assert_eq!(frames, vec![Ok(vec![0xB0, END, ESC, 0x07])]);
    }

    #[test]
    fn test_decoder_skips_empty_frames() {
        let mut stream = encode(&[0xA0]);
        stream.extend(encode(&[0xA1]));
        // Shared delimiter between frames plus stray idle delimiters
        let frames = decode_all(&[&[END, END][..], &stream[..]].concat());
        assert_eq!(frames, vec![Ok(vec![0xA0]), Ok(vec![0xA1])]);
    }

    #[test]
    fn test_decoder_recovers_after_bad_escape() {
        let mut stream = vec![END, 0x01, ESC, 0x55, 0x02, END];
        stream.extend(encode(&[0xA2]));
        stream.extend([END, 0x03, ESC, END]);
        let frames = decode_all(&stream);
        assert_eq!(
            frames,
            vec![
                Err(FrameError::InvalidEscape(0x55)),
                Ok(vec![0xA2]),
                Err(FrameError::DanglingEscape),
            ]
        );
    }

    #[test]
    fn test_round_trip_random_payloads() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let len = rng.gen_range(0..64);
            // Bias towards the special bytes
            let packet: Vec<u8> = (0..len)
                .map(|_| match rng.gen_range(0..4) {
                    0 => END,
                    1 => ESC,
                    _ => rng.gen(),
                })
                .collect();

            let framed = encode(&packet);
            assert_eq!(framed.first(), Some(&END));
            assert_eq!(framed.last(), Some(&END));
            assert!(!framed[1..framed.len() - 1].contains(&END));

            assert_eq!(decode(&framed), Ok(packet));
        }
    }

    #[test]
    fn test_decode_keeps_empty_packet() {
        assert_eq!(decode(&encode(&[])), Ok(Vec::new()));
        // The streaming decoder treats the same bytes as idle line noise
        assert!(decode_all(&encode(&[])).is_empty());
    }

    #[test]
    fn test_decode_rejects_malformed_frames() {
        assert_eq!(decode(&[0xA0]), Err(FrameError::MissingDelimiter));
        assert_eq!(decode(&[END]), Err(FrameError::MissingDelimiter));
        assert_eq!(decode(&[END, 0xA0]), Err(FrameError::MissingDelimiter));
        assert_eq!(decode(&[END, 0xA0, END, 0xA1, END]), Err(FrameError::StrayDelimiter(2)));
        assert_eq!(decode(&[END, ESC, 0x01, END]), Err(FrameError::InvalidEscape(0x01)));
        assert_eq!(decode(&[END, 0xA0, ESC, END]), Err(FrameError::DanglingEscape));
    }
}
