//! Lossless compression for sparse-coverage count vectors.
//!
//! Most CpG sites in a typical sample have no coverage at all, and most
//! covered sites have single-digit counts, so the frame stores a 2-bit tag
//! per pair followed by variable-width bodies:
//!
//! | tag | meaning | body |
//! |---|---|---|
//! | 0 | both counts zero | none |
//! | 1 | both fit in one byte | 2 × u8 |
//! | 2 | both fit in two bytes | 2 × u16 LE |
//! | 3 | combined 32-bit form | u32 LE, meth in the high half |
//!
//! Tag bytes pack four tags each, pair `i` at bits `2*(i % 4)`, and come
//! before all bodies. The encoder never emits tag 3 (u16 pairs always fit
//! tag 2); the decoder accepts it for forward compatibility.
//!
//! A frame is `[codec id u8][raw byte length u64 LE][CRC-32 u32 LE][stream]`
//! where the CRC covers the raw little-endian pair bytes. Codec id 0x01 is
//! the tag/body scheme above; 0x00 is a stored frame whose stream is the
//! raw pair bytes verbatim.

use byteorder::{ByteOrder, LittleEndian};
use flate2::Crc;

use crate::data::MethCounts;
use crate::errors::MethylomeError;

pub const CODEC_STORED: u8 = 0x00;
pub const CODEC_PACKED: u8 = 0x01;

const FRAME_HEADER_SIZE: usize = 1 + 8 + 4;

const TAG_ZERO: u8 = 0;
const TAG_SMALL: u8 = 1;
const TAG_MEDIUM: u8 = 2;
const TAG_WIDE: u8 = 3;

fn crc_of_pairs(pairs: &[MethCounts]) -> u32 {
    let mut crc = Crc::new();
    let mut buf = [0u8; 4 * 1024];
    for chunk in pairs.chunks(buf.len() / 4) {
        for (i, pair) in chunk.iter().enumerate() {
            buf[4 * i..4 * i + 2].copy_from_slice(&pair.n_meth.to_le_bytes());
            buf[4 * i + 2..4 * i + 4].copy_from_slice(&pair.n_unmeth.to_le_bytes());
        }
        crc.update(&buf[..4 * chunk.len()]);
    }
    crc.sum()
}

/// Encode pairs into a complete packed frame.
pub fn encode(pairs: &[MethCounts]) -> Vec<u8> {
    let n = pairs.len();
    let n_tag_bytes = n.div_ceil(4);

    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + n_tag_bytes + 2 * n);
    frame.push(CODEC_PACKED);
    let mut len_bytes = [0u8; 8];
    LittleEndian::write_u64(&mut len_bytes, 4 * n as u64);
    frame.extend_from_slice(&len_bytes);
    let mut crc_bytes = [0u8; 4];
    LittleEndian::write_u32(&mut crc_bytes, crc_of_pairs(pairs));
    frame.extend_from_slice(&crc_bytes);

    let tags_at = frame.len();
    frame.resize(tags_at + n_tag_bytes, 0);
    for (i, pair) in pairs.iter().enumerate() {
        let tag = if !pair.is_covered() {
            TAG_ZERO
        } else if pair.n_meth <= u8::MAX as u16 && pair.n_unmeth <= u8::MAX as u16 {
            TAG_SMALL
        } else {
            TAG_MEDIUM
        };
        frame[tags_at + i / 4] |= tag << (2 * (i % 4));
        match tag {
            TAG_SMALL => {
                frame.push(pair.n_meth as u8);
                frame.push(pair.n_unmeth as u8);
            }
            TAG_MEDIUM => {
                frame.extend_from_slice(&pair.n_meth.to_le_bytes());
                frame.extend_from_slice(&pair.n_unmeth.to_le_bytes());
            }
            _ => {}
        }
    }
    frame
}

/// Decode a complete frame back into pairs, validating the recorded length
/// and CRC.
pub fn decode(frame: &[u8]) -> Result<Vec<MethCounts>, MethylomeError> {
    if frame.len() < FRAME_HEADER_SIZE {
        return Err(MethylomeError::CorruptFrame(format!(
            "frame shorter than header: {} bytes",
            frame.len()
        )));
    }
    let codec_id = frame[0];
    let raw_len = LittleEndian::read_u64(&frame[1..9]);
    let crc_expected = LittleEndian::read_u32(&frame[9..13]);
    let stream = &frame[FRAME_HEADER_SIZE..];

    if raw_len % 4 != 0 {
        return Err(MethylomeError::CorruptFrame(format!(
            "raw length {} is not a whole number of pairs",
            raw_len
        )));
    }
    let n = (raw_len / 4) as usize;

    let pairs = match codec_id {
        CODEC_STORED => decode_stored(stream, n)?,
        CODEC_PACKED => decode_packed(stream, n)?,
        other => return Err(MethylomeError::UnknownCodec(other)),
    };

    if pairs.len() != n {
        return Err(MethylomeError::LengthMismatch {
            expected: raw_len,
            found: 4 * pairs.len() as u64,
        });
    }
    if crc_of_pairs(&pairs) != crc_expected {
        return Err(MethylomeError::CrcMismatch);
    }
    Ok(pairs)
}

fn decode_stored(stream: &[u8], n: usize) -> Result<Vec<MethCounts>, MethylomeError> {
    if stream.len() != 4 * n {
        return Err(MethylomeError::LengthMismatch {
            expected: 4 * n as u64,
            found: stream.len() as u64,
        });
    }
    Ok(stream
        .chunks_exact(4)
        .map(|c| MethCounts {
            n_meth: u16::from_le_bytes([c[0], c[1]]),
            n_unmeth: u16::from_le_bytes([c[2], c[3]]),
        })
        .collect())
}

fn decode_packed(stream: &[u8], n: usize) -> Result<Vec<MethCounts>, MethylomeError> {
    let n_tag_bytes = n.div_ceil(4);
    if stream.len() < n_tag_bytes {
        return Err(MethylomeError::CorruptFrame(format!(
            "tag area truncated: {} bytes for {} pairs",
            stream.len(),
            n
        )));
    }
    let (tags, bodies) = stream.split_at(n_tag_bytes);

    let mut pairs = Vec::with_capacity(n);
    let mut at = 0usize;
    for i in 0..n {
        let tag = (tags[i / 4] >> (2 * (i % 4))) & 0b11;
        let pair = match tag {
            TAG_ZERO => MethCounts::default(),
            TAG_SMALL => {
                let body = bodies
                    .get(at..at + 2)
                    .ok_or_else(|| MethylomeError::CorruptFrame(body_truncated(i)))?;
                at += 2;
                MethCounts {
                    n_meth: body[0] as u16,
                    n_unmeth: body[1] as u16,
                }
            }
            TAG_MEDIUM => {
                let body = bodies
                    .get(at..at + 4)
                    .ok_or_else(|| MethylomeError::CorruptFrame(body_truncated(i)))?;
                at += 4;
                MethCounts {
                    n_meth: u16::from_le_bytes([body[0], body[1]]),
                    n_unmeth: u16::from_le_bytes([body[2], body[3]]),
                }
            }
            TAG_WIDE => {
                let body = bodies
                    .get(at..at + 4)
                    .ok_or_else(|| MethylomeError::CorruptFrame(body_truncated(i)))?;
                at += 4;
                let combined = LittleEndian::read_u32(body);
                MethCounts {
                    n_meth: (combined >> 16) as u16,
                    n_unmeth: combined as u16,
                }
            }
            _ => unreachable!("two-bit tag"),
        };
        pairs.push(pair);
    }
    if at != bodies.len() {
        return Err(MethylomeError::CorruptFrame(format!(
            "{} trailing body bytes",
            bodies.len() - at
        )));
    }
    Ok(pairs)
}

fn body_truncated(pair_index: usize) -> String {
    format!("body truncated at pair {}", pair_index)
}
