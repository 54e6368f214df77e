//! Response header and level payload framing.
//!
//! Header layout (little-endian, zero-padded to 256 bytes): status code in
//! bytes 0..4, per-methylome element count in bytes 4..8. On success the
//! body is one level vector per requested methylome, in request order;
//! elements are 8 bytes plain or 12 bytes with the covered count.

use byteorder::{ByteOrder, LittleEndian};

use methq_methylome::{Level, LevelCovered, LevelsPayload};

use crate::HEADER_SIZE;
use crate::errors::ProtocolError;
use crate::status::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub status: Status,
    /// Number of level elements per methylome in the body.
    pub response_size: u32,
}

impl ResponseHeader {
    pub fn error(status: Status) -> Self {
        ResponseHeader {
            status,
            response_size: 0,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        LittleEndian::write_u32(&mut buf[0..4], self.status as u32);
        LittleEndian::write_u32(&mut buf[4..8], self.response_size);
        buf
    }

    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Result<Self, ProtocolError> {
        let raw_status = LittleEndian::read_u32(&buf[0..4]);
        let status =
            Status::from_u32(raw_status).ok_or(ProtocolError::UnknownStatus(raw_status))?;
        let response_size = LittleEndian::read_u32(&buf[4..8]);
        Ok(ResponseHeader {
            status,
            response_size,
        })
    }
}

/// Serialize one methylome's levels as wire bytes.
pub fn encode_levels(payload: &LevelsPayload) -> Vec<u8> {
    match payload {
        LevelsPayload::Plain(levels) => {
            let mut bytes = vec![0u8; 8 * levels.len()];
            for (i, level) in levels.iter().enumerate() {
                LittleEndian::write_u32(&mut bytes[8 * i..8 * i + 4], level.n_meth);
                LittleEndian::write_u32(&mut bytes[8 * i + 4..8 * i + 8], level.n_unmeth);
            }
            bytes
        }
        LevelsPayload::Covered(levels) => {
            let mut bytes = vec![0u8; 12 * levels.len()];
            for (i, level) in levels.iter().enumerate() {
                LittleEndian::write_u32(&mut bytes[12 * i..12 * i + 4], level.n_meth);
                LittleEndian::write_u32(&mut bytes[12 * i + 4..12 * i + 8], level.n_unmeth);
                LittleEndian::write_u32(&mut bytes[12 * i + 8..12 * i + 12], level.n_covered);
            }
            bytes
        }
    }
}

/// Deserialize one methylome's levels: exactly `n` elements of the form
/// the request type asked for.
pub fn decode_levels(bytes: &[u8], n: u32, covered: bool) -> Result<LevelsPayload, ProtocolError> {
    let element_size = if covered { 12 } else { 8 };
    let expected = element_size * n as usize;
    if bytes.len() != expected {
        return Err(ProtocolError::PayloadTruncated {
            expected,
            found: bytes.len(),
        });
    }
    if covered {
        let levels = bytes
            .chunks_exact(12)
            .map(|c| LevelCovered {
                n_meth: LittleEndian::read_u32(&c[0..4]),
                n_unmeth: LittleEndian::read_u32(&c[4..8]),
                n_covered: LittleEndian::read_u32(&c[8..12]),
            })
            .collect();
        Ok(LevelsPayload::Covered(levels))
    } else {
        let levels = bytes
            .chunks_exact(8)
            .map(|c| Level {
                n_meth: LittleEndian::read_u32(&c[0..4]),
                n_unmeth: LittleEndian::read_u32(&c[4..8]),
            })
            .collect();
        Ok(LevelsPayload::Plain(levels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_header_round_trip() {
        let hdr = ResponseHeader {
            status: Status::Ok,
            response_size: 1234,
        };
        let buf = hdr.encode();
        assert_eq!(ResponseHeader::decode(&buf).unwrap(), hdr);
    }

    #[rstest]
    fn test_error_header_has_no_size() {
        let hdr = ResponseHeader::error(Status::MethylomeNotFound);
        assert_eq!(hdr.response_size, 0);
        let back = ResponseHeader::decode(&hdr.encode()).unwrap();
        assert_eq!(back.status, Status::MethylomeNotFound);
    }

    #[rstest]
    fn test_unknown_status_rejected() {
        let mut buf = [0u8; HEADER_SIZE];
        LittleEndian::write_u32(&mut buf[0..4], 77);
        assert!(matches!(
            ResponseHeader::decode(&buf),
            Err(ProtocolError::UnknownStatus(77))
        ));
    }

    #[rstest]
    fn test_plain_levels_round_trip() {
        let payload = LevelsPayload::Plain(vec![
            Level {
                n_meth: 10,
                n_unmeth: 5,
            },
            Level {
                n_meth: 0,
                n_unmeth: 0,
            },
        ]);
        let bytes = encode_levels(&payload);
        assert_eq!(bytes.len(), 16);
        assert_eq!(decode_levels(&bytes, 2, false).unwrap(), payload);
    }

    #[rstest]
    fn test_covered_levels_round_trip() {
        let payload = LevelsPayload::Covered(vec![LevelCovered {
            n_meth: 3,
            n_unmeth: 3,
            n_covered: 1,
        }]);
        let bytes = encode_levels(&payload);
        assert_eq!(bytes.len(), 12);
        assert_eq!(decode_levels(&bytes, 1, true).unwrap(), payload);
    }

    #[rstest]
    fn test_truncated_levels_rejected() {
        let payload = LevelsPayload::Plain(vec![Level::default(); 3]);
        let bytes = encode_levels(&payload);
        assert!(matches!(
            decode_levels(&bytes[..20], 3, false),
            Err(ProtocolError::PayloadTruncated { .. })
        ));
    }
}
