//! Request header and query payload framing.
//!
//! Header layout (little-endian, zero-padded to 256 bytes):
//!
//! | bytes | field |
//! |---|---|
//! | 0..4 | request type |
//! | 4..12 | index hash |
//! | 12..16 | aux: interval count for interval requests, bin size for bins |
//! | 16..256 | methylome names, NUL-delimited UTF-8 |
//!
//! A name region without any delimiter is a single name. The payload of an
//! interval request is `aux` pairs of u32 ordinals `[lo, hi)`, sorted
//! ascending by `lo`; bin requests have no payload.

use byteorder::{ByteOrder, LittleEndian};

use methq_index::OffsetRange;

use crate::HEADER_SIZE;
use crate::errors::ProtocolError;

const NAMES_AT: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RequestType {
    Intervals = 0,
    IntervalsCovered = 1,
    Bins = 2,
    BinsCovered = 3,
}

impl RequestType {
    pub fn from_u32(value: u32) -> Option<RequestType> {
        match value {
            0 => Some(RequestType::Intervals),
            1 => Some(RequestType::IntervalsCovered),
            2 => Some(RequestType::Bins),
            3 => Some(RequestType::BinsCovered),
            _ => None,
        }
    }

    pub fn is_intervals(self) -> bool {
        matches!(self, RequestType::Intervals | RequestType::IntervalsCovered)
    }

    pub fn is_covered(self) -> bool {
        matches!(
            self,
            RequestType::IntervalsCovered | RequestType::BinsCovered
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub rq_type: RequestType,
    pub index_hash: u64,
    /// Interval count for interval requests, bin size in bp for bins.
    pub aux: u32,
    pub methylome_names: Vec<String>,
}

impl RequestHeader {
    pub fn encode(&self) -> Result<[u8; HEADER_SIZE], ProtocolError> {
        if self.methylome_names.is_empty() {
            return Err(ProtocolError::NoNames);
        }
        let names_len: usize = self
            .methylome_names
            .iter()
            .map(|n| n.len())
            .sum::<usize>()
            + self.methylome_names.len()
            - 1;
        if names_len > HEADER_SIZE - NAMES_AT {
            return Err(ProtocolError::NamesTooLong);
        }

        let mut buf = [0u8; HEADER_SIZE];
        LittleEndian::write_u32(&mut buf[0..4], self.rq_type as u32);
        LittleEndian::write_u64(&mut buf[4..12], self.index_hash);
        LittleEndian::write_u32(&mut buf[12..16], self.aux);
        let mut at = NAMES_AT;
        for (i, name) in self.methylome_names.iter().enumerate() {
            if i > 0 {
                at += 1; // the padding byte already holds the NUL
            }
            buf[at..at + name.len()].copy_from_slice(name.as_bytes());
            at += name.len();
        }
        Ok(buf)
    }

    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Result<Self, ProtocolError> {
        let raw_type = LittleEndian::read_u32(&buf[0..4]);
        let rq_type =
            RequestType::from_u32(raw_type).ok_or(ProtocolError::InvalidRequestType(raw_type))?;
        let index_hash = LittleEndian::read_u64(&buf[4..12]);
        let aux = LittleEndian::read_u32(&buf[12..16]);

        let mut methylome_names = Vec::new();
        for segment in buf[NAMES_AT..].split(|&b| b == 0) {
            if segment.is_empty() {
                break;
            }
            let name = std::str::from_utf8(segment).map_err(|_| ProtocolError::NameNotUtf8)?;
            methylome_names.push(name.to_string());
        }
        if methylome_names.is_empty() {
            return Err(ProtocolError::NoNames);
        }

        Ok(RequestHeader {
            rq_type,
            index_hash,
            aux,
            methylome_names,
        })
    }
}

/// Encode an interval query as the wire payload.
pub fn encode_query(query: &[OffsetRange]) -> Vec<u8> {
    let mut bytes = vec![0u8; 8 * query.len()];
    for (i, range) in query.iter().enumerate() {
        LittleEndian::write_u32(&mut bytes[8 * i..8 * i + 4], range.start);
        LittleEndian::write_u32(&mut bytes[8 * i + 4..8 * i + 8], range.stop);
    }
    bytes
}

/// Decode and validate an interval query payload: exactly `n` ranges, each
/// `[lo, hi)` with `lo <= hi`, sorted ascending by `lo`.
pub fn decode_query(bytes: &[u8], n: u32) -> Result<Vec<OffsetRange>, ProtocolError> {
    let expected = 8 * n as usize;
    if bytes.len() != expected {
        return Err(ProtocolError::PayloadTruncated {
            expected,
            found: bytes.len(),
        });
    }
    let mut query = Vec::with_capacity(n as usize);
    let mut prev_start = 0u32;
    for chunk in bytes.chunks_exact(8) {
        let start = LittleEndian::read_u32(&chunk[0..4]);
        let stop = LittleEndian::read_u32(&chunk[4..8]);
        if stop < start {
            return Err(ProtocolError::BackwardsRange { start, stop });
        }
        if start < prev_start {
            return Err(ProtocolError::UnsortedQuery);
        }
        prev_start = start;
        query.push(OffsetRange { start, stop });
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn header(names: &[&str]) -> RequestHeader {
        RequestHeader {
            rq_type: RequestType::IntervalsCovered,
            index_hash: 0xdead_beef_0042,
            aux: 17,
            methylome_names: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    #[rstest]
    fn test_header_round_trip_single_name() {
        let hdr = header(&["SRX1234"]);
        let buf = hdr.encode().unwrap();
        assert_eq!(RequestHeader::decode(&buf).unwrap(), hdr);
    }

    #[rstest]
    fn test_header_round_trip_many_names() {
        let hdr = header(&["SRX1", "SRX2", "SRX3"]);
        let buf = hdr.encode().unwrap();
        assert_eq!(RequestHeader::decode(&buf).unwrap(), hdr);
    }

    #[rstest]
    fn test_header_is_zero_padded() {
        let buf = header(&["SRX1"]).encode().unwrap();
        assert_eq!(buf.len(), HEADER_SIZE);
        assert!(buf[NAMES_AT + 4..].iter().all(|&b| b == 0));
    }

    #[rstest]
    fn test_duplicates_are_preserved() {
        let hdr = header(&["SRX1", "SRX1"]);
        let buf = hdr.encode().unwrap();
        assert_eq!(
            RequestHeader::decode(&buf).unwrap().methylome_names,
            vec!["SRX1", "SRX1"]
        );
    }

    #[rstest]
    fn test_invalid_type_rejected() {
        let mut buf = header(&["SRX1"]).encode().unwrap();
        LittleEndian::write_u32(&mut buf[0..4], 99);
        assert!(matches!(
            RequestHeader::decode(&buf),
            Err(ProtocolError::InvalidRequestType(99))
        ));
    }

    #[rstest]
    fn test_empty_names_rejected() {
        let hdr = header(&[]);
        assert!(matches!(hdr.encode(), Err(ProtocolError::NoNames)));

        let mut buf = [0u8; HEADER_SIZE];
        LittleEndian::write_u32(&mut buf[0..4], 0);
        assert!(matches!(
            RequestHeader::decode(&buf),
            Err(ProtocolError::NoNames)
        ));
    }

    #[rstest]
    fn test_names_overflowing_header_rejected() {
        let long = "x".repeat(HEADER_SIZE);
        let hdr = header(&[long.as_str()]);
        assert!(matches!(hdr.encode(), Err(ProtocolError::NamesTooLong)));
    }

    #[rstest]
    fn test_query_round_trip() {
        let query = vec![
            OffsetRange { start: 0, stop: 5 },
            OffsetRange { start: 5, stop: 5 },
            OffsetRange {
                start: 9,
                stop: 120,
            },
        ];
        let bytes = encode_query(&query);
        assert_eq!(bytes.len(), 24);
        assert_eq!(decode_query(&bytes, 3).unwrap(), query);
    }

    #[rstest]
    fn test_query_unsorted_rejected() {
        let bytes = encode_query(&[
            OffsetRange { start: 9, stop: 12 },
            OffsetRange { start: 0, stop: 5 },
        ]);
        assert!(matches!(
            decode_query(&bytes, 2),
            Err(ProtocolError::UnsortedQuery)
        ));
    }

    #[rstest]
    fn test_query_backwards_range_rejected() {
        let bytes = encode_query(&[OffsetRange { start: 9, stop: 2 }]);
        assert!(matches!(
            decode_query(&bytes, 1),
            Err(ProtocolError::BackwardsRange { start: 9, stop: 2 })
        ));
    }

    #[rstest]
    fn test_query_length_mismatch_rejected() {
        let bytes = encode_query(&[OffsetRange { start: 0, stop: 2 }]);
        assert!(matches!(
            decode_query(&bytes, 2),
            Err(ProtocolError::PayloadTruncated { .. })
        ));
    }
}
