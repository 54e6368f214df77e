//! Remote query client.
//!
//! One request per connection, blocking I/O: connect, send the framed
//! request, read the response header, then the per-methylome level
//! vectors. Any non-OK status is surfaced as an error and no partial
//! output escapes.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use methq_index::OffsetRange;
use methq_methylome::LevelsPayload;

use crate::HEADER_SIZE;
use crate::errors::ClientError;
use crate::request::{RequestHeader, RequestType, encode_query};
use crate::response::{ResponseHeader, decode_levels};

pub struct QueryClient {
    pub hostname: String,
    pub port: u16,
    pub timeout: Duration,
}

impl QueryClient {
    pub fn new(hostname: &str, port: u16) -> Self {
        QueryClient {
            hostname: hostname.to_string(),
            port,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Query per-interval levels for each named methylome. The query must
    /// already be in global ordinal space (see `GenomeIndex::make_query`)
    /// and sorted ascending.
    pub fn intervals(
        &self,
        index_hash: u64,
        methylome_names: &[String],
        query: &[OffsetRange],
        covered: bool,
    ) -> Result<Vec<LevelsPayload>, ClientError> {
        let header = RequestHeader {
            rq_type: if covered {
                RequestType::IntervalsCovered
            } else {
                RequestType::Intervals
            },
            index_hash,
            aux: query.len() as u32,
            methylome_names: methylome_names.to_vec(),
        };
        self.roundtrip(&header, &encode_query(query), covered)
    }

    /// Query genome-wide bin levels for each named methylome.
    pub fn bins(
        &self,
        index_hash: u64,
        methylome_names: &[String],
        bin_size: u32,
        covered: bool,
    ) -> Result<Vec<LevelsPayload>, ClientError> {
        let header = RequestHeader {
            rq_type: if covered {
                RequestType::BinsCovered
            } else {
                RequestType::Bins
            },
            index_hash,
            aux: bin_size,
            methylome_names: methylome_names.to_vec(),
        };
        self.roundtrip(&header, &[], covered)
    }

    fn roundtrip(
        &self,
        header: &RequestHeader,
        payload: &[u8],
        covered: bool,
    ) -> Result<Vec<LevelsPayload>, ClientError> {
        let mut stream = TcpStream::connect((self.hostname.as_str(), self.port))?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        stream.write_all(&header.encode()?)?;
        stream.write_all(payload)?;

        let mut response_buf = [0u8; HEADER_SIZE];
        stream.read_exact(&mut response_buf)?;
        let response = ResponseHeader::decode(&response_buf)?;
        if !response.status.is_ok() {
            return Err(ClientError::Status(response.status));
        }

        let element_size = if covered { 12 } else { 8 };
        let body_size = element_size * response.response_size as usize;
        let mut results = Vec::with_capacity(header.methylome_names.len());
        let mut body = vec![0u8; body_size];
        for _ in 0..header.methylome_names.len() {
            stream.read_exact(&mut body)?;
            results.push(decode_levels(&body, response.response_size, covered)?);
        }
        Ok(results)
    }
}
