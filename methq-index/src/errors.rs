use thiserror::Error;

/// Error type for genome index operations.
#[derive(Error, Debug)]
pub enum IndexError {
    /// IO error occurred during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata sidecar failed to parse or carries inconsistent fields.
    #[error("Bad index metadata: {0}")]
    BadMetadata(String),

    /// Data fingerprint does not match the metadata.
    #[error("Index hash mismatch: expected {expected}, found {found}")]
    HashMismatch { expected: u64, found: u64 },

    /// Interval names a chromosome the index does not have.
    #[error("Unknown chromosome: {0}")]
    UnknownChrom(String),

    /// Interval stop runs past the end of its chromosome.
    #[error("Interval {chrom}:{start}-{stop} past end of chromosome (size {chrom_size})")]
    IntervalPastEnd {
        chrom: String,
        start: u32,
        stop: u32,
        chrom_size: u32,
    },

    /// Intervals supplied to the query path are not sorted by
    /// (chromosome, start).
    #[error("Intervals are not sorted by (chromosome, start)")]
    UnsortedIntervals,

    /// Data file size disagrees with the CpG counts in the metadata.
    #[error("Index data truncated: expected {expected} bytes, found {found}")]
    DataTruncated { expected: u64, found: u64 },
}

impl From<serde_json::Error> for IndexError {
    fn from(e: serde_json::Error) -> Self {
        IndexError::BadMetadata(e.to_string())
    }
}
