use thiserror::Error;

/// Error type for methylome operations.
#[derive(Error, Debug)]
pub enum MethylomeError {
    /// IO error occurred during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata sidecar failed to parse or carries inconsistent fields.
    #[error("Bad methylome metadata: {0}")]
    BadMetadata(String),

    /// Data length disagrees with the metadata or the paired file.
    #[error("Methylome length mismatch: expected {expected} bytes, found {found}")]
    LengthMismatch { expected: u64, found: u64 },

    /// Data fingerprint does not match the metadata.
    #[error("Methylome hash mismatch: expected {expected}, found {found}")]
    HashMismatch { expected: u64, found: u64 },

    /// Methylome is bound to a different genome index.
    #[error("Index hash mismatch: expected {expected}, found {found}")]
    IndexMismatch { expected: u64, found: u64 },

    /// Compressed frame is structurally invalid.
    #[error("Corrupt frame: {0}")]
    CorruptFrame(String),

    /// Frame CRC does not match the decoded pairs.
    #[error("Frame CRC mismatch")]
    CrcMismatch,

    /// Codec id byte names a codec this build does not know.
    #[error("Unknown codec id: {0:#x}")]
    UnknownCodec(u8),

    /// Counts input file disagrees with the index it is formatted against.
    #[error("Counts file inconsistent with index: {0}")]
    InconsistentCounts(String),
}

impl From<serde_json::Error> for MethylomeError {
    fn from(e: serde_json::Error) -> Self {
        MethylomeError::BadMetadata(e.to_string())
    }
}
