use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use methq_index::GenomeIndexMetadata;

use crate::data::MethylomeData;
use crate::errors::MethylomeError;

/// Metadata sidecar for a methylome, serialized to `<name>.m16.json`.
///
/// `index_hash` pins the methylome to the exact genome index it was built
/// against; `methylome_hash` fingerprints the count pairs themselves.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MethylomeMetadata {
    /// Version of the metadata format
    pub version: String,
    /// Creation timestamp, RFC 3339
    pub creation_time: String,
    /// Host the methylome was formatted on
    pub host: String,
    /// User that formatted the methylome
    pub user: String,
    /// Assembly name of the genome index this methylome is laid out on
    pub assembly: String,
    /// Content fingerprint of the genome index
    pub index_hash: u64,
    /// Content fingerprint of the raw count-pair bytes
    pub methylome_hash: u64,
    /// Number of count pairs
    pub n_cpgs: u32,
    /// Whether the data file holds a codec frame instead of raw pairs
    pub is_compressed: bool,
}

impl MethylomeMetadata {
    /// Build metadata for freshly formatted data, stamping provenance from
    /// the environment.
    pub fn from_parts(
        index_meta: &GenomeIndexMetadata,
        data: &MethylomeData,
        is_compressed: bool,
    ) -> Self {
        MethylomeMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            creation_time: chrono::Utc::now().to_rfc3339(),
            host: methq_core::utils::local_hostname(),
            user: methq_core::utils::local_username(),
            assembly: index_meta.assembly.clone(),
            index_hash: index_meta.index_hash,
            methylome_hash: data.hash(),
            n_cpgs: data.len() as u32,
            is_compressed,
        }
    }

    pub fn read(path: &Path) -> Result<Self, MethylomeError> {
        let file = File::open(path)?;
        let meta: MethylomeMetadata = serde_json::from_reader(BufReader::new(file))?;
        Ok(meta)
    }

    pub fn write(&self, path: &Path) -> Result<(), MethylomeError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let index = crate::tests::tiny_index();
        let m = crate::tests::tiny_methylome(&index);

        let path = dir.path().join("SRX1.m16.json");
        m.meta.write(&path).unwrap();
        let back = MethylomeMetadata::read(&path).unwrap();
        assert_eq!(back, m.meta);
    }

    #[rstest]
    fn test_from_parts_binds_index() {
        let index = crate::tests::tiny_index();
        let m = crate::tests::tiny_methylome(&index);
        assert_eq!(m.meta.index_hash, index.meta.index_hash);
        assert_eq!(m.meta.assembly, "tiny");
        assert_eq!(m.meta.n_cpgs, 3);
        assert_eq!(m.meta.methylome_hash, m.data.hash());
    }

    #[rstest]
    fn test_read_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.m16.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            MethylomeMetadata::read(&path),
            Err(MethylomeError::BadMetadata(_))
        ));
    }
}
