//! # Methylome data
//!
//! A methylome is one sample's (methylated, unmethylated) read-count pair
//! per CpG site of a reference genome, laid out in the CpG-ordinal order a
//! genome index defines. Files are written once by the ingest tools and
//! immutable afterwards.
//!
//! On disk a methylome is a pair of files in one directory:
//! - `<name>.m16`: `n_cpgs` little-endian (u16, u16) pairs, or a codec
//!   frame when compressed (see [`codec`])
//! - `<name>.m16.json`: metadata sidecar binding the data to an index by
//!   content fingerprint

pub mod codec;
pub mod data;
pub mod errors;
pub mod ingest;
pub mod levels;
pub mod metadata;

pub use data::{MethCounts, MethylomeData};
pub use errors::MethylomeError;
pub use levels::{Level, LevelCovered, LevelsPayload};
pub use metadata::MethylomeMetadata;

use std::fs;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use methq_index::GenomeIndex;

pub const DATA_EXTENSION: &str = ".m16";
pub const METADATA_EXTENSION: &str = ".m16.json";

pub fn data_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}{}", name, DATA_EXTENSION))
}

pub fn metadata_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}{}", name, METADATA_EXTENSION))
}

/// A loaded methylome: count pairs plus the metadata that binds them to a
/// genome index.
#[derive(Debug, Clone, PartialEq)]
pub struct Methylome {
    pub meta: MethylomeMetadata,
    pub data: MethylomeData,
}

impl Methylome {
    /// Load the metadata/data pair for `name` from `dir`, decompressing
    /// when the metadata says so, and verify sizes and fingerprints.
    pub fn read(dir: &Path, name: &str) -> Result<Self, MethylomeError> {
        let meta = MethylomeMetadata::read(&metadata_path(dir, name))?;

        let path = data_path(dir, name);
        let file = File::open(&path)?;
        let data = if meta.is_compressed {
            let mut bytes = Vec::new();
            std::io::BufReader::new(file).read_to_end(&mut bytes)?;
            MethylomeData {
                pairs: codec::decode(&bytes)?,
            }
        } else {
            let expected = 4 * meta.n_cpgs as u64;
            let found = file.metadata()?.len();
            if found != expected {
                return Err(MethylomeError::LengthMismatch { expected, found });
            }
            MethylomeData::read_raw(&mut std::io::BufReader::new(file), meta.n_cpgs)?
        };

        if data.len() as u32 != meta.n_cpgs {
            return Err(MethylomeError::LengthMismatch {
                expected: 4 * meta.n_cpgs as u64,
                found: 4 * data.len() as u64,
            });
        }
        let found = data.hash();
        if found != meta.methylome_hash {
            return Err(MethylomeError::HashMismatch {
                expected: meta.methylome_hash,
                found,
            });
        }
        Ok(Methylome { meta, data })
    }

    /// Write the data/metadata pair for `name` into `dir`. The metadata's
    /// `is_compressed`, `n_cpgs` and `methylome_hash` fields are refreshed
    /// from the data being written.
    pub fn write(&mut self, dir: &Path, name: &str, compress: bool) -> Result<(), MethylomeError> {
        self.meta.is_compressed = compress;
        self.meta.n_cpgs = self.data.len() as u32;
        self.meta.methylome_hash = self.data.hash();

        let data_file = data_path(dir, name);
        let data_tmp = data_file.with_extension("m16.tmp");
        {
            let mut writer = BufWriter::new(File::create(&data_tmp)?);
            if compress {
                writer.write_all(&codec::encode(&self.data.pairs))?;
            } else {
                self.data.write_raw(&mut writer)?;
            }
            writer.flush()?;
        }
        fs::rename(&data_tmp, &data_file)?;

        let meta_file = metadata_path(dir, name);
        let meta_tmp = meta_file.with_extension("json.tmp");
        self.meta.write(&meta_tmp)?;
        fs::rename(&meta_tmp, &meta_file)?;
        Ok(())
    }

    /// Merge another methylome into this one, per-CpG saturating addition.
    /// Both must be laid out against the same index.
    pub fn add(&mut self, other: &Methylome) -> Result<(), MethylomeError> {
        if self.meta.index_hash != other.meta.index_hash {
            return Err(MethylomeError::IndexMismatch {
                expected: self.meta.index_hash,
                found: other.meta.index_hash,
            });
        }
        if self.data.len() != other.data.len() {
            return Err(MethylomeError::LengthMismatch {
                expected: 4 * self.data.len() as u64,
                found: 4 * other.data.len() as u64,
            });
        }
        self.data.add(&other.data);
        self.meta.methylome_hash = self.data.hash();
        Ok(())
    }

    /// Check this methylome against the index it claims to be built on.
    pub fn consistent_with(&self, index: &GenomeIndex) -> Result<(), MethylomeError> {
        if self.meta.index_hash != index.meta.index_hash {
            return Err(MethylomeError::IndexMismatch {
                expected: index.meta.index_hash,
                found: self.meta.index_hash,
            });
        }
        if self.meta.n_cpgs != index.meta.n_cpgs {
            return Err(MethylomeError::LengthMismatch {
                expected: 4 * index.meta.n_cpgs as u64,
                found: 4 * self.meta.n_cpgs as u64,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use crate::data::MethCounts;

    pub(crate) fn tiny_index() -> GenomeIndex {
        let data = methq_index::GenomeIndexData {
            positions: vec![vec![1, 3], vec![0]],
        };
        let meta = methq_index::GenomeIndexMetadata::from_parts(
            "tiny",
            vec!["chr1".to_string(), "chr2".to_string()],
            vec![6, 2],
            &data,
        );
        GenomeIndex { meta, data }
    }

    pub(crate) fn tiny_methylome(index: &GenomeIndex) -> Methylome {
        let data = MethylomeData {
            pairs: vec![
                MethCounts {
                    n_meth: 10,
                    n_unmeth: 5,
                },
                MethCounts {
                    n_meth: 0,
                    n_unmeth: 0,
                },
                MethCounts {
                    n_meth: 3,
                    n_unmeth: 3,
                },
            ],
        };
        let meta = MethylomeMetadata::from_parts(&index.meta, &data, false);
        Methylome { meta, data }
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_round_trip(#[case] compress: bool) {
        let dir = tempfile::tempdir().unwrap();
        let index = tiny_index();
        let mut m = tiny_methylome(&index);
        m.write(dir.path(), "SRX1", compress).unwrap();

        let back = Methylome::read(dir.path(), "SRX1").unwrap();
        assert_eq!(back.data, m.data);
        assert_eq!(back.meta.is_compressed, compress);
        assert_eq!(back.meta.methylome_hash, m.meta.methylome_hash);
        back.consistent_with(&index).unwrap();
    }

    #[rstest]
    fn test_compressed_and_raw_agree() {
        let dir = tempfile::tempdir().unwrap();
        let index = tiny_index();
        let mut raw = tiny_methylome(&index);
        let mut zipped = tiny_methylome(&index);
        raw.write(dir.path(), "SRX1", false).unwrap();
        zipped.write(dir.path(), "SRX2", true).unwrap();

        let raw = Methylome::read(dir.path(), "SRX1").unwrap();
        let zipped = Methylome::read(dir.path(), "SRX2").unwrap();
        assert_eq!(raw.data, zipped.data);
    }

    #[rstest]
    fn test_truncated_raw_detected() {
        let dir = tempfile::tempdir().unwrap();
        let index = tiny_index();
        let mut m = tiny_methylome(&index);
        m.write(dir.path(), "SRX1", false).unwrap();

        let path = data_path(dir.path(), "SRX1");
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 2]).unwrap();
        assert!(matches!(
            Methylome::read(dir.path(), "SRX1"),
            Err(MethylomeError::LengthMismatch { .. })
        ));
    }

    #[rstest]
    fn test_tampered_raw_detected() {
        let dir = tempfile::tempdir().unwrap();
        let index = tiny_index();
        let mut m = tiny_methylome(&index);
        m.write(dir.path(), "SRX1", false).unwrap();

        let path = data_path(dir.path(), "SRX1");
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] ^= 0x01;
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(
            Methylome::read(dir.path(), "SRX1"),
            Err(MethylomeError::HashMismatch { .. })
        ));
    }

    #[rstest]
    fn test_add_merges_and_saturates() {
        let index = tiny_index();
        let mut a = tiny_methylome(&index);
        let mut b = tiny_methylome(&index);
        b.data.pairs[0] = MethCounts {
            n_meth: u16::MAX,
            n_unmeth: 1,
        };

        a.add(&b).unwrap();
        assert_eq!(a.data.pairs[0].n_meth, u16::MAX);
        assert_eq!(a.data.pairs[0].n_unmeth, 6);
        assert_eq!(a.data.pairs[2].n_meth, 6);
    }

    #[rstest]
    fn test_add_rejects_foreign_index() {
        let index = tiny_index();
        let mut a = tiny_methylome(&index);
        let mut b = tiny_methylome(&index);
        b.meta.index_hash ^= 1;
        assert!(matches!(
            a.add(&b),
            Err(MethylomeError::IndexMismatch { .. })
        ));
    }

    #[rstest]
    fn test_consistency_check() {
        let index = tiny_index();
        let mut m = tiny_methylome(&index);
        m.consistent_with(&index).unwrap();
        m.meta.index_hash ^= 1;
        assert!(m.consistent_with(&index).is_err());
    }
}
