//! # Genome index
//!
//! A genome index maps genomic coordinates to CpG ordinals for one named
//! assembly. It is the structure every methylome on a server is pinned to:
//! a methylome is just a vector of count pairs laid out in the ordinal
//! order this index defines, and the index's content fingerprint is what
//! binds the two files together.
//!
//! On disk an index is a pair of files in one directory:
//! - `<name>.cpg_idx`: packed little-endian u32 CpG start positions,
//!   chromosomes concatenated in `chrom_order`
//! - `<name>.cpg_idx.json`: metadata sidecar (assembly, chromosome sizes
//!   and offsets, CpG totals, fingerprint, provenance)

pub mod bins;
pub mod data;
pub mod errors;
pub mod fasta;
pub mod metadata;
pub mod query;
pub mod set;

pub use bins::{Bin, BinIter};
pub use data::GenomeIndexData;
pub use errors::IndexError;
pub use metadata::GenomeIndexMetadata;
pub use query::{GenomicInterval, OffsetRange};
pub use set::IndexSet;

use std::fs;
use std::path::{Path, PathBuf};

use methq_core::models::RawInterval;

pub const DATA_EXTENSION: &str = ".cpg_idx";
pub const METADATA_EXTENSION: &str = ".cpg_idx.json";

/// A complete genome index: metadata plus per-chromosome position arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct GenomeIndex {
    pub meta: GenomeIndexMetadata,
    pub data: GenomeIndexData,
}

pub fn data_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}{}", name, DATA_EXTENSION))
}

pub fn metadata_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}{}", name, METADATA_EXTENSION))
}

impl GenomeIndex {
    /// Load the metadata/data pair for `name` from `dir` and verify the
    /// data against the recorded fingerprint.
    pub fn read(dir: &Path, name: &str) -> Result<Self, IndexError> {
        let meta = GenomeIndexMetadata::read(&metadata_path(dir, name))?;
        let data = GenomeIndexData::read(&data_path(dir, name), &meta)?;

        let found = data.hash();
        if found != meta.index_hash {
            return Err(IndexError::HashMismatch {
                expected: meta.index_hash,
                found,
            });
        }
        Ok(GenomeIndex { meta, data })
    }

    /// Write the metadata/data pair for `name` into `dir`. Both files are
    /// written to a temporary name then renamed, so readers never observe
    /// a partial index.
    pub fn write(&self, dir: &Path, name: &str) -> Result<(), IndexError> {
        let data_file = data_path(dir, name);
        let meta_file = metadata_path(dir, name);

        let data_tmp = data_file.with_extension("cpg_idx.tmp");
        self.data.write(&data_tmp)?;
        fs::rename(&data_tmp, &data_file)?;

        let meta_tmp = meta_file.with_extension("json.tmp");
        self.meta.write(&meta_tmp)?;
        fs::rename(&meta_tmp, &meta_file)?;
        Ok(())
    }

    /// Number of fixed-size bins tiling the genome at `bin_size` bp.
    pub fn n_bins(&self, bin_size: u32) -> u32 {
        self.meta.n_bins(bin_size)
    }

    /// Iterate the genome's bins in chromosome order.
    pub fn bin_iter(&self, bin_size: u32) -> BinIter<'_> {
        BinIter::new(&self.meta, bin_size)
    }

    /// Resolve name-keyed intervals against this index, producing id-keyed
    /// intervals and validating chromosome names, bounds and sort order.
    pub fn resolve_intervals(
        &self,
        intervals: &[RawInterval],
    ) -> Result<Vec<GenomicInterval>, IndexError> {
        query::resolve_intervals(&self.meta, intervals)
    }

    /// Translate validated intervals into global CpG ordinal ranges, one
    /// `[lo, hi)` per interval, in input order.
    pub fn make_query(
        &self,
        intervals: &[GenomicInterval],
    ) -> Result<Vec<OffsetRange>, IndexError> {
        query::make_query(&self.meta, &self.data, intervals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    /// The tiny two-chromosome genome used across the workspace tests:
    /// chr1 is ACGCGT (CpGs at 1 and 3), chr2 is CG (CpG at 0).
    pub(crate) fn tiny_index() -> GenomeIndex {
        let data = GenomeIndexData {
            positions: vec![vec![1, 3], vec![0]],
        };
        let meta = GenomeIndexMetadata::from_parts(
            "tiny",
            vec!["chr1".to_string(), "chr2".to_string()],
            vec![6, 2],
            &data,
        );
        GenomeIndex { meta, data }
    }

    #[rstest]
    fn test_tiny_genome_shape() {
        let index = tiny_index();
        assert_eq!(index.meta.n_cpgs, 3);
        assert_eq!(index.meta.chrom_offset, vec![0, 2]);
        assert_eq!(index.n_bins(2), 4);
    }

    #[rstest]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let index = tiny_index();
        index.write(dir.path(), "tiny").unwrap();

        let back = GenomeIndex::read(dir.path(), "tiny").unwrap();
        assert_eq!(back, index);
        assert_eq!(back.meta.index_hash, index.meta.index_hash);
        assert_eq!(
            back.meta.n_cpgs,
            back.data
                .positions
                .iter()
                .map(|p| p.len() as u32)
                .sum::<u32>()
        );
    }

    #[rstest]
    fn test_read_missing_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            GenomeIndex::read(dir.path(), "nope"),
            Err(IndexError::Io(_))
        ));
    }

    #[rstest]
    fn test_read_detects_tampered_data() {
        let dir = tempfile::tempdir().unwrap();
        let index = tiny_index();
        index.write(dir.path(), "tiny").unwrap();

        // flip one position byte; the fingerprint check must catch it
        let path = data_path(dir.path(), "tiny");
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] ^= 0xff;
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(
            GenomeIndex::read(dir.path(), "tiny"),
            Err(IndexError::HashMismatch { .. })
        ));
    }
}
