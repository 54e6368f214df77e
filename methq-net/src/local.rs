//! Local-mode client: the same query surface as [`QueryClient`], served
//! by reading the index and methylomes straight from local directories
//! with no server in between.

use std::path::{Path, PathBuf};

use methq_index::{GenomeIndex, GenomicInterval};
use methq_methylome::{LevelsPayload, Methylome};

use crate::errors::ClientError;

pub struct LocalClient {
    pub index: GenomeIndex,
    pub methylome_dir: PathBuf,
}

impl LocalClient {
    /// Open the index for `assembly` from `index_dir`; methylomes are
    /// loaded per query from `methylome_dir`.
    pub fn open(
        index_dir: &Path,
        assembly: &str,
        methylome_dir: &Path,
    ) -> Result<Self, ClientError> {
        let index = GenomeIndex::read(index_dir, assembly)?;
        Ok(LocalClient {
            index,
            methylome_dir: methylome_dir.to_path_buf(),
        })
    }

    pub fn intervals(
        &self,
        methylome_names: &[String],
        intervals: &[GenomicInterval],
        covered: bool,
    ) -> Result<Vec<LevelsPayload>, ClientError> {
        let query = self.index.make_query(intervals)?;
        let mut results = Vec::with_capacity(methylome_names.len());
        for name in methylome_names {
            let methylome = self.read_consistent(name)?;
            results.push(if covered {
                LevelsPayload::Covered(methylome.data.get_levels_covered(&query))
            } else {
                LevelsPayload::Plain(methylome.data.get_levels(&query))
            });
        }
        Ok(results)
    }

    pub fn bins(
        &self,
        methylome_names: &[String],
        bin_size: u32,
        covered: bool,
    ) -> Result<Vec<LevelsPayload>, ClientError> {
        let mut results = Vec::with_capacity(methylome_names.len());
        for name in methylome_names {
            let methylome = self.read_consistent(name)?;
            results.push(if covered {
                LevelsPayload::Covered(methylome.data.get_bins_covered(bin_size, &self.index))
            } else {
                LevelsPayload::Plain(methylome.data.get_bins(bin_size, &self.index))
            });
        }
        Ok(results)
    }

    fn read_consistent(&self, name: &str) -> Result<Methylome, ClientError> {
        let methylome = Methylome::read(&self.methylome_dir, name)?;
        methylome.consistent_with(&self.index)?;
        Ok(methylome)
    }
}
