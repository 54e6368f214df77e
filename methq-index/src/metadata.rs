use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::GenomeIndexData;
use crate::errors::IndexError;

/// Metadata sidecar for a genome index.
///
/// This is serialized to `<name>.cpg_idx.json` next to the data file. The
/// `index_hash` field is the content fingerprint of the position arrays;
/// any file claiming to be laid out against this index must carry the same
/// value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenomeIndexMetadata {
    /// Version of the metadata format
    pub version: String,
    /// Creation timestamp, RFC 3339
    pub creation_time: String,
    /// Host the index was built on
    pub host: String,
    /// User that built the index
    pub user: String,
    /// Name of the assembly this index describes
    pub assembly: String,
    /// Total CpG count across all chromosomes
    pub n_cpgs: u32,
    /// Content fingerprint of the concatenated position arrays
    pub index_hash: u64,
    /// Chromosome names in file order
    pub chrom_order: Vec<String>,
    /// Chromosome lengths in bp, parallel to `chrom_order`
    pub chrom_size: Vec<u32>,
    /// Exclusive prefix sum of per-chromosome CpG counts
    pub chrom_offset: Vec<u32>,
}

impl GenomeIndexMetadata {
    /// Build metadata for freshly scanned position data, stamping
    /// provenance from the environment.
    pub fn from_parts(
        assembly: &str,
        chrom_order: Vec<String>,
        chrom_size: Vec<u32>,
        data: &GenomeIndexData,
    ) -> Self {
        let mut chrom_offset = Vec::with_capacity(data.positions.len());
        let mut running = 0u32;
        for positions in &data.positions {
            chrom_offset.push(running);
            running += positions.len() as u32;
        }

        GenomeIndexMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            creation_time: chrono::Utc::now().to_rfc3339(),
            host: methq_core::utils::local_hostname(),
            user: methq_core::utils::local_username(),
            assembly: assembly.to_string(),
            n_cpgs: running,
            index_hash: data.hash(),
            chrom_order,
            chrom_size,
            chrom_offset,
        }
    }

    pub fn read(path: &Path) -> Result<Self, IndexError> {
        let file = File::open(path)?;
        let meta: GenomeIndexMetadata = serde_json::from_reader(BufReader::new(file))?;
        meta.validate()?;
        Ok(meta)
    }

    pub fn write(&self, path: &Path) -> Result<(), IndexError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Structural consistency: the four per-chromosome vectors must be
    /// parallel and the offsets must be a proper exclusive prefix sum
    /// ending below `n_cpgs`.
    pub fn validate(&self) -> Result<(), IndexError> {
        let n = self.chrom_order.len();
        if self.chrom_size.len() != n || self.chrom_offset.len() != n {
            return Err(IndexError::BadMetadata(format!(
                "chromosome vectors disagree in length ({}, {}, {})",
                n,
                self.chrom_size.len(),
                self.chrom_offset.len()
            )));
        }
        if n == 0 {
            return Err(IndexError::BadMetadata("no chromosomes".to_string()));
        }
        if self.chrom_offset[0] != 0 {
            return Err(IndexError::BadMetadata(
                "chrom_offset must start at 0".to_string(),
            ));
        }
        for pair in self.chrom_offset.windows(2) {
            if pair[0] > pair[1] {
                return Err(IndexError::BadMetadata(
                    "chrom_offset must be non-decreasing".to_string(),
                ));
            }
        }
        if *self.chrom_offset.last().unwrap() > self.n_cpgs {
            return Err(IndexError::BadMetadata(
                "chrom_offset exceeds n_cpgs".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-chromosome CpG counts recovered from the offsets and total.
    pub fn n_cpgs_per_chrom(&self) -> Vec<u32> {
        let mut counts = Vec::with_capacity(self.chrom_offset.len());
        for (i, offset) in self.chrom_offset.iter().enumerate() {
            let next = self
                .chrom_offset
                .get(i + 1)
                .copied()
                .unwrap_or(self.n_cpgs);
            counts.push(next - offset);
        }
        counts
    }

    /// Number of fixed-size bins tiling the genome: the sum over
    /// chromosomes of `ceil(chrom_size / bin_size)`.
    pub fn n_bins(&self, bin_size: u32) -> u32 {
        self.chrom_size
            .iter()
            .map(|&sz| sz.div_ceil(bin_size))
            .sum()
    }

    /// Rank of a chromosome name in `chrom_order`, if present.
    pub fn chrom_id(&self, chrom: &str) -> Option<u32> {
        self.chrom_order
            .iter()
            .position(|c| c == chrom)
            .map(|i| i as u32)
    }
}
