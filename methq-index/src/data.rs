use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use methq_core::fingerprint::{Fingerprint, update_u32s};

use crate::errors::IndexError;
use crate::metadata::GenomeIndexMetadata;

/// CpG start positions for every chromosome of an assembly.
///
/// `positions[i]` is strictly increasing and holds the 0-based start
/// position of each CpG in chromosome `i`. On disk the arrays are
/// concatenated in chromosome order as packed little-endian u32s; the
/// metadata sidecar records where each chromosome begins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenomeIndexData {
    pub positions: Vec<Vec<u32>>,
}

impl GenomeIndexData {
    /// Read position arrays, splitting the flat file by the per-chromosome
    /// counts recorded in `meta`.
    pub fn read(path: &Path, meta: &GenomeIndexMetadata) -> Result<Self, IndexError> {
        let file = File::open(path)?;
        let expected = 4 * meta.n_cpgs as u64;
        let found = file.metadata()?.len();
        if found != expected {
            return Err(IndexError::DataTruncated { expected, found });
        }

        let mut reader = BufReader::new(file);
        let mut positions = Vec::with_capacity(meta.chrom_order.len());
        for n in meta.n_cpgs_per_chrom() {
            let mut chrom = vec![0u32; n as usize];
            reader.read_u32_into::<LittleEndian>(&mut chrom)?;
            positions.push(chrom);
        }
        Ok(GenomeIndexData { positions })
    }

    pub fn write(&self, path: &Path) -> Result<(), IndexError> {
        let mut writer = BufWriter::new(File::create(path)?);
        for chrom in &self.positions {
            for &pos in chrom {
                writer.write_u32::<LittleEndian>(pos)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Content fingerprint over the concatenated position arrays.
    pub fn hash(&self) -> u64 {
        let mut fp = Fingerprint::new();
        for chrom in &self.positions {
            update_u32s(&mut fp, chrom);
        }
        fp.finish()
    }

    pub fn n_cpgs(&self) -> u32 {
        self.positions.iter().map(|p| p.len() as u32).sum()
    }
}
