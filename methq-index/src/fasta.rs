//! One-shot genome index construction from a FASTA file.
//!
//! The scan is a single pass over a memory-mapped file: a CpG is a C
//! immediately followed by a G on the same strand, with line breaks
//! transparent so sites spanning a wrap are still found. Lowercase
//! (soft-masked) bases count.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::GenomeIndex;
use crate::data::GenomeIndexData;
use crate::errors::IndexError;
use crate::metadata::GenomeIndexMetadata;

impl GenomeIndex {
    /// Scan a (plain, uncompressed) FASTA file and build the index for it.
    /// Chromosome order is file order; the record name is the first word
    /// of the header line.
    pub fn from_fasta(path: &Path, assembly: &str) -> Result<Self, IndexError> {
        let file = File::open(path)?;
        let map = unsafe { Mmap::map(&file)? };

        let mut chrom_order = Vec::new();
        let mut chrom_size = Vec::new();
        let mut positions = Vec::new();

        let mut at = 0usize;
        while at < map.len() {
            if map[at] != b'>' {
                return Err(IndexError::BadMetadata(format!(
                    "not a FASTA file: {}",
                    path.display()
                )));
            }
            let header_end = find_byte(&map, at, b'\n').unwrap_or(map.len());
            let header = &map[at + 1..header_end];
            let name_end = header
                .iter()
                .position(|b| b.is_ascii_whitespace())
                .unwrap_or(header.len());
            let name = String::from_utf8_lossy(&header[..name_end]).into_owned();
            if name.is_empty() {
                return Err(IndexError::BadMetadata(
                    "FASTA record with empty name".to_string(),
                ));
            }

            let seq_start = (header_end + 1).min(map.len());
            let seq_end = find_byte(&map, seq_start, b'>').unwrap_or(map.len());
            let (size, cpgs) = scan_sequence(&map[seq_start..seq_end]);

            chrom_order.push(name);
            chrom_size.push(size);
            positions.push(cpgs);
            at = seq_end;
        }

        if chrom_order.is_empty() {
            return Err(IndexError::BadMetadata(format!(
                "no FASTA records in {}",
                path.display()
            )));
        }

        let data = GenomeIndexData { positions };
        let meta = GenomeIndexMetadata::from_parts(assembly, chrom_order, chrom_size, &data);
        Ok(GenomeIndex { meta, data })
    }
}

fn find_byte(haystack: &[u8], from: usize, needle: u8) -> Option<usize> {
    haystack[from..].iter().position(|&b| b == needle).map(|i| from + i)
}

/// Walk one record's sequence bytes, ignoring newlines, and collect the
/// 0-based position of the C of every CpG. Returns (length, positions).
fn scan_sequence(seq: &[u8]) -> (u32, Vec<u32>) {
    // a typical mammalian genome has a CpG every ~100 bp
    let mut cpgs = Vec::with_capacity(seq.len() / 100);
    let mut prev_is_c = false;
    let mut pos = 0u32;
    for &b in seq {
        if b == b'\n' || b == b'\r' {
            continue;
        }
        let is_g = b == b'G' || b == b'g';
        if prev_is_c && is_g {
            cpgs.push(pos - 1);
        }
        prev_is_c = b == b'C' || b == b'c';
        pos += 1;
    }
    (pos, cpgs)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn write_fasta(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".fa").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[rstest]
    fn test_tiny_genome() {
        let file = write_fasta(">chr1\nACGCGT\n>chr2\nCG\n");
        let index = GenomeIndex::from_fasta(file.path(), "tiny").unwrap();
        assert_eq!(index.meta.chrom_order, vec!["chr1", "chr2"]);
        assert_eq!(index.meta.chrom_size, vec![6, 2]);
        assert_eq!(index.data.positions, vec![vec![1, 3], vec![0]]);
        assert_eq!(index.meta.n_cpgs, 3);
        assert_eq!(index.meta.chrom_offset, vec![0, 2]);
        assert_eq!(index.n_bins(2), 4);
    }

    #[rstest]
    fn test_matches_in_memory_fixture() {
        let file = write_fasta(">chr1\nACGCGT\n>chr2\nCG\n");
        let index = GenomeIndex::from_fasta(file.path(), "tiny").unwrap();
        let fixture = crate::tests::tiny_index();
        assert_eq!(index.data, fixture.data);
        assert_eq!(index.meta.index_hash, fixture.meta.index_hash);
    }

    #[rstest]
    fn test_cpg_across_line_wrap() {
        let file = write_fasta(">chr1\nAC\nGT\n");
        let index = GenomeIndex::from_fasta(file.path(), "t").unwrap();
        assert_eq!(index.data.positions, vec![vec![1]]);
        assert_eq!(index.meta.chrom_size, vec![4]);
    }

    #[rstest]
    fn test_soft_masked_bases_count() {
        let file = write_fasta(">chr1\nacgcgt\n");
        let index = GenomeIndex::from_fasta(file.path(), "t").unwrap();
        assert_eq!(index.data.positions, vec![vec![1, 3]]);
    }

    #[rstest]
    fn test_header_description_dropped() {
        let file = write_fasta(">chr1 some description\nCG\n");
        let index = GenomeIndex::from_fasta(file.path(), "t").unwrap();
        assert_eq!(index.meta.chrom_order, vec!["chr1"]);
    }

    #[rstest]
    fn test_not_fasta_rejected() {
        let file = write_fasta("chr1\tnot\tfasta\n");
        assert!(GenomeIndex::from_fasta(file.path(), "t").is_err());
    }
}
