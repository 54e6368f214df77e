//! BED-like output writers for query results.
//!
//! One row per range: `chrom start stop n_meth n_unmeth [n_covered]`,
//! tab-separated, ranges in query order.

use std::io::{self, Write};

use methq_core::models::RawInterval;
use methq_index::GenomeIndex;
use methq_methylome::LevelsPayload;

pub fn write_intervals<W: Write>(
    out: &mut W,
    intervals: &[RawInterval],
    payload: &LevelsPayload,
) -> io::Result<()> {
    match payload {
        LevelsPayload::Plain(levels) => {
            for (gi, level) in intervals.iter().zip(levels) {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}",
                    gi.chrom, gi.start, gi.stop, level.n_meth, level.n_unmeth
                )?;
            }
        }
        LevelsPayload::Covered(levels) => {
            for (gi, level) in intervals.iter().zip(levels) {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    gi.chrom, gi.start, gi.stop, level.n_meth, level.n_unmeth, level.n_covered
                )?;
            }
        }
    }
    Ok(())
}

pub fn write_bins<W: Write>(
    out: &mut W,
    index: &GenomeIndex,
    bin_size: u32,
    payload: &LevelsPayload,
) -> io::Result<()> {
    match payload {
        LevelsPayload::Plain(levels) => {
            for (bin, level) in index.bin_iter(bin_size).zip(levels) {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}",
                    index.meta.chrom_order[bin.ch_id as usize],
                    bin.start,
                    bin.stop,
                    level.n_meth,
                    level.n_unmeth
                )?;
            }
        }
        LevelsPayload::Covered(levels) => {
            for (bin, level) in index.bin_iter(bin_size).zip(levels) {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    index.meta.chrom_order[bin.ch_id as usize],
                    bin.start,
                    bin.stop,
                    level.n_meth,
                    level.n_unmeth,
                    level.n_covered
                )?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use methq_index::{GenomeIndexData, GenomeIndexMetadata};
    use methq_methylome::{Level, LevelCovered};

    fn tiny_index() -> GenomeIndex {
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
    fn test_write_intervals_covered() {
        let intervals = vec![RawInterval {
            chrom: "chr1".to_string(),
            start: 0,
            stop: 6,
        }];
        let payload = LevelsPayload::Covered(vec![LevelCovered {
            n_meth: 10,
            n_unmeth: 5,
            n_covered: 1,
        }]);
        let mut out = Vec::new();
        write_intervals(&mut out, &intervals, &payload).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "chr1\t0\t6\t10\t5\t1\n");
    }

    #[rstest]
    fn test_write_bins_plain() {
        let index = tiny_index();
        let payload = LevelsPayload::Plain(vec![
            Level {
                n_meth: 10,
                n_unmeth: 5,
            },
            Level::default(),
            Level {
                n_meth: 3,
                n_unmeth: 3,
            },
        ]);
        let mut out = Vec::new();
        write_bins(&mut out, &index, 3, &payload).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "chr1\t0\t3\t10\t5\nchr1\t3\t6\t0\t0\nchr2\t0\t2\t3\t3\n"
        );
    }
}
