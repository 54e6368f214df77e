//! Aggregate methylation levels over ordinal ranges and genome bins.
//!
//! Both entry points are a single sequential pass per range with no
//! allocation inside the loop; the covered/uncovered choice is made once
//! per request, not per site.

use methq_index::{GenomeIndex, OffsetRange};

use crate::data::MethylomeData;

/// Aggregated counts for one range of one methylome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Level {
    pub n_meth: u32,
    pub n_unmeth: u32,
}

/// Aggregated counts plus the number of covered sites in the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelCovered {
    pub n_meth: u32,
    pub n_unmeth: u32,
    pub n_covered: u32,
}

/// Per-request result vector: one variant per request type, chosen at the
/// entry to the query engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelsPayload {
    Plain(Vec<Level>),
    Covered(Vec<LevelCovered>),
}

impl LevelsPayload {
    pub fn len(&self) -> usize {
        match self {
            LevelsPayload::Plain(v) => v.len(),
            LevelsPayload::Covered(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wire size of one element in bytes.
    pub fn element_size(&self) -> usize {
        match self {
            LevelsPayload::Plain(_) => 8,
            LevelsPayload::Covered(_) => 12,
        }
    }
}

impl MethylomeData {
    /// Sum counts over each `[lo, hi)` ordinal range, in input order.
    pub fn get_levels(&self, query: &[OffsetRange]) -> Vec<Level> {
        let mut results = Vec::with_capacity(query.len());
        for range in query {
            let mut level = Level::default();
            for pair in &self.pairs[range.start as usize..range.stop as usize] {
                level.n_meth += pair.n_meth as u32;
                level.n_unmeth += pair.n_unmeth as u32;
            }
            results.push(level);
        }
        results
    }

    /// Sum counts plus covered-site count over each range, in input order.
    pub fn get_levels_covered(&self, query: &[OffsetRange]) -> Vec<LevelCovered> {
        let mut results = Vec::with_capacity(query.len());
        for range in query {
            let mut level = LevelCovered::default();
            for pair in &self.pairs[range.start as usize..range.stop as usize] {
                level.n_meth += pair.n_meth as u32;
                level.n_unmeth += pair.n_unmeth as u32;
                level.n_covered += pair.is_covered() as u32;
            }
            results.push(level);
        }
        results
    }

    /// One aggregate per `bin_size`-bp window, walking chromosomes in
    /// order with a cursor per chromosome. The result has exactly
    /// `index.n_bins(bin_size)` entries.
    pub fn get_bins(&self, bin_size: u32, index: &GenomeIndex) -> Vec<Level> {
        let mut results = Vec::with_capacity(index.n_bins(bin_size) as usize);
        self.walk_bins(bin_size, index, |pairs| {
            let mut level = Level::default();
            for pair in pairs {
                level.n_meth += pair.n_meth as u32;
                level.n_unmeth += pair.n_unmeth as u32;
            }
            results.push(level);
        });
        results
    }

    /// Covered variant of [`get_bins`](Self::get_bins).
    pub fn get_bins_covered(&self, bin_size: u32, index: &GenomeIndex) -> Vec<LevelCovered> {
        let mut results = Vec::with_capacity(index.n_bins(bin_size) as usize);
        self.walk_bins(bin_size, index, |pairs| {
            let mut level = LevelCovered::default();
            for pair in pairs {
                level.n_meth += pair.n_meth as u32;
                level.n_unmeth += pair.n_unmeth as u32;
                level.n_covered += pair.is_covered() as u32;
            }
            results.push(level);
        });
        results
    }

    /// Drive `emit` once per bin with the slice of pairs whose CpG start
    /// falls inside the bin. The per-chromosome cursor only moves forward,
    /// so the whole genome is one pass over `positions` and `pairs`.
    fn walk_bins<F: FnMut(&[crate::data::MethCounts])>(
        &self,
        bin_size: u32,
        index: &GenomeIndex,
        mut emit: F,
    ) {
        for (ch_id, positions) in index.data.positions.iter().enumerate() {
            let offset = index.meta.chrom_offset[ch_id] as usize;
            let chrom_size = index.meta.chrom_size[ch_id];
            let mut cursor = 0usize;
            let mut bin_start = 0u32;
            while bin_start < chrom_size {
                let bin_stop = chrom_size.min(bin_start.saturating_add(bin_size));
                let lo = cursor;
                while cursor < positions.len() && positions[cursor] < bin_stop {
                    cursor += 1;
                }
                emit(&self.pairs[offset + lo..offset + cursor]);
                bin_start = bin_stop;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use methq_index::GenomicInterval;

    use crate::Methylome;

    fn fixtures() -> (GenomeIndex, Methylome) {
        let index = crate::tests::tiny_index();
        let m = crate::tests::tiny_methylome(&index);
        (index, m)
    }

    #[rstest]
    fn test_interval_levels() {
        let (index, m) = fixtures();
        let query = index
            .make_query(&[
                GenomicInterval {
                    ch_id: 0,
                    start: 0,
                    stop: 6,
                },
                GenomicInterval {
                    ch_id: 1,
                    start: 0,
                    stop: 2,
                },
            ])
            .unwrap();

        let plain = m.data.get_levels(&query);
        assert_eq!(
            plain,
            vec![
                Level {
                    n_meth: 10,
                    n_unmeth: 5
                },
                Level {
                    n_meth: 3,
                    n_unmeth: 3
                },
            ]
        );

        let covered = m.data.get_levels_covered(&query);
        assert_eq!(
            covered,
            vec![
                LevelCovered {
                    n_meth: 10,
                    n_unmeth: 5,
                    n_covered: 1
                },
                LevelCovered {
                    n_meth: 3,
                    n_unmeth: 3,
                    n_covered: 1
                },
            ]
        );
    }

    #[rstest]
    fn test_empty_range_yields_zero() {
        let (_, m) = fixtures();
        let levels = m.data.get_levels(&[OffsetRange { start: 1, stop: 1 }]);
        assert_eq!(levels, vec![Level::default()]);
    }

    #[rstest]
    fn test_bins_size_three() {
        let (index, m) = fixtures();
        let bins = m.data.get_bins(3, &index);
        assert_eq!(
            bins,
            vec![
                Level {
                    n_meth: 10,
                    n_unmeth: 5
                },
                Level {
                    n_meth: 0,
                    n_unmeth: 0
                },
                Level {
                    n_meth: 3,
                    n_unmeth: 3
                },
            ]
        );
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(4)]
    #[case(6)]
    #[case(50)]
    fn test_bin_count_matches_n_bins(#[case] bin_size: u32) {
        let (index, m) = fixtures();
        assert_eq!(
            m.data.get_bins(bin_size, &index).len() as u32,
            index.n_bins(bin_size)
        );
        assert_eq!(
            m.data.get_bins_covered(bin_size, &index).len() as u32,
            index.n_bins(bin_size)
        );
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(5)]
    fn test_tiling_intervals_match_bins(#[case] bin_size: u32) {
        // property 3: intervals that tile the genome like the bins do must
        // aggregate to the same levels
        let (index, m) = fixtures();
        let tiling: Vec<GenomicInterval> = index
            .bin_iter(bin_size)
            .map(|b| GenomicInterval {
                ch_id: b.ch_id,
                start: b.start,
                stop: b.stop,
            })
            .collect();
        let query = index.make_query(&tiling).unwrap();
        let by_intervals = m.data.get_levels(&query);
        let by_bins = m.data.get_bins(bin_size, &index);
        assert_eq!(by_intervals, by_bins);
    }

    #[rstest]
    fn test_covered_bounds() {
        // property 5: 0 <= covered <= hi - lo, and covered == 0 iff the
        // range sums to zero
        let (index, m) = fixtures();
        let ranges = [
            OffsetRange { start: 0, stop: 3 },
            OffsetRange { start: 1, stop: 2 },
            OffsetRange { start: 0, stop: 0 },
        ];
        for (range, level) in ranges.iter().zip(m.data.get_levels_covered(&ranges)) {
            assert!(level.n_covered <= range.len());
            assert_eq!(
                level.n_covered == 0,
                level.n_meth + level.n_unmeth == 0,
                "covered/sum disagree on {:?}",
                range
            );
        }
    }

    #[rstest]
    fn test_payload_element_size() {
        assert_eq!(LevelsPayload::Plain(vec![]).element_size(), 8);
        assert_eq!(LevelsPayload::Covered(vec![]).element_size(), 12);
    }
}
