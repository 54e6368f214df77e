use methq_core::models::RawInterval;

use crate::data::GenomeIndexData;
use crate::errors::IndexError;
use crate::metadata::GenomeIndexMetadata;

/// An interval resolved against an index: chromosome id instead of name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenomicInterval {
    pub ch_id: u32,
    pub start: u32,
    pub stop: u32,
}

/// A half-open range `[start, stop)` of global CpG ordinals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OffsetRange {
    pub start: u32,
    pub stop: u32,
}

impl OffsetRange {
    pub fn len(&self) -> u32 {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.stop == self.start
    }
}

/// Resolve chromosome names to ids, checking each interval against the
/// chromosome bounds and the whole list against the sorted-by
/// (chromosome, start) precondition.
pub fn resolve_intervals(
    meta: &GenomeIndexMetadata,
    intervals: &[RawInterval],
) -> Result<Vec<GenomicInterval>, IndexError> {
    let mut resolved = Vec::with_capacity(intervals.len());
    for gi in intervals {
        let ch_id = meta
            .chrom_id(&gi.chrom)
            .ok_or_else(|| IndexError::UnknownChrom(gi.chrom.clone()))?;
        let chrom_size = meta.chrom_size[ch_id as usize];
        if gi.stop > chrom_size {
            return Err(IndexError::IntervalPastEnd {
                chrom: gi.chrom.clone(),
                start: gi.start,
                stop: gi.stop,
                chrom_size,
            });
        }
        resolved.push(GenomicInterval {
            ch_id,
            start: gi.start,
            stop: gi.stop,
        });
    }
    ensure_sorted(&resolved)?;
    Ok(resolved)
}

fn ensure_sorted(intervals: &[GenomicInterval]) -> Result<(), IndexError> {
    let sorted = intervals
        .windows(2)
        .all(|w| (w[0].ch_id, w[0].start) <= (w[1].ch_id, w[1].start));
    if sorted {
        Ok(())
    } else {
        Err(IndexError::UnsortedIntervals)
    }
}

/// Translate validated intervals to global ordinal ranges.
///
/// Each endpoint is one binary search into the chromosome's position
/// array; a run of intervals on the same chromosome shares a cursor that
/// only moves forward, so later searches scan a shrinking tail.
pub fn make_query(
    meta: &GenomeIndexMetadata,
    data: &GenomeIndexData,
    intervals: &[GenomicInterval],
) -> Result<Vec<OffsetRange>, IndexError> {
    ensure_sorted(intervals)?;

    let mut offsets = Vec::with_capacity(intervals.len());
    let mut run_start = 0usize;
    while run_start < intervals.len() {
        let ch_id = intervals[run_start].ch_id;
        if ch_id as usize >= data.positions.len() {
            return Err(IndexError::UnknownChrom(format!("chromosome id {}", ch_id)));
        }
        let mut run_stop = run_start;
        while run_stop < intervals.len() && intervals[run_stop].ch_id == ch_id {
            run_stop += 1;
        }

        let positions = &data.positions[ch_id as usize];
        let chrom_size = meta.chrom_size[ch_id as usize];
        let offset = meta.chrom_offset[ch_id as usize];
        let mut cursor = 0usize;
        for gi in &intervals[run_start..run_stop] {
            if gi.stop > chrom_size {
                return Err(IndexError::IntervalPastEnd {
                    chrom: meta.chrom_order[ch_id as usize].clone(),
                    start: gi.start,
                    stop: gi.stop,
                    chrom_size,
                });
            }
            cursor += lower_bound(&positions[cursor..], gi.start);
            let hi = cursor + lower_bound(&positions[cursor..], gi.stop);
            offsets.push(OffsetRange {
                start: offset + cursor as u32,
                stop: offset + hi as u32,
            });
        }
        run_start = run_stop;
    }
    Ok(offsets)
}

/// First index whose value is >= `key` in a sorted slice.
fn lower_bound(sorted: &[u32], key: u32) -> usize {
    sorted.partition_point(|&p| p < key)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use crate::GenomeIndex;

    fn index() -> GenomeIndex {
        crate::tests::tiny_index()
    }

    fn raw(chrom: &str, start: u32, stop: u32) -> RawInterval {
        RawInterval {
            chrom: chrom.to_string(),
            start,
            stop,
        }
    }

    #[rstest]
    fn test_whole_chromosome() {
        let index = index();
        let q = index
            .make_query(&[GenomicInterval {
                ch_id: 0,
                start: 0,
                stop: 6,
            }])
            .unwrap();
        assert_eq!(q, vec![OffsetRange { start: 0, stop: 2 }]);
    }

    #[rstest]
    fn test_second_chromosome_is_lifted() {
        let index = index();
        let q = index
            .make_query(&[GenomicInterval {
                ch_id: 1,
                start: 0,
                stop: 2,
            }])
            .unwrap();
        assert_eq!(q, vec![OffsetRange { start: 2, stop: 3 }]);
    }

    #[rstest]
    fn test_empty_range_is_valid() {
        let index = index();
        // [4, 6) on chr1 holds no CpG start (positions are 1 and 3)
        let q = index
            .make_query(&[GenomicInterval {
                ch_id: 0,
                start: 4,
                stop: 6,
            }])
            .unwrap();
        assert_eq!(q, vec![OffsetRange { start: 2, stop: 2 }]);
        assert!(q[0].is_empty());
    }

    #[rstest]
    fn test_same_chrom_run_shares_cursor() {
        let index = index();
        let q = index
            .make_query(&[
                GenomicInterval {
                    ch_id: 0,
                    start: 0,
                    stop: 2,
                },
                GenomicInterval {
                    ch_id: 0,
                    start: 2,
                    stop: 6,
                },
                GenomicInterval {
                    ch_id: 1,
                    start: 0,
                    stop: 1,
                },
            ])
            .unwrap();
        assert_eq!(
            q,
            vec![
                OffsetRange { start: 0, stop: 1 },
                OffsetRange { start: 1, stop: 2 },
                OffsetRange { start: 2, stop: 3 },
            ]
        );
    }

    #[rstest]
    fn test_unsorted_is_rejected() {
        let index = index();
        let intervals = [
            GenomicInterval {
                ch_id: 0,
                start: 3,
                stop: 6,
            },
            GenomicInterval {
                ch_id: 0,
                start: 0,
                stop: 2,
            },
        ];
        assert!(matches!(
            index.make_query(&intervals),
            Err(IndexError::UnsortedIntervals)
        ));
    }

    #[rstest]
    fn test_resolve_unknown_chrom() {
        let index = index();
        assert!(matches!(
            index.resolve_intervals(&[raw("chr9", 0, 1)]),
            Err(IndexError::UnknownChrom(_))
        ));
    }

    #[rstest]
    fn test_resolve_past_end() {
        let index = index();
        assert!(matches!(
            index.resolve_intervals(&[raw("chr1", 0, 7)]),
            Err(IndexError::IntervalPastEnd { .. })
        ));
    }

    #[rstest]
    fn test_resolve_sorted_ok() {
        let index = index();
        let resolved = index
            .resolve_intervals(&[raw("chr1", 0, 3), raw("chr1", 3, 6), raw("chr2", 0, 2)])
            .unwrap();
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[2].ch_id, 1);
    }
}
