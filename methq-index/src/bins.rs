use crate::metadata::GenomeIndexMetadata;

/// One fixed-size genomic window, clamped at the chromosome end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bin {
    pub ch_id: u32,
    pub start: u32,
    pub stop: u32,
}

/// Iterator over the bins tiling a genome at `bin_size` bp, in chromosome
/// order then ascending start. Yields exactly `meta.n_bins(bin_size)`
/// items.
pub struct BinIter<'a> {
    meta: &'a GenomeIndexMetadata,
    bin_size: u32,
    ch_id: usize,
    next_start: u32,
}

impl<'a> BinIter<'a> {
    pub fn new(meta: &'a GenomeIndexMetadata, bin_size: u32) -> Self {
        assert!(bin_size >= 1, "bin_size must be at least 1");
        BinIter {
            meta,
            bin_size,
            ch_id: 0,
            next_start: 0,
        }
    }
}

impl Iterator for BinIter<'_> {
    type Item = Bin;

    fn next(&mut self) -> Option<Bin> {
        // skip chromosomes that are exhausted (or have zero length)
        while self.ch_id < self.meta.chrom_size.len()
            && self.next_start >= self.meta.chrom_size[self.ch_id]
        {
            self.ch_id += 1;
            self.next_start = 0;
        }
        if self.ch_id >= self.meta.chrom_size.len() {
            return None;
        }

        let chrom_size = self.meta.chrom_size[self.ch_id];
        let start = self.next_start;
        let stop = chrom_size.min(start.saturating_add(self.bin_size));
        self.next_start = start.saturating_add(self.bin_size);
        Some(Bin {
            ch_id: self.ch_id as u32,
            start,
            stop,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_bins_cover_genome_in_order() {
        let meta = crate::tests::tiny_index().meta;
        let bins: Vec<Bin> = BinIter::new(&meta, 3).collect();
        assert_eq!(
            bins,
            vec![
                Bin {
                    ch_id: 0,
                    start: 0,
                    stop: 3
                },
                Bin {
                    ch_id: 0,
                    start: 3,
                    stop: 6
                },
                Bin {
                    ch_id: 1,
                    start: 0,
                    stop: 2
                },
            ]
        );
    }

    #[rstest]
    fn test_last_bin_clamps() {
        let meta = crate::tests::tiny_index().meta;
        let bins: Vec<Bin> = BinIter::new(&meta, 4).collect();
        assert_eq!(bins[1].stop, 6);
        assert_eq!(bins[1].stop - bins[1].start, 2);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(5)]
    #[case(7)]
    #[case(1000)]
    fn test_count_matches_n_bins(#[case] bin_size: u32) {
        let meta = crate::tests::tiny_index().meta;
        let n = BinIter::new(&meta, bin_size).count() as u32;
        assert_eq!(n, meta.n_bins(bin_size));
    }
}
