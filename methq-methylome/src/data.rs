use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use methq_core::fingerprint::Fingerprint;

use crate::errors::MethylomeError;
use crate::levels::{Level, LevelCovered};

/// One CpG site's (methylated, unmethylated) read counts. (0, 0) means the
/// site had no coverage in this sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MethCounts {
    pub n_meth: u16,
    pub n_unmeth: u16,
}

impl MethCounts {
    pub fn is_covered(&self) -> bool {
        self.n_meth != 0 || self.n_unmeth != 0
    }
}

/// Clamp a raw count pair into u16 range. When either count exceeds the
/// range, both are scaled proportionally so the larger becomes 65535 and
/// the ratio is preserved; the smaller truncates toward zero. Lossy but
/// deterministic.
pub fn clamp_counts(n_meth: u32, n_unmeth: u32) -> MethCounts {
    let c = n_meth.max(n_unmeth);
    if c <= u16::MAX as u32 {
        return MethCounts {
            n_meth: n_meth as u16,
            n_unmeth: n_unmeth as u16,
        };
    }
    let scale = |x: u32| -> u16 {
        if x == c {
            u16::MAX
        } else {
            ((x as f64 / c as f64) * u16::MAX as f64) as u16
        }
    };
    MethCounts {
        n_meth: scale(n_meth),
        n_unmeth: scale(n_unmeth),
    }
}

/// The count pairs of one methylome, in CpG-ordinal order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethylomeData {
    pub pairs: Vec<MethCounts>,
}

impl MethylomeData {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Read `n_cpgs` raw little-endian pairs.
    pub fn read_raw<R: Read>(reader: &mut R, n_cpgs: u32) -> Result<Self, MethylomeError> {
        let mut pairs = Vec::with_capacity(n_cpgs as usize);
        let mut flat = vec![0u16; 2 * n_cpgs as usize];
        reader.read_u16_into::<LittleEndian>(&mut flat)?;
        for chunk in flat.chunks_exact(2) {
            pairs.push(MethCounts {
                n_meth: chunk[0],
                n_unmeth: chunk[1],
            });
        }
        Ok(MethylomeData { pairs })
    }

    pub fn write_raw<W: Write>(&self, writer: &mut W) -> Result<(), MethylomeError> {
        for pair in &self.pairs {
            writer.write_u16::<LittleEndian>(pair.n_meth)?;
            writer.write_u16::<LittleEndian>(pair.n_unmeth)?;
        }
        Ok(())
    }

    /// The raw little-endian byte image of the pairs, as hashed, CRC'd and
    /// written uncompressed.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(4 * self.pairs.len());
        for pair in &self.pairs {
            bytes.extend_from_slice(&pair.n_meth.to_le_bytes());
            bytes.extend_from_slice(&pair.n_unmeth.to_le_bytes());
        }
        bytes
    }

    /// Content fingerprint over the raw pair bytes.
    pub fn hash(&self) -> u64 {
        let mut fp = Fingerprint::new();
        let mut buf = [0u8; 4 * 1024];
        for chunk in self.pairs.chunks(buf.len() / 4) {
            for (i, pair) in chunk.iter().enumerate() {
                buf[4 * i..4 * i + 2].copy_from_slice(&pair.n_meth.to_le_bytes());
                buf[4 * i + 2..4 * i + 4].copy_from_slice(&pair.n_unmeth.to_le_bytes());
            }
            fp.update(&buf[..4 * chunk.len()]);
        }
        fp.finish()
    }

    /// Per-CpG saturating addition; lengths must already be equal.
    pub fn add(&mut self, other: &MethylomeData) {
        for (a, b) in self.pairs.iter_mut().zip(&other.pairs) {
            a.n_meth = a.n_meth.saturating_add(b.n_meth);
            a.n_unmeth = a.n_unmeth.saturating_add(b.n_unmeth);
        }
    }

    /// Sum counts over the whole methylome.
    pub fn total_levels(&self) -> Level {
        let mut level = Level::default();
        for pair in &self.pairs {
            level.n_meth += pair.n_meth as u32;
            level.n_unmeth += pair.n_unmeth as u32;
        }
        level
    }

    /// Sum counts over the whole methylome, with the covered-site count.
    pub fn total_levels_covered(&self) -> LevelCovered {
        let mut level = LevelCovered::default();
        for pair in &self.pairs {
            level.n_meth += pair.n_meth as u32;
            level.n_unmeth += pair.n_unmeth as u32;
            level.n_covered += pair.is_covered() as u32;
        }
        level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn pairs(raw: &[(u16, u16)]) -> MethylomeData {
        MethylomeData {
            pairs: raw
                .iter()
                .map(|&(n_meth, n_unmeth)| MethCounts { n_meth, n_unmeth })
                .collect(),
        }
    }

    #[rstest]
    fn test_raw_round_trip() {
        let data = pairs(&[(10, 5), (0, 0), (3, 3), (65535, 1)]);
        let mut bytes = Vec::new();
        data.write_raw(&mut bytes).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes, data.to_le_bytes());

        let back = MethylomeData::read_raw(&mut bytes.as_slice(), 4).unwrap();
        assert_eq!(back, data);
    }

    #[rstest]
    fn test_hash_matches_byte_image() {
        let data = pairs(&[(1, 2), (3, 4), (0, 0)]);
        let mut fp = methq_core::fingerprint::Fingerprint::new();
        fp.update(&data.to_le_bytes());
        assert_eq!(data.hash(), fp.finish());
    }

    #[rstest]
    #[case(100, 50, 100, 50)]
    #[case(0, 0, 0, 0)]
    #[case(65535, 65535, 65535, 65535)]
    #[case(131070, 65535, 65535, 32767)]
    #[case(65536, 0, 65535, 0)]
    fn test_clamp_counts(
        #[case] m: u32,
        #[case] u: u32,
        #[case] want_m: u16,
        #[case] want_u: u16,
    ) {
        let got = clamp_counts(m, u);
        assert_eq!(got.n_meth, want_m);
        assert_eq!(got.n_unmeth, want_u);
    }

    #[rstest]
    fn test_clamp_preserves_larger_at_max() {
        let got = clamp_counts(1_000_000, 250_000);
        assert_eq!(got.n_meth, u16::MAX);
        // ratio 4:1 preserved, fraction truncated
        assert_eq!(got.n_unmeth, 16383);
    }

    #[rstest]
    fn test_totals() {
        let data = pairs(&[(10, 5), (0, 0), (3, 3)]);
        let total = data.total_levels();
        assert_eq!((total.n_meth, total.n_unmeth), (13, 8));

        let covered = data.total_levels_covered();
        assert_eq!(covered.n_covered, 2);
        assert_eq!(covered.n_meth, 13);
    }

    #[rstest]
    fn test_add_saturates() {
        let mut a = pairs(&[(65000, 1)]);
        let b = pairs(&[(1000, 2)]);
        a.add(&b);
        assert_eq!(a.pairs[0].n_meth, u16::MAX);
        assert_eq!(a.pairs[0].n_unmeth, 3);
    }
}
