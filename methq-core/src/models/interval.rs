use std::fmt::{self, Display};

///
/// One half-open genomic interval `[start, stop)` named by chromosome.
///
/// Positions are 0-based; `stop` is exclusive. This is the form intervals
/// take before they have been resolved against a genome index, so the
/// chromosome is still a name rather than an id.
///
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
pub struct RawInterval {
    pub chrom: String,
    pub start: u32,
    pub stop: u32,
}

impl RawInterval {
    ///
    /// Width of the interval in bp
    ///
    pub fn width(&self) -> u32 {
        self.stop - self.start
    }

    ///
    /// Get file string of the interval
    ///
    pub fn as_string(&self) -> String {
        format!("{}\t{}\t{}", self.chrom, self.start, self.stop)
    }
}

impl Display for RawInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

///
/// Parse one BED-like line into an interval. Columns beyond the third are
/// ignored. Returns None for comment lines, track/browser lines and lines
/// with fewer than three columns.
///
pub fn parse_interval_line(line: &str) -> Option<RawInterval> {
    if line.starts_with('#') || line.starts_with("track") || line.starts_with("browser") {
        return None;
    }
    let mut fields = line.split('\t');
    let chrom = fields.next()?;
    let start = fields.next().and_then(|s| s.trim().parse::<u32>().ok())?;
    let stop = fields.next().and_then(|s| s.trim().parse::<u32>().ok())?;
    Some(RawInterval {
        chrom: chrom.to_string(),
        start,
        stop,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_parse_minimal_line() {
        let gi = parse_interval_line("chr1\t100\t200").unwrap();
        assert_eq!(gi.chrom, "chr1");
        assert_eq!(gi.start, 100);
        assert_eq!(gi.stop, 200);
        assert_eq!(gi.width(), 100);
    }

    #[rstest]
    fn test_parse_line_with_extra_columns() {
        let gi = parse_interval_line("chr2\t5\t25\tname\t0\t+").unwrap();
        assert_eq!(gi.chrom, "chr2");
        assert_eq!(gi.width(), 20);
    }

    #[rstest]
    #[case("# a comment")]
    #[case("track name=foo")]
    #[case("browser position chr1")]
    #[case("chr1\t100")]
    #[case("chr1\tx\t200")]
    fn test_parse_rejects(#[case] line: &str) {
        assert!(parse_interval_line(line).is_none());
    }

    #[rstest]
    fn test_as_string_round_trip() {
        let gi = RawInterval {
            chrom: "chrX".to_string(),
            start: 7,
            stop: 19,
        };
        assert_eq!(parse_interval_line(&gi.as_string()).unwrap(), gi);
    }
}
