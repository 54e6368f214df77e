use std::fmt::{self, Display};
use std::io::BufRead;
use std::path::Path;

use crate::errors::IntervalError;
use crate::models::interval::{RawInterval, parse_interval_line};
use crate::utils::get_dynamic_reader;

///
/// An ordered collection of intervals read from a BED-like file.
///
/// The order is the file order; callers that need the sorted-by-position
/// precondition of the query path should check `is_sorted()`.
///
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalSet {
    pub intervals: Vec<RawInterval>,
}

impl TryFrom<&Path> for IntervalSet {
    type Error = IntervalError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let reader = get_dynamic_reader(path)
            .map_err(|e| IntervalError::FileReadError(format!("{}: {}", path.display(), e)))?;

        let mut intervals = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_interval_line(&line) {
                Some(gi) => {
                    if gi.start >= gi.stop {
                        return Err(IntervalError::BackwardsInterval(line));
                    }
                    intervals.push(gi);
                }
                None => {
                    // comments and track lines fall through silently; a line
                    // with columns that fail to parse is a real error
                    if !line.starts_with('#')
                        && !line.starts_with("track")
                        && !line.starts_with("browser")
                    {
                        return Err(IntervalError::IntervalParseError(line));
                    }
                }
            }
        }

        if intervals.is_empty() {
            return Err(IntervalError::EmptyIntervalSet(
                path.display().to_string(),
            ));
        }

        Ok(IntervalSet { intervals })
    }
}

impl IntervalSet {
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    ///
    /// True when intervals appear in file order sorted by (chrom, start),
    /// chromosomes grouped. This is the precondition for offset queries.
    ///
    pub fn is_sorted(&self) -> bool {
        let mut seen: Vec<&str> = Vec::new();
        for pair in self.intervals.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.chrom == b.chrom {
                if a.start > b.start {
                    return false;
                }
            } else {
                // a chromosome may not reappear after another one started
                if seen.iter().any(|c| *c == b.chrom.as_str()) {
                    return false;
                }
                seen.push(&a.chrom);
            }
        }
        true
    }
}

impl Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IntervalSet with {} intervals.", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn write_bed(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".bed").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[rstest]
    fn test_read_bed_file() {
        let file = write_bed("chr1\t10\t20\nchr1\t30\t40\nchr2\t0\t5\n");
        let set = IntervalSet::try_from(file.path()).unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.is_sorted());
    }

    #[rstest]
    fn test_read_skips_comments() {
        let file = write_bed("# header\ntrack name=x\nchr1\t10\t20\n");
        let set = IntervalSet::try_from(file.path()).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[rstest]
    fn test_unsorted_detected() {
        let file = write_bed("chr1\t30\t40\nchr1\t10\t20\n");
        let set = IntervalSet::try_from(file.path()).unwrap();
        assert!(!set.is_sorted());
    }

    #[rstest]
    fn test_chrom_reappearing_is_unsorted() {
        let file = write_bed("chr1\t10\t20\nchr2\t0\t5\nchr1\t30\t40\n");
        let set = IntervalSet::try_from(file.path()).unwrap();
        assert!(!set.is_sorted());
    }

    #[rstest]
    fn test_backwards_interval_rejected() {
        let file = write_bed("chr1\t20\t10\n");
        assert!(matches!(
            IntervalSet::try_from(file.path()),
            Err(IntervalError::BackwardsInterval(_))
        ));
    }

    #[rstest]
    fn test_empty_file_rejected() {
        let file = write_bed("# nothing here\n");
        assert!(matches!(
            IntervalSet::try_from(file.path()),
            Err(IntervalError::EmptyIntervalSet(_))
        ));
    }
}
