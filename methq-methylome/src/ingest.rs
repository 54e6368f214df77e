//! Formatting counts files into methylomes.
//!
//! The input is the stepped counts format methylation callers emit:
//! optional `#`-prefixed header lines (a `#chrom size` pair per chromosome,
//! checked against the index; anything else ignored), a bare chromosome
//! name line opening each chromosome, then one `step n_meth n_unmeth` line
//! per covered CpG where `step` is the distance from the previous site's
//! position (from 0 at the start of the chromosome). Sites absent from the
//! input stay (0, 0). Files may be gzip'd.

use std::io::BufRead;
use std::path::Path;

use methq_core::utils::get_dynamic_reader;
use methq_index::GenomeIndex;

use crate::data::{MethCounts, MethylomeData, clamp_counts};
use crate::errors::MethylomeError;
use crate::metadata::MethylomeMetadata;
use crate::Methylome;

/// Read a counts file and lay it out against `index`.
pub fn format_counts_file(path: &Path, index: &GenomeIndex) -> Result<Methylome, MethylomeError> {
    let reader = get_dynamic_reader(path)?;

    let mut pairs = vec![MethCounts::default(); index.meta.n_cpgs as usize];
    let mut ch_id: Option<usize> = None;
    let mut chrom_base = 0usize; // global ordinal of the chromosome start
    let mut cpg_in = 0usize; // index into the chromosome's positions
    let mut pos = 0u64;
    let mut n_header_chroms = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix('#') {
            verify_header_line(rest, index, &mut n_header_chroms, line_no)?;
            continue;
        }
        if !line.as_bytes()[0].is_ascii_digit() {
            // a new chromosome opens
            let id = index.meta.chrom_id(line).ok_or_else(|| {
                MethylomeError::InconsistentCounts(format!(
                    "line {}: unknown chromosome {}",
                    line_no + 1,
                    line
                ))
            })? as usize;
            ch_id = Some(id);
            chrom_base = index.meta.chrom_offset[id] as usize;
            cpg_in = 0;
            pos = 0;
            continue;
        }

        let id = ch_id.ok_or_else(|| {
            MethylomeError::InconsistentCounts(format!(
                "line {}: counts before any chromosome line",
                line_no + 1
            ))
        })?;
        let (step, n_meth, n_unmeth) = parse_counts_line(line, line_no)?;
        let curr = pos + step;

        let positions = &index.data.positions[id];
        // sites the input skipped stay zero; move the cursor past them
        while cpg_in < positions.len() && (positions[cpg_in] as u64) < curr {
            cpg_in += 1;
        }
        if cpg_in >= positions.len() || positions[cpg_in] as u64 != curr {
            return Err(MethylomeError::InconsistentCounts(format!(
                "line {}: position {} is not a CpG site of {}",
                line_no + 1,
                curr,
                index.meta.chrom_order[id]
            )));
        }
        pairs[chrom_base + cpg_in] = clamp_counts(n_meth, n_unmeth);
        cpg_in += 1;
        pos = curr;
    }

    let data = MethylomeData { pairs };
    let meta = MethylomeMetadata::from_parts(&index.meta, &data, false);
    Ok(Methylome { meta, data })
}

fn verify_header_line(
    rest: &str,
    index: &GenomeIndex,
    n_header_chroms: &mut usize,
    line_no: usize,
) -> Result<(), MethylomeError> {
    let fields: Vec<&str> = rest.split_whitespace().collect();
    // only "#chrom size" pairs are checked; other header lines pass
    let [chrom, size] = fields.as_slice() else {
        return Ok(());
    };
    let Ok(size) = size.parse::<u32>() else {
        return Ok(());
    };
    let Some(id) = index.meta.chrom_id(chrom) else {
        return Err(MethylomeError::InconsistentCounts(format!(
            "line {}: header names unknown chromosome {}",
            line_no + 1,
            chrom
        )));
    };
    if id as usize != *n_header_chroms {
        return Err(MethylomeError::InconsistentCounts(format!(
            "line {}: header chromosome {} out of order",
            line_no + 1,
            chrom
        )));
    }
    if index.meta.chrom_size[id as usize] != size {
        return Err(MethylomeError::InconsistentCounts(format!(
            "line {}: {} size {} does not match index ({})",
            line_no + 1,
            chrom,
            size,
            index.meta.chrom_size[id as usize]
        )));
    }
    *n_header_chroms += 1;
    Ok(())
}

fn parse_counts_line(line: &str, line_no: usize) -> Result<(u64, u32, u32), MethylomeError> {
    let mut fields = line.split_whitespace();
    let parse_err = || {
        MethylomeError::InconsistentCounts(format!("line {}: malformed counts line", line_no + 1))
    };
    let step = fields
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(parse_err)?;
    let n_meth = fields
        .next()
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(parse_err)?;
    let n_unmeth = fields
        .next()
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(parse_err)?;
    Ok((step, n_meth, n_unmeth))
}
