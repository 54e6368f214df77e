use std::path::Path;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

use methq_index::GenomeIndex;

pub const INDEX_CMD: &str = "index";

pub fn create_index_cli() -> Command {
    Command::new(INDEX_CMD)
        .about("Build a genome index from a FASTA file")
        .arg(
            Arg::new("genome")
                .long("genome")
                .short('g')
                .required(true)
                .help("Path to the genome FASTA file"),
        )
        .arg(
            Arg::new("index-dir")
                .long("index-dir")
                .short('x')
                .required(true)
                .help("Directory to write the index into"),
        )
        .arg(
            Arg::new("assembly")
                .long("assembly")
                .short('a')
                .required(true)
                .help("Assembly name; also names the output files"),
        )
}

pub fn run(matches: &ArgMatches) -> Result<()> {
    crate::logging::init(methq_net::LogLevel::Info, None)?;

    let genome = matches.get_one::<String>("genome").unwrap();
    let index_dir = matches.get_one::<String>("index-dir").unwrap();
    let assembly = matches.get_one::<String>("assembly").unwrap();

    let index = GenomeIndex::from_fasta(Path::new(genome), assembly)
        .with_context(|| format!("failed to scan {}", genome))?;
    std::fs::create_dir_all(index_dir)?;
    index.write(Path::new(index_dir), assembly)?;

    tracing::info!(
        %assembly,
        n_chroms = index.meta.chrom_order.len(),
        n_cpgs = index.meta.n_cpgs,
        index_hash = index.meta.index_hash,
        "wrote genome index"
    );
    Ok(())
}
