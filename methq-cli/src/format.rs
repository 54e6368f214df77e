use std::path::Path;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};

use methq_index::GenomeIndex;
use methq_methylome::ingest::format_counts_file;

pub const FORMAT_CMD: &str = "format";

pub fn create_format_cli() -> Command {
    Command::new(FORMAT_CMD)
        .about("Format a counts file into a methylome laid out on a genome index")
        .arg(
            Arg::new("counts")
                .long("counts")
                .short('c')
                .required(true)
                .help("Counts input file, may be gzip'd"),
        )
        .arg(
            Arg::new("index-dir")
                .long("index-dir")
                .short('x')
                .required(true)
                .help("Directory holding the genome index"),
        )
        .arg(
            Arg::new("assembly")
                .long("assembly")
                .short('a')
                .required(true)
                .help("Assembly the counts were called against"),
        )
        .arg(
            Arg::new("methylome-dir")
                .long("methylome-dir")
                .short('d')
                .required(true)
                .help("Directory to write the methylome into"),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .short('n')
                .required(true)
                .help("Methylome (sample) name"),
        )
        .arg(
            Arg::new("zip")
                .long("zip")
                .short('z')
                .action(ArgAction::SetTrue)
                .help("Compress the methylome data file"),
        )
}

pub fn run(matches: &ArgMatches) -> Result<()> {
    crate::logging::init(methq_net::LogLevel::Info, None)?;

    let counts = matches.get_one::<String>("counts").unwrap();
    let index_dir = matches.get_one::<String>("index-dir").unwrap();
    let assembly = matches.get_one::<String>("assembly").unwrap();
    let methylome_dir = matches.get_one::<String>("methylome-dir").unwrap();
    let name = matches.get_one::<String>("name").unwrap();
    let zip = matches.get_flag("zip");

    let index = GenomeIndex::read(Path::new(index_dir), assembly)
        .with_context(|| format!("failed to read index for {}", assembly))?;
    let mut methylome = format_counts_file(Path::new(counts), &index)
        .with_context(|| format!("failed to format {}", counts))?;
    std::fs::create_dir_all(methylome_dir)?;
    methylome.write(Path::new(methylome_dir), name, zip)?;

    tracing::info!(
        %name,
        n_cpgs = methylome.meta.n_cpgs,
        methylome_hash = methylome.meta.methylome_hash,
        compressed = zip,
        "wrote methylome"
    );
    Ok(())
}
