use std::path::Path;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};

use methq_methylome::Methylome;

pub const MERGE_CMD: &str = "merge";

pub fn create_merge_cli() -> Command {
    Command::new(MERGE_CMD)
        .about("Merge replicate methylomes by per-CpG saturating addition")
        .arg(
            Arg::new("methylome-dir")
                .long("methylome-dir")
                .short('d')
                .required(true)
                .help("Directory holding the input methylomes"),
        )
        .arg(
            Arg::new("names")
                .long("names")
                .short('n')
                .required(true)
                .num_args(2..)
                .help("Names of the methylomes to merge"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .required(true)
                .help("Name of the merged methylome"),
        )
        .arg(
            Arg::new("zip")
                .long("zip")
                .short('z')
                .action(ArgAction::SetTrue)
                .help("Compress the merged data file"),
        )
}

pub fn run(matches: &ArgMatches) -> Result<()> {
    crate::logging::init(methq_net::LogLevel::Info, None)?;

    let dir = Path::new(matches.get_one::<String>("methylome-dir").unwrap());
    let names: Vec<&String> = matches.get_many::<String>("names").unwrap().collect();
    let output = matches.get_one::<String>("output").unwrap();
    let zip = matches.get_flag("zip");

    let mut merged = Methylome::read(dir, names[0])
        .with_context(|| format!("failed to read methylome {}", names[0]))?;
    for name in &names[1..] {
        let next = Methylome::read(dir, name)
            .with_context(|| format!("failed to read methylome {}", name))?;
        merged
            .add(&next)
            .with_context(|| format!("failed to merge {}", name))?;
    }
    merged.write(dir, output, zip)?;

    tracing::info!(
        %output,
        n_inputs = names.len(),
        methylome_hash = merged.meta.methylome_hash,
        "wrote merged methylome"
    );
    Ok(())
}
