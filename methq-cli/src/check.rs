use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgMatches, Command};

use methq_index::GenomeIndex;
use methq_methylome::Methylome;

pub const CHECK_CMD: &str = "check";

pub fn create_check_cli() -> Command {
    Command::new(CHECK_CMD)
        .about("Verify methylomes against their genome index and print totals")
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
                .help("Assembly the methylomes claim"),
        )
        .arg(
            Arg::new("methylome-dir")
                .long("methylome-dir")
                .short('d')
                .required(true)
                .help("Directory holding the methylomes"),
        )
        .arg(
            Arg::new("methylomes")
                .long("methylomes")
                .short('m')
                .required(true)
                .num_args(1..)
                .help("Names of the methylomes to check"),
        )
}

/// Check one methylome; reads validate sizes and the data fingerprint,
/// `consistent_with` validates the index binding.
fn check_one(methylome_dir: &Path, name: &str, index: &GenomeIndex) -> Result<Methylome> {
    let methylome = Methylome::read(methylome_dir, name)
        .with_context(|| format!("failed to read methylome {}", name))?;
    methylome
        .consistent_with(index)
        .context("methylome is inconsistent with the index")?;
    Ok(methylome)
}

pub fn run(matches: &ArgMatches) -> Result<()> {
    crate::logging::init(methq_net::LogLevel::Info, None)?;

    let index_dir = matches.get_one::<String>("index-dir").unwrap();
    let assembly = matches.get_one::<String>("assembly").unwrap();
    let methylome_dir = Path::new(matches.get_one::<String>("methylome-dir").unwrap());
    let names: Vec<&String> = matches.get_many::<String>("methylomes").unwrap().collect();

    let index = GenomeIndex::read(Path::new(index_dir), assembly)
        .with_context(|| format!("failed to read index for {}", assembly))?;

    // every methylome in the batch is checked; one bad file must not hide
    // the status of the rest
    let mut n_failed = 0usize;
    for name in &names {
        match check_one(methylome_dir, name, &index) {
            Ok(methylome) => {
                let totals = methylome.data.total_levels_covered();
                println!(
                    "{}\tok\tn_cpgs={}\tn_covered={}\tn_meth={}\tn_unmeth={}",
                    name, methylome.meta.n_cpgs, totals.n_covered, totals.n_meth, totals.n_unmeth
                );
            }
            Err(error) => {
                n_failed += 1;
                println!("{}\tFAIL\t{:#}", name, error);
            }
        }
    }

    if n_failed > 0 {
        bail!("{} of {} methylomes failed the check", n_failed, names.len());
    }
    Ok(())
}
