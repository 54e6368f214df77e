use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgMatches, Command};

use methq_index::IndexSet;
use methq_methylome::MethylomeMetadata;

pub const LIST_CMD: &str = "list";

pub fn create_list_cli() -> Command {
    Command::new(LIST_CMD)
        .about("List the genome indexes and methylomes in local directories")
        .arg(
            Arg::new("index-dir")
                .long("index-dir")
                .short('x')
                .help("Directory holding genome indexes"),
        )
        .arg(
            Arg::new("methylome-dir")
                .long("methylome-dir")
                .short('d')
                .help("Directory holding methylomes"),
        )
}

pub fn run(matches: &ArgMatches) -> Result<()> {
    crate::logging::init(methq_net::LogLevel::Info, None)?;

    let index_dir = matches.get_one::<String>("index-dir");
    let methylome_dir = matches.get_one::<String>("methylome-dir");
    if index_dir.is_none() && methylome_dir.is_none() {
        bail!("nothing to list; give --index-dir or --methylome-dir");
    }

    if let Some(dir) = index_dir {
        let indexes = IndexSet::load_dir(Path::new(dir))
            .with_context(|| format!("failed to load indexes from {}", dir))?;
        for assembly in indexes.assemblies() {
            let index = indexes.get(&assembly).unwrap();
            println!(
                "index\t{}\tn_cpgs={}\tn_chroms={}\tindex_hash={}",
                assembly,
                index.meta.n_cpgs,
                index.meta.chrom_order.len(),
                index.meta.index_hash
            );
        }
    }

    if let Some(dir) = methylome_dir {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(name) = file_name.strip_suffix(methq_methylome::METADATA_EXTENSION) {
                names.push(name.to_string());
            }
        }
        names.sort();
        for name in names {
            let meta = MethylomeMetadata::read(&methq_methylome::metadata_path(
                Path::new(dir),
                &name,
            ))
            .with_context(|| format!("failed to read metadata for {}", name))?;
            println!(
                "methylome\t{}\tassembly={}\tn_cpgs={}\tcompressed={}",
                name, meta.assembly, meta.n_cpgs, meta.is_compressed
            );
        }
    }
    Ok(())
}
