use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};

use methq_core::models::IntervalSet;
use methq_index::GenomeIndex;
use methq_methylome::LevelsPayload;
use methq_net::output::{write_bins, write_intervals};
use methq_net::{ClientConfig, LocalClient, QueryClient};

pub const QUERY_CMD: &str = "query";

pub fn create_query_cli() -> Command {
    Command::new(QUERY_CMD)
        .about("Query methylation levels over intervals or genome bins")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML client configuration file; flags override its values"),
        )
        .arg(
            Arg::new("index-dir")
                .long("index-dir")
                .short('x')
                .help("Directory holding the genome index"),
        )
        .arg(
            Arg::new("assembly")
                .long("assembly")
                .short('a')
                .required(true)
                .help("Assembly to query against"),
        )
        .arg(
            Arg::new("methylomes")
                .long("methylomes")
                .short('m')
                .required(true)
                .num_args(1..)
                .help("Names of the methylomes to query"),
        )
        .arg(
            Arg::new("intervals")
                .long("intervals")
                .short('i')
                .help("BED file of intervals, sorted by (chrom, start)"),
        )
        .arg(
            Arg::new("bin-size")
                .long("bin-size")
                .short('b')
                .value_parser(clap::value_parser!(u32).range(1..))
                .help("Bin size in bp; tiles the whole genome"),
        )
        .arg(
            Arg::new("covered")
                .long("covered")
                .action(ArgAction::SetTrue)
                .help("Also report the number of covered CpGs per range"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .required(true)
                .help("Output file"),
        )
        .arg(
            Arg::new("local")
                .long("local")
                .action(ArgAction::SetTrue)
                .help("Read methylomes from a local directory instead of a server"),
        )
        .arg(
            Arg::new("hostname")
                .long("hostname")
                .short('H')
                .help("Server to query"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .value_parser(clap::value_parser!(u16))
                .help("Server port"),
        )
        .arg(
            Arg::new("methylome-dir")
                .long("methylome-dir")
                .short('d')
                .help("Methylome directory for local queries"),
        )
}

struct QueryArgs {
    index_dir: PathBuf,
    hostname: String,
    port: u16,
    methylome_dir: Option<PathBuf>,
    local: bool,
}

fn effective_args(matches: &ArgMatches) -> Result<QueryArgs> {
    let config = match matches.get_one::<String>("config") {
        Some(path) => ClientConfig::load(Path::new(path))
            .with_context(|| format!("failed to load config {}", path))?,
        None => ClientConfig::default(),
    };

    let index_dir = matches
        .get_one::<String>("index-dir")
        .map(PathBuf::from)
        .unwrap_or(config.index_dir);
    let hostname = matches
        .get_one::<String>("hostname")
        .cloned()
        .unwrap_or(config.hostname);
    let port = matches
        .get_one::<u16>("port")
        .copied()
        .unwrap_or(config.port);
    let methylome_dir = matches
        .get_one::<String>("methylome-dir")
        .map(PathBuf::from)
        .or(config.methylome_dir);

    Ok(QueryArgs {
        index_dir,
        hostname,
        port,
        methylome_dir,
        local: matches.get_flag("local"),
    })
}

pub fn run(matches: &ArgMatches) -> Result<()> {
    crate::logging::init(methq_net::LogLevel::Info, None)?;

    let args = effective_args(matches)?;
    let assembly = matches.get_one::<String>("assembly").unwrap();
    let names: Vec<String> = matches
        .get_many::<String>("methylomes")
        .unwrap()
        .cloned()
        .collect();
    let covered = matches.get_flag("covered");
    let output = matches.get_one::<String>("output").unwrap();

    let index = GenomeIndex::read(&args.index_dir, assembly)
        .with_context(|| format!("failed to read index for {}", assembly))?;

    let bed_file = matches.get_one::<String>("intervals");
    let bin_size = matches.get_one::<u32>("bin-size").copied();

    // results are gathered completely before anything is written, so a
    // failing methylome never leaves partial output behind
    match (bed_file, bin_size) {
        (Some(bed_file), None) => {
            let set = IntervalSet::try_from(Path::new(bed_file.as_str()))
                .with_context(|| format!("failed to read intervals from {}", bed_file))?;
            let resolved = index.resolve_intervals(&set.intervals)?;
            let results = if args.local {
                local_client(&args, &index)?.intervals(&names, &resolved, covered)?
            } else {
                let query = index.make_query(&resolved)?;
                QueryClient::new(&args.hostname, args.port).intervals(
                    index.meta.index_hash,
                    &names,
                    &query,
                    covered,
                )?
            };
            let mut out = std::fs::File::create(output)?;
            for (name, payload) in names.iter().zip(&results) {
                write_block_header(&mut out, name, payload)?;
                write_intervals(&mut out, &set.intervals, payload)?;
            }
        }
        (None, Some(bin_size)) => {
            let results = if args.local {
                local_client(&args, &index)?.bins(&names, bin_size, covered)?
            } else {
                QueryClient::new(&args.hostname, args.port).bins(
                    index.meta.index_hash,
                    &names,
                    bin_size,
                    covered,
                )?
            };
            let mut out = std::fs::File::create(output)?;
            for (name, payload) in names.iter().zip(&results) {
                write_block_header(&mut out, name, payload)?;
                write_bins(&mut out, &index, bin_size, payload)?;
            }
        }
        _ => bail!("exactly one of --intervals and --bin-size is required"),
    }

    tracing::info!(%output, "wrote query results");
    Ok(())
}

fn local_client(args: &QueryArgs, index: &GenomeIndex) -> Result<LocalClient> {
    let methylome_dir = args
        .methylome_dir
        .as_ref()
        .context("--methylome-dir is required for local queries")?;
    Ok(LocalClient {
        index: index.clone(),
        methylome_dir: methylome_dir.clone(),
    })
}

fn write_block_header<W: Write>(out: &mut W, name: &str, payload: &LevelsPayload) -> Result<()> {
    writeln!(out, "#methylome\t{}\t{}", name, payload.len())?;
    Ok(())
}
