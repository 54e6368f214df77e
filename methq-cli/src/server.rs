use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

use methq_net::server::{shutdown_channel, shutdown_on_signal, write_pid_file};
use methq_net::{Server, ServerConfig};

pub const SERVER_CMD: &str = "server";

pub fn create_server_cli() -> Command {
    Command::new(SERVER_CMD)
        .about("Serve methylome queries over TCP")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML configuration file; flags override its values"),
        )
        .arg(
            Arg::new("hostname")
                .long("hostname")
                .short('H')
                .help("Address to listen on"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .value_parser(clap::value_parser!(u16))
                .help("Port to listen on"),
        )
        .arg(
            Arg::new("methylome-dir")
                .long("methylome-dir")
                .short('d')
                .help("Directory holding the methylomes to serve"),
        )
        .arg(
            Arg::new("index-dir")
                .long("index-dir")
                .short('x')
                .help("Directory holding the genome indexes"),
        )
        .arg(
            Arg::new("n-threads")
                .long("n-threads")
                .short('t')
                .value_parser(clap::value_parser!(usize))
                .help("Worker threads; 0 means one per core"),
        )
        .arg(
            Arg::new("max-resident")
                .long("max-resident")
                .short('r')
                .value_parser(clap::value_parser!(usize))
                .help("Maximum number of methylomes kept in memory"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .short('v')
                .help("One of debug, info, warning, error, critical"),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .short('l')
                .help("Append log lines to this file instead of stderr"),
        )
        .arg(
            Arg::new("pid-file")
                .long("pid-file")
                .help("Write the server pid here, failing if the file exists"),
        )
}

fn effective_config(matches: &ArgMatches) -> Result<ServerConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ServerConfig::load(Path::new(path))
            .with_context(|| format!("failed to load config {}", path))?,
        None => ServerConfig::default(),
    };

    if let Some(hostname) = matches.get_one::<String>("hostname") {
        config.hostname = hostname.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        config.port = *port;
    }
    if let Some(dir) = matches.get_one::<String>("methylome-dir") {
        config.methylome_dir = PathBuf::from(dir);
    }
    if let Some(dir) = matches.get_one::<String>("index-dir") {
        config.index_dir = PathBuf::from(dir);
    }
    if let Some(n) = matches.get_one::<usize>("n-threads") {
        config.n_threads = *n;
    }
    if let Some(n) = matches.get_one::<usize>("max-resident") {
        config.max_resident = *n;
    }
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.log_level = crate::logging::parse_level(level)?;
    }
    if let Some(path) = matches.get_one::<String>("log-file") {
        config.log_file = Some(PathBuf::from(path));
    }
    if let Some(path) = matches.get_one::<String>("pid-file") {
        config.pid_file = Some(PathBuf::from(path));
    }
    Ok(config)
}

pub fn run(matches: &ArgMatches) -> Result<()> {
    let config = effective_config(matches)?;
    crate::logging::init(config.log_level, config.log_file.as_deref())?;

    if let Some(pid_file) = &config.pid_file {
        write_pid_file(pid_file)?;
    }

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if config.n_threads > 0 {
        builder.worker_threads(config.n_threads);
    }
    let runtime = builder
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    runtime.block_on(async {
        let server = Server::bind(&config).await?;
        let (trigger, shutdown) = shutdown_channel();
        tokio::spawn(shutdown_on_signal(trigger));
        server.run(shutdown).await
    })?;

    // a daemon supervisor keys off this file; remove it on clean exit
    if let Some(pid_file) = &config.pid_file {
        let _ = std::fs::remove_file(pid_file);
    }
    Ok(())
}
