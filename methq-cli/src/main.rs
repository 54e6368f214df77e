mod check;
mod format;
mod index;
mod list;
mod logging;
mod merge;
mod query;
mod server;

use anyhow::Result;
use clap::Command;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "methq";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .author("Databio")
        .about("Query DNA methylation levels over genomic intervals and bins, locally or against a methylome server.")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(index::create_index_cli())
        .subcommand(format::create_format_cli())
        .subcommand(merge::create_merge_cli())
        .subcommand(check::create_check_cli())
        .subcommand(list::create_list_cli())
        .subcommand(query::create_query_cli())
        .subcommand(server::create_server_cli())
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    match matches.subcommand() {
        Some((index::INDEX_CMD, sub)) => index::run(sub),
        Some((format::FORMAT_CMD, sub)) => format::run(sub),
        Some((merge::MERGE_CMD, sub)) => merge::run(sub),
        Some((check::CHECK_CMD, sub)) => check::run(sub),
        Some((list::LIST_CMD, sub)) => list::run(sub),
        Some((query::QUERY_CMD, sub)) => query::run(sub),
        Some((server::SERVER_CMD, sub)) => server::run(sub),
        _ => unreachable!("subcommand is required"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_tree_is_consistent() {
        build_parser().debug_assert();
    }
}
