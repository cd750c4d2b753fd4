//! Command-line grammar.

use clap::{value_parser, Arg, Command};
use std::path::PathBuf;

/// Build the `stepline` command tree.
pub fn build_cli() -> Command {
    Command::new("stepline")
        .about("Reconcile out-of-order telemetry updates into events")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .global(true)
                .help("TOML config file"),
        )
        .arg(
            Arg::new("backend")
                .long("backend")
                .value_parser(["document", "relational"])
                .global(true)
                .help("Storage backend (overrides the config file)"),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .global(true)
                .help("Snapshot file or SQLite database (overrides the config file)"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .short('u')
                .global(true)
                .help("User that scopes event keys (overrides the config file)"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_parser(["pretty", "json"])
                .default_value("pretty")
                .global(true)
                .help("Log output format"),
        )
        .subcommand(
            Command::new("ingest")
                .about("Apply a JSON batch of updates and print the acknowledgement")
                .arg(
                    Arg::new("input")
                        .value_name("FILE")
                        .default_value("-")
                        .help("Batch file, or - for stdin"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Print a reconciled event as JSON")
                .arg(Arg::new("event_name").value_name("EVENT_NAME").required(true))
                .arg(Arg::new("event_id").value_name("EVENT_ID").required(true)),
        )
        .subcommand(Command::new("init").about("Create the storage files and schema"))
}
