//! Stepline CLI: ingest update batches and inspect reconciled events.
//!
//! ```text
//! stepline [--config FILE] [--backend document|relational] [--db PATH]
//!          [--user USER] [--log-format pretty|json] <COMMAND>
//!
//!   ingest [FILE|-]            apply a JSON batch, print the acknowledgement
//!   show EVENT_NAME EVENT_ID   print the event, exit 1 if absent
//!   init                       create storage files and schema
//! ```

mod commands;
mod logging;
mod parse;

use std::process::ExitCode;

use anyhow::{Context, Result};
use stepline::Stepline;
use tracing::info;

use commands::build_cli;
use parse::{log_format, matches_to_action, resolve_config, CliAction};

fn main() -> ExitCode {
    let matches = build_cli().get_matches();
    logging::init_logging(log_format(&matches));

    match run(&matches) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(matches: &clap::ArgMatches) -> Result<ExitCode> {
    let action = matches_to_action(matches).map_err(anyhow::Error::msg)?;
    let config = resolve_config(matches).context("invalid configuration")?;
    let db = Stepline::open(config).context("failed to connect storage")?;

    let code = match action {
        CliAction::Ingest { input } => {
            let text = input
                .read_to_string()
                .with_context(|| format!("failed to read batch from {:?}", input))?;
            let ack = db.submit_json(&text)?;
            println!("{}", serde_json::to_string_pretty(&ack)?);
            ExitCode::SUCCESS
        }
        CliAction::Show {
            event_name,
            event_id,
        } => match db.event(&event_name, &event_id)? {
            Some(event) => {
                println!("{}", serde_json::to_string_pretty(&event)?);
                ExitCode::SUCCESS
            }
            None => {
                eprintln!("event {}/{} not found", event_name, event_id);
                ExitCode::from(1)
            }
        },
        CliAction::Init => {
            info!(backend = db.backend(), path = ?db.config().backend.path(), "Storage initialized");
            ExitCode::SUCCESS
        }
    };

    db.close().context("failed to release storage")?;
    Ok(code)
}
