//! ArgMatches → CliAction / IngestConfig conversion.
//!
//! The effective configuration is the config file (or defaults), with
//! `--backend`, `--db` and `--user` applied on top.

use clap::ArgMatches;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use stepline::{IngestConfig, SteplineBuilder};

use crate::logging::LogFormat;

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    /// Apply a batch of updates.
    Ingest { input: Input },
    /// Print one reconciled event.
    Show { event_name: String, event_id: String },
    /// Create storage and exit.
    Init,
}

/// Where an ingest batch comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    /// Read the whole batch text.
    pub fn read_to_string(&self) -> io::Result<String> {
        match self {
            Input::Stdin => {
                let mut text = String::new();
                io::stdin().read_to_string(&mut text)?;
                Ok(text)
            }
            Input::File(path) => fs::read_to_string(path),
        }
    }
}

/// Convert clap ArgMatches into a CliAction.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    let (sub_name, sub_matches) = matches
        .subcommand()
        .ok_or_else(|| "No command provided".to_string())?;

    match sub_name {
        "ingest" => {
            let input = match sub_matches.get_one::<String>("input").map(String::as_str) {
                None | Some("-") => Input::Stdin,
                Some(path) => Input::File(PathBuf::from(path)),
            };
            Ok(CliAction::Ingest { input })
        }
        "show" => Ok(CliAction::Show {
            event_name: required(sub_matches, "event_name")?,
            event_id: required(sub_matches, "event_id")?,
        }),
        "init" => Ok(CliAction::Init),
        other => Err(format!("Unknown command: {}", other)),
    }
}

fn required(matches: &ArgMatches, name: &str) -> Result<String, String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .ok_or_else(|| format!("missing <{}>", name))
}

/// Selected log format.
pub fn log_format(matches: &ArgMatches) -> LogFormat {
    matches
        .get_one::<String>("log-format")
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

/// Build the effective configuration.
pub fn resolve_config(matches: &ArgMatches) -> stepline::Result<IngestConfig> {
    let base = match matches.get_one::<PathBuf>("config") {
        Some(path) => IngestConfig::from_file(path)?,
        None => IngestConfig::default(),
    };

    let mut builder = SteplineBuilder::from_config(base);
    match matches.get_one::<String>("backend").map(String::as_str) {
        Some("document") => builder = builder.document(),
        Some("relational") => builder = builder.relational(),
        _ => {}
    }
    if let Some(path) = matches.get_one::<PathBuf>("db") {
        builder = builder.path(path);
    }
    if let Some(user) = matches.get_one::<String>("user") {
        builder = builder.user(user.clone());
    }

    let config = builder.config().clone();
    config.validate()?;
    Ok(config)
}
