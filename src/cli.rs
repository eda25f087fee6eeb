//! Minimal CLI parsing for the inspection commands.

use std::env;
use std::path::PathBuf;

use anyhow::{Result, bail};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Command {
    /// Print the model graph and generated operation names
    #[default]
    Describe,
    /// Print the query plan for a request file
    Plan { model: String, request: PathBuf },
    /// Print the SQL statements for a request file
    Sql { model: String, request: PathBuf },
    Help,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub command: Command,
    pub schema_path_override: Option<PathBuf>,
}

pub const USAGE: &str = "\
usage: autocrud [--schema <path>] [describe]
       autocrud [--schema <path>] plan <model> <request.json>
       autocrud [--schema <path>] sql <model> <request.json>";

impl CliOptions {
    pub fn from_args() -> Result<Self> {
        Self::parse(env::args().skip(1))
    }

    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = CliOptions::default();
        let mut positional = Vec::new();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => options.command = Command::Help,
                "--schema" => match args.next() {
                    Some(value) => options.schema_path_override = Some(value.into()),
                    None => bail!("--schema requires a path"),
                },
                _ if arg.starts_with("--schema=") => {
                    if let Some((_, value)) = arg.split_once('=') {
                        options.schema_path_override = Some(value.into());
                    }
                }
                _ if arg.starts_with('-') => bail!("unknown option {arg}"),
                _ => positional.push(arg),
            }
        }

        if options.command == Command::Help {
            return Ok(options);
        }

        let mut positional = positional.into_iter();
        options.command = match positional.next().as_deref() {
            None | Some("describe") => Command::Describe,
            Some(name @ ("plan" | "sql")) => {
                let (Some(model), Some(request)) = (positional.next(), positional.next()) else {
                    bail!("{name} requires <model> <request.json>");
                };
                if name == "plan" {
                    Command::Plan { model, request: request.into() }
                } else {
                    Command::Sql { model, request: request.into() }
                }
            }
            Some(other) => bail!("unknown command {other}"),
        };
        if let Some(extra) = positional.next() {
            bail!("unexpected argument {extra}");
        }

        Ok(options)
    }
}
