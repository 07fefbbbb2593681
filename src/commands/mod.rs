//! CLI command implementations
//!
//! One `Command` per subcommand, selected by `RasterfetchCommandFactory`.

pub mod command_traits;
pub mod convert_command;
pub mod fetch_command;

pub use command_traits::{Command, CommandFactory};
pub use convert_command::ConvertCommand;
pub use fetch_command::FetchCommand;

use clap::ArgMatches;
use std::str::FromStr;

use crate::errors::{RasterError, RasterResult};
use crate::utils::logger::Logger;

/// Factory for creating command instances based on CLI arguments
pub struct RasterfetchCommandFactory;

impl RasterfetchCommandFactory {
    pub fn new() -> Self {
        RasterfetchCommandFactory
    }
}

impl Default for RasterfetchCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CommandFactory<'a> for RasterfetchCommandFactory {
    fn create_command(&self, args: &ArgMatches, logger: &'a Logger) -> RasterResult<Box<dyn Command + 'a>> {
        match args.subcommand() {
            Some(("convert", sub_args)) => Ok(Box::new(ConvertCommand::new(sub_args, logger)?)),
            Some(("fetch", sub_args)) => Ok(Box::new(FetchCommand::new(sub_args, logger)?)),
            Some((name, _)) => Err(RasterError::GenericError(format!("Unknown command: {}", name))),
            None => Err(RasterError::GenericError("No command given, use 'convert' or 'fetch'".to_string())),
        }
    }
}

/// Parses an optional string argument into `T`
pub(crate) fn parse_optional<T: FromStr>(args: &ArgMatches, name: &str) -> RasterResult<Option<T>> {
    match args.get_one::<String>(name) {
        Some(text) => text.trim().parse::<T>()
            .map(Some)
            .map_err(|_| RasterError::GenericError(format!("Invalid value for --{}: {}", name, text))),
        None => Ok(None),
    }
}

/// Parses a string argument that has a default or is required
pub(crate) fn parse_required<T: FromStr>(args: &ArgMatches, name: &str) -> RasterResult<T> {
    parse_optional(args, name)?
        .ok_or_else(|| RasterError::GenericError(format!("Missing --{}", name)))
}

pub(crate) fn required_string(args: &ArgMatches, name: &str) -> RasterResult<String> {
    args.get_one::<String>(name)
        .cloned()
        .ok_or_else(|| RasterError::GenericError(format!("Missing {}", name)))
}
