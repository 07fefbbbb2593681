//! Command pattern interfaces
//!
//! Each CLI subcommand is parsed into a `Command` up front, so argument
//! errors surface before any file is touched.

use crate::errors::RasterResult;
use crate::utils::logger::Logger;

/// An executable CLI operation
pub trait Command {
    /// Execute the command
    ///
    /// # Returns
    /// Result indicating success or an error
    fn execute(&self) -> RasterResult<()>;
}

/// Factory for creating commands from CLI arguments
pub trait CommandFactory<'a> {
    /// Create a new Command instance based on CLI arguments
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `logger` - Logger receiving run summaries
    ///
    /// # Returns
    /// A command that implements the Command trait, or an error
    fn create_command(&self, args: &clap::ArgMatches, logger: &'a Logger) -> RasterResult<Box<dyn Command + 'a>>;
}
