//! Raster to image conversion command

use clap::ArgMatches;
use log::info;
use std::path::PathBuf;

use crate::commands::command_traits::Command;
use crate::commands::{parse_optional, required_string};
use crate::errors::RasterResult;
use crate::extractor::ChannelSelection;
use crate::pipeline::ConversionPipeline;
use crate::render::OutputFormat;
use crate::utils::logger::Logger;
use crate::utils::path_utils;

/// Converts a GeoTIFF, or every GeoTIFF in a directory, to RGB images
pub struct ConvertCommand<'a> {
    source: PathBuf,
    output_dir: PathBuf,
    format: String,
    min: Option<f64>,
    max: Option<f64>,
    channels: ChannelSelection,
    /// Logger for recording operations
    logger: &'a Logger,
}

impl<'a> ConvertCommand<'a> {
    /// Create a new convert command
    ///
    /// # Arguments
    /// * `args` - Matches of the `convert` subcommand
    /// * `logger` - Logger for recording operations
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> RasterResult<Self> {
        let source = PathBuf::from(required_string(args, "source")?);
        let output_dir = required_string(args, "output")?;
        let format = required_string(args, "format")?;
        OutputFormat::parse(&format)?;

        let channels = match args.get_one::<String>("channels") {
            Some(text) => ChannelSelection::parse(text)?,
            None => ChannelSelection::default(),
        };

        Ok(ConvertCommand {
            source,
            output_dir: PathBuf::from(path_utils::trim_trailing_slash(&output_dir)),
            format,
            min: parse_optional(args, "min")?,
            max: parse_optional(args, "max")?,
            channels,
            logger,
        })
    }
}

impl<'a> Command for ConvertCommand<'a> {
    fn execute(&self) -> RasterResult<()> {
        let pipeline = ConversionPipeline::new().with_channels(self.channels);

        let written = if self.source.is_dir() {
            pipeline.convert_directory(&self.source, &self.format, &self.output_dir, self.min, self.max)?
        } else {
            vec![pipeline.convert(&self.source, &self.format, &self.output_dir, self.min, self.max)?]
        };

        info!("Converted {} file(s) into {}", written.len(), self.output_dir.display());
        let outputs = written.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ");
        self.logger.log_summary("Conversion", &[
            ("source", self.source.display().to_string()),
            ("channels", self.channels.to_string()),
            ("outputs", outputs),
        ])?;

        Ok(())
    }
}
