//! Composite export command
//!
//! Submits an export to the local backend, waits for it and converts the
//! resulting GeoTIFF to an RGB image.

use clap::ArgMatches;
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use crate::commands::command_traits::Command;
use crate::commands::{parse_optional, parse_required, required_string};
use crate::errors::{RasterError, RasterResult};
use crate::export::{BoundingRect, Catalog, ExportBackend, ExportJob, ExportSpec, LocalExportBackend, PollPolicy};
use crate::masking::DatasetMaskRegistry;
use crate::pipeline::ConversionPipeline;
use crate::render::OutputFormat;
use crate::utils::logger::Logger;
use crate::utils::path_utils;

/// Exports a masked temporal mean and converts it
pub struct FetchCommand<'a> {
    catalog: PathBuf,
    storage: PathBuf,
    spec: ExportSpec,
    format: String,
    min: Option<f64>,
    max: Option<f64>,
    image_dir: PathBuf,
    policy: PollPolicy,
    /// Logger for recording operations
    logger: &'a Logger,
}

impl<'a> FetchCommand<'a> {
    /// Create a new fetch command
    ///
    /// # Arguments
    /// * `args` - Matches of the `fetch` subcommand
    /// * `logger` - Logger for recording operations
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> RasterResult<Self> {
        let region = args.get_many::<String>("region")
            .map(|values| values.map(|v| v.trim().parse::<f64>()).collect::<Result<Vec<_>, _>>())
            .transpose()
            .map_err(|e| RasterError::GenericError(format!("Invalid --region value: {}", e)))?
            .unwrap_or_default();
        let region = match region.as_slice() {
            [xmin, ymin, xmax, ymax] => BoundingRect::new(*xmin, *ymin, *xmax, *ymax),
            _ => return Err(RasterError::GenericError("--region expects four values: xmin ymin xmax ymax".to_string())),
        };

        let bands = args.get_many::<String>("bands")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        let spec = ExportSpec {
            dataset: required_string(args, "data")?,
            bands,
            start: required_string(args, "start")?,
            end: required_string(args, "end")?,
            region,
            scale: parse_required(args, "mpp")?,
            folder: required_string(args, "output_dir")?,
            description: required_string(args, "desc")?,
        };

        let format = required_string(args, "format")?;
        OutputFormat::parse(&format)?;

        let mut policy = PollPolicy::default();
        if let Some(secs) = parse_optional::<f64>(args, "poll-interval")? {
            policy = policy.with_interval(seconds(secs, "poll-interval")?);
        }
        if let Some(secs) = parse_optional::<f64>(args, "timeout")? {
            policy = policy.with_timeout(seconds(secs, "timeout")?);
        }

        Ok(FetchCommand {
            catalog: PathBuf::from(required_string(args, "catalog")?),
            storage: PathBuf::from(required_string(args, "storage")?),
            spec,
            format,
            min: parse_optional(args, "min")?,
            max: parse_optional(args, "max")?,
            image_dir: PathBuf::from(path_utils::trim_trailing_slash(&required_string(args, "out")?)),
            policy,
            logger,
        })
    }
}

fn seconds(value: f64, name: &str) -> RasterResult<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| RasterError::GenericError(format!("Invalid value for --{}: {}", name, value)))
}

impl<'a> Command for FetchCommand<'a> {
    fn execute(&self) -> RasterResult<()> {
        info!("Exporting {} composite from catalog {}", self.spec.dataset, self.catalog.display());
        let catalog = Catalog::load(&self.catalog)?;
        let backend = LocalExportBackend::new(catalog, &self.storage).with_progress(true);
        let registry = DatasetMaskRegistry::default();

        let mut job = ExportJob::submit(&backend, self.spec.clone(), &registry)?;
        job.wait(&backend, &self.policy)?;

        let geotiff = backend.local_output(job.id())
            .ok_or_else(|| RasterError::GenericError(format!("Export {} produced no local file", job.id())))?;
        let image = ConversionPipeline::new()
            .convert(&geotiff, &self.format, &self.image_dir, self.min, self.max)?;

        self.logger.log_summary("Export", &[
            ("job", job.id().to_string()),
            ("dataset", self.spec.dataset.clone()),
            ("status checks", job.status_checks().to_string()),
            ("geotiff", geotiff.display().to_string()),
            ("image", image.display().to_string()),
        ])?;
        Ok(())
    }
}
