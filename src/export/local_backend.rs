//! Export backend over a local observation catalog
//!
//! Jobs are queued on submit and executed on their first status query, so a
//! caller sees the same submit/poll protocol a hosted service offers. Output
//! is a float32 GeoTIFF holding the masked per-pixel mean of every
//! observation that passes the date window and the pre-filter.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::errors::{RasterError, RasterResult};
use crate::extractor::ChannelExtractor;
use crate::tiff::builder::GeoTiffBuilder;
use crate::tiff::constants::compression;
use crate::tiff::geotags::{self, GeoReference};
use crate::tiff::types::SampleType;
use crate::utils::progress::ProgressTracker;

use super::backend::{BackendStatus, ExportBackend};
use super::catalog::{Catalog, Collection, Observation};
use super::request::{AggregationRequest, Reducer};

/// Largest output grid a local export may produce
pub const MAX_PIXELS: usize = 100_000_000;

enum LocalJob {
    Queued(AggregationRequest),
    Completed(PathBuf),
    Failed(String),
}

#[derive(Default)]
struct JobTable {
    next_id: usize,
    jobs: HashMap<String, LocalJob>,
}

/// Output pixel grid of one export
struct TargetGrid {
    width: usize,
    height: usize,
    geo_reference: GeoReference,
}

impl TargetGrid {
    /// Fails when the grid would exceed `MAX_PIXELS`
    fn for_request(request: &AggregationRequest, collection: &Collection) -> RasterResult<Self> {
        let region = request.region;
        let (_, center_y) = region.center();
        let (meters_x, meters_y) = geotags::meters_per_unit(collection.epsg, center_y);
        let pixel_width = request.scale / meters_x;
        let pixel_height = request.scale / meters_y;

        let columns = (region.width() / pixel_width).ceil().max(1.0);
        let rows = (region.height() / pixel_height).ceil().max(1.0);
        let too_large = || RasterError::InvalidRequest(format!(
            "export of {}x{} pixels exceeds the limit of {} pixels", columns, rows, MAX_PIXELS));
        if !columns.is_finite() || !rows.is_finite() || columns > MAX_PIXELS as f64 || rows > MAX_PIXELS as f64 {
            return Err(too_large());
        }
        let (width, height) = (columns as usize, rows as usize);
        match width.checked_mul(height) {
            Some(count) if count <= MAX_PIXELS => {}
            _ => return Err(too_large()),
        }

        Ok(TargetGrid {
            width,
            height,
            geo_reference: GeoReference {
                origin_x: region.xmin,
                origin_y: region.ymax,
                pixel_width,
                pixel_height,
                epsg: collection.epsg,
            },
        })
    }

    fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// Running per-pixel sums for the mean reducer
struct MeanAccumulator {
    sums: Vec<Vec<f64>>,
    counts: Vec<u32>,
}

impl MeanAccumulator {
    fn new(band_count: usize, pixel_count: usize) -> Self {
        MeanAccumulator {
            sums: vec![vec![0.0; pixel_count]; band_count],
            counts: vec![0; pixel_count],
        }
    }

    fn add(&mut self, pixel: usize, values: &[f64]) {
        for (band, value) in self.sums.iter_mut().zip(values) {
            band[pixel] += value;
        }
        self.counts[pixel] += 1;
    }

    /// Mean per band; NaN where no observation contributed
    fn finish(self) -> Vec<Vec<f64>> {
        let counts = self.counts;
        self.sums.into_iter()
            .map(|band| band.into_iter()
                .zip(&counts)
                .map(|(sum, &count)| if count == 0 { f64::NAN } else { sum / count as f64 })
                .collect())
            .collect()
    }
}

/// Runs exports against a `Catalog`, writing results under `storage`
pub struct LocalExportBackend {
    catalog: Catalog,
    storage: PathBuf,
    show_progress: bool,
    table: Mutex<JobTable>,
}

impl LocalExportBackend {
    pub fn new(catalog: Catalog, storage: impl Into<PathBuf>) -> Self {
        LocalExportBackend {
            catalog,
            storage: storage.into(),
            show_progress: false,
            table: Mutex::new(JobTable::default()),
        }
    }

    /// Draw a progress bar while aggregating observations
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    fn lock(&self) -> RasterResult<MutexGuard<'_, JobTable>> {
        self.table.lock()
            .map_err(|_| RasterError::GenericError("local job table lock poisoned".to_string()))
    }

    /// Builds the composite for `request` and returns the written path
    fn run(&self, request: &AggregationRequest) -> RasterResult<PathBuf> {
        let collection = self.catalog.collection(&request.dataset)
            .ok_or_else(|| RasterError::InvalidRequest(format!("dataset '{}' is not in the catalog", request.dataset)))?;

        let mut band_numbers = request.bands.iter()
            .map(|name| collection.band_number(name).ok_or_else(|| RasterError::InvalidRequest(
                format!("dataset '{}' has no band '{}'", collection.id, name))))
            .collect::<RasterResult<Vec<_>>>()?;
        if let Some(qa_band) = request.mask.required_band() {
            let qa_number = collection.band_number(qa_band).ok_or_else(|| RasterError::InvalidRequest(
                format!("dataset '{}' has no '{}' band for masking", collection.id, qa_band)))?;
            band_numbers.push(qa_number);
        }

        let observations: Vec<&Observation> = collection.observations.iter()
            .filter(|o| o.date >= request.start && o.date < request.end)
            .filter(|o| request.pre_filter.accepts(&o.properties))
            .collect();
        info!("{} of {} observations of {} pass the date window and {}",
              observations.len(), collection.observations.len(), collection.id, request.pre_filter);
        if observations.is_empty() {
            return Err(RasterError::InvalidRequest("no observations match the request".to_string()));
        }

        let target = TargetGrid::for_request(request, collection)?;
        debug!("Target grid {}x{} at {:?}", target.width, target.height, target.geo_reference);

        let composite = match request.reducer {
            Reducer::Mean => self.mean_composite(request, &observations, &band_numbers, &target)?,
        };

        let mut builder = GeoTiffBuilder::new(target.width, target.height, SampleType::F32)
            .with_compression(compression::DEFLATE)
            .with_geo_reference(target.geo_reference)
            .with_nodata("nan");
        for band in composite {
            builder.add_band(band)?;
        }

        let output = self.storage.join(request.output_name());
        builder.write(&output)?;
        info!("Wrote {}x{} composite to {}", target.width, target.height, output.display());
        Ok(output)
    }

    fn mean_composite(
        &self,
        request: &AggregationRequest,
        observations: &[&Observation],
        band_numbers: &[usize],
        target: &TargetGrid,
    ) -> RasterResult<Vec<Vec<f64>>> {
        let progress = if self.show_progress {
            ProgressTracker::new(observations.len() as u64, "Aggregating observations")
        } else {
            ProgressTracker::hidden(observations.len() as u64)
        };

        let mut accumulator = MeanAccumulator::new(request.bands.len(), target.pixel_count());
        let mut values = vec![0.0; request.bands.len()];

        for observation in observations {
            progress.set_message(&observation.date.to_string());
            let (source, mut grids) = ChannelExtractor::read_bands(&observation.path, band_numbers)?;
            let geo = source.geo_reference.ok_or_else(|| RasterError::InvalidRequest(
                format!("{} has no georeferencing", source.path.display())))?;
            if geo.epsg != target.geo_reference.epsg {
                return Err(RasterError::InvalidRequest(format!(
                    "{} is in EPSG:{}, expected EPSG:{}", source.path.display(), geo.epsg, target.geo_reference.epsg)));
            }

            let qa = if request.mask.required_band().is_some() { grids.pop() } else { None };
            let masked = request.mask.apply(grids, qa.as_ref())?;
            debug!("{}: {} valid pixels", source.path.display(), masked.valid_count());

            for row in 0..target.height {
                for col in 0..target.width {
                    let (x, y) = target.geo_reference.pixel_center(col, row);
                    let Some((source_col, source_row)) = geo.pixel_at(x, y, source.width, source.height) else {
                        continue;
                    };
                    let index = source_row * source.width + source_col;
                    if !masked.is_valid(index) {
                        continue;
                    }
                    for (value, band) in values.iter_mut().zip(&masked.bands) {
                        *value = band.data()[index];
                    }
                    if values.iter().any(|v| v.is_nan()) {
                        continue;
                    }
                    accumulator.add(row * target.width + col, &values);
                }
            }
            progress.increment(1);
        }

        progress.finish();
        Ok(accumulator.finish())
    }
}

impl ExportBackend for LocalExportBackend {
    fn submit(&self, request: &AggregationRequest) -> RasterResult<String> {
        let mut table = self.lock()?;
        table.next_id += 1;
        let id = format!("local-{:04}", table.next_id);
        table.jobs.insert(id.clone(), LocalJob::Queued(request.clone()));
        debug!("Queued {} for {}", id, request.dataset);
        Ok(id)
    }

    fn status(&self, job_id: &str) -> RasterResult<BackendStatus> {
        let mut table = self.lock()?;
        let job = table.jobs.get_mut(job_id)
            .ok_or_else(|| RasterError::InvalidRequest(format!("unknown job id '{}'", job_id)))?;

        let queued = match job {
            LocalJob::Queued(request) => Some(request.clone()),
            _ => None,
        };
        if let Some(request) = queued {
            *job = match self.run(&request) {
                Ok(output) => LocalJob::Completed(output),
                Err(e) => {
                    warn!("Export {} failed: {}", job_id, e);
                    LocalJob::Failed(e.to_string())
                }
            };
        }

        Ok(match job {
            LocalJob::Queued(_) => BackendStatus::Active,
            LocalJob::Completed(_) => BackendStatus::Completed,
            LocalJob::Failed(reason) => BackendStatus::Failed(Some(reason.clone())),
        })
    }

    fn local_output(&self, job_id: &str) -> Option<PathBuf> {
        let table = self.lock().ok()?;
        match table.jobs.get(job_id) {
            Some(LocalJob::Completed(path)) => Some(path.clone()),
            _ => None,
        }
    }

    fn name(&self) -> &str {
        "local"
    }
}
