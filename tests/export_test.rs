//! Export protocol against scripted and local backends

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rasterfetch::export::{AggregationRequest, BackendStatus, BoundingRect, Catalog};
use rasterfetch::tiff::{GeoReference, GeoTiffBuilder, SampleType};
use rasterfetch::{
    ChannelExtractor, ConversionPipeline, DatasetMaskRegistry, ExportBackend, ExportJob, ExportSpec, JobState,
    LocalExportBackend, MaskFunction, PollPolicy, PreFilter, RasterError, RasterResult,
};

/// Backend replaying a fixed status sequence; the last status repeats
struct ScriptedBackend {
    statuses: RefCell<VecDeque<BackendStatus>>,
    queries: Cell<usize>,
}

impl ScriptedBackend {
    fn new(statuses: Vec<BackendStatus>) -> Self {
        ScriptedBackend {
            statuses: RefCell::new(statuses.into()),
            queries: Cell::new(0),
        }
    }
}

impl ExportBackend for ScriptedBackend {
    fn submit(&self, _request: &AggregationRequest) -> RasterResult<String> {
        Ok("task-42".to_string())
    }

    fn status(&self, _job_id: &str) -> RasterResult<BackendStatus> {
        self.queries.set(self.queries.get() + 1);
        let mut statuses = self.statuses.borrow_mut();
        let next = statuses.pop_front().unwrap_or(BackendStatus::Active);
        if statuses.is_empty() {
            statuses.push_back(next.clone());
        }
        Ok(next)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn spec(dataset: &str) -> ExportSpec {
    ExportSpec {
        dataset: dataset.to_string(),
        bands: vec!["B4".to_string(), "B3".to_string(), "B2".to_string()],
        start: "2020-01-01".to_string(),
        end: "2021-01-01".to_string(),
        region: BoundingRect::new(0.0, 0.0, 20.0, 20.0),
        scale: 10.0,
        folder: "composites".to_string(),
        description: "harbor".to_string(),
    }
}

fn fast_policy() -> PollPolicy {
    PollPolicy::default().with_interval(Duration::ZERO)
}

#[test]
fn test_wait_returns_after_completion() {
    use BackendStatus::*;
    let backend = ScriptedBackend::new(vec![Active, Active, Active, Completed]);
    let mut job = ExportJob::submit(&backend, spec("USDA/NAIP/DOQQ"), &DatasetMaskRegistry::default()).unwrap();

    job.wait(&backend, &fast_policy()).unwrap();
    assert_eq!(job.state(), JobState::Completed);
    assert_eq!(job.status_checks(), 4);
    assert_eq!(backend.queries.get(), 4);
    assert_eq!(job.output_name(), PathBuf::from("composites/harbor.tif"));
}

#[test]
fn test_failure_on_first_poll() {
    let backend = ScriptedBackend::new(vec![BackendStatus::Failed(None)]);
    let mut job = ExportJob::submit(&backend, spec("USDA/NAIP/DOQQ"), &DatasetMaskRegistry::default()).unwrap();

    let err = job.wait(&backend, &fast_policy()).unwrap_err();
    assert!(matches!(err, RasterError::ExportFailed { ref job_id, reason: None } if job_id == "task-42"));
    assert_eq!(job.status_checks(), 1);
}

#[test]
fn test_timeout_while_active() {
    let backend = ScriptedBackend::new(vec![BackendStatus::Active]);
    let mut job = ExportJob::submit(&backend, spec("USDA/NAIP/DOQQ"), &DatasetMaskRegistry::default()).unwrap();
    let policy = PollPolicy::default()
        .with_interval(Duration::from_millis(5))
        .with_timeout(Duration::from_millis(20));

    let err = job.wait(&backend, &policy).unwrap_err();
    assert!(matches!(err, RasterError::ExportTimeout { ref job_id, .. } if job_id == "task-42"));
    assert_eq!(job.state(), JobState::Active);
    assert!(job.status_checks() >= 2);
}

#[test]
fn test_unknown_dataset_resolves_to_no_masking() {
    let backend = ScriptedBackend::new(vec![BackendStatus::Completed]);
    let job = ExportJob::submit(&backend, spec("USDA/NAIP/DOQQ"), &DatasetMaskRegistry::default()).unwrap();
    assert_eq!(job.request().mask, MaskFunction::Identity);
    assert_eq!(job.request().pre_filter, PreFilter::None);
}

/// 2x2 observation anchored at (0, 20) with 10 m pixels in EPSG:3857
fn write_observation(path: &Path, red: [f64; 4], qa: [f64; 4]) {
    let mut builder = GeoTiffBuilder::new(2, 2, SampleType::U16).with_geo_reference(GeoReference {
        origin_x: 0.0,
        origin_y: 20.0,
        pixel_width: 10.0,
        pixel_height: 10.0,
        epsg: 3857,
    });
    builder.add_band(red.to_vec()).unwrap();
    builder.add_band(vec![1000.0; 4]).unwrap();
    builder.add_band(vec![2000.0; 4]).unwrap();
    builder.add_band(qa.to_vec()).unwrap();
    builder.write(path).unwrap();
}

const CATALOG: &str = r#"
[[collection]]
id = "COPERNICUS/S2_SR"
bands = ["B4", "B3", "B2", "QA60"]
epsg = 3857

[[collection.observation]]
path = "obs/march.tif"
date = "2020-03-01"
properties = { CLOUDY_PIXEL_PERCENTAGE = 5 }

[[collection.observation]]
path = "obs/june.tif"
date = "2020-06-01"
properties = { CLOUDY_PIXEL_PERCENTAGE = 10.5 }

[[collection.observation]]
path = "obs/cloudy.tif"
date = "2020-07-01"
properties = { CLOUDY_PIXEL_PERCENTAGE = 60 }

[[collection.observation]]
path = "obs/next-year.tif"
date = "2021-01-01"
properties = { CLOUDY_PIXEL_PERCENTAGE = 0 }
"#;

#[test]
fn test_local_backend_masked_mean() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("obs")).unwrap();
    write_observation(&dir.path().join("obs/march.tif"), [1000.0, 2000.0, 3000.0, 4000.0], [0.0, 1024.0, 0.0, 3072.0]);
    write_observation(&dir.path().join("obs/june.tif"), [3000.0, 4000.0, 5000.0, 6000.0], [0.0, 0.0, 2048.0, 1024.0]);
    // cloudy.tif and next-year.tif are never written: filtering must skip them

    let catalog_path = dir.path().join("catalog.toml");
    fs::write(&catalog_path, CATALOG).unwrap();
    let storage = dir.path().join("storage");
    let backend = LocalExportBackend::new(Catalog::load(&catalog_path).unwrap(), &storage);

    let mut job = ExportJob::submit(&backend, spec("COPERNICUS/S2_SR"), &DatasetMaskRegistry::default()).unwrap();
    assert_eq!(job.id(), "local-0001");
    assert!(backend.local_output(job.id()).is_none());

    job.wait(&backend, &fast_policy()).unwrap();
    assert_eq!(job.status_checks(), 1);

    let output = backend.local_output(job.id()).unwrap();
    assert_eq!(output, storage.join("composites/harbor.tif"));

    let (source, grids) = ChannelExtractor::read_bands(&output, &[1, 2]).unwrap();
    assert_eq!((source.width, source.height), (2, 2));
    assert_eq!(source.sample_type, SampleType::F32);
    let geo = source.geo_reference.unwrap();
    assert_eq!((geo.origin_x, geo.origin_y, geo.pixel_width, geo.epsg), (0.0, 20.0, 10.0, 3857));

    let red = grids[0].data();
    let expected = [0.2, 0.4, 0.3];
    for (value, expected) in red.iter().zip(expected) {
        assert!((value - expected).abs() < 1e-6, "{} != {}", value, expected);
    }
    assert!(red[3].is_nan());
    assert!((grids[1].get(0, 0) - 0.1).abs() < 1e-6);

    let image = ConversionPipeline::new()
        .convert(&output, "png", &dir.path().join("images"), None, None)
        .unwrap();
    assert!(image.ends_with("images/harbor.png"));
}

#[test]
fn test_local_backend_reports_missing_band() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Catalog::from_str(CATALOG, dir.path()).unwrap();
    let backend = LocalExportBackend::new(catalog, dir.path().join("storage"));

    let mut request = spec("COPERNICUS/S2_SR");
    request.bands = vec!["B8".to_string()];
    let mut job = ExportJob::submit(&backend, request, &DatasetMaskRegistry::default()).unwrap();

    let err = job.wait(&backend, &fast_policy()).unwrap_err();
    assert!(matches!(err, RasterError::ExportFailed { reason: Some(ref r), .. } if r.contains("B8")));
    assert_eq!(job.state(), JobState::Failed);
}

#[test]
fn test_local_backend_rejects_oversized_region() {
    let dir = tempfile::tempdir().unwrap();
    let content = "[[collection]]\nid = \"MERCATOR/MOSAIC\"\nbands = [\"B4\", \"B3\", \"B2\"]\nepsg = 3857\n\n\
                   [[collection.observation]]\npath = \"mosaic.tif\"\ndate = \"2020-03-01\"\n";
    let catalog = Catalog::from_str(content, dir.path()).unwrap();
    let backend = LocalExportBackend::new(catalog, dir.path().join("storage"));

    let mut request = spec("MERCATOR/MOSAIC");
    request.region = BoundingRect::new(0.0, 0.0, 1e10, 1e10);
    request.scale = 1.0;
    let mut job = ExportJob::submit(&backend, request, &DatasetMaskRegistry::default()).unwrap();

    let err = job.wait(&backend, &fast_policy()).unwrap_err();
    assert!(matches!(err, RasterError::ExportFailed { reason: Some(ref r), .. } if r.contains("exceeds")));
    assert_eq!(job.state(), JobState::Failed);

    // the job table stays usable after the rejected export
    let next = backend.submit(job.request()).unwrap();
    assert_eq!(next, "local-0002");
    assert!(matches!(backend.status(&next).unwrap(), BackendStatus::Failed(Some(_))));
}
