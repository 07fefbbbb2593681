//! Local observation catalog
//!
//! A TOML file listing collections of GeoTIFF observations:
//!
//! ```toml
//! [[collection]]
//! id = "COPERNICUS/S2_SR"
//! bands = ["B4", "B3", "B2", "QA60"]
//! epsg = 4326
//!
//! [[collection.observation]]
//! path = "s2/20180601.tif"
//! date = "2018-06-01"
//! properties = { CLOUDY_PIXEL_PERCENTAGE = 12.5 }
//! ```
//!
//! Relative observation paths resolve against the catalog's directory.

use log::debug;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{RasterError, RasterResult};
use crate::tiff::constants::epsg;

use super::request::CalendarDate;

/// One acquisition: a multi-band GeoTIFF plus its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub path: PathBuf,
    pub date: CalendarDate,
    pub properties: BTreeMap<String, f64>,
}

/// A dataset: band names in file order and its observations
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub id: String,
    pub bands: Vec<String>,
    pub epsg: u16,
    pub observations: Vec<Observation>,
}

impl Collection {
    /// 1-based band number of `name` in the observation files
    pub fn band_number(&self, name: &str) -> Option<usize> {
        self.bands.iter().position(|b| b == name).map(|i| i + 1)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    collections: Vec<Collection>,
}

impl Catalog {
    /// Reads and parses a catalog file
    pub fn load(path: &Path) -> RasterResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| RasterError::SourceNotFound {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let catalog = Self::from_str(&content, base_dir)?;
        debug!("Loaded catalog {} with {} collections", path.display(), catalog.collections.len());
        Ok(catalog)
    }

    /// Parses catalog TOML, resolving relative paths against `base_dir`
    pub fn from_str(content: &str, base_dir: &Path) -> RasterResult<Self> {
        let toml_value: toml::Value = match content.parse() {
            Ok(value) => value,
            Err(e) => return Err(RasterError::GenericError(format!("Failed to parse catalog TOML: {}", e))),
        };

        let mut catalog = Catalog::default();
        let entries = toml_value.get("collection").and_then(|v| v.as_array()).cloned().unwrap_or_default();
        for entry in &entries {
            catalog.collections.push(parse_collection(entry, base_dir)?);
        }
        Ok(catalog)
    }

    pub fn collection(&self, id: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == id)
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }
}

fn parse_collection(entry: &toml::Value, base_dir: &Path) -> RasterResult<Collection> {
    let id = entry.get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| catalog_error("collection without an 'id'"))?
        .to_string();

    let bands = entry.get("bands")
        .and_then(|v| v.as_array())
        .ok_or_else(|| catalog_error(&format!("collection '{}' has no 'bands' list", id)))?
        .iter()
        .map(|b| b.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| catalog_error(&format!("collection '{}' has a non-string band name", id)))?;

    let epsg = match entry.get("epsg").and_then(|v| v.as_integer()) {
        Some(code) => u16::try_from(code)
            .map_err(|_| catalog_error(&format!("collection '{}' has invalid EPSG code {}", id, code)))?,
        None => epsg::WGS84,
    };

    let mut observations = Vec::new();
    if let Some(list) = entry.get("observation").and_then(|v| v.as_array()) {
        for observation in list {
            observations.push(parse_observation(observation, &id, base_dir)?);
        }
    }

    Ok(Collection { id, bands, epsg, observations })
}

fn parse_observation(entry: &toml::Value, collection: &str, base_dir: &Path) -> RasterResult<Observation> {
    let path = entry.get("path")
        .and_then(|v| v.as_str())
        .ok_or_else(|| catalog_error(&format!("observation in '{}' without a 'path'", collection)))?;
    let path = Path::new(path);
    let path = if path.is_absolute() { path.to_path_buf() } else { base_dir.join(path) };

    let date = entry.get("date")
        .and_then(|v| v.as_str())
        .ok_or_else(|| catalog_error(&format!("observation {} without a 'date'", path.display())))?;
    let date = CalendarDate::parse(date)?;

    let mut properties = BTreeMap::new();
    if let Some(table) = entry.get("properties").and_then(|v| v.as_table()) {
        for (key, value) in table {
            let number = value.as_float().or_else(|| value.as_integer().map(|i| i as f64));
            match number {
                Some(number) => {
                    properties.insert(key.clone(), number);
                }
                None => debug!("Ignoring non-numeric property '{}' of {}", key, path.display()),
            }
        }
    }

    Ok(Observation { path, date, properties })
}

fn catalog_error(message: &str) -> RasterError {
    RasterError::GenericError(format!("Invalid catalog: {}", message))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
[[collection]]
id = "COPERNICUS/S2_SR"
bands = ["B4", "B3", "B2", "QA60"]

[[collection.observation]]
path = "s2/a.tif"
date = "2018-06-01"
properties = { CLOUDY_PIXEL_PERCENTAGE = 12, SPACECRAFT = "S2A" }

[[collection]]
id = "USDA/NAIP/DOQQ"
bands = ["R", "G", "B", "N"]
epsg = 26918
"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = Catalog::from_str(CATALOG, Path::new("/data")).unwrap();
        assert_eq!(catalog.collections().len(), 2);

        let s2 = catalog.collection("COPERNICUS/S2_SR").unwrap();
        assert_eq!(s2.epsg, epsg::WGS84);
        assert_eq!(s2.band_number("QA60"), Some(4));
        assert_eq!(s2.observations[0].path, PathBuf::from("/data/s2/a.tif"));
        assert_eq!(s2.observations[0].properties.get("CLOUDY_PIXEL_PERCENTAGE"), Some(&12.0));
        assert!(!s2.observations[0].properties.contains_key("SPACECRAFT"));

        let naip = catalog.collection("USDA/NAIP/DOQQ").unwrap();
        assert_eq!(naip.epsg, 26918);
        assert!(naip.observations.is_empty());
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let content = "[[collection]]\nid = \"x\"\nbands = [\"a\"]\n[[collection.observation]]\npath = \"a.tif\"\ndate = \"June\"\n";
        assert!(Catalog::from_str(content, Path::new(".")).is_err());
    }
}
