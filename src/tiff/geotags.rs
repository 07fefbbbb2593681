//! GeoTIFF georeferencing
//!
//! Only north-up rasters are handled: a single tiepoint anchoring the
//! upper-left corner of pixel (0, 0) plus a pixel scale. The coordinate
//! reference system is carried as an EPSG code in the GeoKey directory.

use log::debug;

use crate::errors::RasterResult;
use crate::io::SeekableReader;
use crate::tiff::constants::{epsg, geo_keys, tags};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;

/// Approximate metres per degree of latitude
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Affine placement of a north-up raster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoReference {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width in CRS units
    pub pixel_width: f64,
    /// Pixel height in CRS units (positive, rows go south)
    pub pixel_height: f64,
    /// EPSG code of the coordinate reference system
    pub epsg: u16,
}

impl GeoReference {
    /// Whether the CRS is geographic (degrees) rather than projected
    pub fn is_geographic(&self) -> bool {
        self.epsg == epsg::WGS84
    }

    /// World coordinates of the centre of pixel (col, row)
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Pixel containing the world coordinate, if it falls inside `width` x `height`
    pub fn pixel_at(&self, x: f64, y: f64, width: usize, height: usize) -> Option<(usize, usize)> {
        let col = ((x - self.origin_x) / self.pixel_width).floor();
        let row = ((self.origin_y - y) / self.pixel_height).floor();
        if col < 0.0 || row < 0.0 || col >= width as f64 || row >= height as f64 {
            return None;
        }
        Some((col as usize, row as usize))
    }

    /// ModelPixelScale tag values
    pub fn pixel_scale(&self) -> [f64; 3] {
        [self.pixel_width, self.pixel_height, 0.0]
    }

    /// ModelTiepoint tag values
    pub fn tiepoint(&self) -> [f64; 6] {
        [0.0, 0.0, 0.0, self.origin_x, self.origin_y, 0.0]
    }

    /// GeoKey directory: header followed by model type, raster type and CRS keys
    pub fn geo_key_directory(&self) -> Vec<u16> {
        let (model_type, crs_key) = if self.is_geographic() {
            (geo_keys::MODEL_TYPE_GEOGRAPHIC, geo_keys::GEOGRAPHIC_TYPE)
        } else {
            (geo_keys::MODEL_TYPE_PROJECTED, geo_keys::PROJECTED_CS_TYPE)
        };

        vec![
            1, 1, 0, 3,
            geo_keys::MODEL_TYPE, 0, 1, model_type,
            geo_keys::RASTER_TYPE, 0, 1, geo_keys::RASTER_PIXEL_IS_AREA,
            crs_key, 0, 1, self.epsg,
        ]
    }

    /// Reads the georeference of `ifd`, `None` when the GeoTIFF tags are absent
    ///
    /// A missing CRS key defaults to WGS84.
    pub fn read(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> RasterResult<Option<Self>> {
        if !ifd.has_tag(tags::MODEL_PIXEL_SCALE_TAG) || !ifd.has_tag(tags::MODEL_TIEPOINT_TAG) {
            return Ok(None);
        }

        let scale = tiff_reader.read_double_values(reader, ifd, tags::MODEL_PIXEL_SCALE_TAG)?;
        let tiepoint = tiff_reader.read_double_values(reader, ifd, tags::MODEL_TIEPOINT_TAG)?;
        if scale.len() < 2 || tiepoint.len() < 6 {
            debug!("Incomplete georeference tags in IFD #{}", ifd.number);
            return Ok(None);
        }

        let epsg = if ifd.has_tag(tags::GEO_KEY_DIRECTORY_TAG) {
            let directory = tiff_reader.read_tag_values(reader, ifd, tags::GEO_KEY_DIRECTORY_TAG)?;
            crs_from_directory(&directory).unwrap_or(epsg::WGS84)
        } else {
            epsg::WGS84
        };

        Ok(Some(GeoReference {
            origin_x: tiepoint[3] - tiepoint[0] * scale[0],
            origin_y: tiepoint[4] + tiepoint[1] * scale[1],
            pixel_width: scale[0],
            pixel_height: scale[1],
            epsg,
        }))
    }
}

/// Looks up the projected or geographic CRS code in a GeoKey directory
fn crs_from_directory(directory: &[u64]) -> Option<u16> {
    let key_count = *directory.get(3)? as usize;
    directory
        .get(4..4 + key_count * 4)?
        .chunks_exact(4)
        .find(|key| {
            key[1] == 0
                && (key[0] == geo_keys::PROJECTED_CS_TYPE as u64 || key[0] == geo_keys::GEOGRAPHIC_TYPE as u64)
        })
        .map(|key| key[3] as u16)
}

/// Ground distance in metres covered by one CRS unit along x and y near `latitude`
pub fn meters_per_unit(epsg_code: u16, latitude: f64) -> (f64, f64) {
    if epsg_code == epsg::WGS84 {
        (METERS_PER_DEGREE * latitude.to_radians().cos(), METERS_PER_DEGREE)
    } else {
        (1.0, 1.0)
    }
}
