use geo::geometry::Coord;
use serde::{Deserialize, Serialize};

/// A route vertex.
///
/// In a geographic reference `longitude` is within [-180, 180] and
/// `latitude` within [-90, 90]. Projected geometries carry easting and
/// northing in these fields until reprojected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
    /// Meters above the surface datum, when the geometry carries it.
    pub elevation: Option<f64>,
}

impl Coordinate {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            elevation: None,
        }
    }

    pub fn with_elevation(longitude: f64, latitude: f64, elevation: f64) -> Self {
        Self {
            longitude,
            latitude,
            elevation: Some(elevation),
        }
    }

    /// Returns the horizontal position as `x: longitude, y: latitude`.
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }
}

/// A spatial reference, identified by its well-known ID.
///
/// An undeclared reference (`wkid: None`) is assumed geographic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialReference {
    pub wkid: Option<u32>,
}

impl SpatialReference {
    pub const WGS84: Self = Self { wkid: Some(4326) };

    pub fn is_geographic(&self) -> bool {
        matches!(self.wkid, None | Some(4326))
    }
}

/// A (possibly multi-part) line geometry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polyline {
    pub paths: Vec<Vec<Coordinate>>,
    pub spatial_reference: SpatialReference,
}

impl Polyline {
    pub fn new(paths: Vec<Vec<Coordinate>>, spatial_reference: SpatialReference) -> Self {
        Self {
            paths,
            spatial_reference,
        }
    }

    /// Returns the first part, if it has any vertices.
    ///
    /// Only the primary part of a multi-part geometry is profiled.
    pub fn primary_path(&self) -> Option<&[Coordinate]> {
        self.paths
            .first()
            .map(Vec::as_slice)
            .filter(|path| !path.is_empty())
    }
}
