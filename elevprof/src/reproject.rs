use crate::{
    constants::WGS84_MAJOR_RADIUS_M, Coordinate, Polyline, ProfileError, SpatialReference,
};
use std::f64::consts::FRAC_PI_2;

/// Converts geometries into geographic (WGS84 lat/lon) coordinates.
pub trait Reprojector {
    fn to_geographic(&self, line: &Polyline) -> Result<Polyline, ProfileError>;
}

/// Inverse spherical ("web") Mercator.
///
/// Handles WKID 3857 and its legacy aliases 102100 and 102113.
/// Elevations pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

impl WebMercator {
    const WKIDS: [u32; 3] = [3857, 102_100, 102_113];

    fn unproject(vertex: &Coordinate) -> Coordinate {
        let lon = (vertex.longitude / WGS84_MAJOR_RADIUS_M).to_degrees();
        let lat = (2.0 * (vertex.latitude / WGS84_MAJOR_RADIUS_M).exp().atan() - FRAC_PI_2)
            .to_degrees();
        Coordinate {
            longitude: lon,
            latitude: lat,
            elevation: vertex.elevation,
        }
    }
}

impl Reprojector for WebMercator {
    fn to_geographic(&self, line: &Polyline) -> Result<Polyline, ProfileError> {
        let wkid = line.spatial_reference.wkid;
        if line.spatial_reference.is_geographic() {
            return Ok(line.clone());
        }
        if !wkid.is_some_and(|wkid| Self::WKIDS.contains(&wkid)) {
            return Err(ProfileError::Reprojection(wkid));
        }
        let paths = line
            .paths
            .iter()
            .map(|path| path.iter().map(Self::unproject).collect())
            .collect();
        Ok(Polyline::new(paths, SpatialReference::WGS84))
    }
}
