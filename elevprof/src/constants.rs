/// Radius of the sphere used for great-circle distances, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Radius of the WGS84 ellipsoid's major axis, in meters. Spherical
/// (web) Mercator projects onto a sphere of this radius.
pub const WGS84_MAJOR_RADIUS_M: f64 = 6_378_137.0;
