use crate::constants::EARTH_RADIUS_M;
use geo::{Coord, CoordFloat};
use num_traits::FromPrimitive;

/// Returns the great-circle distance, in meters, between `a` and `b`.
///
/// Coordinates are `x: longitude, y: latitude` in degrees. The Earth
/// is modeled as a sphere of radius [`EARTH_RADIUS_M`]. NaN inputs
/// propagate to the output; validating coordinates is the caller's
/// job.
pub fn haversine_distance<T>(a: Coord<T>, b: Coord<T>) -> T
where
    T: CoordFloat + FromPrimitive,
{
    let one = T::one();
    let two = one + one;
    let radius = T::from_f64(EARTH_RADIUS_M).unwrap_or_else(T::nan);

    let lat1 = a.y.to_radians();
    let lat2 = b.y.to_radians();
    let delta_lat = (b.y - a.y).to_radians();
    let delta_lon = (b.x - a.x).to_radians();

    let h = (delta_lat / two).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / two).sin().powi(2);
    let c = two * h.sqrt().atan2((one - h).sqrt());

    radius * c
}
