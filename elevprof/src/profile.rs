use crate::{
    math::{haversine_distance, round_to},
    Coordinate, ProfileError,
};
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

/// One entry of a profile.
///
/// Serializes as the two-element array `[distance_km, elevation_m]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct ProfilePoint {
    /// Distance from the start of the path, in kilometers, rounded to
    /// 3 decimal places.
    pub distance_km: f64,

    /// Elevation in meters, rounded to 1 decimal place.
    pub elevation_m: f64,
}

impl ProfilePoint {
    /// Returns a point with both fields rounded to their wire
    /// precision.
    pub fn new(distance_km: f64, elevation_m: f64) -> Self {
        Self {
            distance_km: round_to(distance_km, 3),
            elevation_m: round_to(elevation_m, 1),
        }
    }
}

impl From<(f64, f64)> for ProfilePoint {
    fn from((distance_km, elevation_m): (f64, f64)) -> Self {
        Self {
            distance_km,
            elevation_m,
        }
    }
}

impl From<ProfilePoint> for (f64, f64) {
    fn from(point: ProfilePoint) -> Self {
        (point.distance_km, point.elevation_m)
    }
}

/// Cumulative distance versus elevation along a path.
///
/// The first point is always at distance 0 and distances never
/// decrease.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile {
    pub points: Vec<ProfilePoint>,
}

impl Profile {
    pub fn builder() -> ProfileBuilder {
        ProfileBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the (lowest, highest) elevation, if any.
    pub fn elevation_range(&self) -> Option<(f64, f64)> {
        self.points.iter().map(|p| p.elevation_m).fold(None, |acc, e| {
            Some(match acc {
                None => (e, e),
                Some((lo, hi)) => (lo.min(e), hi.max(e)),
            })
        })
    }

    /// Highest minus lowest elevation, in meters.
    pub fn relief_m(&self) -> f64 {
        self.elevation_range().map_or(0.0, |(lo, hi)| hi - lo)
    }

    /// Sum of all elevation gains, in meters.
    pub fn ascent_m(&self) -> f64 {
        self.points
            .iter()
            .tuple_windows()
            .map(|(a, b)| (b.elevation_m - a.elevation_m).max(0.0))
            .sum()
    }

    /// Sum of all elevation losses, in meters, as a positive number.
    pub fn descent_m(&self) -> f64 {
        self.points
            .iter()
            .tuple_windows()
            .map(|(a, b)| (a.elevation_m - b.elevation_m).max(0.0))
            .sum()
    }

    /// Total path length, in kilometers.
    pub fn length_km(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.distance_km)
    }

    /// Encodes this profile as a JSON array of
    /// `[distance_km, elevation_m]` pairs.
    pub fn to_json(&self) -> Result<String, ProfileError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ProfileError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Converts vertex sequences into profiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileBuilder {
    /// Elevation used for vertices without a finite one.
    missing_elevation_m: f64,
}

impl Default for ProfileBuilder {
    fn default() -> Self {
        Self {
            missing_elevation_m: 0.0,
        }
    }
}

impl ProfileBuilder {
    pub fn missing_elevation(mut self, meters: f64) -> Self {
        self.missing_elevation_m = meters;
        self
    }

    pub fn missing_elevation_m(&self) -> f64 {
        self.missing_elevation_m
    }

    /// Returns the profile of `vertices`.
    ///
    /// Segment lengths are great-circle distances between consecutive
    /// vertices. Distance accumulates in meters and is only converted
    /// and rounded when each point is emitted.
    pub fn build(&self, vertices: &[Coordinate]) -> Result<Profile, ProfileError> {
        if vertices.is_empty() {
            return Err(ProfileError::Empty);
        }

        let segments_m = vertices
            .iter()
            .tuple_windows()
            .map(|(a, b)| haversine_distance(a.coord(), b.coord()));
        let cumulative_m = std::iter::once(0.0).chain(segments_m.scan(0.0, |total, seg| {
            *total += seg;
            Some(*total)
        }));

        let points: Vec<ProfilePoint> = vertices
            .iter()
            .zip(cumulative_m)
            .map(|(vertex, meters)| {
                ProfilePoint::new(
                    meters / 1000.0,
                    vertex
                        .elevation
                        .filter(|e| e.is_finite())
                        .unwrap_or(self.missing_elevation_m),
                )
            })
            .collect();

        debug!(
            "profile; len: {}, length_km: {}",
            points.len(),
            points.last().map_or(0.0, |p| p.distance_km)
        );

        Ok(Profile { points })
    }
}

#[cfg(test)]
mod tests {
    use super::{Profile, ProfilePoint};
    use crate::{Coordinate, ProfileError};
    use approx::assert_relative_eq;

    fn two_vertex_route() -> Vec<Coordinate> {
        vec![
            Coordinate::with_elevation(-1.0, 43.0, 100.0),
            Coordinate::with_elevation(-1.01, 43.01, 150.0),
        ]
    }

    #[test]
    fn test_two_vertices() {
        let profile = Profile::builder().build(&two_vertex_route()).unwrap();
        assert_eq!(
            profile.points,
            vec![ProfilePoint::new(0.0, 100.0), ProfilePoint::new(1.378, 150.0)]
        );
        assert_eq!(profile.to_json().unwrap(), "[[0.0,100.0],[1.378,150.0]]");
    }

    #[test]
    fn test_single_vertex() {
        let profile = Profile::builder()
            .build(&[Coordinate::with_elevation(7.0, 45.0, 812.34)])
            .unwrap();
        assert_eq!(profile.points, vec![ProfilePoint::new(0.0, 812.3)]);
    }

    #[test]
    fn test_empty_is_an_error() {
        assert!(matches!(
            Profile::builder().build(&[]),
            Err(ProfileError::Empty)
        ));
    }

    #[test]
    fn test_missing_elevation_defaults() {
        let vertices = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.001)];
        let zeroed = Profile::builder().build(&vertices).unwrap();
        assert!(zeroed.points.iter().all(|p| p.elevation_m == 0.0));

        let substituted = Profile::builder()
            .missing_elevation(-1.25)
            .build(&vertices)
            .unwrap();
        assert!(substituted.points.iter().all(|p| p.elevation_m == -1.3));
    }

    #[test]
    fn test_non_finite_elevation_is_missing() {
        let vertices = [
            Coordinate::with_elevation(0.0, 0.0, f64::NAN),
            Coordinate::with_elevation(0.0, 0.001, f64::INFINITY),
            Coordinate::with_elevation(0.0, 0.002, 12.0),
        ];
        let profile = Profile::builder()
            .missing_elevation(3.0)
            .build(&vertices)
            .unwrap();
        let elevations: Vec<f64> = profile.points.iter().map(|p| p.elevation_m).collect();
        assert_eq!(elevations, vec![3.0, 3.0, 12.0]);
        assert_eq!(
            Profile::from_json(&profile.to_json().unwrap()).unwrap(),
            profile
        );
    }

    #[test]
    fn test_length_and_monotonic_distance() {
        // Zig-zag with a repeated vertex.
        let vertices: Vec<Coordinate> = [
            (6.0, 45.0),
            (6.01, 45.01),
            (6.01, 45.01),
            (6.0, 45.02),
            (6.02, 45.03),
            (5.99, 45.0),
        ]
        .iter()
        .enumerate()
        .map(|(i, &(lon, lat))| Coordinate::with_elevation(lon, lat, 1000.0 + i as f64))
        .collect();
        let profile = Profile::builder().build(&vertices).unwrap();
        assert_eq!(profile.len(), vertices.len());
        assert_eq!(profile.points[0].distance_km, 0.0);
        for pair in profile.points.windows(2) {
            assert!(pair[0].distance_km <= pair[1].distance_km);
        }
        assert_eq!(profile.points[1].distance_km, profile.points[2].distance_km);
    }

    #[test]
    fn test_accumulates_before_rounding() {
        // 1000 segments of ~0.4 m each; rounding every segment to
        // kilometers would collapse the total to zero.
        let vertices: Vec<Coordinate> = (0..=1000)
            .map(|i| Coordinate::new(0.0, f64::from(i) * 0.000_004))
            .collect();
        let profile = Profile::builder().build(&vertices).unwrap();
        assert_relative_eq!(profile.length_km(), 0.445, epsilon = 1e-9);
    }

    #[test]
    fn test_statistics() {
        let profile = Profile {
            points: vec![
                ProfilePoint::new(0.0, 100.0),
                ProfilePoint::new(0.5, 130.0),
                ProfilePoint::new(1.0, 110.0),
                ProfilePoint::new(1.5, 160.0),
            ],
        };
        assert_eq!(profile.elevation_range(), Some((100.0, 160.0)));
        assert_relative_eq!(profile.relief_m(), 60.0);
        assert_relative_eq!(profile.ascent_m(), 80.0);
        assert_relative_eq!(profile.descent_m(), 20.0);
        assert_relative_eq!(profile.length_km(), 1.5);
        assert_eq!(Profile::default().elevation_range(), None);
        assert_eq!(Profile::default().relief_m(), 0.0);
    }

    #[test]
    fn test_wire_round_trip() {
        let profile = Profile::builder().build(&two_vertex_route()).unwrap();
        let json = profile.to_json().unwrap();
        assert_eq!(Profile::from_json(&json).unwrap(), profile);
        assert!(Profile::from_json("[[0.0]]").is_err());
    }
}
