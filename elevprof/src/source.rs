//! Elevation-source capabilities.

use crate::{Coordinate, SourceError};
use std::sync::Arc;

/// Result of capability negotiation with an elevation source.
///
/// Being unavailable (unlicensed, disabled, not configured) is an
/// expected outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable(String),
}

/// An elevation value as reported by a point-sampling source.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Value(f64),

    /// Textual value, possibly localized (`"1234,5"`).
    Text(String),

    /// The surface has no value at this location.
    NoData,
}

impl Sample {
    /// Returns the sampled elevation in meters, or `None` for no data
    /// and values that do not parse.
    pub fn elevation(&self) -> Option<f64> {
        match self {
            Self::Value(value) => Some(*value).filter(|v| v.is_finite()),
            Self::Text(text) => parse_elevation(text),
            Self::NoData => None,
        }
    }
}

/// Parses an elevation that may use a comma as decimal separator.
///
/// Sentinels such as `"NoData"`, `"failed"` or an empty string yield
/// `None`.
pub fn parse_elevation(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Interpolates elevation along an entire path in one call.
pub trait BulkInterpolator {
    fn availability(&self) -> Availability {
        Availability::Available
    }

    /// Returns `vertices` with elevation populated at each vertex,
    /// interpolated against the terrain surface named `surface`.
    fn interpolate(
        &self,
        vertices: &[Coordinate],
        surface: &str,
    ) -> Result<Vec<Coordinate>, SourceError>;
}

/// Samples elevation at individual coordinates.
pub trait PointSampler {
    fn availability(&self) -> Availability {
        Availability::Available
    }

    /// Whether [`PointSampler::sample_batch`] is cheaper than one
    /// [`PointSampler::sample`] per coordinate.
    fn supports_batch(&self) -> bool {
        false
    }

    fn sample(&self, coord: &Coordinate, surface: &str) -> Result<Sample, SourceError>;

    /// Returns one sample per coordinate, in order.
    fn sample_batch(
        &self,
        coords: &[Coordinate],
        surface: &str,
    ) -> Result<Vec<Sample>, SourceError> {
        coords
            .iter()
            .map(|coord| self.sample(coord, surface))
            .collect()
    }
}

impl<T: BulkInterpolator + ?Sized> BulkInterpolator for Arc<T> {
    fn availability(&self) -> Availability {
        (**self).availability()
    }

    fn interpolate(
        &self,
        vertices: &[Coordinate],
        surface: &str,
    ) -> Result<Vec<Coordinate>, SourceError> {
        (**self).interpolate(vertices, surface)
    }
}

impl<T: PointSampler + ?Sized> PointSampler for Arc<T> {
    fn availability(&self) -> Availability {
        (**self).availability()
    }

    fn supports_batch(&self) -> bool {
        (**self).supports_batch()
    }

    fn sample(&self, coord: &Coordinate, surface: &str) -> Result<Sample, SourceError> {
        (**self).sample(coord, surface)
    }

    fn sample_batch(
        &self,
        coords: &[Coordinate],
        surface: &str,
    ) -> Result<Vec<Sample>, SourceError> {
        (**self).sample_batch(coords, surface)
    }
}
