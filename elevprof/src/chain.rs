//! Tiered elevation-source fallback.
//!
//! A chain is an ordered list of [`Tier`]s. Each tier produces a
//! candidate profile for a route, which is then validated; the first
//! valid candidate wins. Tiers that are unavailable, fail, or produce
//! a flat profile hand over to the next tier. Nothing a tier does can
//! abort the chain.

use crate::{
    source::{Availability, BulkInterpolator, PointSampler, Sample},
    validator::Validity,
    Coordinate, Profile, ProfileBuilder, ProfileError, SourceError, Validator,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default name of the terrain surface sampled by fallback tiers.
pub const DEFAULT_SURFACE: &str = "Terrain";

/// Identifies where a profile's elevations came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    /// Elevations carried by the route geometry itself.
    EmbeddedZ,

    /// One interpolation call for the whole path.
    BulkInterpolation,

    /// One sample per vertex.
    PointSampling,
}

impl SourceTag {
    pub const ALL: [Self; 3] = [
        Self::EmbeddedZ,
        Self::BulkInterpolation,
        Self::PointSampling,
    ];
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EmbeddedZ => "embedded_z",
            Self::BulkInterpolation => "bulk_interpolation",
            Self::PointSampling => "point_sampling",
        };
        f.write_str(name)
    }
}

/// What a single tier produced.
#[derive(Debug)]
pub enum Attempt {
    /// A candidate profile, not yet validated.
    Built(Profile),

    /// The tier's capability is not available.
    Unavailable(String),

    /// The tier's source raised an error.
    Failed(ProfileError),
}

impl From<Result<Profile, ProfileError>> for Attempt {
    fn from(result: Result<Profile, ProfileError>) -> Self {
        match result {
            Ok(profile) => Self::Built(profile),
            Err(e) => Self::Failed(e),
        }
    }
}

/// One strategy for obtaining a route's elevations.
pub trait Tier {
    fn tag(&self) -> SourceTag;

    fn attempt(&self, vertices: &[Coordinate], builder: &ProfileBuilder) -> Attempt;
}

/// Uses whatever elevations the geometry already carries.
pub struct EmbeddedZ;

impl Tier for EmbeddedZ {
    fn tag(&self) -> SourceTag {
        SourceTag::EmbeddedZ
    }

    fn attempt(&self, vertices: &[Coordinate], builder: &ProfileBuilder) -> Attempt {
        builder.build(vertices).into()
    }
}

/// Interpolates the whole path against a terrain surface.
pub struct BulkInterpolation {
    source: Box<dyn BulkInterpolator>,
    surface: String,
}

impl BulkInterpolation {
    pub fn new(source: impl BulkInterpolator + 'static, surface: impl Into<String>) -> Self {
        Self {
            source: Box::new(source),
            surface: surface.into(),
        }
    }
}

impl Tier for BulkInterpolation {
    fn tag(&self) -> SourceTag {
        SourceTag::BulkInterpolation
    }

    fn attempt(&self, vertices: &[Coordinate], builder: &ProfileBuilder) -> Attempt {
        if let Availability::Unavailable(reason) = self.source.availability() {
            return Attempt::Unavailable(reason);
        }
        self.source
            .interpolate(vertices, &self.surface)
            .map_err(ProfileError::from)
            .and_then(|interpolated| builder.build(&interpolated))
            .into()
    }
}

/// Samples the terrain surface at every vertex.
///
/// Vertices the surface has no usable value for get the builder's
/// missing-elevation default.
pub struct PointSampling {
    source: Box<dyn PointSampler>,
    surface: String,
}

impl PointSampling {
    pub fn new(source: impl PointSampler + 'static, surface: impl Into<String>) -> Self {
        Self {
            source: Box::new(source),
            surface: surface.into(),
        }
    }

    fn samples(&self, vertices: &[Coordinate]) -> Result<Vec<Sample>, SourceError> {
        let samples = if self.source.supports_batch() {
            self.source.sample_batch(vertices, &self.surface)?
        } else {
            vertices
                .iter()
                .map(|vertex| self.source.sample(vertex, &self.surface))
                .collect::<Result<Vec<_>, _>>()?
        };
        if samples.len() == vertices.len() {
            Ok(samples)
        } else {
            Err(SourceError::Length {
                expected: vertices.len(),
                actual: samples.len(),
            })
        }
    }
}

impl Tier for PointSampling {
    fn tag(&self) -> SourceTag {
        SourceTag::PointSampling
    }

    fn attempt(&self, vertices: &[Coordinate], builder: &ProfileBuilder) -> Attempt {
        if let Availability::Unavailable(reason) = self.source.availability() {
            return Attempt::Unavailable(reason);
        }
        let samples = match self.samples(vertices) {
            Ok(samples) => samples,
            Err(e) => return Attempt::Failed(e.into()),
        };

        let mut no_data = 0_usize;
        let sampled: Vec<Coordinate> = vertices
            .iter()
            .zip(&samples)
            .map(|(vertex, sample)| Coordinate {
                elevation: Some(sample.elevation().unwrap_or_else(|| {
                    no_data += 1;
                    builder.missing_elevation_m()
                })),
                ..*vertex
            })
            .collect();
        if no_data > 0 {
            debug!(
                "{} of {} samples had no usable value",
                no_data,
                samples.len()
            );
        }

        builder.build(&sampled).into()
    }
}

/// Ordered fallback across elevation sources.
pub struct ElevationChain {
    tiers: Vec<Box<dyn Tier>>,
    builder: ProfileBuilder,
    validator: Validator,
}

impl ElevationChain {
    pub fn new(tiers: Vec<Box<dyn Tier>>, builder: ProfileBuilder, validator: Validator) -> Self {
        Self {
            tiers,
            builder,
            validator,
        }
    }

    pub fn builder() -> ChainBuilder {
        ChainBuilder::default()
    }

    /// Returns the tags of this chain's tiers, in the order they are
    /// tried.
    pub fn tiers(&self) -> impl Iterator<Item = SourceTag> + '_ {
        self.tiers.iter().map(|tier| tier.tag())
    }

    /// Returns the first valid profile of `vertices` and the tier that
    /// produced it, or `None` once every tier is exhausted.
    pub fn resolve(&self, vertices: &[Coordinate]) -> Option<(Profile, SourceTag)> {
        if vertices.is_empty() {
            warn!("no vertices to profile");
            return None;
        }

        for tier in &self.tiers {
            let tag = tier.tag();
            match tier.attempt(vertices, &self.builder) {
                Attempt::Built(profile) => match self.validator.judge(&profile) {
                    Validity::Valid => return Some((profile, tag)),
                    Validity::SuspiciouslyFlat { relief_m } => {
                        warn!("{tag}: accepting suspiciously flat profile, relief: {relief_m:.1} m");
                        return Some((profile, tag));
                    }
                    verdict => debug!("{tag}: rejected profile, {verdict:?}"),
                },
                Attempt::Unavailable(reason) => debug!("{tag}: unavailable, {reason}"),
                Attempt::Failed(e) => warn!("{tag}: {e}"),
            }
        }

        None
    }
}

/// Assembles an [`ElevationChain`] from configured sources.
///
/// A tier whose source was never supplied is left out of the chain.
pub struct ChainBuilder {
    order: Vec<SourceTag>,
    bulk: Option<Box<dyn BulkInterpolator>>,
    point: Option<Box<dyn PointSampler>>,
    surface: String,
    profile: ProfileBuilder,
    validator: Validator,
}

impl Default for ChainBuilder {
    fn default() -> Self {
        Self {
            order: SourceTag::ALL.to_vec(),
            bulk: None,
            point: None,
            surface: DEFAULT_SURFACE.to_owned(),
            profile: ProfileBuilder::default(),
            validator: Validator::default(),
        }
    }
}

impl ChainBuilder {
    pub fn order(mut self, order: Vec<SourceTag>) -> Self {
        self.order = order;
        self
    }

    pub fn bulk(mut self, source: impl BulkInterpolator + 'static) -> Self {
        self.bulk = Some(Box::new(source));
        self
    }

    pub fn point(mut self, source: impl PointSampler + 'static) -> Self {
        self.point = Some(Box::new(source));
        self
    }

    pub fn surface(mut self, surface: impl Into<String>) -> Self {
        self.surface = surface.into();
        self
    }

    pub fn missing_elevation(mut self, meters: f64) -> Self {
        self.profile = self.profile.missing_elevation(meters);
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn build(mut self) -> Result<ElevationChain, ProfileError> {
        let mut tiers: Vec<Box<dyn Tier>> = Vec::with_capacity(self.order.len());
        for tag in std::mem::take(&mut self.order) {
            match tag {
                SourceTag::EmbeddedZ if !tiers.iter().any(|t| t.tag() == tag) => {
                    tiers.push(Box::new(EmbeddedZ));
                }
                SourceTag::BulkInterpolation => match self.bulk.take() {
                    Some(source) => tiers.push(Box::new(BulkInterpolation {
                        source,
                        surface: self.surface.clone(),
                    })),
                    None => debug!("{tag}: no source configured, tier skipped"),
                },
                SourceTag::PointSampling => match self.point.take() {
                    Some(source) => tiers.push(Box::new(PointSampling {
                        source,
                        surface: self.surface.clone(),
                    })),
                    None => debug!("{tag}: no source configured, tier skipped"),
                },
                SourceTag::EmbeddedZ => debug!("{tag}: listed twice, ignoring repeat"),
            }
        }

        if tiers.is_empty() {
            return Err(ProfileError::Builder);
        }

        Ok(ElevationChain::new(tiers, self.profile, self.validator))
    }
}
