use crate::{
    chain::{ChainBuilder, SourceTag, DEFAULT_SURFACE},
    validator::{MIN_RELIEF_M, SUSPICIOUS_RELIEF_M},
    ElevationChain, ProfileError, Validator,
};
use serde::Deserialize;
use std::{fs::File, io::BufReader, path::Path, time::Duration};

/// Route attribute that receives the serialized profile.
pub const DEFAULT_PROFILE_FIELD: &str = "elevation_profile";

/// Capacity, in characters, of the profile text attribute.
pub const DEFAULT_FIELD_CAPACITY: usize = 10_000;

/// Tunables for profile extraction and write-back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Name of the route attribute holding the serialized profile.
    pub profile_field: String,

    /// Longest serialized profile the attribute can store.
    pub field_capacity: usize,

    /// Minimum elevation range for a profile to be valid.
    pub min_relief_m: f64,

    /// Valid profiles with less relief than this are logged as
    /// suspiciously flat.
    pub suspicious_relief_m: f64,

    /// Elevation assumed for vertices without one.
    pub missing_elevation_m: f64,

    /// Name of the terrain surface sampled by fallback tiers.
    pub surface: String,

    /// Elevation sources, in the order they are tried.
    pub tiers: Vec<SourceTag>,

    /// Timeout for each call to a remote elevation source.
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile_field: DEFAULT_PROFILE_FIELD.to_owned(),
            field_capacity: DEFAULT_FIELD_CAPACITY,
            min_relief_m: MIN_RELIEF_M,
            suspicious_relief_m: SUSPICIOUS_RELIEF_M,
            missing_elevation_m: 0.0,
            surface: DEFAULT_SURFACE.to_owned(),
            tiers: SourceTag::ALL.to_vec(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Reads a JSON config file. Omitted fields take their defaults.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ProfileError> {
        let file = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(file)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validator(&self) -> Validator {
        Validator::new(self.min_relief_m).suspicious_below(self.suspicious_relief_m)
    }

    /// Returns a chain builder preconfigured with this config's tier
    /// order, surface, defaults and validity thresholds. Sources are
    /// still to be supplied.
    pub fn chain(&self) -> ChainBuilder {
        ElevationChain::builder()
            .order(self.tiers.clone())
            .surface(self.surface.clone())
            .missing_elevation(self.missing_elevation_m)
            .validator(self.validator())
    }
}
