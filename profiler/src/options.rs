use anyhow::Result;
use clap::{Parser, ValueEnum};
use elevprof::{Config, SourceTag, TileMode, WORLD_ELEVATION_URL};
use std::path::PathBuf;

/// Write distance/elevation profiles onto the routes of a GeoJSON
/// file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// GeoJSON FeatureCollection of (Multi)LineString routes.
    pub input: PathBuf,

    /// Where to write the updated collection [default: INPUT].
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// JSON config file. Flags below override its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory of SRTM/NASADEM `.hgt` tiles, used for bulk
    /// interpolation and, without `--image-server`, point sampling.
    #[arg(short, long)]
    pub tile_dir: Option<PathBuf>,

    /// Load tiles into memory instead of memory mapping them.
    #[arg(long, default_value_t = false)]
    pub in_mem: bool,

    /// ImageServer `getSamples` endpoint used for point sampling.
    #[arg(long, num_args = 0..=1, default_missing_value = WORLD_ELEVATION_URL)]
    pub image_server: Option<String>,

    /// Token for `--image-server`.
    #[arg(long)]
    pub token: Option<String>,

    /// WKID of the input coordinates, when not WGS84.
    #[arg(long)]
    pub wkid: Option<u32>,

    /// Route property receiving the serialized profile.
    #[arg(long)]
    pub profile_field: Option<String>,

    /// Minimum elevation range, in meters, for a profile to be valid.
    #[arg(long)]
    pub min_relief: Option<f64>,

    /// Elevation sources to try, in order.
    #[arg(long, value_delimiter = ',')]
    pub tiers: Option<Vec<Tier>>,

    /// Compute and report profiles without writing them.
    #[arg(short = 'n', long, default_value_t = false)]
    pub dry_run: bool,
}

impl Cli {
    /// Returns the config file's settings, or the defaults, with
    /// command line overrides applied.
    pub fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_path(path)?,
            None => Config::default(),
        };
        if let Some(field) = &self.profile_field {
            config.profile_field = field.clone();
        }
        if let Some(min_relief) = self.min_relief {
            config.min_relief_m = min_relief;
        }
        if let Some(tiers) = &self.tiers {
            config.tiers = tiers.iter().copied().map(SourceTag::from).collect();
        }
        Ok(config)
    }

    pub fn tile_mode(&self) -> TileMode {
        if self.in_mem {
            TileMode::InMem
        } else {
            TileMode::MemMap
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Tier {
    /// Elevations carried by the route geometry.
    EmbeddedZ,

    /// Interpolate the whole route against the tile surface.
    BulkInterpolation,

    /// Sample the surface at every vertex.
    PointSampling,
}

impl From<Tier> for SourceTag {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::EmbeddedZ => Self::EmbeddedZ,
            Tier::BulkInterpolation => Self::BulkInterpolation,
            Tier::PointSampling => Self::PointSampling,
        }
    }
}
