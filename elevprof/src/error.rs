use hgt::HgtError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("missing required parameters")]
    Builder,

    #[error("cannot build a profile from an empty vertex sequence")]
    Empty,

    #[error("route has no usable geometry")]
    GeometryMissing,

    #[error("no reprojection from wkid {0:?} to geographic coordinates")]
    Reprojection(Option<u32>),

    #[error("serialized profile is {len} characters, field holds {capacity}")]
    FieldOverflow { len: usize, capacity: usize },

    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("no height files in {0}")]
    Path(PathBuf),

    #[error("{0}")]
    Store(#[from] StoreError),
}

/// Failure of an elevation-source call.
///
/// These never abort a chain: the tier that raised one is abandoned
/// and the next tier is tried.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("elevation service returned status {0}")]
    Status(u16),

    #[error("elevation service error: {0}")]
    Response(String),

    #[error("expected {expected} elevations, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("surface has no value at ({lon}, {lat})")]
    NoData { lon: f64, lat: f64 },

    #[error("{0}")]
    Tile(#[from] HgtError),
}

/// Failure of the route store collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Backend(#[from] Box<dyn std::error::Error + Send + Sync>),
}
