//! Distance/elevation profiles for hiking routes.
//!
//! A route's vertices are turned into a cumulative
//! `[distance_km, elevation_m]` series. When the elevations embedded
//! in the geometry are missing or flat, an [`ElevationChain`] falls
//! back through other elevation sources until one yields a profile
//! with real terrain variation. A [`Pipeline`] runs the chain over
//! every route in a [`RouteStore`] and writes accepted profiles back.

pub mod chain;
mod config;
mod constants;
mod coordinate;
mod error;
mod image_server;
pub mod math;
mod pipeline;
mod profile;
pub mod reproject;
pub mod source;
mod tiles;
mod validator;

pub use crate::{
    chain::{ElevationChain, SourceTag},
    config::Config,
    coordinate::{Coordinate, Polyline, SpatialReference},
    error::{ProfileError, SourceError, StoreError},
    image_server::{ImageServer, WORLD_ELEVATION_URL},
    pipeline::{
        Pipeline, ProfileUpdate, RouteId, RouteInput, RouteOutcome, RouteStore, Summary,
        WriteResult,
    },
    profile::{Profile, ProfileBuilder, ProfilePoint},
    tiles::{TileMode, Tiles},
    validator::{Validator, Validity},
};
pub use geo;
