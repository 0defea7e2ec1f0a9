//! Batch profile extraction and write-back.

use crate::{
    reproject::Reprojector, Config, ElevationChain, Polyline, Profile, ProfileError, SourceTag,
    StoreError,
};
use log::{info, warn};
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

/// Identifier of a route record in the store.
pub type RouteId = i64;

/// A route as enumerated by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteInput {
    pub id: RouteId,
    pub name: String,
    pub geometry: Option<Polyline>,
}

/// A serialized profile staged for write-back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub id: RouteId,
    pub profile: String,
}

/// The store's verdict on one staged update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    pub id: RouteId,
    pub success: bool,
    pub error: Option<String>,
}

impl WriteResult {
    pub fn ok(id: RouteId) -> Self {
        Self {
            id,
            success: true,
            error: None,
        }
    }

    pub fn failed(id: RouteId, error: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Source and sink of route records.
pub trait RouteStore {
    /// Returns every route, with identifier, name and geometry.
    fn routes(&mut self) -> Result<Vec<RouteInput>, StoreError>;

    /// Commits a batch of profiles, reporting success per identifier.
    ///
    /// An `Err` means the batch as a whole could not be committed.
    fn write_profiles(&mut self, updates: &[ProfileUpdate]) -> Result<Vec<WriteResult>, StoreError>;

    /// Number of records the last call to [`RouteStore::routes`] could
    /// not turn into a route, such as records without an identifier.
    fn unlisted(&self) -> usize {
        0
    }
}

/// Result of processing one route.
#[derive(Debug)]
pub enum RouteOutcome {
    Updated {
        profile: Profile,
        source: SourceTag,
        update: ProfileUpdate,
    },

    /// No elevation source yielded a valid profile.
    SkippedInvalid,

    Failed(ProfileError),
}

/// Per-batch tally of route outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Routes whose profile the store confirmed.
    pub updated: usize,

    pub skipped_invalid: usize,

    /// Routes that failed processing or whose write was rejected, and
    /// records the store could not list as routes.
    pub failed: usize,

    /// Routes left unprocessed after cancellation.
    pub not_visited: usize,

    pub cancelled: bool,
}

pub struct Pipeline {
    config: Config,
    chain: ElevationChain,
    reprojector: Option<Box<dyn Reprojector>>,
}

impl Pipeline {
    pub fn new(config: Config, chain: ElevationChain) -> Self {
        Self {
            config,
            chain,
            reprojector: None,
        }
    }

    /// Reprojects routes declared in a non-geographic reference.
    pub fn reprojector(mut self, reprojector: impl Reprojector + 'static) -> Self {
        self.reprojector = Some(Box::new(reprojector));
        self
    }

    /// Profiles every route in `store` and commits accepted profiles
    /// in one batch.
    ///
    /// Per-route errors are tallied, never propagated. Setting
    /// `cancel` stops processing before the next route; profiles
    /// staged up to that point are still committed. Only failing to
    /// enumerate routes or to commit the batch returns `Err`.
    pub fn run(
        &self,
        store: &mut dyn RouteStore,
        cancel: &AtomicBool,
    ) -> Result<Summary, ProfileError> {
        let routes = store.routes()?;
        let total = routes.len();
        info!("processing {total} routes");

        let mut summary = Summary::default();
        let unlisted = store.unlisted();
        if unlisted > 0 {
            warn!("{unlisted} records could not be read as routes");
            summary.failed += unlisted;
        }
        let mut staged = Vec::new();

        for (idx, route) in routes.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                summary.cancelled = true;
                summary.not_visited = total - idx;
                warn!("cancelled with {} routes not visited", summary.not_visited);
                break;
            }

            match self.process(route) {
                RouteOutcome::Updated {
                    profile,
                    source,
                    update,
                } => {
                    info!(
                        "[{}/{total}] {} ({}): {} points from {source}, {:.3} km, +{:.0}/-{:.0} m",
                        idx + 1,
                        route.name,
                        route.id,
                        profile.len(),
                        profile.length_km(),
                        profile.ascent_m(),
                        profile.descent_m(),
                    );
                    staged.push(update);
                }
                RouteOutcome::SkippedInvalid => {
                    warn!(
                        "[{}/{total}] {} ({}): no valid elevation source",
                        idx + 1,
                        route.name,
                        route.id
                    );
                    summary.skipped_invalid += 1;
                }
                RouteOutcome::Failed(e) => {
                    warn!(
                        "[{}/{total}] {} ({}): {e}",
                        idx + 1,
                        route.name,
                        route.id
                    );
                    summary.failed += 1;
                }
            }
        }

        self.commit(store, &staged, &mut summary)?;
        info!("{summary:?}");
        Ok(summary)
    }

    /// Profiles a single route and stages it for write-back.
    pub fn process(&self, route: &RouteInput) -> RouteOutcome {
        match self.try_process(route) {
            Ok(Some((profile, source, update))) => RouteOutcome::Updated {
                profile,
                source,
                update,
            },
            Ok(None) => RouteOutcome::SkippedInvalid,
            Err(e) => RouteOutcome::Failed(e),
        }
    }
}

/// Private API.
impl Pipeline {
    fn try_process(
        &self,
        route: &RouteInput,
    ) -> Result<Option<(Profile, SourceTag, ProfileUpdate)>, ProfileError> {
        let geometry = route
            .geometry
            .as_ref()
            .ok_or(ProfileError::GeometryMissing)?;

        let reprojected;
        let geometry = if geometry.spatial_reference.is_geographic() {
            geometry
        } else {
            let reprojector = self
                .reprojector
                .as_ref()
                .ok_or(ProfileError::Reprojection(geometry.spatial_reference.wkid))?;
            reprojected = reprojector.to_geographic(geometry)?;
            &reprojected
        };

        if geometry.paths.len() > 1 {
            warn!(
                "{} ({}): {} parts, profiling only the first",
                route.name,
                route.id,
                geometry.paths.len()
            );
        }
        let vertices = geometry
            .primary_path()
            .ok_or(ProfileError::GeometryMissing)?;

        let Some((profile, source)) = self.chain.resolve(vertices) else {
            return Ok(None);
        };

        let update = self.stage(route.id, &profile)?;
        Ok(Some((profile, source, update)))
    }

    fn stage(&self, id: RouteId, profile: &Profile) -> Result<ProfileUpdate, ProfileError> {
        let profile = profile.to_json()?;
        let (len, capacity) = (profile.chars().count(), self.config.field_capacity);
        if len > capacity {
            return Err(ProfileError::FieldOverflow { len, capacity });
        }
        Ok(ProfileUpdate { id, profile })
    }

    fn commit(
        &self,
        store: &mut dyn RouteStore,
        staged: &[ProfileUpdate],
        summary: &mut Summary,
    ) -> Result<(), ProfileError> {
        if staged.is_empty() {
            info!("no profiles to write");
            return Ok(());
        }

        info!(
            "writing {} profiles to {}",
            staged.len(),
            self.config.profile_field
        );
        let results: HashMap<RouteId, WriteResult> = store
            .write_profiles(staged)?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        for update in staged {
            match results.get(&update.id) {
                Some(WriteResult { success: true, .. }) => summary.updated += 1,
                Some(WriteResult { error, .. }) => {
                    warn!(
                        "write failed for {}: {}",
                        update.id,
                        error.as_deref().unwrap_or("unknown error")
                    );
                    summary.failed += 1;
                }
                None => {
                    warn!("write result missing for {}", update.id);
                    summary.failed += 1;
                }
            }
        }
        Ok(())
    }
}
