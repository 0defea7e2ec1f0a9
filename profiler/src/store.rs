//! Routes kept as features of a GeoJSON FeatureCollection file.

use elevprof::{
    Coordinate, Polyline, ProfileUpdate, RouteId, RouteInput, RouteStore, SpatialReference,
    StoreError, WriteResult,
};
use geojson::{feature::Id, Feature, FeatureCollection, GeoJson, Geometry, Value};
use log::{debug, warn};
use serde_json::Value as JsonValue;
use std::{
    collections::HashMap,
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

/// Property names tried, in order, for a route's display name.
const NAME_PROPERTIES: [&str; 2] = ["name_1", "name"];

/// Property carrying a route's numeric identifier.
const ID_PROPERTY: &str = "OBJECTID";

pub struct GeoJsonStore {
    collection: FeatureCollection,

    /// Feature index of every identified route.
    index: HashMap<RouteId, usize>,

    /// Features without a usable, unique identifier.
    unlisted: usize,

    /// Where `write_profiles` persists the collection.
    out: PathBuf,

    /// Property receiving serialized profiles.
    field: String,

    /// Spatial reference of every route geometry.
    spatial_reference: SpatialReference,

    /// Apply updates in memory only.
    dry_run: bool,
}

impl GeoJsonStore {
    pub fn open(input: PathBuf, out: PathBuf, field: String) -> Result<Self, StoreError> {
        let text = fs::read_to_string(&input)?;
        let collection = match text.parse::<GeoJson>().map_err(backend)? {
            GeoJson::FeatureCollection(collection) => collection,
            GeoJson::Feature(feature) => FeatureCollection {
                bbox: None,
                features: vec![feature],
                foreign_members: None,
            },
            GeoJson::Geometry(_) => {
                return Err(backend(format!(
                    "{} holds a bare geometry, not route features",
                    input.display()
                )))
            }
        };
        Ok(Self {
            collection,
            index: HashMap::new(),
            unlisted: 0,
            out,
            field,
            spatial_reference: SpatialReference::WGS84,
            dry_run: false,
        })
    }

    /// Declares the spatial reference of the file's coordinates.
    pub fn wkid(mut self, wkid: u32) -> Self {
        self.spatial_reference = SpatialReference { wkid: Some(wkid) };
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Writes the collection beside `out`, then renames it over
    /// `out`. A failed save leaves any existing file untouched.
    fn save(&self) -> Result<(), StoreError> {
        let dir = self
            .out
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, &self.collection).map_err(backend)?;
            writer.flush()?;
        }
        tmp.persist(&self.out).map_err(|e| e.error)?;
        debug!("wrote {} routes to {:?}", self.collection.features.len(), self.out);
        Ok(())
    }
}

impl RouteStore for GeoJsonStore {
    fn routes(&mut self) -> Result<Vec<RouteInput>, StoreError> {
        self.index.clear();
        self.unlisted = 0;
        let mut routes = Vec::with_capacity(self.collection.features.len());
        for (i, feature) in self.collection.features.iter().enumerate() {
            let Some(id) = route_id(feature) else {
                warn!("feature {i} has no usable {ID_PROPERTY} or id, ignoring it");
                self.unlisted += 1;
                continue;
            };
            if self.index.contains_key(&id) {
                warn!("feature {i} repeats route id {id}, ignoring it");
                self.unlisted += 1;
                continue;
            }
            self.index.insert(id, i);
            routes.push(RouteInput {
                id,
                name: route_name(feature),
                geometry: feature
                    .geometry
                    .as_ref()
                    .and_then(|g| polyline(g, self.spatial_reference)),
            });
        }
        Ok(routes)
    }

    fn write_profiles(&mut self, updates: &[ProfileUpdate]) -> Result<Vec<WriteResult>, StoreError> {
        let mut results = Vec::with_capacity(updates.len());
        for update in updates {
            match self
                .index
                .get(&update.id)
                .and_then(|&i| self.collection.features.get_mut(i))
            {
                Some(feature) => {
                    feature.set_property(self.field.clone(), update.profile.clone());
                    results.push(WriteResult::ok(update.id));
                }
                None => results.push(WriteResult::failed(update.id, "no such route")),
            }
        }
        if self.dry_run {
            debug!("dry run, leaving {:?} untouched", self.out);
        } else {
            self.save()?;
        }
        Ok(results)
    }

    fn unlisted(&self) -> usize {
        self.unlisted
    }
}

/// Prefers the `OBJECTID` property, then a numeric feature id. Either
/// may be a number or a numeric string.
fn route_id(feature: &Feature) -> Option<RouteId> {
    feature
        .property(ID_PROPERTY)
        .and_then(|id| id.as_i64().or_else(|| id.as_str()?.trim().parse().ok()))
        .or_else(|| match &feature.id {
            Some(Id::Number(n)) => n.as_i64(),
            Some(Id::String(s)) => s.parse().ok(),
            None => None,
        })
}

fn route_name(feature: &Feature) -> String {
    NAME_PROPERTIES
        .iter()
        .find_map(|key| feature.property(key).and_then(JsonValue::as_str))
        .filter(|name| !name.is_empty())
        .unwrap_or("Unknown")
        .to_owned()
}

/// Returns the route polyline, or `None` for non-linear geometries.
fn polyline(geometry: &Geometry, spatial_reference: SpatialReference) -> Option<Polyline> {
    let paths = match &geometry.value {
        Value::LineString(line) => vec![path(line)],
        Value::MultiLineString(lines) => lines.iter().map(|line| path(line)).collect(),
        _ => return None,
    };
    Some(Polyline::new(paths, spatial_reference))
}

fn path(positions: &[Vec<f64>]) -> Vec<Coordinate> {
    positions
        .iter()
        .filter_map(|position| match position.as_slice() {
            [x, y] => Some(Coordinate::new(*x, *y)),
            [x, y, z, ..] => Some(Coordinate::with_elevation(*x, *y, *z)),
            _ => None,
        })
        .collect()
}

fn backend(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> StoreError {
    StoreError::Backend(e.into())
}

#[cfg(test)]
mod tests {
    use super::GeoJsonStore;
    use elevprof::{ProfileUpdate, RouteStore};
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    const ROUTES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "OBJECTID": 7, "name_1": "Col de Lizarrieta" },
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[-1.6, 43.2, 100.0], [-1.59, 43.21, 150.0]]
                }
            },
            {
                "type": "Feature",
                "id": 12,
                "properties": { "name": "Larrun" },
                "geometry": {
                    "type": "MultiLineString",
                    "coordinates": [[[-1.6, 43.2], [-1.59, 43.21]], [[-1.5, 43.3], [-1.49, 43.31]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "OBJECTID": 13 },
                "geometry": null
            },
            {
                "type": "Feature",
                "properties": { "OBJECTID": "21", "name_1": "Xoldokogaina" },
                "geometry": null
            },
            {
                "type": "Feature",
                "properties": { "OBJECTID": 7, "name_1": "Col de Lizarrieta (copy)" },
                "geometry": null
            },
            {
                "type": "Feature",
                "properties": { "name": "anonymous" },
                "geometry": { "type": "Point", "coordinates": [0.0, 0.0] }
            }
        ]
    }"#;

    fn store(dir: &TempDir) -> GeoJsonStore {
        let input = dir.path().join("routes.geojson");
        fs::write(&input, ROUTES).unwrap();
        GeoJsonStore::open(input, dir.path().join("out.geojson"), "profile".into()).unwrap()
    }

    #[test]
    fn test_routes() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        let routes = store.routes().unwrap();
        assert_eq!(routes.len(), 4);
        // The anonymous feature and the repeated OBJECTID 7.
        assert_eq!(store.unlisted(), 2);

        assert_eq!(routes[0].id, 7);
        assert_eq!(routes[0].name, "Col de Lizarrieta");
        let line = routes[0].geometry.as_ref().unwrap();
        assert_eq!(line.primary_path().unwrap()[1].elevation, Some(150.0));
        assert!(line.spatial_reference.is_geographic());

        assert_eq!(routes[1].id, 12);
        assert_eq!(routes[1].name, "Larrun");
        let multi = routes[1].geometry.as_ref().unwrap();
        assert_eq!(multi.paths.len(), 2);
        assert_eq!(multi.primary_path().unwrap()[0].elevation, None);

        assert_eq!(routes[2].id, 13);
        assert_eq!(routes[2].name, "Unknown");
        assert!(routes[2].geometry.is_none());

        assert_eq!(routes[3].id, 21);
        assert_eq!(routes[3].name, "Xoldokogaina");
    }

    #[test]
    fn test_save_in_place() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("routes.geojson");
        fs::write(&input, ROUTES).unwrap();
        let mut store = GeoJsonStore::open(input.clone(), input.clone(), "profile".into()).unwrap();
        store.routes().unwrap();
        let results = store
            .write_profiles(&[ProfileUpdate {
                id: 21,
                profile: "[[0.0,900.0],[2.5,1120.0]]".into(),
            }])
            .unwrap();
        assert!(results[0].success);

        let written: Value = serde_json::from_str(&fs::read_to_string(&input).unwrap()).unwrap();
        assert_eq!(
            written["features"][3]["properties"]["profile"],
            "[[0.0,900.0],[2.5,1120.0]]"
        );
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_save_keeps_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("routes.geojson");
        fs::write(&input, ROUTES).unwrap();
        // A directory cannot be replaced by the saved file.
        let out = dir.path().join("out.geojson");
        fs::create_dir(&out).unwrap();

        let mut store = GeoJsonStore::open(input.clone(), out, "profile".into()).unwrap();
        store.routes().unwrap();
        assert!(store
            .write_profiles(&[ProfileUpdate {
                id: 7,
                profile: "[]".into(),
            }])
            .is_err());
        assert_eq!(fs::read_to_string(&input).unwrap(), ROUTES);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_write_profiles() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        store.routes().unwrap();
        let results = store
            .write_profiles(&[
                ProfileUpdate {
                    id: 7,
                    profile: "[[0.0,100.0],[1.378,150.0]]".into(),
                },
                ProfileUpdate {
                    id: 99,
                    profile: "[]".into(),
                },
            ])
            .unwrap();
        assert!(results[0].success);
        assert!(!results[1].success);

        let written: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("out.geojson")).unwrap())
                .unwrap();
        assert_eq!(
            written["features"][0]["properties"]["profile"],
            "[[0.0,100.0],[1.378,150.0]]"
        );
        assert!(written["features"][1]["properties"].get("profile").is_none());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir).dry_run(true);
        store.routes().unwrap();
        let results = store
            .write_profiles(&[ProfileUpdate {
                id: 12,
                profile: "[]".into(),
            }])
            .unwrap();
        assert!(results[0].success);
        assert!(!dir.path().join("out.geojson").exists());
    }
}
