//! Local DEM surface backed by a directory of HGT tiles.

use crate::{
    source::{BulkInterpolator, PointSampler, Sample},
    Coordinate, ProfileError, SourceError,
};
use dashmap::DashMap;
use geo::geometry::Coord;
use hgt::{Elevation, HgtError, Tile};
use log::debug;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Floating point type used for tile lookup.
pub type C = f64;

pub struct Tiles {
    /// Directory containing HGT tile files.
    tile_dir: PathBuf,

    /// How to load tiles (in-memory or mapped).
    tile_mode: TileMode,

    /// Tiles which have been loaded on demand.
    tiles: DashMap<Coord<i16>, Arc<Tile>>,
}

impl Tiles {
    pub fn new(tile_dir: PathBuf, tile_mode: TileMode) -> Result<Self, ProfileError> {
        let mut has_height_files = false;

        // Fail early unless tile_dir holds at least one `hgt` file.
        for entry in std::fs::read_dir(&tile_dir)? {
            let path = entry?.path();
            if path
                .extension()
                .and_then(std::ffi::OsStr::to_str)
                .is_some_and(|ext| ext.eq_ignore_ascii_case("hgt"))
            {
                has_height_files = true;
                break;
            }
        }

        if has_height_files {
            Ok(Self {
                tile_dir,
                tile_mode,
                tiles: DashMap::new(),
            })
        } else {
            Err(ProfileError::Path(tile_dir))
        }
    }

    /// Returns the tile containing `coord`.
    ///
    /// Tiles are read from disk on first use. A tile missing from
    /// disk is replaced by an all-void tombstone.
    pub fn get(&self, coord: Coord<C>) -> Result<Arc<Tile>, HgtError> {
        let sw_corner = sw_corner(coord);
        self.tiles
            .entry(sw_corner)
            .or_try_insert_with(|| match self.load_tile(sw_corner) {
                Ok(tile) => Ok(Arc::new(tile)),
                Err(HgtError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                    Ok(Arc::new(Self::load_tombstone(sw_corner)))
                }
                Err(e) => Err(e),
            })
            .map(|r| r.clone())
    }

    /// Returns the nearest sample to `coord`.
    pub fn elevation(&self, coord: Coord<C>) -> Result<Elevation, HgtError> {
        let tile = self.get(coord)?;
        Ok(tile.get(coord).unwrap_or(Elevation::Void))
    }
}

/// Private API.
impl Tiles {
    fn load_tile(&self, sw_corner: Coord<i16>) -> Result<Tile, HgtError> {
        let tile_path = {
            let file_name = file_name(sw_corner);
            let mut tile_path: PathBuf = [&self.tile_dir, Path::new(&file_name)].iter().collect();
            if !tile_path.exists() {
                let file_name = file_name.to_lowercase();
                tile_path = [&self.tile_dir, Path::new(&file_name)].iter().collect();
            }
            tile_path
        };
        debug!("loading {tile_path:?}");
        match self.tile_mode {
            TileMode::InMem => Tile::load(tile_path),
            TileMode::MemMap => Tile::memmap(tile_path),
        }
    }

    fn load_tombstone(sw_corner: Coord<i16>) -> Tile {
        debug!("loading tombstone in lieu of missing tile for {sw_corner:?}");
        Tile::tombstone(sw_corner)
    }
}

/// A single DEM directory serves whatever surface name is asked for.
impl BulkInterpolator for Tiles {
    fn interpolate(
        &self,
        vertices: &[Coordinate],
        _surface: &str,
    ) -> Result<Vec<Coordinate>, SourceError> {
        vertices
            .iter()
            .map(|vertex| -> Result<Coordinate, SourceError> {
                let coord = vertex.coord();
                let elevation = self
                    .get(coord)?
                    .interpolate(coord)
                    .ok_or(SourceError::NoData {
                        lon: vertex.longitude,
                        lat: vertex.latitude,
                    })?;
                Ok(Coordinate {
                    elevation: Some(elevation),
                    ..*vertex
                })
            })
            .collect()
    }
}

impl PointSampler for Tiles {
    fn supports_batch(&self) -> bool {
        true
    }

    fn sample(&self, coord: &Coordinate, _surface: &str) -> Result<Sample, SourceError> {
        Ok(match self.elevation(coord.coord())? {
            Elevation::Meters(m) => Sample::Value(f64::from(m)),
            Elevation::Void => Sample::NoData,
        })
    }
}

/// How to handle tile.
///
/// The trade off between loading tile data into memory versus memory
/// mapping is not obvious, and you should measure both before
/// deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileMode {
    /// Parse tile and load into memory.
    ///
    /// Note that this can consume gigabytes of RAM when loading many
    /// tiles.
    InMem,

    /// Memory map file contents.
    MemMap,
}

/// Returns the southwest corner as integers for coord.
fn sw_corner(Coord { x, y }: Coord<C>) -> Coord<i16> {
    #[allow(clippy::cast_possible_truncation)]
    Coord {
        x: (x.floor() as i16),
        y: (y.floor() as i16),
    }
}

/// Returns the expected file name for coord
fn file_name(Coord { x, y }: Coord<i16>) -> String {
    let (n_s, lat) = {
        let lat = y.abs();
        let n_s = if y.is_negative() { 'S' } else { 'N' };
        (n_s, lat)
    };
    let (e_w, lon) = {
        let lon = x.abs();
        let e_w = if x.is_negative() { 'W' } else { 'E' };
        (e_w, lon)
    };
    format!("{n_s}{lat:02}{e_w}{lon:03}.hgt")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{file_name, sw_corner, Coord, TileMode, Tiles};
    use crate::{
        source::{BulkInterpolator, PointSampler, Sample},
        Coordinate, ProfileError, SourceError,
    };
    use approx::assert_relative_eq;
    use byteorder::{BigEndian as BE, WriteBytesExt};
    use hgt::{Elevation, VOID};
    use std::{
        fs::File,
        io::{BufWriter, Write},
    };
    use tempfile::TempDir;

    /// Writes a 3-arcsecond `N43W002.hgt` whose elevation rises 1 m
    /// per sample eastward, with a void in the sample at (600, 600).
    pub(crate) fn tile_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let mut file = BufWriter::new(File::create(dir.path().join("N43W002.hgt")).unwrap());
        for y in (0..1201_usize).rev() {
            for x in 0..1201_usize {
                let sample = if (x, y) == (600, 600) {
                    VOID
                } else {
                    i16::try_from(x).unwrap()
                };
                file.write_i16::<BE>(sample).unwrap();
            }
        }
        file.flush().unwrap();
        dir
    }

    /// Coordinate of sample (x, y) in the N43W002 tile.
    pub(crate) fn at(x: f64, y: f64) -> Coordinate {
        Coordinate::new(-2.0 + x / 1200.0, 43.0 + y / 1200.0)
    }

    #[test]
    fn test_requires_height_files() {
        let empty = TempDir::new().unwrap();
        assert!(matches!(
            Tiles::new(empty.path().to_owned(), TileMode::MemMap),
            Err(ProfileError::Path(_))
        ));
    }

    #[test]
    fn test_missing_tile_is_void() {
        let dir = tile_dir();
        let tiles = Tiles::new(dir.path().to_owned(), TileMode::MemMap).unwrap();
        let south_pole = Coord { y: -89.5, x: 0.0 };
        assert_eq!(tiles.elevation(south_pole).unwrap(), Elevation::Void);
        assert_eq!(
            tiles.sample(&Coordinate::new(0.0, -89.5), "Terrain").unwrap(),
            Sample::NoData
        );
    }

    #[test]
    fn test_sample() {
        let dir = tile_dir();
        let tiles = Tiles::new(dir.path().to_owned(), TileMode::InMem).unwrap();
        let samples = tiles
            .sample_batch(&[at(10.0, 10.0), at(600.0, 600.0), at(1199.8, 3.0)], "Terrain")
            .unwrap();
        assert_eq!(
            samples,
            vec![Sample::Value(10.0), Sample::NoData, Sample::Value(1200.0)]
        );
    }

    #[test]
    fn test_interpolate() {
        let dir = tile_dir();
        let tiles = Tiles::new(dir.path().to_owned(), TileMode::MemMap).unwrap();
        let path = tiles
            .interpolate(&[at(10.25, 4.0), at(20.5, 900.0)], "Terrain")
            .unwrap();
        assert_relative_eq!(path[0].elevation.unwrap(), 10.25, epsilon = 1e-6);
        assert_relative_eq!(path[1].elevation.unwrap(), 20.5, epsilon = 1e-6);
        assert_relative_eq!(path[1].longitude, at(20.5, 900.0).longitude);

        assert!(matches!(
            tiles.interpolate(&[at(10.0, 10.0), at(600.2, 600.2)], "Terrain"),
            Err(SourceError::NoData { .. })
        ));
    }

    #[test]
    fn test_file_name() {
        let name = file_name(sw_corner(Coord {
            y: 0.0 + f64::EPSILON,
            x: 0.0 + f64::EPSILON,
        }));
        assert_eq!(name, "N00E000.hgt");

        let name = file_name(sw_corner(Coord {
            y: 0.0 + f64::EPSILON,
            x: 0.0 - f64::EPSILON,
        }));
        assert_eq!(name, "N00W001.hgt");

        let name = file_name(sw_corner(Coord {
            y: 0.0 - f64::EPSILON,
            x: 0.0 - f64::EPSILON,
        }));
        assert_eq!(name, "S01W001.hgt");

        let name = file_name(sw_corner(Coord {
            y: 43.3,
            x: -1.6,
        }));
        assert_eq!(name, "N43W002.hgt");
    }
}
