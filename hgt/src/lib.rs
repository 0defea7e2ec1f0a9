//! SRTM/NASADEM elevation (`.hgt`) file format.
//!
//! An HGT file is a square grid of big-endian `i16` samples, stored
//! row-major from the northernmost row to the southernmost. The file
//! name encodes the southwest corner (`N44W072.hgt`), and the file
//! length encodes the resolution.
//!
//! # References
//!
//! 1. [HGT file layout](http://fileformats.archiveteam.org/index.php?title=HGT&oldid=17250)
//! 1. [SRTM Collection User Guide](https://lpdaac.usgs.gov/documents/179/SRTM_User_Guide_V3.pdf)

mod error;

pub use crate::error::HgtError;
use byteorder::{BigEndian as BE, ByteOrder, ReadBytesExt};
use geo::geometry::Coord;
use memmap2::Mmap;
use std::{fs::File, io::BufReader, mem::size_of, path::Path};

/// Base floating point type used for all coordinates and calculations.
pub type C = f64;

const ARCSEC_PER_DEG: C = 3600.0;

/// Sample value SRTM uses to mark a hole in the data.
pub const VOID: i16 = i16::MIN;

/// A single elevation sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevation {
    /// Height above the geoid, in meters.
    Meters(i16),

    /// The surface has no value here.
    Void,
}

impl Elevation {
    fn from_raw(raw: i16) -> Self {
        if raw == VOID {
            Self::Void
        } else {
            Self::Meters(raw)
        }
    }

    pub fn meters(self) -> Option<i16> {
        match self {
            Self::Meters(m) => Some(m),
            Self::Void => None,
        }
    }
}

pub struct Tile {
    /// Southwest corner of the tile.
    ///
    /// Specificlly, the _center_ of the SW most sample of the tile.
    sw_corner_center: Coord<C>,

    /// Arcseconds per sample.
    resolution: u8,

    /// Number of (columns, rows) in this tile.
    dimensions: (usize, usize),

    /// Elevation samples.
    samples: SampleStore,
}

enum SampleStore {
    Tombstone,
    InMem(Box<[i16]>),
    MemMap(Mmap),
}

impl SampleStore {
    fn get_unchecked(&self, index: usize) -> i16 {
        match self {
            Self::Tombstone => VOID,
            Self::InMem(samples) => samples[index],
            Self::MemMap(raw) => {
                let start = index * size_of::<i16>();
                let end = start + size_of::<i16>();
                BE::read_i16(&raw[start..end])
            }
        }
    }
}

impl Tile {
    /// Returns a Tile read into memory from the file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, HgtError> {
        let (resolution, dimensions @ (cols, rows)) = extract_resolution(&path)?;
        let sw_corner_center = corner_to_center(parse_sw_corner(&path)?);

        let mut file = BufReader::new(File::open(path)?);

        let samples = {
            let mut sample_store = Vec::with_capacity(cols * rows);
            for _ in 0..(cols * rows) {
                sample_store.push(file.read_i16::<BE>()?);
            }
            SampleStore::InMem(sample_store.into_boxed_slice())
        };

        Ok(Self {
            sw_corner_center,
            resolution,
            dimensions,
            samples,
        })
    }

    /// Returns a Tile using the memory-mapped file as storage.
    pub fn memmap<P: AsRef<Path>>(path: P) -> Result<Self, HgtError> {
        let (resolution, dimensions) = extract_resolution(&path)?;
        let sw_corner_center = corner_to_center(parse_sw_corner(&path)?);

        let samples = {
            let file = File::open(path)?;
            // The file length was validated above, and tiles are
            // treated as read-only for the life of the map.
            let mmap = unsafe { Mmap::map(&file)? };
            SampleStore::MemMap(mmap)
        };

        Ok(Self {
            sw_corner_center,
            resolution,
            dimensions,
            samples,
        })
    }

    /// Returns a stand-in for a tile that does not exist on disk.
    ///
    /// Every sample of a tombstone is [`Elevation::Void`].
    pub fn tombstone(sw_corner: Coord<i16>) -> Self {
        Self {
            sw_corner_center: corner_to_center(sw_corner),
            resolution: 3,
            dimensions: (1201, 1201),
            samples: SampleStore::Tombstone,
        }
    }

    /// Returns the number of samples in this tile.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        let (x, y) = self.dimensions;
        x * y
    }

    /// Returns this tile's resolution in arcseconds per sample.
    pub fn resolution(&self) -> u8 {
        self.resolution
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self.samples, SampleStore::Tombstone)
    }

    /// Returns the sample nearest to `coord`, or `None` if `coord`
    /// is not covered by this tile.
    pub fn get(&self, coord: Coord<C>) -> Option<Elevation> {
        let (fx, fy) = self.coord_to_fractional_xy(coord);
        #[allow(clippy::cast_possible_truncation)]
        let (idx_x, idx_y) = ((fx + 0.5).floor() as isize, (fy + 0.5).floor() as isize);
        let (cols, rows) = self.dimensions;
        #[allow(clippy::cast_possible_wrap)]
        if 0 <= idx_x && idx_x < cols as isize && 0 <= idx_y && idx_y < rows as isize {
            #[allow(clippy::cast_sign_loss)]
            Some(self.get_xy((idx_x as usize, idx_y as usize)))
        } else {
            None
        }
    }

    /// Returns the bilinearly interpolated elevation at `coord`.
    ///
    /// Returns `None` if `coord` is outside this tile or if any of
    /// the four surrounding samples is void.
    pub fn interpolate(&self, coord: Coord<C>) -> Option<C> {
        let (fx, fy) = self.coord_to_fractional_xy(coord);
        let (cols, rows) = self.dimensions;
        #[allow(clippy::cast_precision_loss)]
        let (max_x, max_y) = ((cols - 1) as C, (rows - 1) as C);
        if !(0.0..=max_x).contains(&fx) || !(0.0..=max_y).contains(&fy) {
            return None;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (x0, y0) = (
            (fx.floor() as usize).min(cols - 2),
            (fy.floor() as usize).min(rows - 2),
        );
        #[allow(clippy::cast_precision_loss)]
        let (tx, ty) = (fx - x0 as C, fy - y0 as C);

        let sw = C::from(self.get_xy((x0, y0)).meters()?);
        let se = C::from(self.get_xy((x0 + 1, y0)).meters()?);
        let nw = C::from(self.get_xy((x0, y0 + 1)).meters()?);
        let ne = C::from(self.get_xy((x0 + 1, y0 + 1)).meters()?);

        let south = sw + (se - sw) * tx;
        let north = nw + (ne - nw) * tx;
        Some(south + (north - south) * ty)
    }
}

/// Private API
impl Tile {
    fn get_xy(&self, (x, y): (usize, usize)) -> Elevation {
        let idx_1d = self.xy_to_linear_index((x, y));
        Elevation::from_raw(self.samples.get_unchecked(idx_1d))
    }

    /// Returns `coord` in (possibly fractional, possibly out of range)
    /// sample units, with the SW sample at the origin.
    fn coord_to_fractional_xy(&self, coord: Coord<C>) -> (C, C) {
        let c = ARCSEC_PER_DEG / C::from(self.resolution);
        let x = (coord.x - self.sw_corner_center.x) * c;
        let y = (coord.y - self.sw_corner_center.y) * c;
        (x, y)
    }

    fn xy_to_linear_index(&self, (x, y): (usize, usize)) -> usize {
        let (cols, rows) = self.dimensions;
        cols * (rows - y - 1) + x
    }
}

fn corner_to_center(Coord { x, y }: Coord<i16>) -> Coord<C> {
    Coord {
        x: C::from(x),
        y: C::from(y),
    }
}

fn extract_resolution<P: AsRef<Path>>(path: P) -> Result<(u8, (usize, usize)), HgtError> {
    const RES_1_ARCSECONDS_FILE_LEN: u64 = 3601 * 3601 * size_of::<u16>() as u64;
    const RES_3_ARCSECONDS_FILE_LEN: u64 = 1201 * 1201 * size_of::<u16>() as u64;
    match path.as_ref().metadata().map(|m| m.len())? {
        RES_1_ARCSECONDS_FILE_LEN => Ok((1, (3601, 3601))),
        RES_3_ARCSECONDS_FILE_LEN => Ok((3, (1201, 1201))),
        invalid_len => Err(HgtError::HgtLen(invalid_len, path.as_ref().to_owned())),
    }
}

fn parse_sw_corner<P: AsRef<Path>>(path: P) -> Result<Coord<i16>, HgtError> {
    let mk_err = || HgtError::HgtName(path.as_ref().to_owned());
    let name = path
        .as_ref()
        .file_stem()
        .and_then(std::ffi::OsStr::to_str)
        .ok_or_else(mk_err)?
        .to_uppercase();
    if name.len() != 7 || !name.is_ascii() {
        return Err(mk_err());
    }
    let lat_sign = match &name[0..1] {
        "N" => 1,
        "S" => -1,
        _ => return Err(mk_err()),
    };
    let lat = lat_sign * name[1..3].parse::<i16>().map_err(|_| mk_err())?;
    let lon_sign = match &name[3..4] {
        "E" => 1,
        "W" => -1,
        _ => return Err(mk_err()),
    };
    let lon = lon_sign * name[4..7].parse::<i16>().map_err(|_| mk_err())?;
    Ok(Coord { x: lon, y: lat })
}
