mod haversine;
mod round;

pub use haversine::haversine_distance;
pub(crate) use round::round_to;
