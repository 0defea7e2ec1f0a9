use num_traits::{Float, FromPrimitive};

/// Rounds `value` to `places` decimal places, half away from zero.
pub fn round_to<T>(value: T, places: i32) -> T
where
    T: Float + FromPrimitive,
{
    let scale = T::from_f64(10f64.powi(places)).unwrap_or_else(T::one);
    (value * scale).round() / scale
}
