use crate::Profile;

/// Default minimum relief, in meters, for a profile to count as real
/// terrain.
pub const MIN_RELIEF_M: f64 = 0.5;

/// Default relief, in meters, below which an accepted profile is
/// reported as suspiciously flat.
pub const SUSPICIOUS_RELIEF_M: f64 = 5.0;

/// Verdict on a profile's elevation signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Validity {
    Valid,

    /// Accepted, but with little enough relief that the elevation data
    /// may be defaulted or noise.
    SuspiciouslyFlat { relief_m: f64 },

    /// Fewer than two points.
    TooShort,

    /// Relief below the minimum.
    Flat { relief_m: f64 },
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid | Self::SuspiciouslyFlat { .. })
    }
}

/// Judges whether a profile shows meaningful elevation variation.
///
/// Profiles that never sampled real elevations come out flat (every
/// vertex defaulted), and so do paths over GPS-noise-flat terrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Validator {
    min_relief_m: f64,
    suspicious_relief_m: f64,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            min_relief_m: MIN_RELIEF_M,
            suspicious_relief_m: SUSPICIOUS_RELIEF_M,
        }
    }
}

impl Validator {
    pub fn new(min_relief_m: f64) -> Self {
        Self {
            min_relief_m,
            ..Self::default()
        }
    }

    pub fn suspicious_below(mut self, relief_m: f64) -> Self {
        self.suspicious_relief_m = relief_m;
        self
    }

    pub fn judge(&self, profile: &Profile) -> Validity {
        if profile.len() < 2 {
            return Validity::TooShort;
        }
        let relief_m = profile.relief_m();
        if relief_m < self.min_relief_m {
            Validity::Flat { relief_m }
        } else if relief_m < self.suspicious_relief_m {
            Validity::SuspiciouslyFlat { relief_m }
        } else {
            Validity::Valid
        }
    }

    pub fn is_valid(&self, profile: &Profile) -> bool {
        self.judge(profile).is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::{Validator, Validity};
    use crate::{Profile, ProfilePoint};

    fn profile(elevations: &[f64]) -> Profile {
        Profile {
            points: elevations
                .iter()
                .enumerate()
                .map(|(i, &e)| ProfilePoint::new(i as f64 * 0.1, e))
                .collect(),
        }
    }

    #[test]
    fn test_too_short() {
        let validator = Validator::default();
        assert_eq!(validator.judge(&profile(&[])), Validity::TooShort);
        assert_eq!(validator.judge(&profile(&[1500.0])), Validity::TooShort);
        assert!(!validator.is_valid(&profile(&[1500.0])));
    }

    #[test]
    fn test_threshold() {
        let validator = Validator::default();
        assert!(!validator.is_valid(&profile(&[0.0, 0.0, 0.0])));
        assert!(!validator.is_valid(&profile(&[100.0, 100.4, 100.2])));
        assert!(validator.is_valid(&profile(&[100.0, 100.5])));
        assert!(validator.is_valid(&profile(&[100.0, 350.0, 120.0])));
    }

    #[test]
    fn test_suspiciously_flat_is_accepted() {
        let validator = Validator::default();
        assert_eq!(
            validator.judge(&profile(&[10.0, 12.0])),
            Validity::SuspiciouslyFlat { relief_m: 2.0 }
        );
        assert_eq!(validator.judge(&profile(&[10.0, 15.0])), Validity::Valid);

        let strict = Validator::new(3.0).suspicious_below(3.0);
        assert!(matches!(
            strict.judge(&profile(&[10.0, 12.0])),
            Validity::Flat { .. }
        ));
        assert_eq!(strict.judge(&profile(&[10.0, 13.0])), Validity::Valid);
    }
}
