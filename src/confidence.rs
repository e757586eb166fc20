//! Confidence score value type.
//!
//! Every stage that produces text also reports how much it trusts that text.
//! The score travels with the text across stage boundaries: the OCR cascade
//! compares scores across engines and the correction pipeline decides whether
//! AI correction is worth invoking. Wrapping the raw float guarantees two
//! invariants at construction time instead of at every use site: the value is
//! inside [0, 1], and it is never NaN (so comparisons are total).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A reliability measure in `[0.0, 1.0]`, comparable across stages.
///
/// Digital text extraction is assigned [`Confidence::CERTAIN`]; OCR engines
/// report whatever their recognition model measured.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    /// Full confidence, used for digital text extraction.
    pub const CERTAIN: Confidence = Confidence(1.0);

    /// Zero confidence.
    pub const NONE: Confidence = Confidence(0.0);

    /// Create a score, clamping into `[0.0, 1.0]`. NaN maps to 0.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            Confidence(0.0)
        } else {
            Confidence(value.clamp(0.0, 1.0))
        }
    }

    /// The raw value.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Whether this score falls strictly below `threshold`.
    pub fn is_below(&self, threshold: f64) -> bool {
        self.0 < threshold
    }
}

impl Eq for Confidence {}

#[allow(clippy::derive_ord_xor_partial_ord)]
impl Ord for Confidence {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Construction rules out NaN, so total_cmp agrees with partial_cmp.
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range() {
        assert_eq!(Confidence::new(1.5).value(), 1.0);
        assert_eq!(Confidence::new(-0.3).value(), 0.0);
    }

    #[test]
    fn nan_maps_to_zero() {
        assert_eq!(Confidence::new(f64::NAN).value(), 0.0);
    }

    #[test]
    fn comparable_across_values() {
        assert!(Confidence::new(0.9) > Confidence::new(0.5));
        assert!(Confidence::NONE < Confidence::CERTAIN);
    }

    #[test]
    fn threshold_check_is_strict() {
        assert!(Confidence::new(0.5).is_below(0.7));
        assert!(!Confidence::new(0.7).is_below(0.7));
    }
}
