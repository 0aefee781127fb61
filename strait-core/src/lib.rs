//! Strait Watch Core - tagged source results, domain scorers and indicator aggregation
//!
//! This crate provides the scoring primitives:
//! - Status-tagged source results and the four-domain data bundle
//! - Heuristic domain scorers (military, economic, news, stock)
//! - The weighted aggregator producing an [`IndicatorReport`]
//!
//! Everything here is synchronous and side-effect free apart from logging.
//! Failures never escape: a scorer falls back to its domain default, and the
//! aggregator falls back to a fixed report carrying an error description.

pub mod tagged;
pub mod scorers;
pub mod indicators;

pub use tagged::*;
pub use scorers::*;
pub use indicators::*;

/// Lower bound of every score
pub const MIN_SCORE: f64 = 0.0;

/// Upper bound of every score
pub const MAX_SCORE: f64 = 100.0;

/// Share of the overall score used as the trend projection base
pub const TREND_BASE_FACTOR: f64 = 0.6;

/// Month-one offset below the projection base
pub const TREND_NEAR_OFFSET: f64 = 5.0;

/// Month-three offset above the projection base
pub const TREND_FAR_OFFSET: f64 = 3.0;

/// Clamp a score into `[MIN_SCORE, MAX_SCORE]`
pub fn clamp_score(value: f64) -> f64 {
    value.clamp(MIN_SCORE, MAX_SCORE)
}

/// Round to one decimal place, half away from zero.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round1_half_away_from_zero() {
        assert_eq!(round1(23.25), 23.3);
        assert_eq!(round1(18.25), 18.3);
        assert_eq!(round1(43.0), 43.0);
        assert_eq!(round1(0.04), 0.0);
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(-4.0), 0.0);
        assert_eq!(clamp_score(140.0), 100.0);
        assert_eq!(clamp_score(42.5), 42.5);
    }
}
