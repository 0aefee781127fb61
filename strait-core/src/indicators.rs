//! Indicator aggregation
//!
//! Folds the four domain scores into an [`IndicatorReport`]:
//! - fixed-weight overall threat probability
//! - a three-point trend projection nudged around that overall score
//! - the original source statuses, for traceability
//!
//! Scorer failures are absorbed by the scorers themselves. Anything that goes
//! wrong in the aggregation step replaces the whole report with
//! [`IndicatorReport::fallback`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    round1, BaselineStockScorer, DataBundle, Domain, DomainScorer, EconomicScorer, MilitaryScorer,
    NewsScorer, MAX_SCORE, MIN_SCORE, TREND_BASE_FACTOR, TREND_FAR_OFFSET, TREND_NEAR_OFFSET,
};

/// Errors in the aggregation step
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("bundle is missing the '{0}' source")]
    MissingDomain(Domain),

    #[error("malformed {domain} source: {reason}")]
    MalformedDomain { domain: Domain, reason: String },

    #[error("malformed bundle: {0}")]
    MalformedBundle(String),

    #[error("indicator weights sum to {0}, expected 1.0")]
    InvalidWeights(f64),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Weights of each domain in the overall score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub military: f64,
    pub economic: f64,
    pub news: f64,
    pub stock: f64,
}

impl Weights {
    pub const DEFAULT: Weights = Weights {
        military: 0.40,
        economic: 0.25,
        news: 0.25,
        stock: 0.10,
    };

    pub fn total(&self) -> f64 {
        self.military + self.economic + self.news + self.stock
    }

    /// Weights must be non-negative and sum to 1.0
    pub fn validate(&self) -> Result<(), AggregateError> {
        let parts = [self.military, self.economic, self.news, self.stock];
        let total = self.total();

        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) || (total - 1.0).abs() > 1e-9 {
            return Err(AggregateError::InvalidWeights(total));
        }
        Ok(())
    }

    pub fn combine(&self, scores: &DomainScores) -> f64 {
        scores.military * self.military
            + scores.economic * self.economic
            + scores.news * self.news
            + scores.stock * self.stock
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Unrounded per-domain scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainScores {
    pub military: f64,
    pub economic: f64,
    pub news: f64,
    pub stock: f64,
}

/// Three-month trend projection derived from the overall score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreeMonthProbabilities {
    pub month1: f64,
    pub month2: f64,
    pub month3: f64,
}

impl ThreeMonthProbabilities {
    /// Linear nudge around `overall * 0.6`; not a forecast
    pub fn project(overall: f64) -> Self {
        let base = overall * TREND_BASE_FACTOR;
        Self {
            month1: (base - TREND_NEAR_OFFSET).max(MIN_SCORE),
            month2: base,
            month3: (base + TREND_FAR_OFFSET).min(MAX_SCORE),
        }
    }

    fn rounded(&self) -> Self {
        Self {
            month1: round1(self.month1),
            month2: round1(self.month2),
            month3: round1(self.month3),
        }
    }
}

/// Original status of each domain source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSources {
    pub military_status: String,
    pub economic_status: String,
    pub news_status: String,
    pub stock_status: String,
}

impl DataSources {
    pub fn from_bundle(bundle: &DataBundle) -> Self {
        Self {
            military_status: bundle.military.status.clone(),
            economic_status: bundle.economic.status.clone(),
            news_status: bundle.news.status.clone(),
            stock_status: bundle.stock.status.clone(),
        }
    }
}

/// Output of one aggregation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorReport {
    pub military_threat: f64,
    pub economic_pressure: f64,
    pub news_alert: f64,
    pub stock_impact: f64,
    pub overall_threat_probability: f64,
    pub three_month_probabilities: ThreeMonthProbabilities,
    pub calculation_time: DateTime<Utc>,

    /// Absent on the fallback report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_sources: Option<DataSources>,

    /// Present only on the fallback report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IndicatorReport {
    /// Fixed report substituted when aggregation fails
    pub fn fallback(error: impl Into<String>) -> Self {
        Self {
            military_threat: 30.0,
            economic_pressure: 25.0,
            news_alert: 20.0,
            stock_impact: 10.0,
            overall_threat_probability: 25.0,
            three_month_probabilities: ThreeMonthProbabilities {
                month1: 20.0,
                month2: 25.0,
                month3: 28.0,
            },
            calculation_time: Utc::now(),
            data_sources: None,
            error: Some(error.into()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }

    /// Every numeric field, in declaration order
    pub fn numeric_fields(&self) -> [(&'static str, f64); 8] {
        [
            ("military_threat", self.military_threat),
            ("economic_pressure", self.economic_pressure),
            ("news_alert", self.news_alert),
            ("stock_impact", self.stock_impact),
            ("overall_threat_probability", self.overall_threat_probability),
            ("month1", self.three_month_probabilities.month1),
            ("month2", self.three_month_probabilities.month2),
            ("month3", self.three_month_probabilities.month3),
        ]
    }
}

/// Scores a data bundle into an [`IndicatorReport`]
pub struct IndicatorCalculator {
    military: MilitaryScorer,
    economic: EconomicScorer,
    news: NewsScorer,
    stock: Box<dyn DomainScorer>,
    weights: Weights,
}

impl Default for IndicatorCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorCalculator {
    pub fn new() -> Self {
        Self {
            military: MilitaryScorer,
            economic: EconomicScorer,
            news: NewsScorer,
            stock: Box::new(BaselineStockScorer),
            weights: Weights::DEFAULT,
        }
    }

    /// Replace the baseline stock scorer
    pub fn with_stock_scorer(mut self, scorer: impl DomainScorer + 'static) -> Self {
        self.stock = Box::new(scorer);
        self
    }

    /// Override the domain weights; invalid weights yield the fallback report
    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Score each domain independently
    pub fn scores(&self, bundle: &DataBundle) -> DomainScores {
        DomainScores {
            military: self.military.score(&bundle.military),
            economic: self.economic.score(&bundle.economic),
            news: self.news.score(&bundle.news),
            stock: self.stock.score(&bundle.stock),
        }
    }

    /// Aggregate a typed bundle; never fails
    pub fn calculate(&self, bundle: &DataBundle) -> IndicatorReport {
        match self.try_calculate(bundle) {
            Ok(report) => report,
            Err(e) => {
                warn!("Indicator aggregation failed, using fallback report: {}", e);
                IndicatorReport::fallback(e.to_string())
            }
        }
    }

    /// Aggregate a raw JSON bundle; never fails
    pub fn calculate_value(&self, raw: &Value) -> IndicatorReport {
        match DataBundle::from_value(raw) {
            Ok(bundle) => self.calculate(&bundle),
            Err(e) => {
                warn!("Rejected data bundle, using fallback report: {}", e);
                IndicatorReport::fallback(e.to_string())
            }
        }
    }

    fn try_calculate(&self, bundle: &DataBundle) -> Result<IndicatorReport, AggregateError> {
        self.weights.validate()?;

        let scores = self.scores(bundle);
        let overall = self.weights.combine(&scores);
        let trend = ThreeMonthProbabilities::project(overall);

        debug!(
            "Domain scores: military={} economic={} news={} stock={} overall={}",
            scores.military, scores.economic, scores.news, scores.stock, overall
        );

        let report = IndicatorReport {
            military_threat: round1(scores.military),
            economic_pressure: round1(scores.economic),
            news_alert: round1(scores.news),
            stock_impact: round1(scores.stock),
            overall_threat_probability: round1(overall),
            three_month_probabilities: trend.rounded(),
            calculation_time: Utc::now(),
            data_sources: Some(DataSources::from_bundle(bundle)),
            error: None,
        };

        for (field, value) in report.numeric_fields() {
            if !value.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&value) {
                return Err(AggregateError::OutOfRange { field, value });
            }
        }

        Ok(report)
    }
}

/// Aggregate a bundle with the default scorers and weights
pub fn calculate_threat_indicators(bundle: &DataBundle) -> IndicatorReport {
    IndicatorCalculator::new().calculate(bundle)
}
