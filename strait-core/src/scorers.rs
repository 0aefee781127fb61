//! Heuristic domain scorers
//!
//! Each scorer maps one [`TaggedResult`] to a bounded score in `[0, 100]`.
//! A non-success status yields the domain's unavailable default; a payload
//! that cannot be scored yields its error default. Neither case surfaces an
//! error to the caller.
//!
//! The keyword lists, weights and caps are tuned heuristics and are kept
//! exactly as deployed. The economic scorer looks at which commodities were
//! quoted, not at their prices.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::{clamp_score, Domain, TaggedResult};

/// Errors raised while scoring a successful payload
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("malformed {domain} payload: {reason}")]
    Malformed { domain: Domain, reason: String },

    #[error("{domain} score is not a finite number")]
    NonFinite { domain: Domain },
}

/// Common interface for all domain scorers
pub trait DomainScorer: Send + Sync {
    /// Domain this scorer handles
    fn domain(&self) -> Domain;

    /// Score used when the source did not report success
    fn unavailable_score(&self) -> f64;

    /// Score used when a successful payload could not be scored
    fn error_score(&self) -> f64;

    /// Score a successful payload; `None` when the source sent no payload
    fn compute(&self, data: Option<&Value>) -> Result<f64, ScoreError>;

    /// Score a tagged result, absorbing every failure into a default
    fn score(&self, result: &TaggedResult) -> f64 {
        if !result.is_success() {
            debug!(
                "{} source status '{}', using default {}",
                self.domain(),
                result.status,
                self.unavailable_score()
            );
            return self.unavailable_score();
        }

        let computed = self.compute(result.data.as_ref()).and_then(|score| {
            if score.is_finite() {
                Ok(score)
            } else {
                Err(ScoreError::NonFinite {
                    domain: self.domain(),
                })
            }
        });

        match computed {
            Ok(score) => clamp_score(score),
            Err(e) => {
                debug!("{}, using error default {}", e, self.error_score());
                self.error_score()
            }
        }
    }
}

/// Count how many of `keywords` occur in `content`, once per keyword
fn keyword_hits(content: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| content.contains(*k)).count()
}

/// A missing payload is an empty sequence; anything but an array is malformed
fn as_sequence(domain: Domain, data: Option<&Value>) -> Result<&[Value], ScoreError> {
    match data {
        None => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(ScoreError::Malformed {
            domain,
            reason: format!("expected a sequence, got {}", json_kind(other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

// ---------------------------------------------------------------------------
// Military
// ---------------------------------------------------------------------------

/// Drills, aircraft, warships, missiles, patrols, alerts
pub const MILITARY_KEYWORDS: &[&str] = &[
    "演習", "軍演", "戰機", "軍艦", "導彈", "飛彈", "巡航", "警戒", "緊急",
];

/// Intrusion, breach, attack, threat, provocation, confrontation
pub const MILITARY_HIGH_THREAT_KEYWORDS: &[&str] = &["入侵", "突破", "攻擊", "威脅", "挑釁", "對峙"];

/// Scores military bulletins by keyword density
#[derive(Debug, Clone, Copy, Default)]
pub struct MilitaryScorer;

impl MilitaryScorer {
    pub const UNAVAILABLE: f64 = 30.0;
    pub const ERROR: f64 = 35.0;
    /// Score when the bulletin list is empty
    pub const EMPTY: f64 = 25.0;
    /// Added to the keyword base when any bulletin exists
    pub const FRESHNESS_BONUS: f64 = 10.0;
    pub const KEYWORD_CAP: f64 = 70.0;

    /// Render a record to lowercase text for keyword matching
    fn render(item: &Value) -> String {
        match item {
            Value::String(text) => text.to_lowercase(),
            other => other.to_string().to_lowercase(),
        }
    }
}

impl DomainScorer for MilitaryScorer {
    fn domain(&self) -> Domain {
        Domain::Military
    }

    fn unavailable_score(&self) -> f64 {
        Self::UNAVAILABLE
    }

    fn error_score(&self) -> f64 {
        Self::ERROR
    }

    fn compute(&self, data: Option<&Value>) -> Result<f64, ScoreError> {
        let items = as_sequence(Domain::Military, data)?;

        if items.is_empty() {
            return Ok(Self::EMPTY);
        }

        let mut keyword_count = 0usize;
        let mut high_threat_count = 0usize;

        for item in items {
            let content = Self::render(item);
            keyword_count += keyword_hits(&content, MILITARY_KEYWORDS);
            // High-threat matches count double
            high_threat_count += 2 * keyword_hits(&content, MILITARY_HIGH_THREAT_KEYWORDS);
        }

        let base = (keyword_count as f64 * 5.0 + high_threat_count as f64 * 10.0).min(Self::KEYWORD_CAP);

        Ok(base + Self::FRESHNESS_BONUS)
    }
}

// ---------------------------------------------------------------------------
// Economic
// ---------------------------------------------------------------------------

/// Keys under which a gold quote may appear
pub const GOLD_KEYS: &[&str] = &["gold", "GC=F"];

/// Soybean, wheat and corn futures tickers
pub const GRAIN_KEYS: &[&str] = &["ZS=F", "ZW=F", "ZC=F"];

/// Scores commodity coverage as a proxy for safe-haven pressure
#[derive(Debug, Clone, Copy, Default)]
pub struct EconomicScorer;

impl EconomicScorer {
    pub const UNAVAILABLE: f64 = 25.0;
    pub const ERROR: f64 = 30.0;
    pub const BASE: f64 = 20.0;
    pub const GOLD_WEIGHT: f64 = 15.0;
    pub const GRAIN_WEIGHT: f64 = 8.0;
}

impl DomainScorer for EconomicScorer {
    fn domain(&self) -> Domain {
        Domain::Economic
    }

    fn unavailable_score(&self) -> f64 {
        Self::UNAVAILABLE
    }

    fn error_score(&self) -> f64 {
        Self::ERROR
    }

    fn compute(&self, data: Option<&Value>) -> Result<f64, ScoreError> {
        let empty = Map::new();
        let quotes = match data {
            None => &empty,
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(ScoreError::Malformed {
                    domain: Domain::Economic,
                    reason: format!("expected a mapping, got {}", json_kind(other)),
                })
            }
        };

        let mut pressure = 0.0;

        if GOLD_KEYS.iter().any(|k| quotes.contains_key(*k)) {
            pressure += Self::GOLD_WEIGHT;
        }

        let grains = GRAIN_KEYS.iter().filter(|k| quotes.contains_key(**k)).count();
        pressure += grains as f64 * Self::GRAIN_WEIGHT;

        Ok(Self::BASE + pressure)
    }
}

// ---------------------------------------------------------------------------
// News
// ---------------------------------------------------------------------------

/// Tension, conflict, antagonism, sanctions, military, war, crisis, threat
pub const NEWS_ALERT_KEYWORDS: &[&str] = &["緊張", "衝突", "對立", "制裁", "軍事", "戰爭", "危機", "威脅"];

/// Open fire, attack, invasion, war, military action, state of emergency
pub const NEWS_HIGH_ALERT_KEYWORDS: &[&str] = &["開火", "攻擊", "入侵", "戰爭", "軍事行動", "緊急狀態"];

/// The fields of an article the news scorer reads
#[derive(Debug, Clone, Deserialize)]
struct ScoredArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

/// Scores news coverage by sensitive vocabulary and volume
#[derive(Debug, Clone, Copy, Default)]
pub struct NewsScorer;

impl NewsScorer {
    pub const UNAVAILABLE: f64 = 20.0;
    pub const ERROR: f64 = 25.0;
    pub const ALERT_WEIGHT: f64 = 3.0;
    pub const HIGH_ALERT_WEIGHT: f64 = 8.0;
    pub const KEYWORD_CAP: f64 = 80.0;

    /// Bonus for the size of the article set
    pub fn volume_bonus(article_count: usize) -> f64 {
        if article_count > 10 {
            10.0
        } else if article_count > 5 {
            5.0
        } else {
            0.0
        }
    }
}

impl DomainScorer for NewsScorer {
    fn domain(&self) -> Domain {
        Domain::News
    }

    fn unavailable_score(&self) -> f64 {
        Self::UNAVAILABLE
    }

    fn error_score(&self) -> f64 {
        Self::ERROR
    }

    fn compute(&self, data: Option<&Value>) -> Result<f64, ScoreError> {
        let articles = as_sequence(Domain::News, data)?
            .iter()
            .map(ScoredArticle::deserialize)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ScoreError::Malformed {
                domain: Domain::News,
                reason: e.to_string(),
            })?;

        let mut keyword_score = 0.0;
        let mut high_alert_score = 0.0;

        for article in &articles {
            let content = format!(
                "{} {}",
                article.title.to_lowercase(),
                article.description.to_lowercase()
            );

            keyword_score += keyword_hits(&content, NEWS_ALERT_KEYWORDS) as f64 * Self::ALERT_WEIGHT;
            high_alert_score +=
                keyword_hits(&content, NEWS_HIGH_ALERT_KEYWORDS) as f64 * Self::HIGH_ALERT_WEIGHT;
        }

        let total = (keyword_score + high_alert_score).min(Self::KEYWORD_CAP);

        Ok(total + Self::volume_bonus(articles.len()))
    }
}

// ---------------------------------------------------------------------------
// Stock
// ---------------------------------------------------------------------------

/// Baseline market impact reported whenever the equity feed is up
pub const STOCK_BASELINE_IMPACT: f64 = 15.0;

/// Stock scorer that only checks feed availability.
///
/// The aggregator holds its stock scorer as a trait object so a real market
/// model can replace this one via
/// [`IndicatorCalculator::with_stock_scorer`](crate::IndicatorCalculator::with_stock_scorer).
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineStockScorer;

impl DomainScorer for BaselineStockScorer {
    fn domain(&self) -> Domain {
        Domain::Stock
    }

    fn unavailable_score(&self) -> f64 {
        0.0
    }

    fn error_score(&self) -> f64 {
        0.0
    }

    fn compute(&self, _data: Option<&Value>) -> Result<f64, ScoreError> {
        Ok(STOCK_BASELINE_IMPACT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn success(data: Value) -> TaggedResult {
        TaggedResult::success(data)
    }

    #[test]
    fn test_military_ordinary_keywords() {
        // 軍艦, 巡航, 警戒: three ordinary hits, base 15, plus freshness
        let result = success(json!(["中國軍艦在台海巡航警戒"]));
        assert_eq!(MilitaryScorer.score(&result), 25.0);
    }

    #[test]
    fn test_military_empty_list() {
        assert_eq!(MilitaryScorer.score(&success(json!([]))), 25.0);
        assert_eq!(MilitaryScorer.score(&TaggedResult::without_data("success")), 25.0);
    }

    #[test]
    fn test_military_high_threat_counts_double() {
        // 攻擊 and 挑釁: 2 high-threat keywords, each counted twice, ×10 = 40
        let result = success(json!(["共機攻擊挑釁"]));
        assert_eq!(MilitaryScorer.score(&result), 50.0);
    }

    #[test]
    fn test_military_keyword_cap() {
        let items: Vec<Value> = (0..10).map(|_| json!("入侵突破攻擊演習軍演")).collect();
        assert_eq!(MilitaryScorer.score(&success(Value::Array(items))), 80.0);
    }

    #[test]
    fn test_military_renders_records() {
        let result = success(json!([
            {"title": "軍事演習進行中", "source": "國防部"},
            {"title": "國防部例行記者會", "source": "國防部"}
        ]));
        // 演習 once
        assert_eq!(MilitaryScorer.score(&result), 15.0);
    }

    #[test]
    fn test_military_defaults() {
        assert_eq!(MilitaryScorer.score(&TaggedResult::failure()), 30.0);
        assert_eq!(MilitaryScorer.score(&TaggedResult::new("unknown", json!(["軍艦"]))), 30.0);
        assert_eq!(MilitaryScorer.score(&success(json!("軍艦"))), 35.0);
        assert_eq!(MilitaryScorer.score(&success(json!({"a": 1}))), 35.0);
    }

    #[test]
    fn test_economic_gold_and_soy() {
        let result = success(json!({"gold": true, "ZS=F": true}));
        assert_eq!(EconomicScorer.score(&result), 43.0);
    }

    #[test]
    fn test_economic_all_commodities() {
        let result = success(json!({"GC=F": 2050.0, "ZS=F": 1, "ZW=F": 2, "ZC=F": 3}));
        assert_eq!(EconomicScorer.score(&result), 20.0 + 15.0 + 24.0);
    }

    #[test]
    fn test_economic_gold_aliases_count_once() {
        let result = success(json!({"gold": 1, "GC=F": 1}));
        assert_eq!(EconomicScorer.score(&result), 35.0);
    }

    #[test]
    fn test_economic_ignores_prices() {
        let cheap = success(json!({"GC=F": {"price": 1.0}}));
        let dear = success(json!({"GC=F": {"price": 99999.0}}));
        assert_eq!(EconomicScorer.score(&cheap), EconomicScorer.score(&dear));
    }

    #[test]
    fn test_economic_defaults() {
        assert_eq!(EconomicScorer.score(&TaggedResult::failure()), 25.0);
        assert_eq!(EconomicScorer.score(&TaggedResult::without_data("success")), 20.0);
        assert_eq!(EconomicScorer.score(&success(json!(["gold"]))), 30.0);
    }

    #[test]
    fn test_news_volume_bonus_without_overlap() {
        // 緊張 and 危機 are ordinary-only: 6 per article
        let articles: Vec<Value> = (0..11)
            .map(|_| json!({"title": "中國緊張危機", "description": ""}))
            .collect();
        assert_eq!(NewsScorer.score(&success(Value::Array(articles))), 76.0);
    }

    #[test]
    fn test_news_war_scores_in_both_lists() {
        // 戰爭 is both ordinary and high-alert: 3+3+8 per article, capped at 80
        let articles: Vec<Value> = (0..11)
            .map(|_| json!({"title": "中國戰爭危機", "description": ""}))
            .collect();
        assert_eq!(NewsScorer.score(&success(Value::Array(articles))), 90.0);
    }

    #[test]
    fn test_news_single_article() {
        let result = success(json!([{"title": "台海情勢", "description": "美方宣布制裁"}]));
        assert_eq!(NewsScorer.score(&result), 3.0);
    }

    #[test]
    fn test_news_missing_fields_default_empty() {
        let articles: Vec<Value> = (0..6).map(|_| json!({"url": "#"})).collect();
        assert_eq!(NewsScorer.score(&success(Value::Array(articles))), 5.0);
    }

    #[test]
    fn test_news_defaults() {
        assert_eq!(NewsScorer.score(&TaggedResult::new("fallback", json!([]))), 20.0);
        assert_eq!(NewsScorer.score(&success(json!([{"title": null}]))), 25.0);
        assert_eq!(NewsScorer.score(&success(json!([42]))), 25.0);
    }

    #[test]
    fn test_explicit_null_payload_is_malformed() {
        let raw = json!({"status": "success", "data": null});
        let result: TaggedResult = serde_json::from_value(raw).unwrap();

        assert_eq!(MilitaryScorer.score(&result), MilitaryScorer::ERROR);
        assert_eq!(EconomicScorer.score(&result), EconomicScorer::ERROR);
        assert_eq!(NewsScorer.score(&result), NewsScorer::ERROR);
    }

    #[test]
    fn test_missing_payload_is_empty() {
        let result: TaggedResult = serde_json::from_value(json!({"status": "success"})).unwrap();

        assert_eq!(MilitaryScorer.score(&result), MilitaryScorer::EMPTY);
        assert_eq!(EconomicScorer.score(&result), EconomicScorer::BASE);
        assert_eq!(NewsScorer.score(&result), 0.0);
    }

    #[test]
    fn test_stock_baseline() {
        assert_eq!(BaselineStockScorer.score(&success(Value::Null)), 15.0);
        assert_eq!(BaselineStockScorer.score(&TaggedResult::without_data("success")), 15.0);
        assert_eq!(BaselineStockScorer.score(&TaggedResult::failure()), 0.0);
    }

    struct BrokenScorer;

    impl DomainScorer for BrokenScorer {
        fn domain(&self) -> Domain {
            Domain::Stock
        }

        fn unavailable_score(&self) -> f64 {
            1.0
        }

        fn error_score(&self) -> f64 {
            2.0
        }

        fn compute(&self, data: Option<&Value>) -> Result<f64, ScoreError> {
            Ok(data.and_then(Value::as_f64).unwrap_or(f64::NAN))
        }
    }

    #[test]
    fn test_non_finite_and_out_of_range_are_contained() {
        assert_eq!(BrokenScorer.score(&success(Value::Null)), 2.0);
        assert_eq!(BrokenScorer.score(&success(json!(250.0))), 100.0);
        assert_eq!(BrokenScorer.score(&success(json!(-3.0))), 0.0);
    }
}
