//! Military bulletin adapter
//!
//! Produces simulated Ministry of National Defense bulletins. There is no
//! stable public feed to scrape, so the adapter emits a fixed pair of
//! routine bulletins stamped with the collection time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strait_core::TaggedResult;
use tracing::warn;

/// Issuing ministry
pub const MND_SOURCE: &str = "國防部";

/// A defense ministry bulletin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bulletin {
    pub title: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

/// Routine bulletins stamped with `now`
pub fn simulated_bulletins(now: DateTime<Utc>) -> Vec<Bulletin> {
    ["國防部例行記者會", "軍事演習進行中"]
        .into_iter()
        .map(|title| Bulletin {
            title: title.to_string(),
            source: MND_SOURCE.to_string(),
            timestamp: now,
        })
        .collect()
}

/// Collect military bulletins and tag the result
pub fn collect_military() -> TaggedResult {
    match serde_json::to_value(simulated_bulletins(Utc::now())) {
        Ok(data) => TaggedResult::success(data),
        Err(e) => {
            warn!("Could not encode military bulletins: {}", e);
            TaggedResult::failure()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strait_core::{DomainScorer, MilitaryScorer};

    #[test]
    fn test_simulated_bulletins() {
        let bulletins = simulated_bulletins(Utc::now());
        assert_eq!(bulletins.len(), 2);
        assert!(bulletins.iter().all(|b| b.source == MND_SOURCE));
    }

    #[test]
    fn test_collected_bulletins_score() {
        let tagged = collect_military();
        assert!(tagged.is_success());
        // 演習 once, plus the freshness bonus
        assert_eq!(MilitaryScorer.score(&tagged), 15.0);
    }
}
