//! Market quote adapters
//!
//! Fetches commodity and index prices from investing.com instrument pages.
//! Gold and wheat have simulated fallback prices so the economic payload is
//! never empty; the other instruments are dropped when their page cannot be
//! read.

use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strait_core::{SourceStatus, TaggedResult};
use tracing::{debug, info, warn};

use crate::SourceError;

/// Source label for live quotes
const LIVE_SOURCE: &str = "investing.com";

/// Source label for simulated quotes
const SIMULATED_SOURCE: &str = "investing.com (模擬)";

/// Price pattern on instrument pages
const PRICE_PATTERN: &str = r"[\d,]+\.?\d*";

/// Elements that carry the last price, in order of preference
const PRICE_SELECTORS: &[&str] = &[
    r#"span[data-test="instrument-price-last"]"#,
    "span.text-2xl",
    "div.text-5xl",
];

/// A quoted instrument
#[derive(Debug, Clone, Copy)]
pub struct Instrument {
    /// Ticker used as the payload key
    pub ticker: &'static str,
    /// Display name
    pub name: &'static str,
    /// Instrument page
    pub url: &'static str,
    /// Price reported when the page cannot be read
    pub simulated_price: Option<f64>,
}

/// Gold, wheat, soybean and corn futures
pub const COMMODITIES: &[Instrument] = &[
    Instrument {
        ticker: "GC=F",
        name: "黃金",
        url: "https://www.investing.com/commodities/gold",
        simulated_price: Some(2050.0),
    },
    Instrument {
        ticker: "ZW=F",
        name: "小麥",
        url: "https://www.investing.com/commodities/us-wheat",
        simulated_price: Some(650.0),
    },
    Instrument {
        ticker: "ZS=F",
        name: "黃豆",
        url: "https://www.investing.com/commodities/us-soybeans",
        simulated_price: None,
    },
    Instrument {
        ticker: "ZC=F",
        name: "玉米",
        url: "https://www.investing.com/commodities/us-corn",
        simulated_price: None,
    },
];

/// Taiwan capitalization-weighted stock index
pub const TAIEX: Instrument = Instrument {
    ticker: "^TWII",
    name: "加權指數",
    url: "https://www.investing.com/indices/taiwan-weighted",
    simulated_price: None,
};

/// A price quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub source: String,
}

impl Quote {
    fn new(instrument: &Instrument, price: f64, source: &str) -> Self {
        Self {
            name: instrument.name.to_string(),
            price,
            currency: "USD".to_string(),
            source: source.to_string(),
        }
    }
}

/// Extract the last price from an instrument page
pub fn parse_price(html: &str) -> Option<f64> {
    let document = Html::parse_document(html);
    let pattern = Regex::new(PRICE_PATTERN).ok()?;

    let text = PRICE_SELECTORS
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .next()
                .map(|el| el.text().collect::<String>())
        })?;

    let matched = pattern.find(text.trim())?;
    matched.as_str().replace(',', "").parse().ok()
}

/// Fetch a live quote
pub async fn fetch_quote(client: &Client, instrument: &Instrument) -> Result<Quote, SourceError> {
    debug!("Fetching quote for {}", instrument.ticker);

    let response = client.get(instrument.url).send().await?;

    if !response.status().is_success() {
        return Err(SourceError::Status(response.status().as_u16()));
    }

    let html = response.text().await?;
    let price = parse_price(&html)
        .ok_or_else(|| SourceError::Parse(format!("price for {}", instrument.ticker)))?;

    Ok(Quote::new(instrument, price, LIVE_SOURCE))
}

/// Fetch a live quote, substituting the simulated price if there is one
pub async fn fetch_quote_or_simulated(client: &Client, instrument: &Instrument) -> Option<Quote> {
    match fetch_quote(client, instrument).await {
        Ok(quote) => Some(quote),
        Err(e) => {
            warn!("Quote for {} unavailable: {}", instrument.ticker, e);
            instrument
                .simulated_price
                .map(|price| Quote::new(instrument, price, SIMULATED_SOURCE))
        }
    }
}

/// Key quotes by ticker and tag the mapping
fn tag_quotes(quotes: Vec<(&'static str, Quote)>) -> TaggedResult {
    if quotes.is_empty() {
        return TaggedResult::with_status(SourceStatus::Failure, Value::Object(Map::new()));
    }

    let mut map = Map::new();
    for (ticker, quote) in quotes {
        match serde_json::to_value(&quote) {
            Ok(value) => {
                map.insert(ticker.to_string(), value);
            }
            Err(e) => warn!("Could not encode quote for {}: {}", ticker, e),
        }
    }

    TaggedResult::success(Value::Object(map))
}

/// Collect commodity quotes keyed by ticker
pub async fn collect_economic(client: &Client) -> TaggedResult {
    let fetches = COMMODITIES.iter().map(|instrument| async move {
        fetch_quote_or_simulated(client, instrument)
            .await
            .map(|quote| (instrument.ticker, quote))
    });

    let quotes: Vec<_> = futures::future::join_all(fetches)
        .await
        .into_iter()
        .flatten()
        .collect();

    info!("Collected {} commodity quotes", quotes.len());
    tag_quotes(quotes)
}

/// Collect the index quote
pub async fn collect_stock(client: &Client) -> TaggedResult {
    match fetch_quote(client, &TAIEX).await {
        Ok(quote) => match serde_json::to_value(&quote) {
            Ok(data) => TaggedResult::success(data),
            Err(e) => {
                warn!("Could not encode index quote: {}", e);
                TaggedResult::failure()
            }
        },
        Err(e) => {
            warn!("Index quote unavailable: {}", e);
            TaggedResult::failure()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_data_test_span() {
        let html = r#"
            <html><body>
                <span class="text-2xl">ignored 1.0</span>
                <span data-test="instrument-price-last">2,345.60</span>
            </body></html>
        "#;
        assert_eq!(parse_price(html), Some(2345.6));
    }

    #[test]
    fn test_parse_price_fallback_selectors() {
        let html = r#"<html><body><div class="text-5xl"> 650.25 USD </div></body></html>"#;
        assert_eq!(parse_price(html), Some(650.25));
    }

    #[test]
    fn test_parse_price_missing() {
        let html = r#"<html><body><p>Access denied</p></body></html>"#;
        assert_eq!(parse_price(html), None);
    }

    #[test]
    fn test_commodity_tickers_match_scorer_keys() {
        let tickers: Vec<_> = COMMODITIES.iter().map(|c| c.ticker).collect();
        assert!(strait_core::GOLD_KEYS.iter().any(|k| tickers.contains(k)));
        for grain in strait_core::GRAIN_KEYS {
            assert!(tickers.contains(grain));
        }
    }

    #[test]
    fn test_tag_quotes() {
        let gold = Quote::new(&COMMODITIES[0], 2050.0, SIMULATED_SOURCE);
        let tagged = tag_quotes(vec![("GC=F", gold)]);

        assert!(tagged.is_success());
        assert_eq!(tagged.payload()["GC=F"]["price"], 2050.0);
        assert_eq!(tagged.payload()["GC=F"]["source"], SIMULATED_SOURCE);

        let empty = tag_quotes(Vec::new());
        assert_eq!(empty.status, "failure");
    }
}
