//! Data collectors
//!
//! A collector produces one [`DataBundle`] per analysis request. The live
//! collector queries every source adapter concurrently; the fixture
//! collector replays a bundle saved as JSON.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use strait_core::DataBundle;
use tracing::info;

use crate::{
    collect_economic, collect_military, collect_news, collect_stock, create_client, SourceConfig,
    SourceError,
};

/// Common interface for bundle producers
#[async_trait]
pub trait SourceCollector: Send + Sync {
    /// Collector name for logs
    fn name(&self) -> &str;

    /// Produce a fresh bundle
    async fn collect(&self) -> Result<DataBundle, SourceError>;
}

/// Collects from the live source adapters
#[derive(Debug, Clone, Default)]
pub struct LiveCollector {
    config: SourceConfig,
}

impl LiveCollector {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }
}

#[async_trait]
impl SourceCollector for LiveCollector {
    fn name(&self) -> &str {
        "live"
    }

    async fn collect(&self) -> Result<DataBundle, SourceError> {
        let client = create_client(&self.config)?;

        info!("Collecting from all sources");

        let military = collect_military();
        let (news, economic, stock) = tokio::join!(
            collect_news(&client, &self.config),
            collect_economic(&client),
            collect_stock(&client),
        );

        info!(
            "Collection finished: military={} economic={} news={} stock={}",
            military.status, economic.status, news.status, stock.status
        );

        Ok(DataBundle {
            military,
            economic,
            news,
            stock,
        })
    }
}

/// Replays a bundle stored as JSON
#[derive(Debug, Clone)]
pub struct FixtureCollector {
    path: PathBuf,
}

impl FixtureCollector {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Parse a bundle from JSON text
    pub fn parse(json: &str) -> Result<DataBundle, SourceError> {
        let raw: serde_json::Value =
            serde_json::from_str(json).map_err(|e| SourceError::Fixture(e.to_string()))?;
        DataBundle::from_value(&raw).map_err(|e| SourceError::Fixture(e.to_string()))
    }
}

#[async_trait]
impl SourceCollector for FixtureCollector {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn collect(&self) -> Result<DataBundle, SourceError> {
        let json = tokio::fs::read_to_string(&self.path).await?;
        info!("Loaded fixture bundle from {}", self.path.display());
        Self::parse(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "military": {"status": "success", "data": ["中國軍艦在台海巡航警戒"]},
        "economic": {"status": "success", "data": {"gold": true, "ZS=F": true}},
        "news": {"status": "failure", "data": []},
        "stock": {"status": "unknown"}
    }"#;

    #[test]
    fn test_parse_fixture() {
        let bundle = FixtureCollector::parse(FIXTURE).unwrap();
        assert!(bundle.military.is_success());
        assert_eq!(bundle.news.status, "failure");
    }

    #[test]
    fn test_parse_fixture_missing_domain() {
        let err = FixtureCollector::parse(r#"{"military": {}}"#).unwrap_err();
        assert!(matches!(err, SourceError::Fixture(_)));
    }

    #[tokio::test]
    async fn test_fixture_collector_reads_file() {
        let path = std::env::temp_dir().join(format!("strait-fixture-{}.json", std::process::id()));
        tokio::fs::write(&path, FIXTURE).await.unwrap();

        let collector = FixtureCollector::new(&path);
        let bundle = collector.collect().await.unwrap();
        assert_eq!(bundle.economic.payload()["gold"], true);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_fixture_collector_missing_file() {
        let collector = FixtureCollector::new("/nonexistent/strait-bundle.json");
        assert!(matches!(collector.collect().await, Err(SourceError::Io(_))));
    }
}
