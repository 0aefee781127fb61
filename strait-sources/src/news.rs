//! General news adapter
//!
//! Searches Google News (zh-TW) for cross-strait coverage in three
//! categories and extracts article cards from the result page.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strait_core::{SourceStatus, TaggedResult};
use tracing::{debug, info, warn};

use crate::{SourceConfig, SourceError};

/// Google News base URL
pub const GOOGLE_NEWS_URL: &str = "https://news.google.com";

/// Label used when a card carries no source
const UNKNOWN_SOURCE: &str = "未知來源";

/// News search categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsCategory {
    Economic,
    Diplomatic,
    PublicOpinion,
}

impl NewsCategory {
    pub const ALL: [NewsCategory; 3] = [
        NewsCategory::Economic,
        NewsCategory::Diplomatic,
        NewsCategory::PublicOpinion,
    ];

    /// Search queries for this category, most important first
    pub fn queries(&self) -> &'static [&'static str] {
        match self {
            NewsCategory::Economic => &["中國經濟", "中美貿易", "台海經濟", "兩岸貿易"],
            NewsCategory::Diplomatic => &["中國外交", "兩岸關係", "台海情勢", "中美關係"],
            NewsCategory::PublicOpinion => &["中國輿情", "兩岸民意", "台海局勢", "中國社會"],
        }
    }
}

/// A news article as handed to the news scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    /// Result cards carry no summary, so this is usually empty
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub published_date: String,
    pub source: String,
    pub category: NewsCategory,
}

/// Build the search URL for a query
pub fn build_search_url(query: &str) -> String {
    format!(
        "{}/search?q={}&hl=zh-TW&gl=TW&ceid=TW:zh-Hant",
        GOOGLE_NEWS_URL,
        urlencoding::encode(query)
    )
}

/// Resolve a result link against the news site
fn resolve_link(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    let path = href.trim_start_matches("./").trim_start_matches('/');
    format!("{}/{}", GOOGLE_NEWS_URL, path)
}

/// Run one search query
pub async fn search_news(
    client: &Client,
    query: &str,
    category: NewsCategory,
    limit: usize,
) -> Result<Vec<NewsArticle>, SourceError> {
    let url = build_search_url(query);

    debug!("Searching news for: {}", query);

    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        return Err(SourceError::Status(response.status().as_u16()));
    }

    let html = response.text().await?;
    let articles = parse_news_results(&html, category, limit);

    debug!("Query '{}' returned {} articles", query, articles.len());
    Ok(articles)
}

/// Parse article cards from a result page
fn parse_news_results(html: &str, category: NewsCategory, limit: usize) -> Vec<NewsArticle> {
    let selectors = (
        Selector::parse("div.SoaBEf"),
        Selector::parse("a[href]"),
        Selector::parse("div[role=\"heading\"]"),
        Selector::parse("time"),
        Selector::parse("div[data-n-tid*=\"source\"]"),
    );
    let (Ok(card_sel), Ok(link_sel), Ok(heading_sel), Ok(time_sel), Ok(source_sel)) = selectors
    else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut articles = Vec::new();

    for card in document.select(&card_sel).take(limit) {
        let link = card.select(&link_sel).next();
        let heading = card.select(&heading_sel).next();

        let (Some(link), Some(heading)) = (link, heading) else {
            continue;
        };

        let href = link.value().attr("href").unwrap_or_default();
        let title = heading.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            continue;
        }

        let published_date = card
            .select(&time_sel)
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .unwrap_or_default()
            .to_string();

        let source = card
            .select(&source_sel)
            .next()
            .map(|s| s.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string());

        articles.push(NewsArticle {
            title,
            description: String::new(),
            url: resolve_link(href),
            published_date,
            source,
            category,
        });
    }

    articles
}

/// Substitute articles returned when nothing could be scraped
pub fn fallback_articles() -> Vec<NewsArticle> {
    let now = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let article = |title: &str, source: &str, category| NewsArticle {
        title: title.to_string(),
        description: String::new(),
        url: "#".to_string(),
        published_date: now.clone(),
        source: source.to_string(),
        category,
    };

    vec![
        article("中美貿易關係持續關注中", "財經新聞", NewsCategory::Economic),
        article("兩岸關係發展備受矚目", "政治新聞", NewsCategory::Diplomatic),
        article("台海局勢持續穩定發展", "國際新聞", NewsCategory::PublicOpinion),
    ]
}

/// Keep at most `per_category` articles per category, dropping duplicate URLs
fn select_articles(
    batches: Vec<(NewsCategory, Vec<NewsArticle>)>,
    per_category: usize,
) -> Vec<NewsArticle> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut selected = Vec::new();

    for category in NewsCategory::ALL {
        let mut kept = 0;
        for article in batches
            .iter()
            .filter(|(c, _)| *c == category)
            .flat_map(|(_, articles)| articles.iter())
        {
            if kept >= per_category {
                break;
            }
            let normalized = article.url.trim_end_matches('/').to_lowercase();
            if seen.insert(normalized) {
                selected.push(article.clone());
                kept += 1;
            }
        }
    }

    selected
}

/// Collect news for every category and tag the result
pub async fn collect_news(client: &Client, config: &SourceConfig) -> TaggedResult {
    let jobs: Vec<(NewsCategory, &'static str)> = NewsCategory::ALL
        .iter()
        .flat_map(|category| {
            category
                .queries()
                .iter()
                .take(config.queries_per_category)
                .map(move |query| (*category, *query))
        })
        .collect();

    let limit = config.max_articles_per_query;
    let batches: Vec<(NewsCategory, Vec<NewsArticle>)> = stream::iter(jobs)
        .map(|(category, query)| async move {
            match search_news(client, query, category, limit).await {
                Ok(articles) => (category, articles),
                Err(e) => {
                    warn!("News search '{}' failed: {}", query, e);
                    (category, Vec::new())
                }
            }
        })
        .boxed()
        .buffered(config.max_concurrent.max(1))
        .collect()
        .await;

    let articles = select_articles(batches, config.max_articles_per_category);

    if articles.is_empty() {
        warn!("No news articles scraped, using fallback articles");
        return tag_articles(SourceStatus::Fallback, &fallback_articles());
    }

    info!("Collected {} news articles", articles.len());
    tag_articles(SourceStatus::Success, &articles)
}

fn tag_articles(status: SourceStatus, articles: &[NewsArticle]) -> TaggedResult {
    match serde_json::to_value(articles) {
        Ok(data) => TaggedResult::with_status(status, data),
        Err(e) => {
            warn!("Could not encode news articles: {}", e);
            TaggedResult::failure()
        }
    }
}
