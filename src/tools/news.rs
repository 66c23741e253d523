//! NewsAPI tools: keyword search (`news_search`) and top headlines
//! (`news_headlines`)

use super::error::{PermanentKind, ToolError};
use super::http::ApiClient;
use super::spec::{ParamSpec, ParamType, ToolSpec};
use super::trait_def::Tool;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

const DEFAULT_LIMIT: i64 = 5;
const MAX_LIMIT: i64 = 100;
const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_COUNTRY: &str = "us";

pub const CATEGORIES: &[&str] = &[
    "business",
    "entertainment",
    "general",
    "health",
    "science",
    "sports",
    "technology",
];

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

fn normalize_article(article: &Value) -> Value {
    json!({
        "title": article["title"],
        "description": article["description"],
        "source": article["source"]["name"],
        "author": article["author"],
        "url": article["url"],
        "image_url": article["urlToImage"],
        "published_at": article["publishedAt"],
        "content_preview": article["content"],
    })
}

/// Extracts articles from a NewsAPI response, keeping at most `limit`
///
/// NewsAPI sometimes reports errors with HTTP 200 and `"status": "error"`.
pub fn normalize_articles(raw: &Value, limit: usize) -> Result<(u64, Vec<Value>), ToolError> {
    if raw["status"] == "error" {
        let message = raw["message"]
            .as_str()
            .unwrap_or("Unknown error from NewsAPI")
            .to_string();
        let kind = match raw["code"].as_str() {
            Some("apiKeyInvalid") | Some("apiKeyMissing") | Some("apiKeyDisabled") => {
                PermanentKind::Authentication
            }
            _ => PermanentKind::InvalidResponse,
        };
        return Err(ToolError::permanent(kind, message));
    }

    let articles = raw["articles"]
        .as_array()
        .ok_or_else(|| ToolError::invalid_response("NewsAPI response has no articles list"))?;

    let total = raw["totalResults"].as_u64().unwrap_or(articles.len() as u64);
    let articles = articles.iter().take(limit).map(normalize_article).collect();
    Ok((total, articles))
}

#[derive(Debug)]
pub struct NewsService {
    api: ApiClient,
    api_key: Option<String>,
}

impl NewsService {
    pub fn new(api: ApiClient, api_key: Option<String>) -> Self {
        Self { api, api_key }
    }

    async fn fetch(
        &self,
        endpoint: &str,
        query: BTreeMap<String, String>,
        limit: usize,
    ) -> Result<(u64, Vec<Value>), ToolError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ToolError::authentication("NewsAPI key not configured. Set NEWS_API_KEY.")
        })?;

        let raw = self
            .api
            .get_json(endpoint, &query, Some(("apiKey", api_key)))
            .await?;
        normalize_articles(&raw, limit)
    }
}

pub struct NewsSearchTool {
    service: Arc<NewsService>,
    spec: ToolSpec,
}

impl NewsSearchTool {
    pub fn new(service: Arc<NewsService>) -> Self {
        let spec = ToolSpec::new(
            "news_search",
            "Search recent news articles by keyword or topic",
        )
        .with_param(ParamSpec::required(
            "query",
            ParamType::String,
            "Search keywords",
        ))
        .with_param(ParamSpec::optional(
            "limit",
            ParamType::Integer,
            "Maximum number of articles (1-100, default 5)",
        ))
        .with_param(ParamSpec::optional(
            "language",
            ParamType::String,
            "Two-letter language code (default \"en\")",
        ));
        Self { service, spec }
    }
}

#[async_trait]
impl Tool for NewsSearchTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn invoke(&self, params: &Map<String, Value>) -> Result<Value, ToolError> {
        let checked = self.spec.check(params)?;
        let query = checked.str("query").unwrap_or_default().trim().to_string();
        let limit = clamp_limit(checked.i64("limit"));
        let language = checked
            .str("language")
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_lowercase();
        info!(query = %query, limit, "Searching news");

        let mut request = BTreeMap::new();
        request.insert("q".to_string(), query.clone());
        request.insert("language".to_string(), language);
        request.insert("sortBy".to_string(), "publishedAt".to_string());
        request.insert("pageSize".to_string(), limit.to_string());

        let (total, articles) = self
            .service
            .fetch("everything", request, limit as usize)
            .await?;

        Ok(json!({
            "query": query,
            "total_results": total,
            "returned_count": articles.len(),
            "articles": articles,
        }))
    }
}

pub struct NewsHeadlinesTool {
    service: Arc<NewsService>,
    spec: ToolSpec,
}

impl NewsHeadlinesTool {
    pub fn new(service: Arc<NewsService>) -> Self {
        let spec = ToolSpec::new(
            "news_headlines",
            "Get top news headlines for a country and/or category",
        )
        .with_param(ParamSpec::optional(
            "country",
            ParamType::String,
            "Two-letter country code (default \"us\")",
        ))
        .with_param(ParamSpec::optional(
            "category",
            ParamType::String,
            "One of business, entertainment, general, health, science, sports, technology",
        ))
        .with_param(ParamSpec::optional(
            "limit",
            ParamType::Integer,
            "Maximum number of headlines (1-100, default 5)",
        ));
        Self { service, spec }
    }
}

#[async_trait]
impl Tool for NewsHeadlinesTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn invoke(&self, params: &Map<String, Value>) -> Result<Value, ToolError> {
        let checked = self.spec.check(params)?;
        let country = checked
            .str("country")
            .unwrap_or(DEFAULT_COUNTRY)
            .to_lowercase();
        let category = checked.str("category").map(|c| c.trim().to_lowercase());
        let limit = clamp_limit(checked.i64("limit"));

        if let Some(ref category) = category {
            if !CATEGORIES.contains(&category.as_str()) {
                return Err(ToolError::invalid_parameters(format!(
                    "Invalid category '{}'. Must be one of: {}",
                    category,
                    CATEGORIES.join(", ")
                )));
            }
        }
        info!(country = %country, category = ?category, "Getting top headlines");

        let mut request = BTreeMap::new();
        request.insert("country".to_string(), country.clone());
        request.insert("pageSize".to_string(), limit.to_string());
        if let Some(ref category) = category {
            request.insert("category".to_string(), category.clone());
        }

        let (total, articles) = self
            .service
            .fetch("top-headlines", request, limit as usize)
            .await?;

        Ok(json!({
            "country": country,
            "category": category,
            "total_results": total,
            "returned_count": articles.len(),
            "articles": articles,
        }))
    }
}
