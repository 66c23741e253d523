//! Shared HTTP plumbing for the API-backed tools
//!
//! [`ApiClient`] performs a cached JSON `GET` against one service and maps
//! every failure onto [`ToolError`], so the adapters only deal with payload
//! normalization.

use super::cache::ToolCache;
use super::error::{PermanentKind, ToolError, TransientKind};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("aiops/", env!("CARGO_PKG_VERSION"));

/// Maps an HTTP error status onto a tool failure
///
/// `detail` is the most useful text the service returned, if any.
pub fn classify_status(status: u16, service: &str, detail: Option<&str>) -> ToolError {
    let detail = detail
        .map(|d| format!(": {}", d))
        .unwrap_or_default();

    match status {
        400 | 422 => ToolError::permanent(
            PermanentKind::InvalidParameters,
            format!("{} rejected the request (HTTP {}){}", service, status, detail),
        ),
        401 | 403 => ToolError::permanent(
            PermanentKind::Authentication,
            format!("{} rejected the API key (HTTP {}){}", service, status, detail),
        ),
        404 => ToolError::permanent(
            PermanentKind::NotFound,
            format!("{} found nothing for the request{}", service, detail),
        ),
        426 => ToolError::permanent(
            PermanentKind::Unsupported,
            format!(
                "{} plan does not support this request (HTTP 426){}",
                service, detail
            ),
        ),
        429 => ToolError::transient(
            TransientKind::RateLimited,
            format!("{} rate limit exceeded{}", service, detail),
        ),
        500..=599 => ToolError::transient(
            TransientKind::Unavailable,
            format!("{} is unavailable (HTTP {}){}", service, status, detail),
        ),
        _ => ToolError::permanent(
            PermanentKind::InvalidResponse,
            format!("{} returned HTTP {}{}", service, status, detail),
        ),
    }
}

fn classify_transport_error(service: &str, err: &reqwest::Error) -> ToolError {
    if err.is_timeout() {
        ToolError::timeout(format!("{} request timed out", service))
    } else if err.is_decode() {
        ToolError::invalid_response(format!("{} response could not be read: {}", service, err))
    } else {
        ToolError::transient(
            TransientKind::Network,
            format!("{} request failed: {}", service, err),
        )
    }
}

/// Pulls a human readable message out of an error body
fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub struct ApiClient {
    service: &'static str,
    base_url: String,
    http: reqwest::Client,
    cache: ToolCache,
}

impl ApiClient {
    pub fn new(service: &'static str, base_url: &str, timeout: Duration, cache: ToolCache) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(service, error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            cache,
        }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// Performs a JSON `GET`, serving fresh responses from the cache
    ///
    /// `credential` is appended to the query string but never becomes part
    /// of the cache key.
    pub async fn get_json(
        &self,
        endpoint: &str,
        query: &BTreeMap<String, String>,
        credential: Option<(&str, &str)>,
    ) -> Result<Value, ToolError> {
        if let Some(cached) = self.cache.get(endpoint, query) {
            debug!(service = self.service, endpoint, "Cache hit");
            return Ok(cached);
        }

        let value = self.get_json_uncached(endpoint, query, credential).await?;
        self.cache.insert(endpoint, query, value.clone());
        Ok(value)
    }

    /// Performs a JSON `GET` without consulting or filling the cache
    pub async fn get_json_uncached(
        &self,
        endpoint: &str,
        query: &BTreeMap<String, String>,
        credential: Option<(&str, &str)>,
    ) -> Result<Value, ToolError> {
        let url = self.url_for(endpoint);
        debug!(service = self.service, url = %url, query = ?query, "Sending request");

        let mut request = self.http.get(&url).query(query);
        if let Some((name, value)) = credential {
            request = request.query(&[(name, value)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_transport_error(self.service, &e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(self.service, &e))?;

        if !(200..300).contains(&status) {
            let detail = error_detail(&body);
            warn!(service = self.service, status, "Request failed");
            return Err(classify_status(status, self.service, detail.as_deref()));
        }

        serde_json::from_str(&body).map_err(|e| {
            ToolError::invalid_response(format!(
                "{} returned a body that is not JSON: {}",
                self.service, e
            ))
        })
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("service", &self.service)
            .field("base_url", &self.base_url)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        bad_request = { 400, false, "invalid parameters" },
        unprocessable = { 422, false, "invalid parameters" },
        unauthorized = { 401, false, "authentication" },
        forbidden = { 403, false, "authentication" },
        not_found = { 404, false, "not found" },
        upgrade_required = { 426, false, "unsupported" },
        rate_limited = { 429, true, "rate limited" },
        internal = { 500, true, "unavailable" },
        bad_gateway = { 502, true, "unavailable" },
        teapot = { 418, false, "invalid response" },
    )]
    fn test_classify_status(status: u16, transient: bool, kind: &str) {
        let err = classify_status(status, "NewsAPI", None);
        assert_eq!(err.is_transient(), transient);
        assert!(
            err.to_string().starts_with(kind),
            "{} should start with {}",
            err,
            kind
        );
    }

    #[test]
    fn test_classify_status_includes_detail() {
        let err = classify_status(401, "NewsAPI", Some("Your API key is invalid"));
        assert!(err.message().contains("Your API key is invalid"));
    }

    #[test]
    fn test_error_detail() {
        assert_eq!(
            error_detail(r#"{"cod":"404","message":"city not found"}"#).as_deref(),
            Some("city not found")
        );
        assert_eq!(error_detail("<html>oops</html>"), None);
    }

    #[test]
    fn test_url_for() {
        let client = ApiClient::new(
            "Jokes",
            "https://icanhazdadjoke.com/",
            Duration::from_secs(5),
            ToolCache::new(Duration::from_secs(1)),
        );
        assert_eq!(client.base_url(), "https://icanhazdadjoke.com");
        assert_eq!(client.url_for(""), "https://icanhazdadjoke.com/");
        assert_eq!(client.url_for("search"), "https://icanhazdadjoke.com/search");
    }

    #[tokio::test]
    async fn test_cached_response_skips_network() {
        let cache = ToolCache::new(Duration::from_secs(60));
        let mut query = BTreeMap::new();
        query.insert("q".to_string(), "Noida".to_string());
        cache.insert("weather", &query, serde_json::json!({"cached": true}));

        // Unroutable base URL: only the cache can answer
        let client = ApiClient::new(
            "OpenWeatherMap",
            "http://127.0.0.1:9",
            Duration::from_secs(1),
            cache,
        );
        let value = client.get_json("weather", &query, Some(("appid", "k"))).await.unwrap();
        assert_eq!(value["cached"], true);
    }
}
