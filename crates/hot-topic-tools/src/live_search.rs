//! live_search tool — recent X posts via xAI Live Search.
//!
//! A single chat-completion request with `search_parameters` scoped to the X
//! source. Failures never propagate: the caller always gets renderable text,
//! prefixed with [`SEARCH_ERROR_MARKER`] when something went wrong.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use hot_topic_core::config::Config;
use hot_topic_core::types::{SearchWindow, parse_date, today};

use crate::{Tool, ToolContext, ToolOutput};

/// Prefix of every content string produced by a failed search.
pub const SEARCH_ERROR_MARKER: &str = "エラーが発生しました";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// One search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub target_date: Option<NaiveDate>,
    pub max_results: u32,
    pub min_favorites: u64,
    pub min_views: u64,
}

/// Raw model text plus the post URLs it was grounded on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSearchResult {
    pub content: String,
    #[serde(default)]
    pub citations: Vec<String>,
}

impl LiveSearchResult {
    fn failure(reason: impl std::fmt::Display) -> Self {
        Self {
            content: format!("{SEARCH_ERROR_MARKER}: {reason}"),
            citations: Vec::new(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.content.starts_with(SEARCH_ERROR_MARKER)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    choices: Vec<SearchChoice>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchChoice {
    #[serde(default)]
    message: Option<SearchMessage>,
}

#[derive(Debug, Deserialize)]
struct SearchMessage {
    #[serde(default)]
    content: Option<String>,
}

impl From<SearchResponse> for LiveSearchResult {
    fn from(resp: SearchResponse) -> Self {
        let content = resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.is_empty())
            .or(resp.content)
            .unwrap_or_default();
        Self {
            content,
            citations: resp.citations,
        }
    }
}

/// HTTP client for xAI chat completions with live search.
pub struct XaiSearchClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    defaults: SearchDefaults,
    client: reqwest::Client,
}

#[derive(Debug, Clone, Copy)]
struct SearchDefaults {
    max_results: u32,
    min_favorites: u64,
    min_views: u64,
}

impl XaiSearchClient {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            defaults: SearchDefaults {
                max_results: 10,
                min_favorites: 100,
                min_views: 1000,
            },
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut client = Self::new(
            &config.search_base_url(),
            &config.search_model(),
            config.search_api_key(),
        );
        client.defaults = SearchDefaults {
            max_results: config.search_max_results(),
            min_favorites: config.search_min_favorites(),
            min_views: config.search_min_views(),
        };
        client
    }

    /// A request for `query` filled with this client's configured thresholds.
    pub fn request(&self, query: impl Into<String>, target_date: Option<NaiveDate>) -> SearchRequest {
        SearchRequest {
            query: query.into(),
            target_date,
            max_results: self.defaults.max_results,
            min_favorites: self.defaults.min_favorites,
            min_views: self.defaults.min_views,
        }
    }

    /// Run the search. Never fails; see [`LiveSearchResult::is_failure`].
    pub async fn search(&self, request: &SearchRequest) -> LiveSearchResult {
        self.search_with_today(request, today()).await
    }

    async fn search_with_today(&self, request: &SearchRequest, today: NaiveDate) -> LiveSearchResult {
        match self.try_search(request, today).await {
            Ok(result) => result,
            Err(e) => {
                warn!(query = %request.query, error = %e, "Live search failed");
                LiveSearchResult::failure(e)
            }
        }
    }

    async fn try_search(
        &self,
        request: &SearchRequest,
        today: NaiveDate,
    ) -> anyhow::Result<LiveSearchResult> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("XAI_API_KEY is not configured"))?;

        let window = SearchWindow::for_target(request.target_date, today);
        debug!(
            query = %request.query,
            from = %window.start_str(),
            to = %window.end_str(),
            max_results = request.max_results,
            "Live search"
        );

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&self.build_body(request, &window))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("xAI search request failed: {status} - {body}");
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.into())
    }

    fn build_body(&self, request: &SearchRequest, window: &SearchWindow) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": search_instructions(&request.query, window) }
            ],
            "search_parameters": {
                "mode": "on",
                "return_citations": true,
                "sources": [
                    {
                        "type": "x",
                        "post_favorite_count": request.min_favorites,
                        "post_view_count": request.min_views,
                    }
                ],
                "max_search_results": request.max_results,
            }
        })
    }
}

fn search_instructions(query: &str, window: &SearchWindow) -> String {
    format!(
        "次の条件でXの投稿を検索してください。\n\
         - 期間: {from} から {to} まで\n\
         - テーマ: 「{query}」\n\n\
         該当する投稿がなければ、見つからなかったと正直にテキストで答えてください。\n\
         見つかった場合は投稿ごとに、本文、投稿日時、主な返信や引用をマークダウンでまとめてください。\n\
         外国語の投稿には日本語訳を添え、反応の多い投稿を優先してください。",
        from = window.start_str(),
        to = window.end_str(),
    )
}

/// Agent-facing wrapper around [`XaiSearchClient`].
pub struct LiveSearchTool {
    client: Arc<XaiSearchClient>,
}

impl LiveSearchTool {
    pub fn new(client: Arc<XaiSearchClient>) -> Self {
        Self { client }
    }
}

#[derive(Deserialize)]
struct Params {
    query: String,
    #[serde(default)]
    target_date: Option<String>,
    #[serde(default)]
    max_results: Option<u32>,
    #[serde(default)]
    min_favorites: Option<u64>,
    #[serde(default)]
    min_views: Option<u64>,
}

fn render(result: &LiveSearchResult) -> String {
    if result.citations.is_empty() {
        return result.content.clone();
    }
    let mut out = result.content.clone();
    out.push_str("\n\n出典:\n");
    for url in &result.citations {
        out.push_str("- ");
        out.push_str(url);
        out.push('\n');
    }
    out
}

#[async_trait]
impl Tool for LiveSearchTool {
    fn name(&self) -> &str {
        "live_search"
    }

    fn description(&self) -> &str {
        "Search recent posts on X with xAI Live Search and return development-related topics. Filters by a date window and by minimum favorites and views."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "One concrete keyword or phrase (e.g. \"TypeScript\", \"Rust 2024 edition\")"
                },
                "target_date": {
                    "type": "string",
                    "description": "Target day in YYYY-MM-DD; omit for the latest week"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of posts to consider (default: 10)"
                },
                "min_favorites": {
                    "type": "integer",
                    "description": "Minimum favorite count (default: 100)"
                },
                "min_views": {
                    "type": "integer",
                    "description": "Minimum view count (default: 1000)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        context: &ToolContext,
    ) -> anyhow::Result<ToolOutput> {
        let p: Params = serde_json::from_value(params)?;
        debug!(run_id = %context.run_id, query = %p.query, "live_search");

        let target_date = match p.target_date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => match parse_date(s) {
                Ok(date) => Some(date),
                Err(e) => {
                    return Ok(ToolOutput {
                        content: LiveSearchResult::failure(e).content,
                        is_error: true,
                    });
                }
            },
            None => None,
        };

        let mut request = self.client.request(p.query, target_date);
        if let Some(max) = p.max_results {
            request.max_results = max;
        }
        if let Some(fav) = p.min_favorites {
            request.min_favorites = fav;
        }
        if let Some(views) = p.min_views {
            request.min_views = views;
        }

        let result = self.client.search(&request).await;
        Ok(ToolOutput {
            content: render(&result),
            is_error: result.is_failure(),
        })
    }
}
