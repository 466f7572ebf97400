use crate::credentials::Credentials;
use crate::error_utils::{create_http_client_with_context, parse_http_response_json};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Twitter API specific errors with structured information
#[derive(Debug, Error)]
pub enum TwitterError {
    #[error("Rate limit exceeded (reset at {reset_time:?}, remaining: {remaining:?})")]
    RateLimit {
        reset_time: Option<u64>,
        remaining: Option<u64>,
    },

    #[error("User '{username}' not found")]
    UserNotFound { username: String },

    #[error("Authentication rejected (status {status}); auth_token and ct0 may have expired")]
    Unauthorized { status: u16 },

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },
}

pub const TWITTER_API_BASE: &str = "https://x.com/i/api";

/// Bearer token of the public web client, shared by every logged-in browser session
const WEB_BEARER_TOKEN: &str = "AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA";

const USER_BY_SCREEN_NAME: GraphqlOperation = GraphqlOperation {
    query_id: "sLVLhk0bGj3MVFEKTdax1w",
    name: "UserByScreenName",
};

const FOLLOWERS: GraphqlOperation = GraphqlOperation {
    query_id: "pd8Tt1qUz1YWrICegqZ8cw",
    name: "Followers",
};

pub const DEFAULT_PAGE_SIZE: u32 = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
struct GraphqlOperation {
    query_id: &'static str,
    name: &'static str,
}

/// Twitter API rate limit information extracted from response headers
#[derive(Debug, Clone, Default)]
struct RateLimits {
    /// Maximum number of requests allowed in the current time window
    limit: Option<u64>,
    /// Number of requests remaining in the current time window
    remaining: Option<u64>,
    /// Unix timestamp when the rate limit resets
    reset: Option<u64>,
}

/// The account whose followers are exported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    /// Numeric account id, kept as a string
    pub id: String,
    pub screen_name: String,
    /// Follower count advertised by the profile
    pub followers_count: u64,
}

/// One page of the followers timeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FollowerPage {
    /// Raw user objects, in the order the API returned them
    pub users: Vec<Value>,
    /// Cursor naming the following page, if the API offered one
    pub next_cursor: Option<String>,
}

/// Upstream capability used by the export: user lookup and follower pages.
#[async_trait]
pub trait FollowerSource: Send + Sync {
    /// Resolves a username to its account. Unknown users yield
    /// [`TwitterError::UserNotFound`].
    async fn lookup_user(&self, username: &str) -> Result<AccountSummary>;

    /// Fetches the page of followers named by `cursor`, or the first page when `None`
    async fn fetch_followers_page(
        &self,
        account_id: &str,
        cursor: Option<&str>,
    ) -> Result<FollowerPage>;
}

/// Client for the GraphQL endpoints behind the Twitter web app, authenticated
/// with a browser session's cookies.
pub struct TwitterClient {
    client: Client,
    base_url: String,
    page_size: u32,
}

impl TwitterClient {
    /// Creates a client for the production API
    pub fn new(credentials: &Credentials) -> Result<Self> {
        Self::with_base_url(credentials, TWITTER_API_BASE)
    }

    /// Creates a client talking to `base_url` instead of the production API
    pub fn with_base_url(credentials: &Credentials, base_url: &str) -> Result<Self> {
        Url::parse(base_url).with_context(|| format!("Invalid API base URL: {base_url}"))?;

        let headers = session_headers(credentials)?;
        let client = create_http_client_with_context(headers, REQUEST_TIMEOUT)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Number of followers requested per page
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn build_graphql_url(&self, operation: GraphqlOperation) -> String {
        format!(
            "{base}/graphql/{query_id}/{name}",
            base = self.base_url,
            query_id = operation.query_id,
            name = operation.name
        )
    }

    /// Issues a GraphQL GET request and returns the decoded body
    async fn graphql_get(
        &self,
        operation: GraphqlOperation,
        resource_id: &str,
        variables: Value,
    ) -> Result<Value> {
        let url = self.build_graphql_url(operation);
        debug!(%resource_id, %url, "Making request to Twitter API");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("variables", variables.to_string()),
                ("features", graphql_features().to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to send {name} request", name = operation.name))?;

        let rate_limits = parse_rate_limit_headers(&response);
        let status = response.status();

        if !status.is_success() {
            debug!(
                "{name} request for {resource_id} failed with {status}. Limit: {limit:?}, Remaining: {remaining:?}, Reset: {reset:?}",
                name = operation.name,
                limit = rate_limits.limit,
                remaining = rate_limits.remaining,
                reset = rate_limits.reset
            );

            let error = match status {
                StatusCode::TOO_MANY_REQUESTS => TwitterError::RateLimit {
                    reset_time: rate_limits.reset,
                    remaining: rate_limits.remaining,
                },
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TwitterError::Unauthorized {
                    status: status.as_u16(),
                },
                _ => TwitterError::ApiError {
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                },
            };
            return Err(error.into());
        }

        debug!(
            "Received {name} response for {resource_id} with limits: {limit:?}/{remaining:?} until {reset:?}",
            name = operation.name,
            limit = rate_limits.limit,
            remaining = rate_limits.remaining,
            reset = rate_limits.reset
        );

        let data: Value = parse_http_response_json(response, operation.name).await?;

        // GraphQL reports failures with a 200 and an `errors` array
        if data.get("errors").is_some() && data.get("data").map_or(true, Value::is_null) {
            let message = data["errors"][0]["message"]
                .as_str()
                .unwrap_or("Unknown error")
                .to_string();
            return Err(TwitterError::ApiError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        Ok(data)
    }
}

#[async_trait]
impl FollowerSource for TwitterClient {
    async fn lookup_user(&self, username: &str) -> Result<AccountSummary> {
        let variables = json!({
            "screen_name": username,
            "withSafetyModeUserFields": true,
        });

        let data = self
            .graphql_get(USER_BY_SCREEN_NAME, username, variables)
            .await?;

        parse_account_summary(&data, username)
    }

    async fn fetch_followers_page(
        &self,
        account_id: &str,
        cursor: Option<&str>,
    ) -> Result<FollowerPage> {
        let mut variables = json!({
            "userId": account_id,
            "count": self.page_size,
            "includePromotedContent": false,
        });
        if let Some(cursor) = cursor {
            variables["cursor"] = Value::String(cursor.to_string());
        }

        let data = self.graphql_get(FOLLOWERS, account_id, variables).await?;
        let page = parse_followers_page(&data);

        debug!(
            "Followers page for {account_id}: {count} users, next cursor: {next_cursor:?}",
            count = page.users.len(),
            next_cursor = page.next_cursor
        );

        Ok(page)
    }
}

/// Extracts the account from a `UserByScreenName` response
pub fn parse_account_summary(data: &Value, username: &str) -> Result<AccountSummary> {
    let not_found = || TwitterError::UserNotFound {
        username: username.to_string(),
    };

    let result = data
        .pointer("/data/user/result")
        .filter(|r| r.get("__typename").and_then(Value::as_str) != Some("UserUnavailable"))
        .ok_or_else(not_found)?;

    let id = result
        .get("rest_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(not_found)?
        .to_string();

    let legacy = result.get("legacy");
    let screen_name = legacy
        .and_then(|l| l.get("screen_name"))
        .and_then(Value::as_str)
        .unwrap_or(username)
        .to_string();
    let followers_count = legacy
        .and_then(|l| l.get("followers_count"))
        .and_then(Value::as_u64)
        .unwrap_or_default();

    Ok(AccountSummary {
        id,
        screen_name,
        followers_count,
    })
}

/// Extracts users and the bottom cursor from a `Followers` response
pub fn parse_followers_page(data: &Value) -> FollowerPage {
    let instructions = data
        .pointer("/data/user/result/timeline/timeline/instructions")
        .or_else(|| data.pointer("/data/user/result/timeline_v2/timeline/instructions"))
        .and_then(Value::as_array);

    let mut page = FollowerPage::default();

    let Some(instructions) = instructions else {
        return page;
    };

    let entries = instructions
        .iter()
        .filter(|i| i.get("type").and_then(Value::as_str) == Some("TimelineAddEntries"))
        .filter_map(|i| i.get("entries").and_then(Value::as_array))
        .flatten();

    for entry in entries {
        let entry_id = entry
            .get("entryId")
            .and_then(Value::as_str)
            .unwrap_or_default();

        if entry_id.starts_with("user-") {
            if let Some(user) = entry
                .pointer("/content/itemContent/user_results/result")
                .filter(|u| u.is_object())
            {
                page.users.push(user.clone());
            }
        } else if entry_id.starts_with("cursor-bottom-") {
            page.next_cursor = entry
                .pointer("/content/value")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
    }

    page
}

/// Default headers carrying the session cookies and CSRF token
fn session_headers(credentials: &Credentials) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    let mut insert = |name: &'static str, value: String| -> Result<()> {
        let mut value = HeaderValue::from_str(&value)
            .with_context(|| format!("Invalid characters in {name} header value"))?;
        value.set_sensitive(matches!(name, "authorization" | "cookie" | "x-csrf-token"));
        headers.insert(HeaderName::from_static(name), value);
        Ok(())
    };

    insert("authorization", format!("Bearer {WEB_BEARER_TOKEN}"))?;
    insert(
        "cookie",
        format!(
            "auth_token={auth_token}; ct0={ct0}",
            auth_token = credentials.auth_token,
            ct0 = credentials.ct0
        ),
    )?;
    insert("x-csrf-token", credentials.ct0.clone())?;
    insert("x-twitter-auth-type", "OAuth2Session".to_string())?;
    insert("x-twitter-active-user", "yes".to_string())?;
    insert("x-twitter-client-language", "en".to_string())?;
    insert(
        "user-agent",
        concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
    )?;

    Ok(headers)
}

/// Parses rate limit headers from a response
fn parse_rate_limit_headers(response: &reqwest::Response) -> RateLimits {
    let header_u64 = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
    };

    RateLimits {
        limit: header_u64("x-rate-limit-limit"),
        remaining: header_u64("x-rate-limit-remaining"),
        reset: header_u64("x-rate-limit-reset"),
    }
}

fn graphql_features() -> Value {
    json!({
        "hidden_profile_likes_enabled": true,
        "hidden_profile_subscriptions_enabled": true,
        "highlights_tweets_tab_ui_enabled": true,
        "creator_subscriptions_tweet_preview_api_enabled": true,
        "responsive_web_graphql_exclude_directive_enabled": true,
        "responsive_web_graphql_skip_user_profile_image_extensions_enabled": false,
        "responsive_web_graphql_timeline_navigation_enabled": true,
        "responsive_web_twitter_article_notes_tab_enabled": true,
        "subscriptions_verification_info_is_identity_verified_enabled": true,
        "subscriptions_verification_info_verified_since_enabled": true,
        "verified_phone_label_enabled": false,
        "rweb_lists_timeline_redesign_enabled": true,
        "view_counts_everywhere_api_enabled": true,
        "longform_notetweets_consumption_enabled": true,
        "longform_notetweets_rich_text_read_enabled": true,
        "responsive_web_edit_tweet_api_enabled": true,
        "tweetypie_unmention_optimization_enabled": true,
        "freedom_of_speech_not_reach_fetch_enabled": true,
        "standardized_nudges_misinfo": true,
        "responsive_web_enhance_cards_enabled": false,
    })
}
