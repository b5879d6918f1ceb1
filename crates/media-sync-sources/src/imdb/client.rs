use async_trait::async_trait;
use media_sync_config::ImdbConfig;
use media_sync_models::SourceItem;
use reqwest::header::{CONTENT_DISPOSITION, COOKIE};
use reqwest::{Client, Response};
use tracing::{debug, info};

use crate::error::SourceError;
use crate::imdb::{parser, scrape};
use crate::retry::{send_with_retry, RetryPolicy};
use crate::traits::SourceProvider;

const BASE_URL: &str = "https://www.imdb.com";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Read-only access to an IMDb account through its session cookies.
///
/// The user id and watchlist id are resolved once in [`ImdbClient::connect`]
/// and never change afterwards.
pub struct ImdbClient {
    client: Client,
    base_url: String,
    cookie: String,
    user_id: String,
    watchlist_id: String,
    retry: RetryPolicy,
}

impl ImdbClient {
    pub async fn connect(config: &ImdbConfig) -> Result<Self, SourceError> {
        Self::connect_to(config, BASE_URL).await
    }

    /// Like [`ImdbClient::connect`], against another host.
    pub async fn connect_to(config: &ImdbConfig, base_url: &str) -> Result<Self, SourceError> {
        if config.cookie_at_main.trim().is_empty() || config.cookie_ubid_main.trim().is_empty() {
            return Err(SourceError::Config("IMDb session cookies are not configured".to_string()));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceError::Config(format!("failed to build HTTP client: {}", e)))?;

        let mut imdb = Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie: format!(
                "at-main={}; ubid-main={}",
                config.cookie_at_main.trim(),
                config.cookie_ubid_main.trim()
            ),
            user_id: String::new(),
            watchlist_id: String::new(),
            retry: RetryPolicy::default(),
        };

        imdb.user_id = if config.resolves_user_id() {
            let html = imdb.fetch_text("/profile", "IMDb profile page").await?;
            scrape::find_user_id(&html).ok_or_else(|| {
                SourceError::MalformedResponse("user id not found on the IMDb profile page".to_string())
            })?
        } else {
            config.user_id.trim().to_string()
        };

        let html = imdb.fetch_text("/watchlist", "IMDb watchlist page").await?;
        imdb.watchlist_id = scrape::find_watchlist_id(&html).ok_or_else(|| {
            SourceError::MalformedResponse("watchlist id not found on the IMDb watchlist page".to_string())
        })?;

        info!(
            operation = "imdb_connect",
            user_id = %imdb.user_id,
            watchlist_id = %imdb.watchlist_id,
            "Connected to IMDb"
        );
        Ok(imdb)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn watchlist_id(&self) -> &str {
        &self.watchlist_id
    }

    async fn fetch(&self, path: &str, context: &str) -> Result<Response, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Fetching");
        send_with_retry(&self.retry, context, || {
            self.client.get(&url).header(COOKIE, &self.cookie)
        })
        .await
    }

    async fn fetch_text(&self, path: &str, context: &str) -> Result<String, SourceError> {
        self.fetch(path, context)
            .await?
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("{}: {}", context, e)))
    }

    /// Download a list export, returning the attachment's list name (if any) and its items.
    async fn export_list(&self, list_id: &str) -> Result<(Option<String>, Vec<SourceItem>), SourceError> {
        let context = format!("IMDb list {}", list_id);
        let response = self.fetch(&format!("/list/{}/export", list_id), &context).await?;

        let name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(parser::list_name_from_content_disposition);
        let body = response
            .bytes()
            .await
            .map_err(|e| SourceError::Network(format!("{}: {}", context, e)))?;
        let items = parser::parse_list_csv(&body[..])?;

        debug!(list_id, name = ?name, items = items.len(), "Exported IMDb list");
        Ok((name, items))
    }
}

#[async_trait]
impl SourceProvider for ImdbClient {
    fn provider_name(&self) -> &str {
        "imdb"
    }

    async fn get_list_items(&self, list_id: &str) -> Result<(String, Vec<SourceItem>), SourceError> {
        let (name, items) = self.export_list(list_id).await?;
        let name = name.ok_or_else(|| {
            SourceError::MalformedResponse(format!("IMDb list {} export has no filename", list_id))
        })?;
        Ok((name, items))
    }

    async fn get_watchlist(&self) -> Result<(String, Vec<SourceItem>), SourceError> {
        let (_, items) = self.export_list(&self.watchlist_id).await?;
        Ok((self.watchlist_id.clone(), items))
    }

    async fn list_all_lists(&self) -> Result<Vec<String>, SourceError> {
        let html = self
            .fetch_text(&format!("/user/{}/lists", self.user_id), "IMDb lists page")
            .await?;
        let found = scrape::find_list_ids(&html);
        if found.is_empty() {
            // Treating this as "no lists" would delete every target list
            return Err(SourceError::MalformedResponse(
                "no list entries recognised on the IMDb lists page".to_string(),
            ));
        }
        let ids: Vec<String> = found.into_iter().filter(|id| *id != self.watchlist_id).collect();
        debug!(count = ids.len(), "Discovered IMDb lists");
        Ok(ids)
    }

    async fn get_ratings(&self) -> Result<Vec<SourceItem>, SourceError> {
        let context = "IMDb ratings export";
        let body = self
            .fetch(&format!("/user/{}/ratings/export", self.user_id), context)
            .await?
            .bytes()
            .await
            .map_err(|e| SourceError::Network(format!("{}: {}", context, e)))?;
        parser::parse_ratings_csv(&body[..])
    }
}
