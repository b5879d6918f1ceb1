use async_trait::async_trait;
use chrono::{Duration, Utc};
use media_sync_config::{CredentialStore, TraktConfig};
use media_sync_models::{TargetItem, TargetList};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::retry::{send_with_retry, RetryPolicy};
use crate::traits::{BatchOutcome, HistoryEntry, TargetProvider};
use crate::trakt::api::{
    self, NewList, PayloadMode, SyncPayload, SyncResponse, TraktEntry, TraktHistoryEntry, TraktList, UserProfile,
};
use crate::trakt::auth;

const BASE_URL: &str = "https://api.trakt.tv";

/// Tokens younger than this are refreshed before use.
const REFRESH_WINDOW_MINUTES: i64 = 5;

pub struct TraktClient {
    client: Client,
    base_url: String,
    client_id: String,
    access_token: String,
    encoded_username: String,
    retry: RetryPolicy,
}

impl TraktClient {
    /// Connect with the tokens saved in `credentials`, refreshing them first
    /// when they are about to expire. Refreshed tokens are written back.
    pub async fn connect(config: &TraktConfig, credentials: &mut CredentialStore) -> Result<Self, SourceError> {
        Self::connect_to(config, credentials, BASE_URL).await
    }

    /// Like [`TraktClient::connect`], against another API host.
    pub async fn connect_to(
        config: &TraktConfig,
        credentials: &mut CredentialStore,
        base_url: &str,
    ) -> Result<Self, SourceError> {
        let client = auth::create_trakt_client()?;

        let mut access_token = credentials.get_trakt_access_token().cloned().ok_or_else(|| {
            SourceError::Authentication("no Trakt access token saved, run `reelsync config trakt`".to_string())
        })?;
        let mut refreshed = false;

        let expiring = match credentials.get_trakt_token_expires() {
            Some(expires_at) => expires_at <= Utc::now() + Duration::minutes(REFRESH_WINDOW_MINUTES),
            None => false,
        };
        if expiring {
            info!("Trakt access token expired or expiring soon, refreshing");
            access_token = Self::refresh(&client, config, credentials).await?;
            refreshed = true;
        }

        let mut trakt = Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            access_token,
            encoded_username: String::new(),
            retry: RetryPolicy::default(),
        };

        let profile = match trakt.get_json::<UserProfile>("/users/me", "Trakt profile").await {
            Err(SourceError::Authentication(reason)) if !refreshed => {
                info!(reason = %reason, "Saved Trakt token rejected, attempting refresh");
                trakt.access_token = Self::refresh(&trakt.client, config, credentials).await?;
                trakt.get_json::<UserProfile>("/users/me", "Trakt profile").await?
            }
            other => other?,
        };
        trakt.encoded_username = urlencoding::encode(&profile.ids.slug).into_owned();

        info!(operation = "trakt_connect", user = %profile.ids.slug, "Connected to Trakt");
        Ok(trakt)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn refresh(
        client: &Client,
        config: &TraktConfig,
        credentials: &mut CredentialStore,
    ) -> Result<String, SourceError> {
        let refresh_token = credentials.get_trakt_refresh_token().cloned().ok_or_else(|| {
            SourceError::Authentication("no Trakt refresh token saved, run `reelsync config trakt`".to_string())
        })?;
        let token = auth::refresh_access_token(client, &config.client_id, &config.client_secret, &refresh_token).await?;

        credentials.set_trakt_access_token(token.access_token.clone());
        credentials.set_trakt_refresh_token(token.refresh_token);
        credentials.set_trakt_token_expires(token.expires_at);
        credentials
            .save()
            .map_err(|e| SourceError::Config(format!("failed to save Trakt tokens: {}", e)))?;

        Ok(token.access_token)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .header("trakt-api-version", "2")
            .header("trakt-api-key", &self.client_id)
            .header(CONTENT_TYPE, "application/json")
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, context: &str) -> Result<T, SourceError> {
        send_with_retry(&self.retry, context, || self.request(Method::GET, path))
            .await?
            .json::<T>()
            .await
            .map_err(|e| SourceError::MalformedResponse(format!("{}: {}", context, e)))
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B, context: &str) -> Result<Response, SourceError> {
        send_with_retry(&self.retry, context, || self.request(Method::POST, path).json(body)).await
    }

    /// POST a batch to a sync-style endpoint and hand back the items Trakt could not match.
    async fn post_batch(
        &self,
        path: &str,
        items: &[TargetItem],
        mode: PayloadMode,
        context: &str,
    ) -> Result<BatchOutcome, SourceError> {
        let payload = SyncPayload::build(items, mode);
        if payload.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let summary: SyncResponse = self
            .post(path, &payload, context)
            .await?
            .json()
            .await
            .map_err(|e| SourceError::MalformedResponse(format!("{}: {}", context, e)))?;
        let not_found = summary.unmatched(items);

        if !not_found.is_empty() {
            warn!(context, not_found = not_found.len(), "Trakt could not match some items");
        }
        debug!(context, items = payload.len(), "Batch submitted");
        Ok(BatchOutcome::unmatched(not_found))
    }

    fn user_path(&self, rest: &str) -> String {
        format!("/users/{}{}", self.encoded_username, rest)
    }

    fn list_path(&self, list_id: &str, rest: &str) -> String {
        self.user_path(&format!("/lists/{}{}", urlencoding::encode(list_id), rest))
    }
}

#[async_trait]
impl TargetProvider for TraktClient {
    fn provider_name(&self) -> &str {
        "trakt"
    }

    async fn get_lists(&self) -> Result<Vec<TargetList>, SourceError> {
        let lists: Vec<TraktList> = self.get_json(&self.user_path("/lists"), "Trakt lists").await?;
        Ok(lists.into_iter().map(TargetList::from).collect())
    }

    async fn create_list(&self, name: &str) -> Result<TargetList, SourceError> {
        let context = format!("create Trakt list '{}'", name);
        let body = NewList { name, privacy: "private" };
        let list: TraktList = self
            .post(&self.user_path("/lists"), &body, &context)
            .await?
            .json()
            .await
            .map_err(|e| SourceError::MalformedResponse(format!("{}: {}", context, e)))?;
        Ok(list.into())
    }

    async fn delete_list(&self, list_id: &str) -> Result<(), SourceError> {
        let context = format!("delete Trakt list {}", list_id);
        let path = self.list_path(list_id, "");
        send_with_retry(&self.retry, &context, || self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    async fn get_list_items(&self, list_id: &str) -> Result<Vec<TargetItem>, SourceError> {
        let context = format!("Trakt list {}", list_id);
        let entries: Vec<TraktEntry> = self.get_json(&self.list_path(list_id, "/items"), &context).await?;
        Ok(api::entries_to_targets(entries))
    }

    async fn add_list_items(&self, list_id: &str, items: &[TargetItem]) -> Result<BatchOutcome, SourceError> {
        let context = format!("add items to Trakt list {}", list_id);
        self.post_batch(&self.list_path(list_id, "/items"), items, PayloadMode::Ids, &context)
            .await
    }

    async fn remove_list_items(&self, list_id: &str, items: &[TargetItem]) -> Result<BatchOutcome, SourceError> {
        let context = format!("remove items from Trakt list {}", list_id);
        self.post_batch(&self.list_path(list_id, "/items/remove"), items, PayloadMode::Ids, &context)
            .await
    }

    async fn get_watchlist(&self) -> Result<Vec<TargetItem>, SourceError> {
        let entries: Vec<TraktEntry> = self.get_json(&self.user_path("/watchlist"), "Trakt watchlist").await?;
        Ok(api::entries_to_targets(entries))
    }

    async fn add_watchlist_items(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError> {
        self.post_batch("/sync/watchlist", items, PayloadMode::Ids, "add to Trakt watchlist")
            .await
    }

    async fn remove_watchlist_items(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError> {
        self.post_batch("/sync/watchlist/remove", items, PayloadMode::Ids, "remove from Trakt watchlist")
            .await
    }

    async fn get_ratings(&self) -> Result<Vec<TargetItem>, SourceError> {
        let entries: Vec<TraktEntry> = self.get_json(&self.user_path("/ratings"), "Trakt ratings").await?;
        Ok(api::entries_to_targets(entries))
    }

    async fn add_ratings(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError> {
        self.post_batch("/sync/ratings", items, PayloadMode::Ratings, "add Trakt ratings")
            .await
    }

    async fn remove_ratings(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError> {
        self.post_batch("/sync/ratings/remove", items, PayloadMode::Ids, "remove Trakt ratings")
            .await
    }

    async fn get_history(&self, item: &TargetItem) -> Result<Vec<HistoryEntry>, SourceError> {
        let ids = item.ids();
        let id = match (ids.trakt, item.external_id()) {
            (Some(trakt), _) => trakt.to_string(),
            (None, Some(imdb)) => imdb.to_string(),
            (None, None) => {
                return Err(SourceError::Config(format!(
                    "{} has no id usable for a history lookup",
                    item.label()
                )))
            }
        };
        let context = format!("Trakt history for {}", item.label());
        let path = self.user_path(&format!("/history/{}/{}", api::history_type(item.kind()), id));
        let entries: Vec<TraktHistoryEntry> = self.get_json(&path, &context).await?;
        Ok(entries
            .into_iter()
            .map(|entry| HistoryEntry {
                id: entry.id,
                watched_at: entry.watched_at,
            })
            .collect())
    }

    async fn add_history(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError> {
        self.post_batch("/sync/history", items, PayloadMode::History, "add Trakt history")
            .await
    }

    async fn remove_history(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError> {
        self.post_batch("/sync/history/remove", items, PayloadMode::Ids, "remove Trakt history")
            .await
    }
}
