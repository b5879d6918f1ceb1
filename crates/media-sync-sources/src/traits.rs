use async_trait::async_trait;
use media_sync_models::{SourceItem, TargetItem, TargetList};

use crate::error::SourceError;

/// Entries a target keeps in its watched history for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: u64,
    pub watched_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// What a batch write left undone: submitted items the target could not
/// match to anything in its catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub not_found: Vec<TargetItem>,
}

impl BatchOutcome {
    pub fn unmatched(not_found: Vec<TargetItem>) -> Self {
        Self { not_found }
    }

    pub fn is_complete(&self) -> bool {
        self.not_found.is_empty()
    }
}

/// The source of truth. Read-only.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    fn provider_name(&self) -> &str;

    /// Items of one list together with its display name.
    async fn get_list_items(&self, list_id: &str) -> Result<(String, Vec<SourceItem>), SourceError>;

    /// The watchlist's list id and its items.
    async fn get_watchlist(&self) -> Result<(String, Vec<SourceItem>), SourceError>;

    /// Ids of every ordinary list the user owns.
    async fn list_all_lists(&self) -> Result<Vec<String>, SourceError>;

    async fn get_ratings(&self) -> Result<Vec<SourceItem>, SourceError>;
}

/// The service being made to match the source.
#[async_trait]
pub trait TargetProvider: Send + Sync {
    fn provider_name(&self) -> &str;

    async fn get_lists(&self) -> Result<Vec<TargetList>, SourceError>;
    async fn create_list(&self, name: &str) -> Result<TargetList, SourceError>;
    async fn delete_list(&self, list_id: &str) -> Result<(), SourceError>;
    async fn get_list_items(&self, list_id: &str) -> Result<Vec<TargetItem>, SourceError>;
    async fn add_list_items(&self, list_id: &str, items: &[TargetItem]) -> Result<BatchOutcome, SourceError>;
    async fn remove_list_items(&self, list_id: &str, items: &[TargetItem]) -> Result<BatchOutcome, SourceError>;

    async fn get_watchlist(&self) -> Result<Vec<TargetItem>, SourceError>;
    async fn add_watchlist_items(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError>;
    async fn remove_watchlist_items(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError>;

    async fn get_ratings(&self) -> Result<Vec<TargetItem>, SourceError>;
    /// Adds new ratings and overwrites existing ones.
    async fn add_ratings(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError>;
    async fn remove_ratings(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError>;

    async fn get_history(&self, item: &TargetItem) -> Result<Vec<HistoryEntry>, SourceError>;
    async fn add_history(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError>;
    async fn remove_history(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError>;
}
