use futures::stream::{self, StreamExt};
use media_sync_config::ListSelection;
use media_sync_models::{DataPair, TargetItem, TargetList};
use media_sync_sources::{BatchOutcome, SourceError, SourceProvider, TargetProvider};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::diff::{difference, rating_updates};

/// Progress hook called on every stage transition.
pub type StageCallback = Arc<dyn Fn(SyncStage) + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct SyncOptions {
    pub selection: ListSelection,
    pub lists: bool,
    pub watchlist: bool,
    pub ratings: bool,
    /// Compute every diff and history check but issue no mutation.
    pub dry_run: bool,
    /// Source list snapshots fetched in parallel.
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            selection: ListSelection::All,
            lists: true,
            watchlist: true,
            ratings: true,
            dry_run: false,
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum SyncStage {
    #[default]
    Init,
    SnapshotAcquired,
    ListsReconciled,
    ItemsSynced,
    RatingsSynced,
    Done,
}

impl SyncStage {
    /// Position in the run, for progress display.
    pub fn ordinal(self) -> u64 {
        self as u64
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncStage::Init => "init",
            SyncStage::SnapshotAcquired => "snapshot_acquired",
            SyncStage::ListsReconciled => "lists_reconciled",
            SyncStage::ItemsSynced => "items_synced",
            SyncStage::RatingsSynced => "ratings_synced",
            SyncStage::Done => "done",
        })
    }
}

/// A non-fatal apply failure, collected instead of stopping the run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub scope: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: SourceError,
}

fn serialize_display<S: Serializer>(error: &SourceError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub stage: SyncStage,
    pub lists_created: usize,
    pub lists_deleted: usize,
    pub items_added: usize,
    pub items_removed: usize,
    pub ratings_added: usize,
    pub ratings_removed: usize,
    pub ratings_updated: usize,
    pub history_added: usize,
    pub history_removed: usize,
    /// Source lists that no longer exist and were dropped from this run.
    pub skipped_lists: Vec<String>,
    pub failures: Vec<SyncFailure>,
    pub duration: Duration,
    pub dry_run: bool,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_changes(&self) -> usize {
        self.lists_created
            + self.lists_deleted
            + self.items_added
            + self.items_removed
            + self.ratings_added
            + self.ratings_removed
            + self.ratings_updated
            + self.history_added
            + self.history_removed
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    /// A snapshot could not be read; nothing was changed.
    #[error("failed to fetch {what}: {source}")]
    Acquisition { what: String, source: SourceError },

    /// A fatal provider error during the apply phase; earlier changes stay applied.
    #[error("sync aborted at {stage} while trying to {what}: {source}")]
    Aborted {
        stage: SyncStage,
        what: String,
        source: SourceError,
    },
}

/// A selected source list together with what the target holds for it.
struct ListSnapshot {
    pair: DataPair,
    on_target: bool,
}

#[derive(Default)]
struct Snapshot {
    lists: Vec<ListSnapshot>,
    target_lists: Vec<TargetList>,
    watchlist: Option<DataPair>,
    ratings: Option<DataPair>,
    skipped_lists: Vec<String>,
}

/// Slug of the target list each source list maps to, if any.
///
/// An exact slug match wins; otherwise a list with the same name is used,
/// since the target may assign its own slug when a list is created. Each
/// target list is paired with at most one source list.
fn match_target_lists(target_lists: &[TargetList], pairs: &[DataPair]) -> Vec<Option<String>> {
    let mut claimed: HashSet<&str> = HashSet::new();
    let mut matches: Vec<Option<String>> = pairs
        .iter()
        .map(|pair| {
            target_lists
                .iter()
                .find(|list| !pair.target_list_id.is_empty() && list.slug == pair.target_list_id)
                .filter(|list| claimed.insert(list.slug.as_str()))
                .map(|list| list.slug.clone())
        })
        .collect();

    for (pair, matched) in pairs.iter().zip(matches.iter_mut()) {
        if matched.is_some() {
            continue;
        }
        *matched = target_lists
            .iter()
            .find(|list| list.name == pair.source_list_name && !claimed.contains(list.slug.as_str()))
            .map(|list| {
                claimed.insert(list.slug.as_str());
                list.slug.clone()
            });
    }

    matches
}

fn acquisition(what: impl Into<String>) -> impl FnOnce(SourceError) -> SyncError {
    let what = what.into();
    move |source| SyncError::Acquisition { what, source }
}

/// Drives one reconciliation run from the source of truth to the target.
pub struct SyncOrchestrator {
    source: Arc<dyn SourceProvider>,
    target: Arc<dyn TargetProvider>,
    options: SyncOptions,
    on_stage: Option<StageCallback>,
}

impl SyncOrchestrator {
    pub fn new(source: Arc<dyn SourceProvider>, target: Arc<dyn TargetProvider>) -> Self {
        Self {
            source,
            target,
            options: SyncOptions::default(),
            on_stage: None,
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_stage_callback(mut self, callback: StageCallback) -> Self {
        self.on_stage = Some(callback);
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    #[instrument(skip(self), fields(source = self.source.provider_name(), target = self.target.provider_name()))]
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let start = Instant::now();
        let mut report = SyncReport {
            dry_run: self.options.dry_run,
            ..SyncReport::default()
        };

        info!(
            operation = "sync_start",
            selection = %self.options.selection,
            lists = self.options.lists,
            watchlist = self.options.watchlist,
            ratings = self.options.ratings,
            dry_run = self.options.dry_run,
            "Starting sync"
        );

        let snapshot = self.acquire().await?;
        report.skipped_lists = snapshot.skipped_lists;
        self.advance(&mut report, SyncStage::SnapshotAcquired);

        let lists = self.reconcile_lists(snapshot.lists, &mut report).await?;
        self.advance(&mut report, SyncStage::ListsReconciled);

        for pair in &lists {
            self.sync_list(pair, &mut report).await?;
        }
        if let Some(watchlist) = &snapshot.watchlist {
            self.sync_watchlist(watchlist, &mut report).await?;
        }
        if self.options.lists {
            self.delete_orphans(&lists, &snapshot.target_lists, &mut report).await?;
        }
        self.advance(&mut report, SyncStage::ItemsSynced);

        if let Some(ratings) = &snapshot.ratings {
            self.sync_ratings(ratings, &mut report).await?;
        }
        self.advance(&mut report, SyncStage::RatingsSynced);

        report.duration = start.elapsed();
        self.advance(&mut report, SyncStage::Done);

        info!(
            operation = "sync_complete",
            changes = report.total_changes(),
            failures = report.failures.len(),
            duration_ms = report.duration.as_millis() as u64,
            dry_run = report.dry_run,
            "Sync finished"
        );
        Ok(report)
    }

    fn advance(&self, report: &mut SyncReport, stage: SyncStage) {
        report.stage = stage;
        info!(operation = "sync_stage", stage = %stage, "Stage reached");
        if let Some(callback) = &self.on_stage {
            callback(stage);
        }
    }

    /// Read every snapshot the run needs. Any error here aborts before a single write.
    async fn acquire(&self) -> Result<Snapshot, SyncError> {
        let mut snapshot = Snapshot::default();

        if self.options.lists {
            self.acquire_lists(&mut snapshot).await?;
        }

        if self.options.watchlist {
            let (list_id, items) = self
                .source
                .get_watchlist()
                .await
                .map_err(acquisition("source watchlist"))?;
            let target_items = self
                .target
                .get_watchlist()
                .await
                .map_err(acquisition("target watchlist"))?;
            debug!(source = items.len(), target = target_items.len(), "Watchlist snapshots fetched");
            snapshot.watchlist = Some(DataPair::watchlist(list_id, items).with_target_items(target_items));
        }

        if self.options.ratings {
            match self.source.get_ratings().await {
                Ok(source_ratings) => {
                    let target_ratings = self
                        .target
                        .get_ratings()
                        .await
                        .map_err(acquisition("target ratings"))?;
                    debug!(source = source_ratings.len(), target = target_ratings.len(), "Ratings snapshots fetched");
                    snapshot.ratings = Some(DataPair::ratings(source_ratings, target_ratings));
                }
                Err(e) if e.is_not_found() => {
                    warn!(error = %e, "Source ratings export not found, skipping ratings this run");
                }
                Err(e) => return Err(acquisition("source ratings")(e)),
            }
        }

        Ok(snapshot)
    }

    async fn acquire_lists(&self, snapshot: &mut Snapshot) -> Result<(), SyncError> {
        let list_ids = match &self.options.selection {
            ListSelection::All => self
                .source
                .list_all_lists()
                .await
                .map_err(acquisition("source list index"))?,
            ListSelection::Ids(ids) => ids.clone(),
        };
        let mut seen = HashSet::new();
        let list_ids: Vec<String> = list_ids.into_iter().filter(|id| seen.insert(id.clone())).collect();
        debug!(count = list_ids.len(), "Fetching source lists");

        let concurrency = self.options.concurrency.max(1);
        let fetched: Vec<_> = stream::iter(list_ids)
            .map(|list_id| {
                let source = Arc::clone(&self.source);
                async move {
                    let result = source.get_list_items(&list_id).await;
                    (list_id, result)
                }
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut slugs = HashSet::new();
        let mut pairs = Vec::new();
        for (list_id, result) in fetched {
            match result {
                Ok((name, items)) => {
                    let pair = DataPair::list(list_id.clone(), name, items);
                    // Names with no slug-able characters are told apart by name
                    let key = if pair.target_list_id.is_empty() {
                        format!("name:{}", pair.source_list_name)
                    } else {
                        pair.target_list_id.clone()
                    };
                    if !slugs.insert(key) {
                        warn!(
                            list_id = %list_id,
                            slug = %pair.target_list_id,
                            "Another selected list maps to the same target list, skipping"
                        );
                        snapshot.skipped_lists.push(list_id);
                        continue;
                    }
                    pairs.push(pair);
                }
                Err(e) if e.is_not_found() => {
                    warn!(list_id = %list_id, "Source list not found, dropping it from this run");
                    snapshot.skipped_lists.push(list_id);
                }
                Err(e) => return Err(acquisition(format!("source list {}", list_id))(e)),
            }
        }

        snapshot.target_lists = self
            .target
            .get_lists()
            .await
            .map_err(acquisition("target lists"))?;

        let matches = match_target_lists(&snapshot.target_lists, &pairs);
        for (mut pair, matched) in pairs.into_iter().zip(matches) {
            let Some(slug) = matched else {
                snapshot.lists.push(ListSnapshot { pair, on_target: false });
                continue;
            };
            if slug != pair.target_list_id {
                debug!(expected = %pair.target_list_id, actual = %slug, "Matched target list by name");
                pair.target_list_id = slug;
            }
            match self.target.get_list_items(&pair.target_list_id).await {
                Ok(target_items) => snapshot.lists.push(ListSnapshot {
                    pair: pair.with_target_items(target_items),
                    on_target: true,
                }),
                Err(e) if e.is_not_found() => {
                    debug!(slug = %pair.target_list_id, "Target list vanished, will recreate");
                    snapshot.lists.push(ListSnapshot { pair, on_target: false });
                }
                Err(e) => {
                    return Err(acquisition(format!("target list {}", pair.target_list_id))(e));
                }
            }
        }

        Ok(())
    }

    /// Record a failed apply step. Fatal errors stop the run, the rest are collected.
    fn apply_failed(
        &self,
        report: &mut SyncReport,
        stage: SyncStage,
        what: String,
        err: SourceError,
    ) -> Result<(), SyncError> {
        if err.is_fatal() {
            error!(stage = %stage, what = %what, error = %err, "Fatal error, aborting sync");
            return Err(SyncError::Aborted {
                stage,
                what,
                source: err,
            });
        }
        warn!(stage = %stage, what = %what, error = %err, "Step failed, continuing");
        report.failures.push(SyncFailure { scope: what, error: err });
        Ok(())
    }

    /// Create missing target lists. Lists that could not be created leave the working set.
    async fn reconcile_lists(
        &self,
        lists: Vec<ListSnapshot>,
        report: &mut SyncReport,
    ) -> Result<Vec<DataPair>, SyncError> {
        let stage = SyncStage::ListsReconciled;
        let mut ready = Vec::with_capacity(lists.len());

        for ListSnapshot { mut pair, on_target } in lists {
            if on_target {
                ready.push(pair);
                continue;
            }

            if self.options.dry_run {
                info!(list = %pair.source_list_name, slug = %pair.target_list_id, "Would create target list");
                report.lists_created += 1;
                ready.push(pair);
                continue;
            }

            match self.target.create_list(&pair.source_list_name).await {
                Ok(created) => {
                    info!(list = %pair.source_list_name, slug = %created.slug, "Created target list");
                    if created.slug != pair.target_list_id {
                        debug!(expected = %pair.target_list_id, actual = %created.slug, "Target assigned a different slug");
                        pair.target_list_id = created.slug;
                    }
                    report.lists_created += 1;
                    ready.push(pair);
                }
                Err(e) => {
                    let what = format!("create list '{}'", pair.source_list_name);
                    self.apply_failed(report, stage, what, e)?;
                }
            }
        }

        Ok(ready)
    }

    /// Keep the items a batch actually applied. Items the target could not
    /// match are recorded as failures and count as not applied.
    fn accepted(
        &self,
        report: &mut SyncReport,
        what: &str,
        items: &[TargetItem],
        outcome: BatchOutcome,
    ) -> Vec<TargetItem> {
        if outcome.is_complete() {
            return items.to_vec();
        }

        let missing: HashSet<String> = outcome.not_found.iter().map(TargetItem::label).collect();
        let mut applied = Vec::with_capacity(items.len());
        for item in items {
            let label = item.label();
            if missing.contains(&label) {
                warn!(what, item = %label, "Target could not match item");
                report.failures.push(SyncFailure {
                    scope: format!("{} {}", what, label),
                    error: SourceError::NotFound(format!("{} is unknown to {}", label, self.target.provider_name())),
                });
            } else {
                applied.push(item.clone());
            }
        }
        applied
    }

    async fn sync_list(&self, pair: &DataPair, report: &mut SyncReport) -> Result<(), SyncError> {
        let stage = SyncStage::ItemsSynced;
        let diff = difference(pair);
        let list_id = pair.target_list_id.as_str();

        if !diff.add.is_empty() {
            if self.options.dry_run {
                info!(list = list_id, count = diff.add.len(), "Would add list items");
                report.items_added += diff.add.len();
            } else {
                let what = format!("add items to list {}", list_id);
                match self.target.add_list_items(list_id, &diff.add).await {
                    Ok(outcome) => {
                        let added = self.accepted(report, &what, &diff.add, outcome).len();
                        info!(list = list_id, count = added, "Added list items");
                        report.items_added += added;
                    }
                    Err(e) => self.apply_failed(report, stage, what, e)?,
                }
            }
        }

        if !diff.remove.is_empty() {
            if self.options.dry_run {
                info!(list = list_id, count = diff.remove.len(), "Would remove list items");
                report.items_removed += diff.remove.len();
            } else {
                let what = format!("remove items from list {}", list_id);
                match self.target.remove_list_items(list_id, &diff.remove).await {
                    Ok(outcome) => {
                        let removed = self.accepted(report, &what, &diff.remove, outcome).len();
                        info!(list = list_id, count = removed, "Removed list items");
                        report.items_removed += removed;
                    }
                    Err(e) => self.apply_failed(report, stage, what, e)?,
                }
            }
        }

        Ok(())
    }

    async fn sync_watchlist(&self, pair: &DataPair, report: &mut SyncReport) -> Result<(), SyncError> {
        let stage = SyncStage::ItemsSynced;
        let diff = difference(pair);

        if !diff.add.is_empty() {
            if self.options.dry_run {
                info!(count = diff.add.len(), "Would add watchlist items");
                report.items_added += diff.add.len();
            } else {
                let what = "add watchlist items";
                match self.target.add_watchlist_items(&diff.add).await {
                    Ok(outcome) => {
                        let added = self.accepted(report, what, &diff.add, outcome).len();
                        info!(count = added, "Added watchlist items");
                        report.items_added += added;
                    }
                    Err(e) => self.apply_failed(report, stage, what.to_string(), e)?,
                }
            }
        }

        if !diff.remove.is_empty() {
            if self.options.dry_run {
                info!(count = diff.remove.len(), "Would remove watchlist items");
                report.items_removed += diff.remove.len();
            } else {
                let what = "remove watchlist items";
                match self.target.remove_watchlist_items(&diff.remove).await {
                    Ok(outcome) => {
                        let removed = self.accepted(report, what, &diff.remove, outcome).len();
                        info!(count = removed, "Removed watchlist items");
                        report.items_removed += removed;
                    }
                    Err(e) => self.apply_failed(report, stage, what.to_string(), e)?,
                }
            }
        }

        Ok(())
    }

    /// Delete target lists that no selected source list maps to.
    async fn delete_orphans(
        &self,
        lists: &[DataPair],
        target_lists: &[TargetList],
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let known: HashSet<&str> = lists.iter().map(|pair| pair.target_list_id.as_str()).collect();

        for list in target_lists.iter().filter(|list| !known.contains(list.slug.as_str())) {
            if self.options.dry_run {
                info!(slug = %list.slug, "Would delete orphaned target list");
                report.lists_deleted += 1;
                continue;
            }
            match self.target.delete_list(&list.slug).await {
                Ok(()) => {
                    info!(slug = %list.slug, name = %list.name, "Deleted orphaned target list");
                    report.lists_deleted += 1;
                }
                Err(e) => {
                    self.apply_failed(report, SyncStage::ItemsSynced, format!("delete list {}", list.slug), e)?;
                }
            }
        }

        Ok(())
    }

    async fn sync_ratings(&self, pair: &DataPair, report: &mut SyncReport) -> Result<(), SyncError> {
        let diff = difference(pair);
        self.add_ratings(&diff.add, report).await?;
        self.remove_ratings(&diff.remove, report).await?;
        self.update_ratings(pair, report).await
    }

    /// Phase one: push new ratings, then give each one a watched entry if it lacks one.
    async fn add_ratings(&self, items: &[TargetItem], report: &mut SyncReport) -> Result<(), SyncError> {
        let stage = SyncStage::RatingsSynced;
        if items.is_empty() {
            return Ok(());
        }

        let rated = if self.options.dry_run {
            info!(count = items.len(), "Would add ratings");
            items.to_vec()
        } else {
            match self.target.add_ratings(items).await {
                Ok(outcome) => {
                    let rated = self.accepted(report, "add rating", items, outcome);
                    info!(count = rated.len(), "Added ratings");
                    rated
                }
                // The batch did not land, so none of its items count as added
                Err(e) => return self.apply_failed(report, stage, "add ratings".to_string(), e),
            }
        };
        report.ratings_added += rated.len();

        for item in &rated {
            let history = match self.target.get_history(item).await {
                Ok(history) => history,
                Err(e) => {
                    self.apply_failed(report, stage, format!("check history of {}", item.label()), e)?;
                    continue;
                }
            };
            if !history.is_empty() {
                debug!(item = %item.label(), entries = history.len(), "Already in history");
                continue;
            }

            if self.options.dry_run {
                info!(item = %item.label(), "Would add history entry");
                report.history_added += 1;
                continue;
            }
            let batch = std::slice::from_ref(item);
            match self.target.add_history(batch).await {
                Ok(outcome) => {
                    let added = self.accepted(report, "add history for", batch, outcome).len();
                    report.history_added += added;
                }
                Err(e) => self.apply_failed(report, stage, format!("add history for {}", item.label()), e)?,
            }
        }

        Ok(())
    }

    /// Phase two: drop ratings gone from the source, and their watched entries with them.
    async fn remove_ratings(&self, items: &[TargetItem], report: &mut SyncReport) -> Result<(), SyncError> {
        let stage = SyncStage::RatingsSynced;
        if items.is_empty() {
            return Ok(());
        }

        let unrated = if self.options.dry_run {
            info!(count = items.len(), "Would remove ratings");
            items.to_vec()
        } else {
            match self.target.remove_ratings(items).await {
                Ok(outcome) => {
                    let unrated = self.accepted(report, "remove rating", items, outcome);
                    info!(count = unrated.len(), "Removed ratings");
                    unrated
                }
                Err(e) => return self.apply_failed(report, stage, "remove ratings".to_string(), e),
            }
        };
        report.ratings_removed += unrated.len();

        for item in &unrated {
            let history = match self.target.get_history(item).await {
                Ok(history) => history,
                Err(e) => {
                    self.apply_failed(report, stage, format!("check history of {}", item.label()), e)?;
                    continue;
                }
            };
            if history.is_empty() {
                continue;
            }

            if self.options.dry_run {
                info!(item = %item.label(), "Would remove history entries");
                report.history_removed += 1;
                continue;
            }
            let batch = std::slice::from_ref(item);
            match self.target.remove_history(batch).await {
                Ok(outcome) => {
                    let removed = self.accepted(report, "remove history for", batch, outcome).len();
                    report.history_removed += removed;
                }
                Err(e) => self.apply_failed(report, stage, format!("remove history for {}", item.label()), e)?,
            }
        }

        Ok(())
    }

    /// Phase three: overwrite target ratings whose value differs from the source.
    async fn update_ratings(&self, pair: &DataPair, report: &mut SyncReport) -> Result<(), SyncError> {
        let updates = rating_updates(pair);
        if updates.is_empty() {
            return Ok(());
        }

        if self.options.dry_run {
            info!(count = updates.len(), "Would update ratings");
            report.ratings_updated += updates.len();
            return Ok(());
        }

        match self.target.add_ratings(&updates).await {
            Ok(outcome) => {
                let updated = self.accepted(report, "update rating", &updates, outcome).len();
                info!(count = updated, "Updated ratings");
                report.ratings_updated += updated;
                Ok(())
            }
            Err(e) => self.apply_failed(report, SyncStage::RatingsSynced, "update ratings".to_string(), e),
        }
    }
}

#[cfg(test)]
mod tests;
