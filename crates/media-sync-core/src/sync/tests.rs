use super::*;
use async_trait::async_trait;
use chrono::NaiveDate;
use media_sync_models::{list_slug, SourceItem, SourceRating, TargetIds, TargetKind, TargetRecord, TitleType};
use media_sync_sources::{BatchOutcome, HistoryEntry};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    CreateList(String),
    DeleteList(String),
    GetListItems(String),
    AddListItems(String, Vec<String>),
    RemoveListItems(String, Vec<String>),
    AddWatchlist(Vec<String>),
    RemoveWatchlist(Vec<String>),
    AddRatings(Vec<(String, u8)>),
    RemoveRatings(Vec<String>),
    GetHistory(String),
    AddHistory(Vec<String>),
    RemoveHistory(Vec<String>),
}

impl Call {
    fn is_mutation(&self) -> bool {
        !matches!(self, Call::GetListItems(_) | Call::GetHistory(_))
    }
}

fn labels(items: &[TargetItem]) -> Vec<String> {
    items.iter().map(TargetItem::label).collect()
}

#[derive(Default)]
struct FakeSource {
    lists: Vec<(String, String, Vec<SourceItem>)>,
    watchlist: Vec<SourceItem>,
    ratings: Vec<SourceItem>,
    ratings_missing: bool,
}

#[async_trait]
impl SourceProvider for FakeSource {
    fn provider_name(&self) -> &str {
        "fake-source"
    }

    async fn get_list_items(&self, list_id: &str) -> Result<(String, Vec<SourceItem>), SourceError> {
        self.lists
            .iter()
            .find(|(id, _, _)| id == list_id)
            .map(|(_, name, items)| (name.clone(), items.clone()))
            .ok_or_else(|| SourceError::NotFound(list_id.to_string()))
    }

    async fn get_watchlist(&self) -> Result<(String, Vec<SourceItem>), SourceError> {
        Ok(("ls000000099".to_string(), self.watchlist.clone()))
    }

    async fn list_all_lists(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.lists.iter().map(|(id, _, _)| id.clone()).collect())
    }

    async fn get_ratings(&self) -> Result<Vec<SourceItem>, SourceError> {
        if self.ratings_missing {
            return Err(SourceError::NotFound("ratings export".to_string()));
        }
        Ok(self.ratings.clone())
    }
}

#[derive(Default)]
struct FakeTarget {
    lists: Vec<TargetList>,
    list_items: HashMap<String, Vec<TargetItem>>,
    watchlist: Vec<TargetItem>,
    ratings: Vec<TargetItem>,
    history: HashMap<String, Vec<HistoryEntry>>,
    failures: HashMap<&'static str, SourceError>,
    unknown: HashSet<String>,
    calls: Mutex<Vec<Call>>,
}

impl FakeTarget {
    fn with_list(self, name: &str, items: Vec<TargetItem>) -> Self {
        let slug = list_slug(name);
        self.with_list_slug(name, &slug, items)
    }

    fn with_list_slug(mut self, name: &str, slug: &str, items: Vec<TargetItem>) -> Self {
        self.lists.push(TargetList {
            name: name.to_string(),
            slug: slug.to_string(),
            trakt_id: Some(self.lists.len() as u64 + 1),
        });
        self.list_items.insert(slug.to_string(), items);
        self
    }

    /// Items the target has no record of; batches report them as unmatched.
    fn unknown(mut self, id: &str) -> Self {
        self.unknown.insert(id.to_string());
        self
    }

    fn batch(&self, operation: &str, items: &[TargetItem]) -> Result<BatchOutcome, SourceError> {
        self.check(operation)?;
        Ok(BatchOutcome::unmatched(
            items
                .iter()
                .filter(|item| self.unknown.contains(&item.label()))
                .cloned()
                .collect(),
        ))
    }

    fn failing(mut self, operation: &'static str, error: SourceError) -> Self {
        self.failures.insert(operation, error);
        self
    }

    fn watched(mut self, id: &str) -> Self {
        self.history.insert(
            id.to_string(),
            vec![HistoryEntry {
                id: 1,
                watched_at: None,
            }],
        );
        self
    }

    fn check(&self, operation: &str) -> Result<(), SourceError> {
        match self.failures.get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }
}

#[async_trait]
impl TargetProvider for FakeTarget {
    fn provider_name(&self) -> &str {
        "fake-target"
    }

    async fn get_lists(&self) -> Result<Vec<TargetList>, SourceError> {
        self.check("get_lists")?;
        Ok(self.lists.clone())
    }

    async fn create_list(&self, name: &str) -> Result<TargetList, SourceError> {
        self.record(Call::CreateList(name.to_string()));
        self.check("create_list")?;
        Ok(TargetList {
            name: name.to_string(),
            slug: list_slug(name),
            trakt_id: None,
        })
    }

    async fn delete_list(&self, list_id: &str) -> Result<(), SourceError> {
        self.record(Call::DeleteList(list_id.to_string()));
        self.check("delete_list")
    }

    async fn get_list_items(&self, list_id: &str) -> Result<Vec<TargetItem>, SourceError> {
        self.record(Call::GetListItems(list_id.to_string()));
        self.check("get_list_items")?;
        self.list_items
            .get(list_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(list_id.to_string()))
    }

    async fn add_list_items(&self, list_id: &str, items: &[TargetItem]) -> Result<BatchOutcome, SourceError> {
        self.record(Call::AddListItems(list_id.to_string(), labels(items)));
        self.batch("add_list_items", items)
    }

    async fn remove_list_items(&self, list_id: &str, items: &[TargetItem]) -> Result<BatchOutcome, SourceError> {
        self.record(Call::RemoveListItems(list_id.to_string(), labels(items)));
        self.batch("remove_list_items", items)
    }

    async fn get_watchlist(&self) -> Result<Vec<TargetItem>, SourceError> {
        self.check("get_watchlist")?;
        Ok(self.watchlist.clone())
    }

    async fn add_watchlist_items(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError> {
        self.record(Call::AddWatchlist(labels(items)));
        self.batch("add_watchlist_items", items)
    }

    async fn remove_watchlist_items(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError> {
        self.record(Call::RemoveWatchlist(labels(items)));
        self.batch("remove_watchlist_items", items)
    }

    async fn get_ratings(&self) -> Result<Vec<TargetItem>, SourceError> {
        self.check("get_ratings")?;
        Ok(self.ratings.clone())
    }

    async fn add_ratings(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError> {
        self.record(Call::AddRatings(items.iter().map(|i| (i.label(), i.rating)).collect()));
        self.batch("add_ratings", items)
    }

    async fn remove_ratings(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError> {
        self.record(Call::RemoveRatings(labels(items)));
        self.batch("remove_ratings", items)
    }

    async fn get_history(&self, item: &TargetItem) -> Result<Vec<HistoryEntry>, SourceError> {
        self.record(Call::GetHistory(item.label()));
        self.check("get_history")?;
        Ok(self.history.get(&item.label()).cloned().unwrap_or_default())
    }

    async fn add_history(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError> {
        self.record(Call::AddHistory(labels(items)));
        self.batch("add_history", items)
    }

    async fn remove_history(&self, items: &[TargetItem]) -> Result<BatchOutcome, SourceError> {
        self.record(Call::RemoveHistory(labels(items)));
        self.batch("remove_history", items)
    }
}

fn movie(id: &str) -> SourceItem {
    SourceItem::new(id, TitleType::Movie).unwrap()
}

fn rated(id: &str, value: u8) -> SourceItem {
    let rating = SourceRating::new(value, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()).unwrap();
    SourceItem::rated(id, TitleType::Movie, rating).unwrap()
}

fn target(id: &str) -> TargetItem {
    TargetItem::new(
        TargetKind::Movie,
        TargetRecord {
            ids: TargetIds::from_imdb(id),
            ..TargetRecord::default()
        },
    )
}

fn strings(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

fn orchestrator(source: FakeSource, target: Arc<FakeTarget>, options: SyncOptions) -> SyncOrchestrator {
    SyncOrchestrator::new(Arc::new(source), target).with_options(options)
}

fn lists_only() -> SyncOptions {
    SyncOptions {
        watchlist: false,
        ratings: false,
        ..SyncOptions::default()
    }
}

fn ratings_only() -> SyncOptions {
    SyncOptions {
        lists: false,
        watchlist: false,
        ..SyncOptions::default()
    }
}

#[tokio::test]
async fn test_creates_missing_list_and_adds_items() {
    let source = FakeSource {
        lists: vec![(
            "ls000000001".to_string(),
            "Watched 2024".to_string(),
            vec![movie("ttA"), movie("ttB"), movie("ttC")],
        )],
        ..FakeSource::default()
    };
    let target = Arc::new(FakeTarget::default());

    let report = orchestrator(source, target.clone(), SyncOptions::default())
        .run()
        .await
        .unwrap();

    assert_eq!(
        target.mutations(),
        vec![
            Call::CreateList("Watched 2024".to_string()),
            Call::AddListItems("watched-2024".to_string(), strings(&["ttA", "ttB", "ttC"])),
        ]
    );
    assert_eq!(report.lists_created, 1);
    assert_eq!(report.items_added, 3);
    assert_eq!(report.stage, SyncStage::Done);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_existing_list_gets_add_and_remove_batches() {
    let source = FakeSource {
        lists: vec![(
            "ls000000001".to_string(),
            "Favorites".to_string(),
            vec![movie("tt1"), movie("tt2")],
        )],
        ..FakeSource::default()
    };
    let target = Arc::new(FakeTarget::default().with_list("Favorites", vec![target("tt1"), target("tt9")]));

    let report = orchestrator(source, target.clone(), lists_only()).run().await.unwrap();

    assert_eq!(
        target.mutations(),
        vec![
            Call::AddListItems("favorites".to_string(), strings(&["tt2"])),
            Call::RemoveListItems("favorites".to_string(), strings(&["tt9"])),
        ]
    );
    assert_eq!(report.lists_created, 0);
    assert_eq!(report.items_added, 1);
    assert_eq!(report.items_removed, 1);
}

#[tokio::test]
async fn test_orphan_list_is_deleted_without_item_operations() {
    let target = Arc::new(FakeTarget::default().with_list("Orphan List", vec![target("tt1")]));

    let report = orchestrator(FakeSource::default(), target.clone(), lists_only())
        .run()
        .await
        .unwrap();

    assert_eq!(target.calls(), vec![Call::DeleteList("orphan-list".to_string())]);
    assert_eq!(report.lists_deleted, 1);
}

#[tokio::test]
async fn test_missing_source_list_is_dropped_and_its_target_deleted() {
    let source = FakeSource {
        lists: vec![("ls000000001".to_string(), "Kept".to_string(), vec![movie("tt1")])],
        ..FakeSource::default()
    };
    let target = Arc::new(
        FakeTarget::default()
            .with_list("Kept", vec![target("tt1")])
            .with_list("Gone", vec![target("tt2")]),
    );
    let options = SyncOptions {
        selection: ListSelection::Ids(strings(&["ls000000001", "ls000000404"])),
        ..lists_only()
    };

    let report = orchestrator(source, target.clone(), options).run().await.unwrap();

    assert_eq!(report.skipped_lists, strings(&["ls000000404"]));
    assert_eq!(target.mutations(), vec![Call::DeleteList("gone".to_string())]);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_watchlist_sync_uses_watchlist_operations() {
    let source = FakeSource {
        watchlist: vec![movie("tt1"), movie("tt2")],
        ..FakeSource::default()
    };
    let target = Arc::new(FakeTarget {
        watchlist: vec![target("tt2"), target("tt3")],
        ..FakeTarget::default()
    });
    let options = SyncOptions {
        lists: false,
        ratings: false,
        ..SyncOptions::default()
    };

    orchestrator(source, target.clone(), options).run().await.unwrap();

    assert_eq!(
        target.mutations(),
        vec![
            Call::AddWatchlist(strings(&["tt1"])),
            Call::RemoveWatchlist(strings(&["tt3"])),
        ]
    );
}

#[tokio::test]
async fn test_new_rating_adds_history_when_missing() {
    let source = FakeSource {
        ratings: vec![rated("tt1", 9)],
        ..FakeSource::default()
    };
    let target = Arc::new(FakeTarget::default());

    let report = orchestrator(source, target.clone(), ratings_only()).run().await.unwrap();

    assert_eq!(
        target.calls(),
        vec![
            Call::AddRatings(vec![("tt1".to_string(), 9)]),
            Call::GetHistory("tt1".to_string()),
            Call::AddHistory(strings(&["tt1"])),
        ]
    );
    assert_eq!(report.ratings_added, 1);
    assert_eq!(report.history_added, 1);
}

#[tokio::test]
async fn test_new_rating_skips_history_when_already_watched() {
    let source = FakeSource {
        ratings: vec![rated("tt1", 9)],
        ..FakeSource::default()
    };
    let target = Arc::new(FakeTarget::default().watched("tt1"));

    let report = orchestrator(source, target.clone(), ratings_only()).run().await.unwrap();

    let history_adds = target
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::AddHistory(_)))
        .count();
    assert_eq!(history_adds, 0);
    assert_eq!(report.history_added, 0);
}

#[tokio::test]
async fn test_removed_rating_removes_history() {
    let target = Arc::new(FakeTarget {
        ratings: vec![target("tt1").with_rating(7, None), target("tt2").with_rating(5, None)],
        ..FakeTarget::default()
    }
    .watched("tt1"));

    let report = orchestrator(FakeSource::default(), target.clone(), ratings_only())
        .run()
        .await
        .unwrap();

    assert_eq!(
        target.calls(),
        vec![
            Call::RemoveRatings(strings(&["tt1", "tt2"])),
            Call::GetHistory("tt1".to_string()),
            Call::RemoveHistory(strings(&["tt1"])),
            Call::GetHistory("tt2".to_string()),
        ]
    );
    assert_eq!(report.ratings_removed, 2);
    assert_eq!(report.history_removed, 1);
}

#[tokio::test]
async fn test_changed_rating_value_is_updated() {
    let source = FakeSource {
        ratings: vec![rated("tt1", 8)],
        ..FakeSource::default()
    };
    let target = Arc::new(FakeTarget {
        ratings: vec![target("tt1").with_rating(6, None)],
        ..FakeTarget::default()
    });

    let report = orchestrator(source, target.clone(), ratings_only()).run().await.unwrap();

    assert_eq!(target.calls(), vec![Call::AddRatings(vec![("tt1".to_string(), 8)])]);
    assert_eq!(report.ratings_updated, 1);
    assert_eq!(report.ratings_added, 0);
}

#[tokio::test]
async fn test_missing_ratings_export_never_removes_ratings() {
    let source = FakeSource {
        ratings_missing: true,
        ..FakeSource::default()
    };
    let target = Arc::new(FakeTarget {
        ratings: vec![target("tt1").with_rating(7, None)],
        ..FakeTarget::default()
    });

    let report = orchestrator(source, target.clone(), ratings_only()).run().await.unwrap();

    assert!(target.calls().is_empty());
    assert_eq!(report.stage, SyncStage::Done);
}

#[tokio::test]
async fn test_failed_rating_batch_skips_history_checks() {
    let source = FakeSource {
        ratings: vec![rated("tt1", 9), rated("tt2", 4)],
        ..FakeSource::default()
    };
    let target = Arc::new(FakeTarget::default().failing(
        "add_ratings",
        SourceError::Rejected {
            status: 422,
            message: "invalid".to_string(),
        },
    ));

    let report = orchestrator(source, target.clone(), ratings_only()).run().await.unwrap();

    assert!(!target.calls().iter().any(|call| matches!(call, Call::GetHistory(_))));
    assert_eq!(report.ratings_added, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].scope, "add ratings");
}

#[tokio::test]
async fn test_non_fatal_failure_is_collected_and_run_continues() {
    let source = FakeSource {
        lists: vec![("ls000000001".to_string(), "Broken".to_string(), vec![movie("tt1")])],
        watchlist: vec![movie("tt5")],
        ..FakeSource::default()
    };
    let target = Arc::new(FakeTarget::default().failing(
        "add_list_items",
        SourceError::Rejected {
            status: 420,
            message: "list limit".to_string(),
        },
    ));
    let options = SyncOptions {
        ratings: false,
        ..SyncOptions::default()
    };

    let report = orchestrator(source, target.clone(), options).run().await.unwrap();

    assert_eq!(report.failures.len(), 1);
    assert!(!report.is_clean());
    assert!(target.calls().contains(&Call::AddWatchlist(strings(&["tt5"]))));
    assert_eq!(report.items_added, 1);
}

#[tokio::test]
async fn test_fatal_failure_aborts_remaining_steps() {
    let source = FakeSource {
        lists: vec![("ls000000001".to_string(), "Mine".to_string(), vec![movie("tt1")])],
        watchlist: vec![movie("tt5")],
        ..FakeSource::default()
    };
    let target = Arc::new(
        FakeTarget::default().failing("add_list_items", SourceError::Authentication("token revoked".to_string())),
    );

    let err = orchestrator(source, target.clone(), SyncOptions::default())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Aborted {
            stage: SyncStage::ItemsSynced,
            ..
        }
    ));
    assert!(!target.calls().iter().any(|call| matches!(call, Call::AddWatchlist(_))));
}

#[tokio::test]
async fn test_acquisition_failure_aborts_before_any_mutation() {
    let source = FakeSource {
        lists: vec![("ls000000001".to_string(), "New".to_string(), vec![movie("tt1")])],
        ratings: vec![rated("tt1", 9)],
        ..FakeSource::default()
    };
    let target = Arc::new(
        FakeTarget::default()
            .with_list("Orphan", Vec::new())
            .failing("get_ratings", SourceError::Network("timed out".to_string())),
    );

    let err = orchestrator(source, target.clone(), SyncOptions::default())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Acquisition { .. }));
    assert!(err.to_string().contains("target ratings"));
    assert!(target.mutations().is_empty());
}

#[tokio::test]
async fn test_dry_run_issues_no_mutations() {
    let source = FakeSource {
        lists: vec![("ls000000001".to_string(), "New".to_string(), vec![movie("tt1"), movie("tt2")])],
        watchlist: vec![movie("tt3")],
        ratings: vec![rated("tt4", 9)],
        ..FakeSource::default()
    };
    let target = Arc::new(FakeTarget::default().with_list("Orphan", Vec::new()));
    let options = SyncOptions {
        dry_run: true,
        ..SyncOptions::default()
    };

    let report = orchestrator(source, target.clone(), options).run().await.unwrap();

    assert!(target.mutations().is_empty());
    assert!(target.calls().contains(&Call::GetHistory("tt4".to_string())));
    assert!(report.dry_run);
    assert_eq!(report.lists_created, 1);
    assert_eq!(report.lists_deleted, 1);
    assert_eq!(report.items_added, 3);
    assert_eq!(report.ratings_added, 1);
    assert_eq!(report.history_added, 1);
}

#[tokio::test]
async fn test_stage_callback_sees_every_stage_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let callback: StageCallback = Arc::new(move |stage| recorder.lock().unwrap().push(stage));

    orchestrator(FakeSource::default(), Arc::new(FakeTarget::default()), SyncOptions::default())
        .with_stage_callback(callback)
        .run()
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            SyncStage::SnapshotAcquired,
            SyncStage::ListsReconciled,
            SyncStage::ItemsSynced,
            SyncStage::RatingsSynced,
            SyncStage::Done,
        ]
    );
}

#[tokio::test]
async fn test_lists_mapping_to_one_slug_keep_the_first() {
    let source = FakeSource {
        lists: vec![
            ("ls000000001".to_string(), "Best Of".to_string(), vec![movie("tt1")]),
            ("ls000000002".to_string(), "best of!".to_string(), vec![movie("tt2")]),
        ],
        ..FakeSource::default()
    };
    let target = Arc::new(FakeTarget::default());

    let report = orchestrator(source, target.clone(), lists_only()).run().await.unwrap();

    assert_eq!(report.skipped_lists, strings(&["ls000000002"]));
    assert_eq!(
        target.mutations(),
        vec![
            Call::CreateList("Best Of".to_string()),
            Call::AddListItems("best-of".to_string(), strings(&["tt1"])),
        ]
    );
}

#[tokio::test]
async fn test_existing_list_with_other_slug_is_matched_by_name() {
    let source = FakeSource {
        lists: vec![(
            "ls000000001".to_string(),
            "Sci-Fi & Fantasy".to_string(),
            vec![movie("tt1"), movie("tt2")],
        )],
        ..FakeSource::default()
    };
    let target = Arc::new(FakeTarget::default().with_list_slug("Sci-Fi & Fantasy", "sci-fi-fantasy", vec![target("tt1")]));

    let report = orchestrator(source, target.clone(), lists_only()).run().await.unwrap();

    assert_eq!(
        target.mutations(),
        vec![Call::AddListItems("sci-fi-fantasy".to_string(), strings(&["tt2"]))]
    );
    assert_eq!(report.lists_created, 0);
    assert_eq!(report.lists_deleted, 0);
}

#[tokio::test]
async fn test_list_name_without_slug_characters_is_not_recreated() {
    let source = FakeSource {
        lists: vec![("ls000000001".to_string(), "★★★".to_string(), vec![movie("tt1")])],
        ..FakeSource::default()
    };
    let target = Arc::new(FakeTarget::default().with_list_slug("★★★", "list-7", vec![target("tt1")]));

    let report = orchestrator(source, target.clone(), lists_only()).run().await.unwrap();

    assert_eq!(target.calls(), vec![Call::GetListItems("list-7".to_string())]);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_slug_match_wins_over_name_match() {
    let source = FakeSource {
        lists: vec![
            ("ls000000001".to_string(), "Horror".to_string(), vec![movie("tt1")]),
            ("ls000000002".to_string(), "Classics".to_string(), vec![movie("tt2")]),
        ],
        ..FakeSource::default()
    };
    // "classics" was renamed to "Horror" on the target; the slug still ties it to Classics
    let target = Arc::new(
        FakeTarget::default()
            .with_list_slug("Horror", "classics", vec![target("tt2")])
            .with_list("Horror", vec![target("tt1")]),
    );

    let report = orchestrator(source, target.clone(), lists_only()).run().await.unwrap();

    assert!(target.mutations().is_empty());
    assert_eq!(report.lists_created, 0);
    assert_eq!(report.lists_deleted, 0);
}

#[tokio::test]
async fn test_unmatched_list_item_is_a_failure_and_not_counted() {
    let source = FakeSource {
        lists: vec![(
            "ls000000001".to_string(),
            "Favorites".to_string(),
            vec![movie("tt1"), movie("tt404")],
        )],
        ..FakeSource::default()
    };
    let target = Arc::new(FakeTarget::default().with_list("Favorites", Vec::new()).unknown("tt404"));

    let report = orchestrator(source, target.clone(), lists_only()).run().await.unwrap();

    assert_eq!(report.items_added, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].scope, "add items to list favorites tt404");
    assert!(report.failures[0].error.is_not_found());
    assert!(!report.is_clean());
}

#[tokio::test]
async fn test_unmatched_rating_gets_no_history_entry() {
    let source = FakeSource {
        ratings: vec![rated("tt1", 9), rated("tt404", 6)],
        ..FakeSource::default()
    };
    let target = Arc::new(FakeTarget::default().unknown("tt404"));

    let report = orchestrator(source, target.clone(), ratings_only()).run().await.unwrap();

    assert_eq!(
        target.calls(),
        vec![
            Call::AddRatings(vec![("tt1".to_string(), 9), ("tt404".to_string(), 6)]),
            Call::GetHistory("tt1".to_string()),
            Call::AddHistory(strings(&["tt1"])),
        ]
    );
    assert_eq!(report.ratings_added, 1);
    assert_eq!(report.history_added, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].scope, "add rating tt404");
}

#[tokio::test]
async fn test_unmatched_watchlist_removal_is_not_counted() {
    let target = Arc::new(FakeTarget {
        watchlist: vec![target("tt1"), target("tt2")],
        ..FakeTarget::default()
    }
    .unknown("tt2"));
    let options = SyncOptions {
        lists: false,
        ratings: false,
        ..SyncOptions::default()
    };

    let report = orchestrator(FakeSource::default(), target.clone(), options).run().await.unwrap();

    assert_eq!(report.items_removed, 1);
    assert_eq!(report.failures.len(), 1);
}
