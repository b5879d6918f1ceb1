use super::*;
use chrono::NaiveDate;
use media_sync_models::{SourceItem, SourceRating, TargetIds, TargetKind, TargetRecord, TitleType};

fn source_item(id: &str) -> SourceItem {
    SourceItem::new(id, TitleType::Movie).unwrap()
}

fn rated_source(id: &str, value: u8) -> SourceItem {
    let rating = SourceRating::new(value, NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()).unwrap();
    SourceItem::rated(id, TitleType::Movie, rating).unwrap()
}

fn target_item(id: &str) -> TargetItem {
    TargetItem::new(
        TargetKind::Movie,
        TargetRecord {
            ids: TargetIds::from_imdb(id),
            ..TargetRecord::default()
        },
    )
}

fn rated_target(id: &str, value: u8) -> TargetItem {
    target_item(id).with_rating(value, None)
}

fn ids(items: &[TargetItem]) -> Vec<&str> {
    let mut ids: Vec<&str> = items.iter().filter_map(TargetItem::external_id).collect();
    ids.sort_unstable();
    ids
}

fn list_pair(source: Vec<SourceItem>, target: Vec<TargetItem>) -> DataPair {
    DataPair::list("ls000000001", "Test List", source).with_target_items(target)
}

#[test]
fn test_difference_add_and_remove() {
    let pair = list_pair(
        vec![source_item("tt001"), source_item("tt002"), source_item("tt003")],
        vec![target_item("tt002"), target_item("tt004")],
    );

    let diff = difference(&pair);

    assert_eq!(ids(&diff.add), vec!["tt001", "tt003"]);
    assert_eq!(ids(&diff.remove), vec!["tt004"]);
}

#[test]
fn test_difference_sets_are_disjoint_from_intersection() {
    let pair = list_pair(
        vec![source_item("tt001"), source_item("tt002"), source_item("tt003")],
        vec![target_item("tt002"), target_item("tt003"), target_item("tt009")],
    );

    let diff = difference(&pair);
    let add = ids(&diff.add);
    let remove = ids(&diff.remove);

    for id in ["tt002", "tt003"] {
        assert!(!add.contains(&id));
        assert!(!remove.contains(&id));
    }
    assert!(add.iter().all(|id| !remove.contains(id)));
}

#[test]
fn test_applying_difference_reproduces_source() {
    let source = vec![source_item("tt001"), source_item("tt005"), source_item("tt007")];
    let target = vec![target_item("tt001"), target_item("tt002"), target_item("tt003")];
    let pair = list_pair(source.clone(), target.clone());

    let diff = difference(&pair);
    let removed = ids(&diff.remove);
    let mut after: Vec<TargetItem> = target
        .into_iter()
        .filter(|item| !removed.contains(&item.external_id().unwrap()))
        .collect();
    after.extend(diff.add.iter().cloned());

    assert_eq!(ids(&after), vec!["tt001", "tt005", "tt007"]);

    // Second pass over the post-state finds nothing to do
    let second = difference(&list_pair(source, after));
    assert!(second.is_empty());
}

#[test]
fn test_difference_empty_source_removes_everything() {
    let pair = list_pair(Vec::new(), vec![target_item("tt001"), target_item("tt002")]);
    let diff = difference(&pair);
    assert!(diff.add.is_empty());
    assert_eq!(diff.remove.len(), 2);
}

#[test]
fn test_difference_empty_target_adds_everything() {
    let pair = list_pair(vec![source_item("tt001"), source_item("tt002")], Vec::new());
    let diff = difference(&pair);
    assert_eq!(ids(&diff.add), vec!["tt001", "tt002"]);
    assert!(diff.remove.is_empty());
}

#[test]
fn test_difference_identical_sets() {
    let pair = list_pair(vec![source_item("tt001")], vec![target_item("tt001")]);
    assert!(difference(&pair).is_empty());
}

#[test]
fn test_difference_collapses_source_duplicates() {
    let pair = list_pair(vec![source_item("tt001"), source_item("tt001")], Vec::new());
    assert_eq!(difference(&pair).add.len(), 1);
}

#[test]
fn test_difference_removes_target_items_without_external_id() {
    let mut record = TargetRecord::default();
    record.ids.trakt = Some(42);
    let orphan = TargetItem::new(TargetKind::Show, record);
    let pair = list_pair(vec![source_item("tt001")], vec![target_item("tt001"), orphan]);

    let diff = difference(&pair);
    assert!(diff.add.is_empty());
    assert_eq!(diff.remove.len(), 1);
    assert_eq!(diff.remove[0].ids().trakt, Some(42));
}

#[test]
fn test_difference_does_not_mutate_input() {
    let pair = list_pair(vec![source_item("tt001")], vec![target_item("tt002")]);
    let before = format!("{:?}", pair);
    let _ = difference(&pair);
    assert_eq!(format!("{:?}", pair), before);
}

#[test]
fn test_difference_keeps_kind_and_rating_of_source() {
    let rating = SourceRating::new(7, NaiveDate::from_ymd_opt(2021, 7, 1).unwrap()).unwrap();
    let show = SourceItem::rated("tt0944947", TitleType::TvSeries, rating).unwrap();
    let pair = DataPair::ratings(vec![show], Vec::new());

    let diff = difference(&pair);
    assert_eq!(diff.add[0].kind(), TargetKind::Show);
    assert_eq!(diff.add[0].rating, 7);
    assert_eq!(diff.add[0].rated_at, Some(rating.rated_at()));
}

#[test]
fn test_rating_updates_detects_value_change() {
    let pair = DataPair::ratings(
        vec![rated_source("tt001", 8), rated_source("tt002", 5), rated_source("tt003", 9)],
        vec![rated_target("tt001", 6), rated_target("tt002", 5), rated_target("tt004", 3)],
    );

    let updates = rating_updates(&pair);

    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].external_id(), Some("tt001"));
    assert_eq!(updates[0].rating, 8);
    assert_eq!(
        updates[0].rated_at.map(|t| t.to_rfc3339()),
        Some("2024-02-10T00:00:00+00:00".to_string())
    );
    // The update is outside both diff sets
    let diff = difference(&pair);
    assert!(!ids(&diff.add).contains(&"tt001"));
    assert!(!ids(&diff.remove).contains(&"tt001"));
}

#[test]
fn test_rating_updates_keeps_target_ids() {
    let mut target = rated_target("tt001", 4);
    if let media_sync_models::TargetMedia::Movie(record) = &mut target.media {
        record.ids.trakt = Some(7);
    }
    let pair = DataPair::ratings(vec![rated_source("tt001", 10)], vec![target]);

    let updates = rating_updates(&pair);
    assert_eq!(updates[0].ids().trakt, Some(7));
    assert_eq!(updates[0].rating, 10);
}

#[test]
fn test_rating_updates_empty_when_equal() {
    let pair = DataPair::ratings(vec![rated_source("tt001", 6)], vec![rated_target("tt001", 6)]);
    assert!(rating_updates(&pair).is_empty());
}
