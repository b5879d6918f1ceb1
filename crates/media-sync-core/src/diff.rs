// Diff computation between a source snapshot and a target snapshot

use media_sync_models::{DataPair, TargetItem};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Changes needed to make the target side of a pair match the source side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Difference {
    /// Source items missing on the target, converted to the target shape.
    pub add: Vec<TargetItem>,
    /// Target items with no counterpart on the source.
    pub remove: Vec<TargetItem>,
}

impl Difference {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Compute the add and remove sets for `pair`, matching on the cross-service id only.
///
/// Runs in O(n + m). Duplicate source ids are added once, in first-seen order.
/// Target items without an external id can never match and always land in `remove`.
pub fn difference(pair: &DataPair) -> Difference {
    let target_ids: HashSet<&str> = pair
        .target_items
        .iter()
        .filter_map(TargetItem::external_id)
        .collect();
    let source_ids: HashSet<&str> = pair.source_items.iter().map(|item| item.id.as_str()).collect();

    let mut seen: HashSet<&str> = HashSet::with_capacity(pair.source_items.len());
    let add: Vec<TargetItem> = pair
        .source_items
        .iter()
        .filter(|item| !target_ids.contains(item.id.as_str()))
        .filter(|item| seen.insert(item.id.as_str()))
        .map(|item| item.to_target())
        .collect();

    let remove: Vec<TargetItem> = pair
        .target_items
        .iter()
        .filter(|item| match item.external_id() {
            Some(id) => !source_ids.contains(id),
            None => true,
        })
        .cloned()
        .collect();

    debug!(
        list = %pair.source_list_name,
        source_count = pair.source_items.len(),
        target_count = pair.target_items.len(),
        add = add.len(),
        remove = remove.len(),
        "Computed difference"
    );

    Difference { add, remove }
}

/// Items rated on both sides whose values disagree, carrying the source value and date.
///
/// Independent of [`difference`]: only ids present in both snapshots are considered.
pub fn rating_updates(pair: &DataPair) -> Vec<TargetItem> {
    let target_ratings: HashMap<&str, &TargetItem> = pair
        .target_items
        .iter()
        .filter_map(|item| item.external_id().map(|id| (id, item)))
        .collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut updates = Vec::new();

    for item in &pair.source_items {
        let Some(rating) = item.rating else {
            continue;
        };
        let Some(target) = target_ratings.get(item.id.as_str()) else {
            continue;
        };
        if rating.value() == target.rating || !seen.insert(item.id.as_str()) {
            continue;
        }
        updates.push(
            (*target)
                .clone()
                .with_rating(rating.value(), Some(rating.rated_at())),
        );
    }

    debug!(
        source_count = pair.source_items.len(),
        target_count = pair.target_items.len(),
        updates = updates.len(),
        "Computed rating updates"
    );

    updates
}

#[cfg(test)]
mod tests;
