use serde::Serialize;

use crate::slug::list_slug;
use crate::source_item::SourceItem;
use crate::target_item::TargetItem;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum PairKind {
    /// An ordinary named list, created and deleted on the target as needed.
    List,
    /// The singleton watchlist; always exists on both sides.
    Watchlist,
    /// The singleton ratings collection; list ids are unused.
    Ratings,
}

/// One collection as seen on both services for a single run.
#[derive(Debug, Clone, Serialize)]
pub struct DataPair {
    pub source_items: Vec<SourceItem>,
    pub target_items: Vec<TargetItem>,
    pub source_list_id: String,
    pub source_list_name: String,
    pub target_list_id: String,
    pub kind: PairKind,
}

impl DataPair {
    pub fn list(source_list_id: impl Into<String>, source_list_name: impl Into<String>, source_items: Vec<SourceItem>) -> Self {
        let source_list_name = source_list_name.into();
        Self {
            target_list_id: list_slug(&source_list_name),
            source_items,
            target_items: Vec::new(),
            source_list_id: source_list_id.into(),
            source_list_name,
            kind: PairKind::List,
        }
    }

    pub fn watchlist(source_list_id: impl Into<String>, source_items: Vec<SourceItem>) -> Self {
        Self {
            source_items,
            target_items: Vec::new(),
            source_list_id: source_list_id.into(),
            source_list_name: "watchlist".to_string(),
            target_list_id: "watchlist".to_string(),
            kind: PairKind::Watchlist,
        }
    }

    pub fn ratings(source_items: Vec<SourceItem>, target_items: Vec<TargetItem>) -> Self {
        Self {
            source_items,
            target_items,
            source_list_id: String::new(),
            source_list_name: "ratings".to_string(),
            target_list_id: String::new(),
            kind: PairKind::Ratings,
        }
    }

    pub fn with_target_items(mut self, target_items: Vec<TargetItem>) -> Self {
        self.target_items = target_items;
        self
    }

    pub fn is_watchlist(&self) -> bool {
        self.kind == PairKind::Watchlist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::title_type::TitleType;

    #[test]
    fn test_list_derives_target_id() {
        let items = vec![SourceItem::new("tt0000001", TitleType::Movie).unwrap()];
        let pair = DataPair::list("ls000000001", "Watched 2024", items);
        assert_eq!(pair.target_list_id, "watched-2024");
        assert_eq!(pair.kind, PairKind::List);
        assert!(pair.target_items.is_empty());
        assert!(!pair.is_watchlist());
    }

    #[test]
    fn test_watchlist_flag() {
        let pair = DataPair::watchlist("ls000000099", Vec::new());
        assert!(pair.is_watchlist());
        assert_eq!(pair.source_list_id, "ls000000099");
    }
}
