pub mod data_pair;
pub mod error;
pub mod slug;
pub mod source_item;
pub mod target_item;
pub mod title_type;

pub use data_pair::{DataPair, PairKind};
pub use error::ModelError;
pub use slug::list_slug;
pub use source_item::{SourceItem, SourceRating};
pub use target_item::{TargetIds, TargetItem, TargetKind, TargetList, TargetMedia, TargetRecord};
pub use title_type::TitleType;
