pub mod error;
pub mod imdb;
pub mod retry;
pub mod traits;
pub mod trakt;

pub use error::SourceError;
pub use imdb::ImdbClient;
pub use retry::RetryPolicy;
pub use traits::{BatchOutcome, HistoryEntry, SourceProvider, TargetProvider};
pub use trakt::TraktClient;
