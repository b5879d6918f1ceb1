pub mod diff;
pub mod sync;

pub use diff::{difference, rating_updates, Difference};
pub use sync::{StageCallback, SyncError, SyncFailure, SyncOptions, SyncOrchestrator, SyncReport, SyncStage};
