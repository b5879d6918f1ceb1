use indicatif::{ProgressBar, ProgressStyle};
use media_sync_core::{StageCallback, SyncStage};
use std::io::IsTerminal;
use std::sync::Arc;

/// Stage progress for an interactive `sync`. Without a terminal, stage
/// transitions are only logged.
pub struct SyncUI {
    bar: Option<ProgressBar>,
}

impl SyncUI {
    pub fn new(enabled: bool) -> Self {
        if !(enabled && is_interactive()) {
            tracing::debug!(operation = "ui_init", mode = "non_interactive", "Progress bar disabled");
            return Self { bar: None };
        }

        let bar = ProgressBar::new(SyncStage::Done.ordinal());
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);
        bar.set_message("Reading IMDb and Trakt...");
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        Self { bar: Some(bar) }
    }

    pub fn stage_callback(&self) -> StageCallback {
        let bar = self.bar.clone();
        Arc::new(move |stage: SyncStage| {
            tracing::info!(operation = "progress", stage = %stage, "Sync stage reached");
            if let Some(bar) = &bar {
                bar.set_position(stage.ordinal());
                bar.set_message(stage_message(stage));
            }
        })
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

fn stage_message(stage: SyncStage) -> &'static str {
    match stage {
        SyncStage::Init => "Reading IMDb and Trakt...",
        SyncStage::SnapshotAcquired => "Reconciling lists...",
        SyncStage::ListsReconciled => "Syncing list items...",
        SyncStage::ItemsSynced => "Syncing ratings and history...",
        SyncStage::RatingsSynced => "Finishing...",
        SyncStage::Done => "Done",
    }
}

pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}
