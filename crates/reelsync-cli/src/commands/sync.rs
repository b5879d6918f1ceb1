use super::config::{load_config, load_credentials};
use super::sync_ui::SyncUI;
use crate::output::Output;
use color_eyre::eyre::{eyre, Context};
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color, Table};
use media_sync_config::{Config, ListSelection, PathManager};
use media_sync_core::{StageCallback, SyncOptions, SyncOrchestrator, SyncReport};
use media_sync_sources::{ImdbClient, SourceProvider, TargetProvider, TraktClient};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct SyncArgs {
    pub lists: bool,
    pub watchlist: bool,
    pub ratings: bool,
    pub list_ids: Option<String>,
    pub dry_run: bool,
}

/// Section flags select exactly those sections; without any, the
/// configured sections run. `--list-ids` replaces the configured selection.
pub fn sync_options(config: &Config, args: &SyncArgs) -> SyncOptions {
    let any_flags_set = args.lists || args.watchlist || args.ratings;
    let selection = match &args.list_ids {
        Some(ids) => ids.parse::<ListSelection>().unwrap_or_default(),
        None => config.imdb.lists.clone(),
    };

    SyncOptions {
        selection,
        lists: if any_flags_set { args.lists } else { config.sync.lists },
        watchlist: if any_flags_set { args.watchlist } else { config.sync.watchlist },
        ratings: if any_flags_set { args.ratings } else { config.sync.ratings },
        dry_run: args.dry_run,
        concurrency: config.sync.concurrency.max(1),
    }
}

/// Connect both providers. Refreshed Trakt tokens are saved before returning.
pub async fn connect_providers(
    config: &Config,
    paths: &PathManager,
) -> Result<(Arc<dyn SourceProvider>, Arc<dyn TargetProvider>)> {
    let imdb = ImdbClient::connect(&config.imdb).await.wrap_err("Failed to connect to IMDb")?;

    let mut credentials = load_credentials(paths)?;
    let trakt = TraktClient::connect(&config.trakt, &mut credentials)
        .await
        .wrap_err("Failed to connect to Trakt")?;

    let source: Arc<dyn SourceProvider> = Arc::new(imdb);
    let target: Arc<dyn TargetProvider> = Arc::new(trakt);
    Ok((source, target))
}

/// One full pass: connect, reconcile, report. Shared by `sync` and the daemon.
pub async fn run_pass(
    config: &Config,
    options: SyncOptions,
    paths: &PathManager,
    on_stage: Option<StageCallback>,
) -> Result<SyncReport> {
    let (source, target) = connect_providers(config, paths).await?;

    let mut orchestrator = SyncOrchestrator::new(source, target).with_options(options);
    if let Some(callback) = on_stage {
        orchestrator = orchestrator.with_stage_callback(callback);
    }

    orchestrator.run().await.map_err(|e| eyre!(e))
}

pub async fn run_sync(args: SyncArgs, output: &Output) -> Result<()> {
    tracing::debug!("Sync command started");

    let paths = PathManager::default();
    let config = load_config(&paths)?;
    let options = sync_options(&config, &args);

    if options.dry_run {
        output.warn("Dry run: changes are computed and reported but not applied");
    }

    let ui = SyncUI::new(output.is_human());
    let result = run_pass(&config, options, &paths, Some(ui.stage_callback())).await;
    ui.finish();

    let report = result?;
    render_report(&report, output);

    if report.is_clean() {
        Ok(())
    } else {
        Err(eyre!("Sync finished with {} failure(s)", report.failures.len()))
    }
}

pub fn render_report(report: &SyncReport, output: &Output) {
    if !output.is_human() {
        match serde_json::to_value(report) {
            Ok(value) => output.json(&value),
            Err(e) => output.error(format!("Failed to serialize sync report: {}", e)),
        }
        return;
    }

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table.set_header(vec![
        Cell::new("Change").add_attribute(Attribute::Bold),
        Cell::new(if report.dry_run { "Would apply" } else { "Applied" }).add_attribute(Attribute::Bold),
    ]);
    let rows = [
        ("Lists created", report.lists_created),
        ("Lists deleted", report.lists_deleted),
        ("Items added", report.items_added),
        ("Items removed", report.items_removed),
        ("Ratings added", report.ratings_added),
        ("Ratings updated", report.ratings_updated),
        ("Ratings removed", report.ratings_removed),
        ("History added", report.history_added),
        ("History removed", report.history_removed),
    ];
    for (label, count) in rows {
        let cell = Cell::new(count);
        table.add_row(vec![Cell::new(label), if count > 0 { cell.fg(Color::Green) } else { cell }]);
    }
    println!("{}", table);

    for list in &report.skipped_lists {
        output.warn(format!("Skipped list {}", list));
    }
    for failure in &report.failures {
        output.error(format!("{}: {}", failure.scope, failure.error));
    }

    let summary = format!(
        "{} {} change(s) in {:.1}s",
        if report.dry_run { "Found" } else { "Applied" },
        report.total_changes(),
        report.duration.as_secs_f64()
    );
    if report.is_clean() {
        output.success(summary);
    } else {
        output.warn(summary);
    }
}
