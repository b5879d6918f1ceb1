use super::config::load_config;
use super::sync::{run_pass, sync_options, SyncArgs};
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_sync_config::{Config, PathManager, SchedulerConfig};
use media_sync_core::SyncOptions;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

struct DaemonState {
    config: Config,
    options: SyncOptions,
    paths: PathManager,
    // Held for the duration of a pass so scheduled runs never overlap
    running: Mutex<()>,
}

/// Effective schedule: the command line wins over the config file.
pub fn scheduler_config(config: &Config, schedule_override: Option<String>, no_startup_sync: bool) -> SchedulerConfig {
    let from_file = config
        .scheduler
        .clone()
        .unwrap_or_else(media_sync_config::default_scheduler_config);

    SchedulerConfig {
        schedule: schedule_override
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(from_file.schedule),
        run_on_startup: from_file.run_on_startup && !no_startup_sync,
    }
}

async fn run_scheduled(state: Arc<DaemonState>, trigger: &'static str) {
    let Ok(_guard) = state.running.try_lock() else {
        warn!(operation = "scheduled_sync_skipped", trigger, "Previous sync still running, skipping this one");
        return;
    };

    info!(operation = "scheduled_sync_start", trigger, "Starting sync");
    match run_pass(&state.config, state.options.clone(), &state.paths, None).await {
        Ok(report) => {
            for failure in &report.failures {
                warn!(operation = "scheduled_sync_failure", scope = %failure.scope, error = %failure.error, "Change failed");
            }
            info!(
                operation = "scheduled_sync_complete",
                trigger,
                changes = report.total_changes(),
                failures = report.failures.len(),
                skipped_lists = report.skipped_lists.len(),
                duration_ms = report.duration.as_millis() as u64,
                "Sync completed"
            );
        }
        Err(e) => {
            error!(operation = "scheduled_sync_error", trigger, error = %e, "Sync failed");
        }
    }
}

pub async fn run_daemon(schedule_override: Option<String>, no_startup_sync: bool, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    let config = load_config(&paths)?;
    let scheduler_config = scheduler_config(&config, schedule_override, no_startup_sync);
    let options = sync_options(&config, &SyncArgs::default());

    let state = Arc::new(DaemonState {
        config,
        options,
        paths,
        running: Mutex::new(()),
    });

    let job_state = state.clone();
    let job = Job::new_async(scheduler_config.schedule.as_str(), move |_uuid, _lock| {
        let state = job_state.clone();
        Box::pin(async move {
            run_scheduled(state, "schedule").await;
        })
    })
    .map_err(|e| eyre!("Invalid schedule '{}': {:?}", scheduler_config.schedule, e))?;

    let mut scheduler = JobScheduler::new()
        .await
        .map_err(|e| eyre!("Failed to create scheduler: {:?}", e))?;
    scheduler
        .add(job)
        .await
        .map_err(|e| eyre!("Failed to schedule sync: {:?}", e))?;

    info!(
        operation = "daemon_start",
        schedule = %scheduler_config.schedule,
        run_on_startup = scheduler_config.run_on_startup,
        log_dir = %state.paths.log_dir().display(),
        "Daemon started"
    );
    output.info(format!(
        "Daemon running on schedule '{}'. Logs: {}",
        scheduler_config.schedule,
        state.paths.log_dir().display()
    ));

    if scheduler_config.run_on_startup {
        run_scheduled(state.clone(), "startup").await;
    }

    scheduler
        .start()
        .await
        .map_err(|e| eyre!("Failed to start scheduler: {:?}", e))?;

    tokio::signal::ctrl_c().await?;
    info!(operation = "daemon_stop", "Shutdown requested");

    // Let a pass that is already running finish
    let _guard = state.running.lock().await;
    scheduler
        .shutdown()
        .await
        .map_err(|e| eyre!("Failed to stop scheduler: {:?}", e))?;

    output.success("Daemon stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_defaults() {
        let config = scheduler_config(&Config::default(), None, false);
        assert_eq!(config.schedule, "0 0 */6 * * *");
        assert!(config.run_on_startup);
    }

    #[test]
    fn test_command_line_overrides() {
        let mut file = Config::default();
        file.scheduler = Some(SchedulerConfig {
            schedule: "0 30 2 * * *".to_string(),
            run_on_startup: true,
        });

        let config = scheduler_config(&file, Some("0 0 * * * *".to_string()), true);
        assert_eq!(config.schedule, "0 0 * * * *");
        assert!(!config.run_on_startup);

        let config = scheduler_config(&file, Some("  ".to_string()), false);
        assert_eq!(config.schedule, "0 30 2 * * *");
    }
}
