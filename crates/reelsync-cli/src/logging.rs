use anyhow::Result;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, time::ChronoUtc, writer::BoxMakeWriter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Default filter for a verbosity level. `RUST_LOG` wins when set, except in quiet mode.
pub fn filter_directive(verbose_level: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose_level {
        0 => "info",
        // -v: debug, without the HTTP connection chatter
        1 => "debug,hyper=info,reqwest=info,rustls=info",
        _ => "trace",
    }
}

fn json_requested() -> bool {
    std::env::var("REELSYNC_LOG_JSON")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or_else(|_| !io::stdout().is_terminal())
}

/// Install the global subscriber.
///
/// With a log file, output goes to a daily rotated file named after its
/// stem (`reelsync.log` becomes `reelsync.YYYY-MM-DD`). The returned guard
/// flushes the file writer and must be held until exit.
pub fn init_logging_with_file(verbose_level: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<Option<WorkerGuard>> {
    let directive = filter_directive(verbose_level, quiet);
    let filter = if quiet {
        EnvFilter::new(directive)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
    };

    let (writer, guard, ansi) = match log_file {
        Some(log_path) => {
            let log_dir = log_path
                .parent()
                .ok_or_else(|| anyhow::anyhow!("Log file path has no parent directory"))?;
            std::fs::create_dir_all(log_dir)?;
            let prefix = log_path
                .file_stem()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("Invalid log filename"))?;

            let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard), false)
        }
        None => (BoxMakeWriter::new(io::stderr), None, io::stderr().is_terminal()),
    };

    let registry = Registry::default().with(filter);
    if json_requested() {
        registry
            .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()).with_writer(writer))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .init();
    }

    Ok(guard)
}
