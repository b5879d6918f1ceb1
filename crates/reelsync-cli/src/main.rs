use clap::{ArgAction, Parser, Subcommand};
use commands::{config, daemon, sync};
use media_sync_config::PathManager;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "reelsync")]
#[command(about = "ReelSync - Mirror your IMDb lists, watchlist and ratings to Trakt")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass
    #[command(long_about = "Make Trakt match IMDb: create and delete lists, add and remove list and watchlist items, and reconcile ratings with their watched history. Without section flags, the sections enabled in the configuration are synced.")]
    Sync {
        /// Sync custom lists
        #[arg(long, action = ArgAction::SetTrue)]
        lists: bool,

        /// Sync the watchlist
        #[arg(long, action = ArgAction::SetTrue)]
        watchlist: bool,

        /// Sync ratings and watched history
        #[arg(long, action = ArgAction::SetTrue)]
        ratings: bool,

        /// Comma-separated IMDb list ids, or 'all' (overrides configuration)
        #[arg(long, value_name = "IDS")]
        list_ids: Option<String>,

        /// Compute and report every change without applying any
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Run sync passes on a cron schedule
    #[command(long_about = "Run in the foreground and sync on the configured schedule. A sync runs at startup unless --no-startup-sync is given. Runs never overlap. Logs go to a daily rotated file in the log directory.")]
    Daemon {
        /// Six-field cron expression with seconds (e.g. '0 0 */6 * * *' for every 6 hours)
        #[arg(long, value_name = "SCHEDULE")]
        schedule: Option<String>,

        /// Skip the sync on startup
        #[arg(long, action = ArgAction::SetTrue)]
        no_startup_sync: bool,
    },
    /// View or change configuration
    #[command(long_about = "Manage the configuration file and the Trakt tokens. Running without a subcommand shows the current configuration.")]
    Config {
        #[command(subcommand)]
        cmd: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (masks secrets)
    Show {
        /// Show secrets unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },

    /// Configure IMDb session cookies and list selection
    #[command(long_about = "Store the IMDb 'at-main' and 'ubid-main' session cookies, copied from a logged-in browser, and choose which lists to sync.")]
    Imdb {
        /// Value of the at-main cookie (prompted when omitted)
        #[arg(long)]
        cookie_at_main: Option<String>,

        /// Value of the ubid-main cookie (prompted when omitted)
        #[arg(long)]
        cookie_ubid_main: Option<String>,

        /// IMDb user id (ur...), or 'scrape' to read it from the profile page
        #[arg(long)]
        user_id: Option<String>,

        /// Comma-separated list ids, or 'all'
        #[arg(long)]
        lists: Option<String>,
    },

    /// Configure Trakt (OAuth flow)
    #[command(long_about = "Configure Trakt API credentials and authorize this application. Create a Trakt API application at https://trakt.tv/oauth/applications first.")]
    Trakt {
        /// Trakt Client ID (prompted when omitted)
        #[arg(long)]
        client_id: Option<String>,

        /// Trakt Client Secret (prompted when omitted)
        #[arg(long)]
        client_secret: Option<String>,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // The daemon logs to a rotated file; everything else logs to stderr
    let log_file = match cli.command {
        Commands::Daemon { .. } => Some(PathManager::default().daemon_log_file()),
        _ => None,
    };
    let _log_guard = logging::init_logging_with_file(cli.verbose, cli.quiet, log_file)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Sync {
            lists,
            watchlist,
            ratings,
            list_ids,
            dry_run,
        } => {
            let args = sync::SyncArgs {
                lists,
                watchlist,
                ratings,
                list_ids,
                dry_run,
            };
            sync::run_sync(args, &output).await
        }
        Commands::Daemon {
            schedule,
            no_startup_sync,
        } => daemon::run_daemon(schedule, no_startup_sync, &output).await,
        Commands::Config { cmd } => {
            let cmd = cmd.unwrap_or(ConfigCommands::Show { full: false });
            config::run_config(cmd, &output).await
        }
    }
}
