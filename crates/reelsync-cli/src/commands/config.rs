use super::prompts::{prompt_secret, prompt_string, prompt_yes_no};
use crate::output::{mask_string, Output};
use crate::ConfigCommands;
use color_eyre::eyre::{eyre, Context};
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color, Table};
use media_sync_config::{Config, CredentialStore, ListSelection, PathManager};
use media_sync_sources::trakt::{authorization_url, create_trakt_client, exchange_code};
use owo_colors::OwoColorize;
use serde_json::json;

/// Load the config file (or defaults), overlay the environment and check that
/// every required value is present.
pub fn load_config(paths: &PathManager) -> Result<Config> {
    let config_file = paths.config_file();
    let mut config = Config::load_or_default(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    config.apply_process_env();
    config
        .validate()
        .map_err(|e| eyre!("{} (set them in {} or the environment)", e, config_file.display()))?;
    Ok(config)
}

pub fn load_credentials(paths: &PathManager) -> Result<CredentialStore> {
    let credentials_file = paths.credentials_file();
    let mut store = CredentialStore::new(credentials_file.clone());
    store
        .load()
        .map_err(|e| eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;
    Ok(store)
}

fn load_file_config(paths: &PathManager) -> Result<Config> {
    let config_file = paths.config_file();
    Config::load_or_default(&config_file).map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))
}

pub async fn run_config(cmd: ConfigCommands, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    paths
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create configuration directories: {}", e))?;

    match cmd {
        ConfigCommands::Show { full } => show_config(&paths, full, output),
        ConfigCommands::Imdb {
            cookie_at_main,
            cookie_ubid_main,
            user_id,
            lists,
        } => configure_imdb(&paths, cookie_at_main, cookie_ubid_main, user_id, lists, output),
        ConfigCommands::Trakt {
            client_id,
            client_secret,
        } => configure_trakt(&paths, client_id, client_secret, output).await,
    }
}

fn show_config(paths: &PathManager, full: bool, output: &Output) -> Result<()> {
    let config_file = paths.config_file();
    let mut config = load_file_config(paths)?;
    config.apply_process_env();
    let credentials = load_credentials(paths)?;

    let secret = |value: &str| if full { value.to_string() } else { mask_string(value) };
    let trakt_token = credentials.get_trakt_access_token().is_some();
    let token_expires = credentials.get_trakt_token_expires().map(|at| at.to_rfc3339());
    let schedule = config.scheduler.clone().unwrap_or_else(media_sync_config::default_scheduler_config);

    if !output.is_human() {
        output.json(&json!({
            "config_file": config_file.display().to_string(),
            "imdb": {
                "cookie_at_main": secret(&config.imdb.cookie_at_main),
                "cookie_ubid_main": secret(&config.imdb.cookie_ubid_main),
                "user_id": config.imdb.user_id,
                "lists": config.imdb.lists.to_string(),
            },
            "trakt": {
                "client_id": secret(&config.trakt.client_id),
                "client_secret": secret(&config.trakt.client_secret),
                "authorized": trakt_token,
                "token_expires": token_expires,
            },
            "sync": {
                "lists": config.sync.lists,
                "watchlist": config.sync.watchlist,
                "ratings": config.sync.ratings,
                "concurrency": config.sync.concurrency,
            },
            "scheduler": {
                "schedule": schedule.schedule,
                "run_on_startup": schedule.run_on_startup,
            },
            "valid": config.validate().is_ok(),
        }));
        return Ok(());
    }

    let flag = |on: bool| if on { "✓".green().to_string() } else { "✗".red().to_string() };

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table.set_header(vec![
        Cell::new("Setting").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![Cell::new("Config File"), Cell::new(config_file.display().to_string())]);
    table.add_row(vec![Cell::new("IMDb").fg(Color::Cyan), Cell::new("")]);
    table.add_row(vec![Cell::new("  at-main cookie"), Cell::new(secret(&config.imdb.cookie_at_main))]);
    table.add_row(vec![Cell::new("  ubid-main cookie"), Cell::new(secret(&config.imdb.cookie_ubid_main))]);
    table.add_row(vec![Cell::new("  User ID"), Cell::new(&config.imdb.user_id)]);
    table.add_row(vec![Cell::new("  Lists"), Cell::new(config.imdb.lists.to_string())]);
    table.add_row(vec![Cell::new("Trakt").fg(Color::Cyan), Cell::new("")]);
    table.add_row(vec![Cell::new("  Client ID"), Cell::new(secret(&config.trakt.client_id))]);
    table.add_row(vec![Cell::new("  Client Secret"), Cell::new(secret(&config.trakt.client_secret))]);
    table.add_row(vec![Cell::new("  Authorized"), Cell::new(flag(trakt_token))]);
    if let Some(expires) = &token_expires {
        table.add_row(vec![Cell::new("  Token Expires"), Cell::new(expires)]);
    }
    table.add_row(vec![Cell::new("Sync").fg(Color::Cyan), Cell::new("")]);
    table.add_row(vec![Cell::new("  Lists"), Cell::new(flag(config.sync.lists))]);
    table.add_row(vec![Cell::new("  Watchlist"), Cell::new(flag(config.sync.watchlist))]);
    table.add_row(vec![Cell::new("  Ratings"), Cell::new(flag(config.sync.ratings))]);
    table.add_row(vec![Cell::new("  Concurrency"), Cell::new(config.sync.concurrency)]);
    table.add_row(vec![Cell::new("Scheduler").fg(Color::Cyan), Cell::new("")]);
    table.add_row(vec![Cell::new("  Schedule"), Cell::new(&schedule.schedule)]);
    table.add_row(vec![Cell::new("  Run On Startup"), Cell::new(flag(schedule.run_on_startup))]);
    println!("{}", table);

    if let Err(e) = config.validate() {
        output.warn(format!("Configuration is incomplete: {}", e));
    }
    Ok(())
}

fn configure_imdb(
    paths: &PathManager,
    cookie_at_main: Option<String>,
    cookie_ubid_main: Option<String>,
    user_id: Option<String>,
    lists: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut config = load_file_config(paths)?;
    let interactive = cookie_at_main.is_none() || cookie_ubid_main.is_none();

    if interactive {
        output.info("Copy the 'at-main' and 'ubid-main' cookies from a browser logged in to imdb.com.");
        output.info("Press Enter to keep a value that is already set.");
    }

    config.imdb.cookie_at_main = match cookie_at_main {
        Some(value) => value.trim().to_string(),
        None => prompt_secret("at-main cookie", &config.imdb.cookie_at_main)?,
    };
    config.imdb.cookie_ubid_main = match cookie_ubid_main {
        Some(value) => value.trim().to_string(),
        None => prompt_secret("ubid-main cookie", &config.imdb.cookie_ubid_main)?,
    };

    config.imdb.user_id = match user_id {
        Some(value) => value.trim().to_string(),
        None if interactive => prompt_string("IMDb user id (ur..., or 'scrape')", Some(&config.imdb.user_id))?,
        None => config.imdb.user_id.clone(),
    };
    if config.imdb.user_id.is_empty() {
        config.imdb.user_id = "scrape".to_string();
    }

    let lists = match lists {
        Some(value) => Some(value),
        None if interactive => {
            let current = config.imdb.lists.to_string();
            Some(prompt_string("Lists to sync (comma-separated ids, or 'all')", Some(&current))?)
        }
        None => None,
    };
    if let Some(value) = lists {
        // FromStr for ListSelection is infallible
        config.imdb.lists = value.parse::<ListSelection>().unwrap_or_default();
    }

    if config.imdb.cookie_at_main.is_empty() || config.imdb.cookie_ubid_main.is_empty() {
        return Err(eyre!("Both IMDb cookies are required"));
    }

    let config_file = paths.config_file();
    config
        .save_to_file(&config_file)
        .map_err(|e| eyre!("Failed to save config to {}: {}", config_file.display(), e))?;
    output.success(format!("IMDb configuration saved to {}", config_file.display()));
    Ok(())
}

async fn configure_trakt(
    paths: &PathManager,
    client_id: Option<String>,
    client_secret: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut config = load_file_config(paths)?;

    config.trakt.client_id = match client_id {
        Some(value) => value.trim().to_string(),
        None => {
            let current = config.trakt.client_id.clone();
            prompt_string("Trakt Client ID", Some(current.as_str()).filter(|v| !v.is_empty()))?
        }
    };
    config.trakt.client_secret = match client_secret {
        Some(value) => value.trim().to_string(),
        None => prompt_secret("Trakt Client Secret", &config.trakt.client_secret)?,
    };
    if !config.is_trakt_configured() {
        return Err(eyre!("Both the Trakt client id and client secret are required"));
    }

    let config_file = paths.config_file();
    config
        .save_to_file(&config_file)
        .map_err(|e| eyre!("Failed to save config to {}: {}", config_file.display(), e))?;
    output.success(format!("Trakt credentials saved to {}", config_file.display()));

    let mut credentials = load_credentials(paths)?;
    if credentials.get_trakt_access_token().is_some() && !prompt_yes_no("Trakt is already authorized. Authorize again?", Some(false))? {
        return Ok(());
    }

    output.info("Open this URL, approve access and paste the code Trakt shows you:");
    output.info(authorization_url(&config.trakt.client_id));
    let code = prompt_string("Authorization code", None)?;

    let client = create_trakt_client()?;
    let token = exchange_code(&client, &config.trakt.client_id, &config.trakt.client_secret, &code)
        .await
        .wrap_err("Trakt authorization failed")?;

    credentials.set_trakt_access_token(token.access_token);
    credentials.set_trakt_refresh_token(token.refresh_token);
    credentials.set_trakt_token_expires(token.expires_at);
    credentials
        .save()
        .map_err(|e| eyre!("Failed to save credentials to {}: {}", paths.credentials_file().display(), e))?;

    tracing::info!(operation = "trakt_authorized", expires_at = %token.expires_at, "Trakt tokens saved");
    output.success("Trakt authorized");
    Ok(())
}
