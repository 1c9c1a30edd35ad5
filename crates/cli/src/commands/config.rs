use clap::Subcommand;
use hotboard_core::{config::AppConfig, runtime::HotboardRuntime};
use std::path::Path;

use super::utils::{print_error, print_info, print_success, CliError, CliResult};

const REDACTED: &str = "[hidden - use --show-sensitive to reveal]";

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to config file
        #[arg(short, long, default_value = "config/config.toml")]
        file: String,
    },

    /// Show the effective configuration (file plus HOTBOARD__* overrides)
    Show {
        /// Path to config file
        #[arg(short, long, default_value = "config/config.toml")]
        file: String,

        /// Show the admin token and connection URLs
        #[arg(long)]
        show_sensitive: bool,
    },

    /// Generate a sample configuration file
    Generate {
        /// Output path for the config file
        #[arg(short, long, default_value = "config/config.toml")]
        output: String,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Connect to the configured score store and rank cache
    CheckBackends {
        /// Path to config file
        #[arg(short, long, default_value = "config/config.toml")]
        file: String,
    },
}

pub async fn handle_config_command(command: ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Validate { file } => validate_config(&file),
        ConfigCommands::Show { file, show_sensitive } => show_config(&file, show_sensitive),
        ConfigCommands::Generate { output, force } => generate_config(&output, force),
        ConfigCommands::CheckBackends { file } => check_backends(&file).await,
    }
}

fn load(file: &str) -> CliResult<AppConfig> {
    AppConfig::from_file(file).map_err(|e| CliError::Config(e.to_string()))
}

fn validate_config(file: &str) -> CliResult<()> {
    if !Path::new(file).exists() {
        print_error(&format!("Configuration file not found: {file}"));
        return Err(CliError::Config(format!("File not found: {file}")));
    }

    print_info(&format!("Loading configuration from {file}..."));
    let config = load(file)?;

    print_info("Validating configuration...");
    config.validate().map_err(CliError::Config)?;

    print_success("Configuration is valid!");

    println!("Configuration Summary:");
    println!("  Server: {}:{}", config.server.bind_address, config.server.bind_port);
    println!("  Cache backend: {:?}", config.cache.backend);
    println!("  Ranking: top {} ({} by default)", config.ranking.top_n, config.ranking.default_kind);
    println!(
        "  Admin API: {}",
        match (config.admin.enabled, config.admin.admin_token().is_some()) {
            (false, _) => "disabled",
            (true, false) => "enabled, no token (all requests refused)",
            (true, true) => "enabled",
        }
    );

    Ok(())
}

/// The configuration with secrets masked unless `show_sensitive` is set.
fn redacted(mut config: AppConfig, show_sensitive: bool) -> AppConfig {
    if !show_sensitive {
        if config.admin.token.is_some() {
            config.admin.token = Some(REDACTED.to_string());
        }
        if config.cache.redis_url.is_some() {
            config.cache.redis_url = Some(REDACTED.to_string());
        }
        config.store.database_url = REDACTED.to_string();
    }
    config
}

fn show_config(file: &str, show_sensitive: bool) -> CliResult<()> {
    let config = redacted(load(file)?, show_sensitive);
    println!("# Effective configuration from {file}");
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# Hotboard configuration
# Every key is optional; environment variables HOTBOARD__SECTION__KEY override it.

[server]
bind_address = "127.0.0.1"
bind_port = 3030
request_timeout_seconds = 30

[store]
database_url = "sqlite://./db/hotboard.db"
max_connections = 5
timeout_ms = 2000

[cache]
backend = "memory"            # or "redis"
# redis_url = "redis://127.0.0.1:6379"
key_prefix = "hotboard"
max_list_len = 100
timeout_ms = 500

[ranking]
top_n = 10
default_kind = "hot"          # or "most_voted"

[scoring]
gravity = 1.8
age_offset_hours = 2.0
age_anchor = "response_created"

[refresher]
debounce_ms = 250
rebuild_interval_seconds = 60
max_concurrent_refreshes = 16
queue_capacity = 1024

[notifications]
send_timeout_ms = 1000
channel_capacity = 64
notify_authors = true
broadcast_rankings = true

[admin]
enabled = true
bind_address = "127.0.0.1"
port = 3031
# token = "change-me"         # without a token every admin request is refused

[logging]
level = "info"
format = "pretty"

[metrics]
enabled = true
"#;

fn generate_config(output: &str, force: bool) -> CliResult<()> {
    if Path::new(output).exists() && !force {
        return Err(CliError::Config(format!(
            "File {output} already exists. Use --force to overwrite."
        )));
    }

    if let Some(parent) = Path::new(output).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, SAMPLE_CONFIG)?;

    print_success(&format!("Sample configuration generated: {output}"));
    print_info("Set admin.token before exposing the admin API");
    Ok(())
}

async fn check_backends(file: &str) -> CliResult<()> {
    let config = load(file)?;
    print_info(&format!("Connecting to {:?} cache and score store...", config.cache.backend));

    let runtime = HotboardRuntime::builder()
        .with_config(config)
        .without_workers()
        .build()
        .await
        .map_err(|e| CliError::General(e.to_string()))?;
    let components = runtime.components().clone();

    let candidates = components.store.list_candidate_responses().await;
    let stats = components.cache.stats().await;
    runtime.shutdown().await;

    match candidates {
        Ok(ids) => print_success(&format!("Score store reachable ({} responses)", ids.len())),
        Err(e) => print_error(&format!("Score store: {e}")),
    }
    match stats {
        Ok(stats) => print_success(&format!(
            "Rank cache reachable ({}, {} aggregates)",
            stats.backend, stats.aggregate_entries
        )),
        Err(e) => print_error(&format!("Rank cache: {e}")),
    }
    Ok(())
}
