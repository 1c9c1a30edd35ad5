use clap::{Args, Subcommand};
use serde_json::Value;
use std::time::Duration;

use super::utils::{check_status, print_info, print_success, CliError, CliResult};

/// Where and how to reach the admin API.
#[derive(Args, Debug, Clone)]
pub struct AdminTarget {
    /// Admin API base URL
    #[arg(long, default_value = "http://127.0.0.1:3031", env = "HOTBOARD_ADMIN_URL")]
    pub url: String,

    /// Admin token sent as `X-Admin-Token`
    #[arg(long, env = "HOTBOARD_ADMIN_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,
}

impl AdminTarget {
    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.url.trim_end_matches('/'))
    }

    fn client(&self) -> CliResult<reqwest::Client> {
        Ok(reqwest::Client::builder().timeout(Duration::from_secs(self.timeout)).build()?)
    }

    fn token(&self) -> CliResult<&str> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CliError::Auth("no admin token given (--token or HOTBOARD_ADMIN_TOKEN)".into()))
    }
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Drop every cached aggregate and both published rankings
    Flush {
        #[command(flatten)]
        target: AdminTarget,

        /// Skip the confirmation notice
        #[arg(long)]
        yes: bool,
    },

    /// Rebuild and publish both rankings now
    Rebuild {
        #[command(flatten)]
        target: AdminTarget,
    },

    /// Show cache statistics
    Stats {
        #[command(flatten)]
        target: AdminTarget,
    },
}

pub async fn handle_cache_command(command: CacheCommands) -> CliResult<()> {
    match command {
        CacheCommands::Flush { target, yes } => flush(&target, yes).await,
        CacheCommands::Rebuild { target } => rebuild(&target).await,
        CacheCommands::Stats { target } => stats(&target).await,
    }
}

async fn admin_call(target: &AdminTarget, method: reqwest::Method, path: &str) -> CliResult<Value> {
    let response = target
        .client()?
        .request(method, target.endpoint(path))
        .header("X-Admin-Token", target.token()?)
        .send()
        .await?;
    Ok(check_status(response).await?.json().await?)
}

async fn flush(target: &AdminTarget, yes: bool) -> CliResult<()> {
    if !yes {
        print_info("Flushing drops both rankings; the next gallery read rebuilds them from the store.");
    }
    let body = admin_call(target, reqwest::Method::POST, "/admin/cache/flush").await?;
    print_success(&format!(
        "Cache flushed ({} backend)",
        body.get("backend").and_then(Value::as_str).unwrap_or("unknown")
    ));
    Ok(())
}

async fn rebuild(target: &AdminTarget) -> CliResult<()> {
    let body = admin_call(target, reqwest::Method::POST, "/admin/cache/rebuild").await?;
    print_success(&format!(
        "Rankings rebuilt from {} candidates",
        body.get("candidates").and_then(Value::as_u64).unwrap_or(0)
    ));
    println!("  hot:        {}", format_ids(body.get("hot")));
    println!("  most_voted: {}", format_ids(body.get("most_voted")));
    Ok(())
}

async fn stats(target: &AdminTarget) -> CliResult<()> {
    let body = admin_call(target, reqwest::Method::GET, "/admin/cache/stats").await?;
    println!("Rank cache ({})", body.get("backend").and_then(Value::as_str).unwrap_or("unknown"));
    for field in [
        "aggregate_entries",
        "hot_list_len",
        "hot_list_version",
        "most_voted_list_len",
        "most_voted_list_version",
        "hits",
        "misses",
    ] {
        println!("  {field}: {}", body.get(field).unwrap_or(&Value::Null));
    }
    if let Some(rate) = body.get("hit_rate").and_then(Value::as_f64) {
        println!("  hit_rate: {rate:.1}%");
    }
    Ok(())
}

fn format_ids(ids: Option<&Value>) -> String {
    ids.and_then(Value::as_array)
        .map(|ids| ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "(empty)".to_string())
}
