use hotboard_core::types::{RankedResponse, RankingKind};
use prettytable::{row, Table};
use std::time::Duration;

use super::utils::{check_status, print_info, CliResult};

pub struct TopOptions {
    pub url: String,
    pub limit: usize,
    pub ranking: RankingKind,
}

pub async fn handle_top_command(options: TopOptions) -> CliResult<()> {
    let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
    let url = format!("{}/gallery/top", options.url.trim_end_matches('/'));
    let response = client
        .get(url)
        .query(&[("limit", options.limit.to_string()), ("ranking", options.ranking.to_string())])
        .send()
        .await?;
    let rows: Vec<RankedResponse> = check_status(response).await?.json().await?;

    if rows.is_empty() {
        print_info("No ranked responses yet");
        return Ok(());
    }
    println!("Top {} ({})", rows.len(), options.ranking);
    render_table(&rows).printstd();
    Ok(())
}

fn render_table(rows: &[RankedResponse]) -> Table {
    let mut table = Table::new();
    table.add_row(row!["#", "Response", "Score", "Votes", "Hot"]);
    for (rank, entry) in rows.iter().enumerate() {
        table.add_row(row![
            rank + 1,
            entry.response_id,
            entry.score,
            entry.votes_count,
            format!("{:.4}", entry.hot_score)
        ]);
    }
    table
}
