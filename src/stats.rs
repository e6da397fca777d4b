use reqwest::Method;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::client::{ApiClient, AuthRejected};
use crate::player::PlayReport;

/// Balances as reported by the profile endpoint. Snapshots are immutable;
/// a run compares an initial and a final instance instead of mutating one.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountStats {
    #[serde(default)]
    pub username: String,
    #[serde(rename = "overPoints", default)]
    pub over_points: i64,
    #[serde(default)]
    pub coins: i64,
    #[serde(default)]
    pub tickets: i64,
}

#[derive(Debug, PartialEq, Eq)]
pub struct StatsDelta {
    pub points: i64,
    pub coins: i64,
    pub tickets: i64,
}

impl AccountStats {
    pub fn delta_from(&self, initial: &AccountStats) -> StatsDelta {
        StatsDelta {
            points: self.over_points - initial.over_points,
            coins: self.coins - initial.coins,
            tickets: self.tickets - initial.tickets,
        }
    }
}

/// Fetches a fresh stats snapshot. Anything other than a parseable 200 body
/// comes back as `None`; the caller decides whether that is fatal.
pub fn fetch_stats(client: &ApiClient) -> Result<Option<AccountStats>, AuthRejected> {
    info!("fetching account stats");
    let response = client.execute(Method::GET, &client.endpoints().profile, None)?;

    match response {
        Some(resp) if resp.status == 200 => match serde_json::from_str::<AccountStats>(&resp.body)
        {
            Ok(stats) => {
                info!(
                    "stats updated: {} points, {} coins, {} tickets",
                    stats.over_points, stats.coins, stats.tickets
                );
                Ok(Some(stats))
            }
            Err(err) => {
                error!(%err, "failed to parse account stats from server response");
                Ok(None)
            }
        },
        Some(resp) => {
            error!(status = resp.status, body = %resp.body, "could not fetch account stats");
            Ok(None)
        }
        None => {
            error!("could not fetch account stats");
            Ok(None)
        }
    }
}

pub fn print_summary(initial: &AccountStats, final_stats: Option<&AccountStats>, report: &PlayReport) {
    println!("\n================== Run Summary ==================");

    let Some(final_stats) = final_stats else {
        warn!("final stats unavailable, the summary deltas are incomplete");
        println!("Played {} game(s), skipped {}.", report.played, report.skipped);
        println!("=================================================");
        return;
    };

    let delta = final_stats.delta_from(initial);
    println!("            {:<10} {:<10} {:<10}", "Initial", "Final", "Gained");
    println!("{}", "-".repeat(49));
    println!(
        "Points:     {:<10} {:<10} {:+}",
        initial.over_points, final_stats.over_points, delta.points
    );
    println!(
        "Coins:      {:<10} {:<10} {:+}",
        initial.coins, final_stats.coins, delta.coins
    );
    println!(
        "Tickets:    {:<10} {:<10} {:+}",
        initial.tickets, final_stats.tickets, delta.tickets
    );
    println!("Played {} game(s), skipped {}.", report.played, report.skipped);
    println!("=================================================");
}
