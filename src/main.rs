use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{anyhow, Result};
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod client;
mod config;
mod notify;
mod player;
mod recover;
mod stats;
#[cfg(test)]
mod testutil;

use client::{ApiClient, AuthRejected, Sleeper, SystemSleeper};
use notify::Notifier;

fn main() {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = ctrlc::set_handler(|| {
        println!("\nInterrupted by user. Shutting down gracefully...");
        process::exit(0);
    }) {
        error!(%err, "could not install the interrupt handler");
    }

    if let Err(err) = run() {
        error!("{err:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let config_path = PathBuf::from(
        std::env::var("OVERNADS_CONFIG").unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_owned()),
    );
    let config = config::load(&config_path)?;

    let notifier = Notifier::new(
        config.telegram_bot_token.clone(),
        config.telegram_chat_id.clone(),
    );
    let client = ApiClient::new(&config)?;
    let sleeper = SystemSleeper;

    info!("--- Overnads game bot started ---");
    notifier.send("🤖 *Overnads bot started*");

    let fatal_auth = |err: AuthRejected| {
        notifier.send("🔴 *CRITICAL ERROR*\nYour auth token has expired! The bot is stopping.");
        anyhow::Error::from(err)
    };

    let initial = stats::fetch_stats(&client)
        .map_err(&fatal_auth)?
        .ok_or_else(|| anyhow!("could not fetch initial stats, check the auth token and network"))?;

    info!("welcome, {}", initial.username);
    notifier.send(&format!(
        "👋 Welcome, *{}*!\nStarting balance: {} points, {} coins, {} tickets",
        initial.username, initial.over_points, initial.coins, initial.tickets
    ));

    let report =
        player::play_all(&client, &sleeper, &notifier, initial.tickets).map_err(&fatal_auth)?;

    info!("all tasks for this run are complete, fetching final stats");
    sleeper.sleep(Duration::from_secs(5));
    let final_stats = stats::fetch_stats(&client).map_err(&fatal_auth)?;

    stats::print_summary(&initial, final_stats.as_ref(), &report);
    if let Some(final_stats) = &final_stats {
        notifier.send(&format!(
            "✅ *Bot run complete*\nFinal balance: {} points, {} coins, {} tickets",
            final_stats.over_points, final_stats.coins, final_stats.tickets
        ));
    }

    info!("--- script finished ---");
    Ok(())
}
