use std::ops::RangeInclusive;
use std::time::Duration;

use rand::Rng;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::client::{ApiClient, ApiResponse, AuthRejected, Sleeper};
use crate::notify::Notifier;
use crate::recover;

const GAMEPLAY_WAIT: Duration = Duration::from_secs(30);
const RECOVERY_RESTART_WAIT: Duration = Duration::from_secs(10);
const TICKET_WAIT_SECS: RangeInclusive<u64> = 15..=25;

/// Lifecycle of a single ticket attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    NotStarted,
    Conflict,
    Recovered,
    Started,
    Ended,
    Failed,
}

#[derive(Debug, Default)]
pub struct PlayReport {
    pub played: u32,
    pub skipped: u32,
}

/// Plays one game per available ticket, sequentially. The ticket count is a
/// snapshot taken before the loop and is never re-read. A single ticket's
/// failure skips that ticket only; the loop stops early only when the
/// credential is rejected.
pub fn play_all(
    client: &ApiClient,
    sleeper: &dyn Sleeper,
    notifier: &Notifier,
    tickets: i64,
) -> Result<PlayReport, AuthRejected> {
    let mut report = PlayReport::default();
    if tickets <= 0 {
        info!("no game tickets available to play");
        return Ok(report);
    }

    info!("starting game sequence for {tickets} tickets");
    for ticket in 1..=tickets {
        info!("--- playing ticket {ticket} of {tickets} ---");
        match play_one(client, sleeper, notifier)? {
            GameState::Ended => report.played += 1,
            _ => report.skipped += 1,
        }

        if ticket < tickets {
            let wait = rand::thread_rng().gen_range(TICKET_WAIT_SECS);
            info!("waiting {wait}s before the next ticket");
            sleeper.sleep(Duration::from_secs(wait));
        }
    }

    info!(
        "game sequence finished: played {} of {tickets}, skipped {}",
        report.played, report.skipped
    );
    Ok(report)
}

fn play_one(
    client: &ApiClient,
    sleeper: &dyn Sleeper,
    notifier: &Notifier,
) -> Result<GameState, AuthRejected> {
    let start_url = &client.endpoints().game_start;

    let mut state = GameState::NotStarted;
    let mut response = client.execute(Method::POST, start_url, None)?;
    state = next_after_start(state, response.as_ref());

    if state == GameState::Conflict {
        warn!("stuck game session detected, attempting self-healing");
        notifier.send("⚠️ Stuck game session detected. Attempting to self-heal...");

        let conflict_body = response.take().map(|r| r.body).unwrap_or_default();
        if recover::try_recover(client, &conflict_body)? {
            state = GameState::Recovered;
            info!(
                "self-heal successful, waiting {}s before restarting",
                RECOVERY_RESTART_WAIT.as_secs()
            );
            sleeper.sleep(RECOVERY_RESTART_WAIT);
            response = client.execute(Method::POST, start_url, None)?;
            state = next_after_start(state, response.as_ref());
        } else {
            error!("self-heal failed, skipping this ticket");
            notifier.send("❌ Self-heal failed for one ticket. Continuing to the next.");
            return Ok(GameState::Failed);
        }
    }

    if state != GameState::Started {
        match response {
            Some(resp) => error!(
                status = resp.status,
                body = %resp.body,
                "could not start game for this ticket"
            ),
            None => error!("could not start game for this ticket: no response from server"),
        }
        warn!("skipping this ticket");
        notifier.send("❗️ Could not start a game for one ticket. Continuing...");
        return Ok(GameState::Failed);
    }

    info!(
        "game started, simulating gameplay for {}s",
        GAMEPLAY_WAIT.as_secs()
    );
    sleeper.sleep(GAMEPLAY_WAIT);

    let payload = end_payload(&mut rand::thread_rng());
    info!(%payload, "ending game, submitting result");
    match client.execute(Method::POST, &client.endpoints().game_end, Some(payload))? {
        Some(ref ended) if ended.is_success() => info!("game finished successfully"),
        Some(ended) => warn!(status = ended.status, body = %ended.body, "end call rejected"),
        None => warn!("end call got no response from server"),
    }

    Ok(GameState::Ended)
}

/// Transition taken after a start call. A stuck conflict is recoverable only
/// on the first start of a ticket; after a recovery the retried start must
/// come up clean or the ticket fails.
fn next_after_start(state: GameState, response: Option<&ApiResponse>) -> GameState {
    match response {
        Some(resp) if resp.is_success() => GameState::Started,
        _ if state == GameState::NotStarted && recover::is_stuck_conflict(response) => {
            GameState::Conflict
        }
        _ => GameState::Failed,
    }
}

fn end_payload(rng: &mut impl Rng) -> Value {
    json!({
        "overPoints": rng.gen_range(90..=110u32),
        "collectedItems": [
            { "type": "coin", "count": rng.gen_range(1..=4u32) },
            { "type": "ticket", "count": rng.gen_range(0..=4u32) },
        ],
    })
}
