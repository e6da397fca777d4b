use rand::Rng;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::client::{ApiClient, ApiResponse, AuthRejected};

const GAME_ID_MARKER: &str = "Game ID: ";
const CONFLICT_SIGNATURE: &str = "active game";

/// A 400 whose body carries the "already have an active game" message.
pub fn is_stuck_conflict(response: Option<&ApiResponse>) -> bool {
    matches!(response, Some(r) if r.status == 400 && r.body.contains(CONFLICT_SIGNATURE))
}

/// Pulls the stuck game ID out of a conflict body. JSON bodies are searched
/// in their `error` field, anything else is scanned as plain text.
pub fn extract_game_id(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<Value>(body) {
        if let Some(message) = parsed.get("error").and_then(Value::as_str) {
            return scan_for_id(message);
        }
    }
    scan_for_id(body)
}

fn scan_for_id(text: &str) -> Option<String> {
    let start = text.find(GAME_ID_MARKER)? + GAME_ID_MARKER.len();
    let id: String = text[start..]
        .chars()
        .take_while(|c| matches!(c, '0'..='9' | 'a'..='f' | '-'))
        .collect();

    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Tries to clear a stuck session by ending it with a throwaway score.
/// Returns `Ok(false)` without any network call when no game ID can be
/// extracted from the conflict body.
pub fn try_recover(client: &ApiClient, conflict_body: &str) -> Result<bool, AuthRejected> {
    let Some(game_id) = extract_game_id(conflict_body) else {
        error!("could not parse stuck game ID from error message, cannot resolve");
        return Ok(false);
    };

    warn!(%game_id, "attempting to clear stuck game");
    let payload = recovery_payload(&game_id, &mut rand::thread_rng());
    let response = client.execute(Method::POST, &client.endpoints().game_end, Some(payload))?;

    match response {
        Some(ref ended) if ended.is_success() => {
            info!("successfully cleared stuck game");
            Ok(true)
        }
        Some(ended) => {
            error!(status = ended.status, body = %ended.body, "failed to clear stuck game");
            Ok(false)
        }
        None => {
            error!("failed to clear stuck game: no response from server");
            Ok(false)
        }
    }
}

// The clearing end call never awards items.
fn recovery_payload(game_id: &str, rng: &mut impl Rng) -> Value {
    json!({
        "gameId": game_id,
        "overPoints": rng.gen_range(90..=110),
        "collectedItems": [],
    })
}
