//! Word suggestions via the Datamuse `/sug` endpoint.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

const SUGGEST_API_URL: &str = "https://api.datamuse.com/sug";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_SUGGESTIONS: usize = 5;
const MIN_QUERY_CHARS: usize = 2;

/// Return up to five suggested words for a partial query.
///
/// Queries shorter than two characters are not sent. Any failure (network,
/// HTTP status, unreadable payload) degrades to an empty list; this call
/// never errors.
pub async fn suggestions(http: &reqwest::Client, query: &str) -> Vec<String> {
    let normalized = query.trim().to_lowercase();
    if normalized.chars().count() < MIN_QUERY_CHARS {
        return Vec::new();
    }

    let response = http
        .get(SUGGEST_API_URL)
        .query(&[("s", normalized.as_str()), ("max", "5")])
        .timeout(HTTP_TIMEOUT)
        .send()
        .await;

    let payload = match response {
        Ok(response) if response.status().is_success() => match response.json::<Value>().await {
            Ok(payload) => payload,
            Err(e) => {
                debug!("suggestion payload unreadable: {e}");
                return Vec::new();
            }
        },
        Ok(response) => {
            debug!("suggestion request failed: {}", response.status());
            return Vec::new();
        }
        Err(e) => {
            debug!("suggestion request failed: {e}");
            return Vec::new();
        }
    };

    parse_suggestions(&payload)
}

/// Datamuse returns `[{"word": "...", "score": ...}, ...]`.
fn parse_suggestions(payload: &Value) -> Vec<String> {
    payload
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("word").and_then(Value::as_str))
                .map(str::to_string)
                .take(MAX_SUGGESTIONS)
                .collect()
        })
        .unwrap_or_default()
}
