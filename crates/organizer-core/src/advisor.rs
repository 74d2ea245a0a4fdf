use crate::error::{Error, Result};
use serde_json::Value;
use tracing::debug;

/// The one capability the organizer needs from an AI provider.
///
/// Implementations own their client, credentials and model choice; the
/// organizer only sees prompt in, text out.
pub trait Completer: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String>;
}

impl<F> Completer for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn complete(&self, prompt: &str) -> Result<String> {
        self(prompt)
    }
}

/// Ask the advisor and pull the raw action list out of its reply.
/// The returned values are still untrusted and must go through validation.
pub fn request_actions(completer: &dyn Completer, prompt: &str) -> Result<Vec<Value>> {
    let text = completer.complete(prompt)?;
    debug!(
        "Advisor responded with {} chars: {}",
        text.len(),
        text.chars().take(200).collect::<String>()
    );
    extract_actions(&text)
}

/// Find a JSON action array in free-form completion text.
///
/// Accepts a bare array, an object with an `actions` array, a fenced code
/// block holding either, or the outermost `[...]` span in prose.
pub fn extract_actions(text: &str) -> Result<Vec<Value>> {
    let trimmed = text.trim();

    if let Some(actions) = parse_action_list(trimmed) {
        return Ok(actions);
    }

    if let Some(body) = fenced_body(trimmed) {
        if let Some(actions) = parse_action_list(body) {
            return Ok(actions);
        }
    }

    if let (Some(first), Some(last)) = (trimmed.find('['), trimmed.rfind(']')) {
        if first < last {
            if let Some(actions) = parse_action_list(&trimmed[first..=last]) {
                return Ok(actions);
            }
        }
    }

    Err(Error::Validation(
        "no action list found in advisor response".to_string(),
    ))
}

fn parse_action_list(candidate: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(candidate).ok()? {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove("actions") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

fn fenced_body(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + "```json".len()..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim());
        }
    }

    let start = text.find("```")?;
    let rest = &text[start + 3..];
    let newline = rest.find('\n')?;
    let body = &rest[newline + 1..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}
