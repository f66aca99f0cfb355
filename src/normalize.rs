//! Normalizes raw realtime-channel payloads into canonical events.
//!
//! The voice provider's message schema is not contractually stable: the
//! same logical event may arrive tagged under `type`, `source`, or as a
//! role-tagged object nested in `message`. This module reduces that
//! variant input to a single canonical shape via an ordered list of
//! shape matchers. Unrecognized shapes produce no event and never fail.

use serde_json::Value;
use tracing::debug;

/// Kind of a normalized channel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Recognized user speech.
    UserTranscript,
    /// Text the voice agent spoke back.
    AgentResponse,
}

/// The shape-independent representation of a raw session message.
///
/// Invariant: `text` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalEvent {
    pub kind: EventKind,
    pub text: String,
}

type ShapeMatcher = fn(&Value) -> Option<CanonicalEvent>;

/// Ordered shape matchers; the first match wins.
const MATCHERS: &[ShapeMatcher] = &[match_tagged_transcript, match_tagged_response, match_role_tagged];

/// Reduces a raw channel payload to a canonical event, or `None` when the
/// shape is unrecognized or the derived text is empty.
#[must_use]
pub fn normalize(raw: &Value) -> Option<CanonicalEvent> {
    debug!(payload = %raw, "raw channel event");
    let event = MATCHERS.iter().find_map(|matcher| matcher(raw));
    if event.is_none() {
        debug!("dropped channel event with unrecognized shape");
    }
    event
}

/// `type == "user_transcript"` or `source == "user"`.
fn match_tagged_transcript(raw: &Value) -> Option<CanonicalEvent> {
    if !tag_matches(raw, "user_transcript", "user") {
        return None;
    }
    derived_text(raw).map(|text| CanonicalEvent {
        kind: EventKind::UserTranscript,
        text,
    })
}

/// `type == "agent_response"` or `source == "ai"`.
fn match_tagged_response(raw: &Value) -> Option<CanonicalEvent> {
    if !tag_matches(raw, "agent_response", "ai") {
        return None;
    }
    derived_text(raw).map(|text| CanonicalEvent {
        kind: EventKind::AgentResponse,
        text,
    })
}

/// Fallback: `message` is itself a role-tagged object.
fn match_role_tagged(raw: &Value) -> Option<CanonicalEvent> {
    let message = raw.get("message")?;
    let kind = match message.get("role").and_then(Value::as_str)? {
        "user" => EventKind::UserTranscript,
        "assistant" => EventKind::AgentResponse,
        _ => return None,
    };
    let text = message.get("content").and_then(Value::as_str)?;
    if text.is_empty() {
        return None;
    }
    Some(CanonicalEvent {
        kind,
        text: text.to_owned(),
    })
}

fn tag_matches(raw: &Value, type_tag: &str, source_tag: &str) -> bool {
    raw.get("type").and_then(Value::as_str) == Some(type_tag)
        || raw.get("source").and_then(Value::as_str) == Some(source_tag)
}

/// Derives event text from `message`, `text`, or `content`, first non-empty
/// string field wins.
fn derived_text(raw: &Value) -> Option<String> {
    ["message", "text", "content"].iter().find_map(|key| {
        raw.get(*key)
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_owned)
    })
}
