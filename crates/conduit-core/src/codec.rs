use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::event::{Event, ResultPayload};
use crate::frame::{Frame, DATA_PREFIX};

const DONE_NOTE: &str = "Response complete";

/// Why a single frame payload could not be turned into an [`Event`].
/// Fatal to that frame only.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("payload has no type discriminator")]
    MissingDiscriminator,
    #[error("unknown event type: {0}")]
    UnknownType(String),
    #[error("invalid {kind} payload: {reason}")]
    InvalidFields { kind: &'static str, reason: String },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Outbound<'a> {
    ProgressChar {
        #[serde(rename = "char")]
        newest: &'a str,
        message: &'a str,
        is_complete: bool,
        replace: bool,
    },
    Progress {
        message: &'a str,
        replace: bool,
        is_complete: bool,
    },
    Token {
        content: &'a str,
        index: u64,
    },
    Done {
        message: &'a str,
    },
}

#[derive(Deserialize)]
struct ProgressIn {
    message: String,
}

#[derive(Deserialize)]
struct TokenIn {
    content: String,
    index: u64,
}

/// Serialize an event into its single-line JSON body (no `data: ` prefix).
pub fn encode_payload(event: &Event) -> String {
    let value = match event {
        Event::ProgressPartial { text } => {
            let newest = text
                .char_indices()
                .last()
                .map(|(i, _)| &text[i..])
                .unwrap_or("");
            to_value(&Outbound::ProgressChar {
                newest,
                message: text,
                is_complete: false,
                replace: true,
            })
        }
        Event::ProgressComplete { text } => to_value(&Outbound::Progress {
            message: text,
            replace: true,
            is_complete: true,
        }),
        Event::Token { content, index } => to_value(&Outbound::Token {
            content,
            index: *index,
        }),
        Event::Done => to_value(&Outbound::Done { message: DONE_NOTE }),
        Event::Result { payload } => {
            let mut object = match serde_json::to_value(payload) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            };
            object.insert("type".into(), Value::String("results".into()));
            Value::Object(object)
        }
        Event::Failure { message, details } => {
            let mut object = Map::new();
            object.insert("error".into(), Value::String(message.clone()));
            if let Some(details) = details {
                object.insert("details".into(), Value::String(details.clone()));
            }
            Value::Object(object)
        }
    };
    value.to_string()
}

/// Encode an event as one wire frame: `data: <json>` plus its blank-line terminator.
pub fn encode(event: &Event) -> Frame {
    Frame::single(format!("{DATA_PREFIX}{}", encode_payload(event)))
}

/// Decode one body line into an event. Accepts the line with or without its
/// `data:` prefix.
pub fn decode(line: &str) -> Result<Event, DecodeError> {
    let body = crate::frame::strip_data_prefix(line).unwrap_or(line);
    let value: Value =
        serde_json::from_str(body).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    let Value::Object(mut object) = value else {
        return Err(DecodeError::NotAnObject);
    };

    let kind = object.get("type").and_then(Value::as_str).map(str::to_owned);
    match kind.as_deref() {
        Some("progress_char") => {
            let p: ProgressIn = fields("progress_char", object)?;
            Ok(Event::ProgressPartial { text: p.message })
        }
        Some("progress") => {
            let p: ProgressIn = fields("progress", object)?;
            Ok(Event::ProgressComplete { text: p.message })
        }
        Some("token") => {
            let t: TokenIn = fields("token", object)?;
            Ok(Event::Token {
                content: t.content,
                index: t.index,
            })
        }
        Some("done") => Ok(Event::Done),
        Some("results") => {
            object.remove("type");
            let payload: ResultPayload = fields("results", object)?;
            Ok(Event::Result { payload })
        }
        // Error-shaped payloads carry no discriminator, but an unknown one
        // still yields to an `error` key.
        Some(other) => failure_from(&object).ok_or_else(|| DecodeError::UnknownType(other.into())),
        None => failure_from(&object).ok_or(DecodeError::MissingDiscriminator),
    }
}

fn failure_from(object: &Map<String, Value>) -> Option<Event> {
    let message = object.get("error").map(text_of)?;
    let details = object
        .get("details")
        .filter(|v| !v.is_null())
        .map(text_of);
    Some(Event::Failure { message, details })
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn fields<T: serde::de::DeserializeOwned>(
    kind: &'static str,
    object: Map<String, Value>,
) -> Result<T, DecodeError> {
    serde_json::from_value(Value::Object(object)).map_err(|e| DecodeError::InvalidFields {
        kind,
        reason: e.to_string(),
    })
}

fn to_value<T: Serialize>(outbound: &T) -> Value {
    // Outbound frames are plain structs of strings and integers.
    serde_json::to_value(outbound).unwrap_or(Value::Null)
}
