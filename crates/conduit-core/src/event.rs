use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Events carried by one relayed stream. Ordering contract:
///
/// search:  (ProgressPartial* → ProgressComplete)* → Result
/// chat:    Token* → Done
///
/// Failure can end either shape at any point. Nothing follows a terminal event.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Full accumulated text of the message being typed. Replaces, never appends.
    ProgressPartial { text: String },
    ProgressComplete { text: String },
    Token { content: String, index: u64 },
    Done,
    Result { payload: ResultPayload },
    Failure { message: String, details: Option<String> },
}

impl Event {
    pub fn failure(message: impl Into<String>, details: Option<String>) -> Self {
        Self::Failure {
            message: message.into(),
            details,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Result { .. } | Self::Failure { .. })
    }

    pub fn is_progress(&self) -> bool {
        matches!(self, Self::ProgressPartial { .. } | Self::ProgressComplete { .. })
    }

    /// Short classification string for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProgressPartial { .. } => "progress_char",
            Self::ProgressComplete { .. } => "progress",
            Self::Token { .. } => "token",
            Self::Done => "done",
            Self::Result { .. } => "results",
            Self::Failure { .. } => "error",
        }
    }
}

/// Key the wire encoding claims for the event discriminator.
const RESERVED_KEY: &str = "type";

/// Final payload of a search stream. Opaque to the relay; the consumer only
/// reads the two ordered sequences. Unknown keys ride along in `extra`,
/// which never holds `type`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PayloadFields")]
pub struct ResultPayload {
    pub properties: Vec<Value>,
    pub landmarks: Vec<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl ResultPayload {
    pub fn new(properties: Vec<Value>, landmarks: Vec<Value>) -> Self {
        Self {
            properties,
            landmarks,
            extra: Map::new(),
        }
    }

    /// Attach an extra top-level key. `type` is dropped.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if key != RESERVED_KEY {
            self.extra.insert(key, value);
        }
        self
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

#[derive(Deserialize)]
struct PayloadFields {
    #[serde(default)]
    properties: Vec<Value>,
    #[serde(default)]
    landmarks: Vec<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<PayloadFields> for ResultPayload {
    fn from(mut fields: PayloadFields) -> Self {
        fields.extra.remove(RESERVED_KEY);
        Self {
            properties: fields.properties,
            landmarks: fields.landmarks,
            extra: fields.extra,
        }
    }
}
