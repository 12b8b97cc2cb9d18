use crate::codec::DecodeError;
use crate::event::Event;

/// Everything that can go wrong between an origin and a consumer.
///
/// Connect, UpstreamStatus and StreamIo end the relay after one synthesized
/// `Failure` frame. MalformedFrame is reported the same way. Decode only
/// costs the consumer one frame. Nothing here is retried.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum StreamError {
    #[error("connect error: cannot reach {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("upstream error: status {status}")]
    UpstreamStatus { status: u16, body: String },
    #[error("malformed upstream frame: {line}")]
    MalformedFrame { line: String },
    #[error("stream error: {0}")]
    StreamIo(String),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl StreamError {
    pub fn is_relay_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::UpstreamStatus { .. } | Self::StreamIo(_)
        )
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect_error",
            Self::UpstreamStatus { .. } => "upstream_status",
            Self::MalformedFrame { .. } => "malformed_frame",
            Self::StreamIo(_) => "stream_io",
            Self::Decode(_) => "decode_error",
        }
    }

    /// The `Failure` event a relay or consumer reports for this error.
    pub fn to_failure(&self) -> Event {
        match self {
            Self::Connect { url, reason } => Event::failure(
                format!("connect error: cannot reach {url}"),
                Some(reason.clone()),
            ),
            Self::UpstreamStatus { status, body } => {
                let details = if body.trim().is_empty() {
                    "Unknown error".to_string()
                } else {
                    body.clone()
                };
                Event::failure(
                    format!("upstream error: status {status}"),
                    Some(details),
                )
            }
            Self::MalformedFrame { line } => {
                Event::failure("malformed upstream frame", Some(line.clone()))
            }
            Self::StreamIo(reason) => Event::failure("stream error", Some(reason.clone())),
            Self::Decode(e) => Event::failure("decode error", Some(e.to_string())),
        }
    }
}
