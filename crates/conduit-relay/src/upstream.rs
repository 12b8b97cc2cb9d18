use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use tracing::{debug, instrument, warn};

use conduit_core::{ChatRequest, SearchRequest, StreamError};

/// Raw response body of an opened upstream stream. Transport errors are
/// carried as text.
pub type ByteStream = BoxStream<'static, Result<Bytes, String>>;

/// What the relay asks the origin for.
#[derive(Clone, Debug, PartialEq)]
pub enum UpstreamRequest {
    Search(SearchRequest),
    Chat(ChatRequest),
}

impl UpstreamRequest {
    /// Origin route serving this request kind.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Search(_) => "/query/stream",
            Self::Chat(_) => "/property_chat/stream",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Search(_) => "search",
            Self::Chat(_) => "chat",
        }
    }
}

/// One outbound streaming connection per call.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Connect and check the response status. On success the body has not
    /// been read yet.
    async fn open(&self, request: &UpstreamRequest) -> Result<ByteStream, StreamError>;
}

/// Streams from an origin over HTTP. The client (and its connection pool)
/// is shared by every request.
#[derive(Clone, Debug)]
pub struct HttpUpstream {
    client: Client,
    origin_url: String,
    timeout: Duration,
}

impl HttpUpstream {
    pub fn new(client: Client, origin_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            origin_url: origin_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// With a fresh client of its own.
    pub fn from_url(origin_url: impl Into<String>, timeout: Duration) -> Self {
        Self::new(Client::new(), origin_url, timeout)
    }

    pub fn origin_url(&self) -> &str {
        &self.origin_url
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    #[instrument(skip_all, fields(kind = request.kind(), origin = %self.origin_url))]
    async fn open(&self, request: &UpstreamRequest) -> Result<ByteStream, StreamError> {
        let url = format!("{}{}", self.origin_url, request.path());
        let builder = self.client.post(&url).timeout(self.timeout);
        let builder = match request {
            UpstreamRequest::Search(body) => builder.json(body),
            UpstreamRequest::Chat(body) => builder.json(body),
        };

        let resp = builder.send().await.map_err(|e| {
            warn!(error = %e, "origin unreachable");
            StreamError::Connect {
                url: self.origin_url.clone(),
                reason: e.to_string(),
            }
        })?;

        let status = resp.status();
        debug!(status = status.as_u16(), "origin responded");
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %body, "origin returned error status");
            return Err(StreamError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.bytes_stream().map_err(|e| e.to_string()).boxed())
    }
}
