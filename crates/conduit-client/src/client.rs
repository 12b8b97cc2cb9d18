use std::time::Duration;

use reqwest::Client;
use tracing::{info, instrument};

use conduit_core::{ChatRequest, SearchQuery, StreamError};

use crate::consumer::{Outcome, StreamConsumer};
use crate::render::Renderer;

/// Talks to a relay and feeds its streams into a [`StreamConsumer`].
#[derive(Clone, Debug)]
pub struct ConsumerClient {
    client: Client,
    relay_url: String,
    timeout: Duration,
}

impl ConsumerClient {
    pub fn new(relay_url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(Client::new(), relay_url, timeout)
    }

    pub fn with_client(client: Client, relay_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            relay_url: relay_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `GET /search/stream?query=...`
    #[instrument(skip(self, consumer))]
    pub async fn search<R: Renderer>(
        &self,
        query: &str,
        consumer: &mut StreamConsumer<R>,
    ) -> Outcome {
        let request = self
            .client
            .get(format!("{}/search/stream", self.relay_url))
            .query(&SearchQuery {
                query: query.to_string(),
            });
        self.stream(request, consumer).await
    }

    /// `POST /chat/stream`
    #[instrument(skip_all, fields(question = %request.user_question))]
    pub async fn chat<R: Renderer>(
        &self,
        request: &ChatRequest,
        consumer: &mut StreamConsumer<R>,
    ) -> Outcome {
        let request = self
            .client
            .post(format!("{}/chat/stream", self.relay_url))
            .json(request);
        self.stream(request, consumer).await
    }

    async fn stream<R: Renderer>(
        &self,
        request: reqwest::RequestBuilder,
        consumer: &mut StreamConsumer<R>,
    ) -> Outcome {
        let resp = match request.timeout(self.timeout).send().await {
            Ok(resp) => resp,
            Err(e) => {
                return consumer.abort(&StreamError::Connect {
                    url: self.relay_url.clone(),
                    reason: e.to_string(),
                })
            }
        };

        let status = resp.status();
        info!(status = status.as_u16(), "connected to relay");
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return consumer.abort(&StreamError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        consumer.consume_body(resp.bytes_stream()).await
    }
}
