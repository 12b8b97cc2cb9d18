use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use parking_lot::Mutex;

use conduit_core::StreamError;

use crate::upstream::{ByteStream, Upstream, UpstreamRequest};

/// Pre-programmed upstream responses for deterministic testing without an
/// origin process.
#[derive(Clone, Debug)]
pub enum ScriptedResponse {
    /// Yield these chunks, then close.
    Body(Vec<Result<Bytes, String>>),
    /// Yield these chunks, then never produce anything again.
    Stall(Vec<Bytes>),
    /// Fail at connect time.
    Error(StreamError),
}

impl ScriptedResponse {
    /// Convenience: a body made of whole text chunks.
    pub fn text(chunks: &[&str]) -> Self {
        Self::Body(
            chunks
                .iter()
                .map(|c| Ok(Bytes::copy_from_slice(c.as_bytes())))
                .collect(),
        )
    }
}

/// Upstream that replays scripted responses in call order and records the
/// requests it saw.
pub struct ScriptedUpstream {
    responses: Vec<ScriptedResponse>,
    call_count: AtomicUsize,
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl ScriptedUpstream {
    pub fn new(responses: Vec<ScriptedResponse>) -> Self {
        Self {
            responses,
            call_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn open(&self, request: &UpstreamRequest) -> Result<ByteStream, StreamError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().push(request.clone());

        match self.responses.get(idx).cloned() {
            Some(ScriptedResponse::Body(chunks)) => Ok(stream::iter(chunks).boxed()),
            Some(ScriptedResponse::Stall(chunks)) => Ok(stream::iter(chunks.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed()),
            Some(ScriptedResponse::Error(e)) => Err(e),
            None => Err(StreamError::Connect {
                url: "scripted".into(),
                reason: format!("no response configured for call {idx}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::SearchRequest;

    fn search() -> UpstreamRequest {
        UpstreamRequest::Search(SearchRequest {
            question: "q".into(),
        })
    }

    #[tokio::test]
    async fn replays_in_order_and_records() {
        let upstream = ScriptedUpstream::new(vec![
            ScriptedResponse::text(&["data: a\n\n"]),
            ScriptedResponse::Error(StreamError::StreamIo("gone".into())),
        ]);

        let first: Vec<_> = upstream.open(&search()).await.unwrap().collect().await;
        assert_eq!(first, vec![Ok(Bytes::from_static(b"data: a\n\n"))]);
        assert!(upstream.open(&search()).await.is_err());
        assert!(upstream.open(&search()).await.is_err());
        assert_eq!(upstream.call_count(), 3);
        assert_eq!(upstream.requests().len(), 3);
    }
}
