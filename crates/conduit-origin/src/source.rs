use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use tracing::info;

use conduit_core::{ChatRequest, Event, ResultPayload, SearchRequest};

use crate::responder::ChatResponder;
use crate::script::{Beat, ProgressPacing, ProgressScript, TokenPacing, TokenScript};
use crate::stages::StageSelector;

pub type EventStream = Pin<Box<dyn Stream<Item = Event> + Send>>;

/// Produces the event sequence for one request. Every sequence is finite,
/// ends with exactly one terminal event, and cannot be restarted.
pub trait EventSource: Send + Sync {
    type Request;

    fn open(&self, request: &Self::Request) -> EventStream;
}

/// Drive a beat schedule in real time: sleep for each beat's delay, then
/// yield its event. Dropping the stream drops the pending timer with it.
pub fn paced<I>(beats: I) -> EventStream
where
    I: Iterator<Item = Beat> + Send + 'static,
{
    Box::pin(futures::stream::unfold(beats, |mut beats| async move {
        let beat = beats.next()?;
        if !beat.delay.is_zero() {
            tokio::time::sleep(beat.delay).await;
        }
        Some((beat.event, beats))
    }))
}

/// Search narration: stages picked from the query, then the result payload.
#[derive(Clone)]
pub struct ProgressSource {
    selector: Arc<dyn StageSelector>,
    results: ResultPayload,
    pacing: ProgressPacing,
}

impl ProgressSource {
    pub fn new(
        selector: Arc<dyn StageSelector>,
        results: ResultPayload,
        pacing: ProgressPacing,
    ) -> Self {
        Self {
            selector,
            results,
            pacing,
        }
    }

    pub fn pacing(&self) -> ProgressPacing {
        self.pacing
    }
}

impl EventSource for ProgressSource {
    type Request = SearchRequest;

    fn open(&self, request: &SearchRequest) -> EventStream {
        let stages = self.selector.select(&request.question);
        info!(
            question = %request.question,
            stages = stages.len(),
            properties = self.results.properties.len(),
            "starting search stream"
        );
        paced(ProgressScript::new(stages, self.results.clone(), self.pacing))
    }
}

/// Chat answer streamed word by word.
#[derive(Clone)]
pub struct TokenSource {
    responder: Arc<dyn ChatResponder>,
    pacing: TokenPacing,
}

impl TokenSource {
    pub fn new(responder: Arc<dyn ChatResponder>, pacing: TokenPacing) -> Self {
        Self { responder, pacing }
    }
}

impl EventSource for TokenSource {
    type Request = ChatRequest;

    fn open(&self, request: &ChatRequest) -> EventStream {
        let answer = self.responder.answer(request);
        info!(
            question = %request.user_question,
            history = request.chat_history.len(),
            words = answer.split_whitespace().count(),
            "starting chat stream"
        );
        paced(TokenScript::new(&answer, self.pacing))
    }
}
