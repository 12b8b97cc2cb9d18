use std::fmt::Display;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use conduit_core::{decode, Event, Line, LineStream, ResultPayload, StreamError};

use crate::render::Renderer;

/// How a consumed stream ended.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Results(ResultPayload),
    Completed { response: String },
    Failed { message: String, details: Option<String> },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Display state of one consumer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderState {
    /// Progress message being typed; empty between messages.
    pub current_display_text: String,
    /// What the progress line shows right now, if anything.
    pub displayed: Option<String>,
    /// Tokens received so far.
    pub response: String,
}

/// Decodes a relayed stream into events and drives a [`Renderer`].
pub struct StreamConsumer<R> {
    renderer: R,
    state: RenderState,
    timeout: Duration,
    lines_seen: u64,
}

impl<R: Renderer> StreamConsumer<R> {
    pub fn new(renderer: R, timeout: Duration) -> Self {
        Self {
            renderer,
            state: RenderState::default(),
            timeout,
            lines_seen: 0,
        }
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Read a raw response body until a terminal event, end of stream or
    /// the timeout.
    pub async fn consume_body<S, E>(&mut self, body: S) -> Outcome
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        self.consume(LineStream::new(body)).await
    }

    /// Read text lines until a terminal event, end of stream or the timeout.
    pub async fn consume<S>(&mut self, lines: S) -> Outcome
    where
        S: Stream<Item = Result<String, StreamError>>,
    {
        let mut lines = std::pin::pin!(lines);
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        loop {
            let next = tokio::select! {
                next = lines.next() => next,
                () = &mut deadline => {
                    let secs = self.timeout.as_secs();
                    return self.abort(&StreamError::StreamIo(format!(
                        "no terminal event within {secs}s"
                    )));
                }
            };

            match next {
                Some(Ok(line)) => {
                    self.lines_seen += 1;
                    if let Some(outcome) = self.on_line(&line) {
                        return outcome;
                    }
                }
                Some(Err(e)) => return self.abort(&e),
                None => {
                    debug!(lines = self.lines_seen, "stream closed without terminal event");
                    let failure = Event::failure(
                        "no data received",
                        Some(format!("stream closed after {} lines", self.lines_seen)),
                    );
                    return self.apply(failure).unwrap_or_else(|| Outcome::Failed {
                        message: "no data received".into(),
                        details: None,
                    });
                }
            }
        }
    }

    /// Report a transport-level error as the stream's failure.
    pub fn abort(&mut self, error: &StreamError) -> Outcome {
        warn!(kind = error.error_kind(), error = %error, "stream aborted");
        let failure = error.to_failure();
        self.apply(failure).unwrap_or_else(|| Outcome::Failed {
            message: error.to_string(),
            details: None,
        })
    }

    fn on_line(&mut self, line: &str) -> Option<Outcome> {
        let Line::Data(body) = Line::classify(line) else {
            return None;
        };
        match decode(body) {
            Ok(event) => self.apply(event),
            Err(e) => {
                warn!(error = %e, "undecodable line skipped");
                self.clear_progress();
                self.renderer.diagnostic(&format!("error parsing event: {e}"), line);
                None
            }
        }
    }

    /// Apply one event. Returns the outcome once a terminal event arrives.
    pub fn apply(&mut self, event: Event) -> Option<Outcome> {
        match event {
            Event::ProgressPartial { text } => {
                let previous = self.state.displayed.take().unwrap_or_default();
                if !text.starts_with(&self.state.current_display_text) {
                    self.renderer.clear_line(&previous);
                }
                self.renderer.replace_line(&previous, &text);
                self.state.current_display_text = text.clone();
                self.state.displayed = Some(text);
                None
            }
            Event::ProgressComplete { text } => {
                if self.state.displayed.as_deref() != Some(text.as_str()) {
                    let previous = self.state.displayed.take().unwrap_or_default();
                    self.renderer.replace_line(&previous, &text);
                    self.state.displayed = Some(text);
                }
                self.state.current_display_text.clear();
                None
            }
            Event::Token { content, index } => {
                debug!(index, "token");
                self.renderer.append_token(&content);
                self.state.response.push_str(&content);
                None
            }
            Event::Done => {
                self.renderer.done();
                Some(Outcome::Completed {
                    response: std::mem::take(&mut self.state.response),
                })
            }
            Event::Result { payload } => {
                self.clear_progress();
                self.renderer.results(&payload);
                Some(Outcome::Results(payload))
            }
            Event::Failure { message, details } => {
                self.clear_progress();
                self.renderer.failure(&message, details.as_deref());
                Some(Outcome::Failed { message, details })
            }
        }
    }

    fn clear_progress(&mut self) {
        if let Some(previous) = self.state.displayed.take() {
            self.renderer.clear_line(&previous);
        }
        self.state.current_display_text.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::ReceiverStream;

    use conduit_core::encode;

    /// Records renderer calls as short strings.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Renderer for Recorder {
        fn replace_line(&mut self, previous: &str, text: &str) {
            self.calls.push(format!("replace {previous:?} -> {text:?}"));
        }
        fn clear_line(&mut self, previous: &str) {
            self.calls.push(format!("clear {previous:?}"));
        }
        fn append_token(&mut self, content: &str) {
            self.calls.push(format!("token {content:?}"));
        }
        fn results(&mut self, payload: &ResultPayload) {
            self.calls.push(format!("results {}", payload.properties.len()));
        }
        fn done(&mut self) {
            self.calls.push("done".into());
        }
        fn failure(&mut self, message: &str, details: Option<&str>) {
            self.calls.push(format!("failure {message:?} {details:?}"));
        }
        fn diagnostic(&mut self, message: &str, _raw: &str) {
            self.calls.push(format!("diagnostic {message}"));
        }
    }

    fn consumer() -> StreamConsumer<Recorder> {
        StreamConsumer::new(Recorder::default(), Duration::from_secs(60))
    }

    fn wire(events: &[Event]) -> String {
        events.iter().map(|e| encode(e).to_wire()).collect()
    }

    fn body(text: String) -> impl Stream<Item = Result<Bytes, String>> {
        futures::stream::iter(vec![Ok(Bytes::from(text))])
    }

    fn partial(text: &str) -> Event {
        Event::ProgressPartial { text: text.into() }
    }

    fn complete(text: &str) -> Event {
        Event::ProgressComplete { text: text.into() }
    }

    #[test]
    fn partials_replace_the_line() {
        let mut c = consumer();
        assert!(c.apply(partial("A")).is_none());
        assert!(c.apply(partial("An")).is_none());
        assert_eq!(c.state().current_display_text, "An");
        assert_eq!(
            c.renderer().calls,
            vec![r#"replace "" -> "A""#, r#"replace "A" -> "An""#]
        );
    }

    #[test]
    fn complete_keeps_text_visible_and_resets_current() {
        let mut c = consumer();
        c.apply(partial("O"));
        c.apply(partial("Ok"));
        c.apply(complete("Ok"));

        assert_eq!(c.state().current_display_text, "");
        assert_eq!(c.state().displayed.as_deref(), Some("Ok"));
        // Already showing the final text: no redraw.
        assert_eq!(c.renderer().calls.len(), 2);
    }

    #[test]
    fn complete_redraws_when_it_differs() {
        let mut c = consumer();
        c.apply(partial("O"));
        c.apply(complete("Ok"));
        assert_eq!(c.renderer().calls.last().unwrap(), r#"replace "O" -> "Ok""#);
        assert_eq!(c.state().displayed.as_deref(), Some("Ok"));
    }

    #[test]
    fn non_extending_partial_clears_first() {
        let mut c = consumer();
        c.apply(partial("Ab"));
        c.apply(partial("X"));
        assert_eq!(
            c.renderer().calls,
            vec![
                r#"replace "" -> "Ab""#,
                r#"clear "Ab""#,
                r#"replace "Ab" -> "X""#
            ]
        );
    }

    #[test]
    fn next_stage_overwrites_previous_complete() {
        let mut c = consumer();
        c.apply(partial("A"));
        c.apply(complete("A"));
        c.apply(partial("B"));
        assert_eq!(c.renderer().calls.last().unwrap(), r#"replace "A" -> "B""#);
        assert!(!c.renderer().calls.iter().any(|call| call.starts_with("clear")));
    }

    #[test]
    fn result_clears_progress_and_ends() {
        let mut c = consumer();
        c.apply(partial("A"));
        let outcome = c.apply(Event::Result {
            payload: ResultPayload::new(vec![json!({"id": "1"})], Vec::new()),
        });
        assert!(matches!(outcome, Some(Outcome::Results(ref p)) if p.properties.len() == 1));
        assert_eq!(c.renderer().calls[1..], [r#"clear "A""#, "results 1"]);
        assert_eq!(c.state().displayed, None);
    }

    #[test]
    fn tokens_accumulate_until_done() {
        let mut c = consumer();
        for (i, word) in ["Yes ", "it ", "is. "].iter().enumerate() {
            c.apply(Event::Token {
                content: word.to_string(),
                index: i as u64,
            });
        }
        assert_eq!(c.state().response, "Yes it is. ");
        let outcome = c.apply(Event::Done);
        assert_eq!(
            outcome,
            Some(Outcome::Completed {
                response: "Yes it is. ".into()
            })
        );
    }

    #[test]
    fn failure_surfaces_message_and_details() {
        let mut c = consumer();
        c.apply(partial("Se"));
        let outcome = c.apply(Event::failure("upstream error: status 500", Some("internal error".into())));
        assert_eq!(
            outcome,
            Some(Outcome::Failed {
                message: "upstream error: status 500".into(),
                details: Some("internal error".into())
            })
        );
        assert_eq!(
            c.renderer().calls[1..],
            [
                r#"clear "Se""#.to_string(),
                r#"failure "upstream error: status 500" Some("internal error")"#.to_string()
            ]
        );
    }

    #[tokio::test]
    async fn consumes_a_full_search_stream() {
        let events = vec![
            partial("A"),
            partial("Ab"),
            complete("Ab"),
            Event::Result {
                payload: ResultPayload::new(vec![json!({}), json!({})], vec![json!({})]),
            },
        ];
        let mut c = consumer();
        let outcome = c.consume_body(body(wire(&events))).await;
        match outcome {
            Outcome::Results(p) => {
                assert_eq!(p.properties.len(), 2);
                assert_eq!(p.landmarks.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn stops_at_the_first_terminal() {
        let mut text = wire(&[Event::Done]);
        text.push_str(&wire(&[Event::Token {
            content: "late ".into(),
            index: 9,
        }]));
        let mut c = consumer();
        let outcome = c.consume_body(body(text)).await;
        assert_eq!(
            outcome,
            Outcome::Completed {
                response: String::new()
            }
        );
        assert_eq!(c.renderer().calls, vec!["done"]);
    }

    #[tokio::test]
    async fn eof_without_terminal_is_no_data_received() {
        let mut c = consumer();
        let outcome = c.consume_body(body(wire(&[partial("A")]))).await;
        match outcome {
            Outcome::Failed { message, .. } => assert_eq!(message, "no data received"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_stream_is_no_data_received() {
        let mut c = consumer();
        let outcome = c
            .consume_body(futures::stream::empty::<Result<Bytes, String>>())
            .await;
        assert!(matches!(outcome, Outcome::Failed { ref message, .. } if message == "no data received"));
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn undecodable_lines_are_skipped_with_a_diagnostic() {
        let text = format!(
            ": comment\nevent: ping\ndata: {{not json\n\n{}",
            wire(&[Event::Done])
        );
        let mut c = consumer();
        let outcome = c.consume_body(body(text)).await;
        assert!(outcome.is_success());
        let calls = &c.renderer().calls;
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("diagnostic error parsing event"), "{calls:?}");
        assert_eq!(calls[1], "done");
    }

    #[tokio::test]
    async fn transport_error_is_a_stream_failure() {
        let mut c = consumer();
        let chunks = vec![
            Ok(Bytes::from(wire(&[partial("A")]))),
            Err("connection reset".to_string()),
        ];
        let outcome = c.consume_body(futures::stream::iter(chunks)).await;
        assert_eq!(
            outcome,
            Outcome::Failed {
                message: "stream error".into(),
                details: Some("connection reset".into())
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_bounds_a_silent_stream() {
        let (tx, rx) = mpsc::channel::<Result<Bytes, String>>(1);
        let mut c = StreamConsumer::new(Recorder::default(), Duration::from_secs(3));
        let outcome = c.consume_body(ReceiverStream::new(rx)).await;
        assert_eq!(
            outcome,
            Outcome::Failed {
                message: "stream error".into(),
                details: Some("no terminal event within 3s".into())
            }
        );
        drop(tx);
    }
}
