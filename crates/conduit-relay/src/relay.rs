use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::Stream;
use tokio::time::Sleep;
use tracing::{debug, info, info_span, trace, warn, Span};

use conduit_core::{encode, Feed, Frame, FrameParser, LineStream, RequestId, StreamError};

use crate::upstream::{ByteStream, Upstream, UpstreamRequest};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub type FrameStream = Pin<Box<dyn Stream<Item = Frame> + Send>>;

/// Forwards origin frames downstream, one upstream connection per request.
#[derive(Clone)]
pub struct RelayService {
    upstream: Arc<dyn Upstream>,
    timeout: Duration,
}

impl RelayService {
    pub fn new(upstream: Arc<dyn Upstream>, timeout: Duration) -> Self {
        Self { upstream, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Open the upstream connection and forward its frames as they arrive.
    ///
    /// The returned stream always ends after the upstream closes, or after
    /// exactly one synthesized `Failure` frame. Dropping it closes the
    /// upstream connection.
    pub fn relay(&self, request: UpstreamRequest) -> FrameStream {
        Box::pin(RelayStream::new(self.upstream.clone(), request, self.timeout))
    }
}

enum Phase {
    Connecting(BoxFuture<'static, Result<ByteStream, StreamError>>),
    Forwarding(LineStream<ByteStream>),
    Finished,
}

/// Per-request forwarding state. Holds at most one frame in the parser plus
/// whatever a single upstream line released.
struct RelayStream {
    phase: Phase,
    parser: FrameParser,
    queued: VecDeque<Frame>,
    deadline: Pin<Box<Sleep>>,
    lifetime: Duration,
    forwarded: u64,
    span: Span,
}

impl RelayStream {
    fn new(upstream: Arc<dyn Upstream>, request: UpstreamRequest, lifetime: Duration) -> Self {
        let id = RequestId::new();
        let span = info_span!("relay", request_id = %id, kind = request.kind());
        span.in_scope(|| info!(path = request.path(), "opening upstream stream"));

        let connect: BoxFuture<'static, _> =
            Box::pin(async move { upstream.open(&request).await });

        Self {
            phase: Phase::Connecting(connect),
            parser: FrameParser::new(),
            queued: VecDeque::new(),
            deadline: Box::pin(tokio::time::sleep(lifetime)),
            lifetime,
            forwarded: 0,
            span,
        }
    }

    fn on_line(&mut self, line: &str) {
        match self.parser.feed(line) {
            Feed::Pending => {}
            Feed::Frame(frame) => self.forward(frame),
            Feed::Malformed { flushed, line } => {
                if let Some(frame) = flushed {
                    self.forward(frame);
                }
                self.fail(StreamError::MalformedFrame { line });
            }
        }
    }

    fn forward(&mut self, frame: Frame) {
        self.forwarded += 1;
        trace!(frame = self.forwarded, lines = frame.lines().len(), "forwarding frame");
        self.queued.push_back(frame);
    }

    /// Queue one `Failure` frame and stop reading upstream.
    fn fail(&mut self, error: StreamError) {
        if let Some(frame) = self.parser.finish() {
            self.forward(frame);
        }
        warn!(
            kind = error.error_kind(),
            error = %error,
            forwarded = self.forwarded,
            "relay ended with failure"
        );
        self.queued.push_back(encode(&error.to_failure()));
        self.phase = Phase::Finished;
    }

    fn timed_out(&self) -> StreamError {
        StreamError::StreamIo(format!(
            "relay timeout after {}s",
            self.lifetime.as_secs()
        ))
    }
}

impl Stream for RelayStream {
    type Item = Frame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        let this = self.get_mut();
        let span = this.span.clone();
        let _entered = span.enter();

        loop {
            // The lifetime bounds the whole connection, even while upstream
            // always has the next line ready.
            if !matches!(this.phase, Phase::Finished) && this.deadline.as_mut().poll(cx).is_ready() {
                let error = this.timed_out();
                this.fail(error);
            }

            if let Some(frame) = this.queued.pop_front() {
                return Poll::Ready(Some(frame));
            }

            let polled = match &mut this.phase {
                Phase::Finished => return Poll::Ready(None),
                Phase::Connecting(connect) => match connect.as_mut().poll(cx) {
                    Poll::Ready(Ok(body)) => {
                        debug!("upstream connected");
                        this.phase = Phase::Forwarding(LineStream::new(body));
                        continue;
                    }
                    Poll::Ready(Err(e)) => {
                        this.fail(e);
                        continue;
                    }
                    Poll::Pending => Poll::Pending,
                },
                Phase::Forwarding(lines) => Pin::new(lines).poll_next(cx),
            };

            match polled {
                Poll::Ready(Some(Ok(line))) => this.on_line(&line),
                Poll::Ready(Some(Err(e))) => this.fail(e),
                Poll::Ready(None) => {
                    if let Some(frame) = this.parser.finish() {
                        this.forward(frame);
                    }
                    info!(forwarded = this.forwarded, "upstream closed");
                    this.phase = Phase::Finished;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
