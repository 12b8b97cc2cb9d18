use std::convert::Infallible;

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use conduit_core::Frame;

pub const EVENT_STREAM: &str = "text/event-stream";

/// Stream frames to the client as they are produced, with the headers that
/// keep proxies from buffering the response.
pub fn frame_response<S>(frames: S) -> Response
where
    S: Stream<Item = Frame> + Send + 'static,
{
    let body = Body::from_stream(frames.map(|frame| Ok::<_, Infallible>(frame.into_bytes())));
    let mut resp = body.into_response();
    let headers = resp.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    resp
}

/// End an event-stream body once `shutdown` is cancelled. Other responses
/// pass through untouched.
pub fn until_shutdown(shutdown: CancellationToken, response: Response) -> Response {
    let streaming = response
        .headers()
        .get(CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(EVENT_STREAM.as_bytes()));
    if !streaming {
        return response;
    }
    response.map(|body| {
        Body::from_stream(body.into_data_stream().take_until(shutdown.cancelled_owned()))
    })
}
