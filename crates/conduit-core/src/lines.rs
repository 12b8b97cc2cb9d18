use std::fmt::Display;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use pin_project_lite::pin_project;

use crate::errors::StreamError;

/// Longest line accepted before the stream is treated as broken.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

pin_project! {
    /// Splits a chunked byte stream into text lines (`\n` or `\r\n`).
    ///
    /// Bytes are buffered until a full line is available, so multi-byte
    /// characters split across chunks decode intact. A transport error is
    /// yielded once as [`StreamError::StreamIo`] and ends the stream.
    pub struct LineStream<S> {
        #[pin]
        inner: S,
        buffer: BytesMut,
        // Bytes of `buffer` already known to hold no newline.
        scanned: usize,
        max_line: usize,
        finished: bool,
    }
}

impl<S> LineStream<S> {
    pub fn new(inner: S) -> Self {
        Self::with_max_line(inner, MAX_LINE_BYTES)
    }

    pub fn with_max_line(inner: S, max_line: usize) -> Self {
        Self {
            inner,
            buffer: BytesMut::new(),
            scanned: 0,
            max_line,
            finished: false,
        }
    }
}

fn to_line(mut raw: BytesMut) -> String {
    if raw.last() == Some(&b'\r') {
        raw.truncate(raw.len() - 1);
    }
    String::from_utf8_lossy(&raw).into_owned()
}

impl<S, E> Stream for LineStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    type Item = Result<String, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            let unscanned = &this.buffer[*this.scanned..];
            if let Some(offset) = unscanned.iter().position(|b| *b == b'\n') {
                let pos = *this.scanned + offset;
                *this.scanned = 0;
                let mut line = this.buffer.split_to(pos + 1);
                line.truncate(pos);
                return Poll::Ready(Some(Ok(to_line(line))));
            }
            *this.scanned = this.buffer.len();

            if this.buffer.len() > *this.max_line {
                let limit = *this.max_line;
                *this.finished = true;
                *this.scanned = 0;
                this.buffer.clear();
                return Poll::Ready(Some(Err(StreamError::StreamIo(format!(
                    "line exceeds {limit} bytes"
                )))));
            }

            if *this.finished {
                if this.buffer.is_empty() {
                    return Poll::Ready(None);
                }
                *this.scanned = 0;
                let rest = this.buffer.split();
                return Poll::Ready(Some(Ok(to_line(rest))));
            }

            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => this.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    *this.finished = true;
                    *this.scanned = 0;
                    this.buffer.clear();
                    return Poll::Ready(Some(Err(StreamError::StreamIo(e.to_string()))));
                }
                None => *this.finished = true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, StreamExt};

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes, String>> {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok::<_, String>(Bytes::from_static(p)))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect<S: Stream<Item = Result<String, StreamError>> + Unpin>(
        mut lines: S,
    ) -> Vec<Result<String, StreamError>> {
        let mut out = Vec::new();
        while let Some(line) = lines.next().await {
            out.push(line);
        }
        out
    }

    #[tokio::test]
    async fn splits_across_chunk_boundaries() {
        let lines = LineStream::new(chunks(&[b"data: {\"a\"", b":1}\n", b"\ndata: x\n\n"]));
        let out: Vec<String> = collect(lines).await.into_iter().map(Result::unwrap).collect();
        assert_eq!(out, ["data: {\"a\":1}", "", "data: x", ""]);
    }

    #[tokio::test]
    async fn strips_carriage_returns() {
        let lines = LineStream::new(chunks(&[b"data: a\r\n\r\n"]));
        let out: Vec<String> = collect(lines).await.into_iter().map(Result::unwrap).collect();
        assert_eq!(out, ["data: a", ""]);
    }

    #[tokio::test]
    async fn multibyte_char_split_between_chunks() {
        // "é" is 0xC3 0xA9
        let lines = LineStream::new(chunks(&[b"caf\xC3", b"\xA9\n"]));
        let out: Vec<String> = collect(lines).await.into_iter().map(Result::unwrap).collect();
        assert_eq!(out, ["caf\u{e9}"]);
    }

    #[tokio::test]
    async fn trailing_line_without_newline() {
        let lines = LineStream::new(chunks(&[b"data: a\n", b"data: tail"]));
        let out: Vec<String> = collect(lines).await.into_iter().map(Result::unwrap).collect();
        assert_eq!(out, ["data: a", "data: tail"]);
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let items: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"data: a\n")),
            Err("connection reset".into()),
            Ok(Bytes::from_static(b"data: never\n")),
        ];
        let out = collect(LineStream::new(stream::iter(items))).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_deref(), Ok("data: a"));
        assert_eq!(out[1], Err(StreamError::StreamIo("connection reset".into())));
    }

    #[tokio::test]
    async fn long_line_built_from_many_chunks() {
        let mut parts: Vec<&'static [u8]> = vec![&b"data: "[..]];
        parts.extend(std::iter::repeat(&b"ab"[..]).take(500));
        parts.push(b"\nnext\n");
        let out: Vec<String> = collect(LineStream::new(chunks(&parts)))
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), 6 + 1000);
        assert_eq!(out[1], "next");
    }

    #[tokio::test]
    async fn oversized_line_ends_stream() {
        let lines = LineStream::with_max_line(chunks(&[b"ok\n", b"0123", b"456789", b"\nlate\n"]), 8);
        let out = collect(lines).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_deref(), Ok("ok"));
        assert_eq!(out[1], Err(StreamError::StreamIo("line exceeds 8 bytes".into())));
    }
}
