//! Generation provider contract.
//!
//! A provider is anything that takes a connection and a request and hands
//! back a stream: zero or more results, then the end or an error. Dropping
//! the stream abandons the call, and the token passed in lets a provider
//! notice cancellation at its own suspension points.

use crate::progress::{GenerationKind, Progress, ProgressGuard};
use futures::stream::{BoxStream, Stream, StreamExt};
use mb_core::{Connection, Size};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("provider error: {0}")]
    Provider(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// What to generate.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub kind: GenerationKind,
    pub prompt: String,
    /// Target card size, part of the cache fingerprint.
    pub size: Size,
    /// Extra text gathered from the selection (bodies of selected text cards).
    pub context: Vec<String>,
}

impl GenerationRequest {
    pub fn new(kind: GenerationKind, prompt: impl Into<String>, size: Size) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            size,
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: Vec<String>) -> Self {
        self.context = context;
        self
    }

    /// Prompt with context appended, as sent to the provider.
    pub fn full_prompt(&self) -> String {
        if self.context.is_empty() {
            return self.prompt.clone();
        }
        format!("{}\n\nContext:\n{}", self.prompt, self.context.join("\n"))
    }
}

/// One result emitted by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GenerationOutput {
    Image { src: String },
    Text { body: String },
    Video { src: String },
}

pub type ResultStream = BoxStream<'static, Result<GenerationOutput, GenerationError>>;

/// An external generation provider.
pub trait Generator: Send + Sync {
    fn generate(
        &self,
        connection: &Connection,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> ResultStream;
}

/// A provider stream that holds one progress count until it ends or is
/// dropped, whichever comes first.
pub struct Tracked<S> {
    inner: S,
    guard: Option<ProgressGuard>,
}

impl<S: Stream + Unpin> Stream for Tracked<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        let polled = Pin::new(&mut self.inner).poll_next(cx);
        if let Poll::Ready(None) = polled {
            self.guard = None;
        }
        polled
    }
}

/// Start a generation call, counted against `request.kind` for as long as
/// the returned stream is alive.
pub fn tracked_generate(
    generator: &dyn Generator,
    progress: &Progress,
    connection: &Connection,
    request: GenerationRequest,
    cancel: CancellationToken,
) -> Tracked<ResultStream> {
    let guard = progress.track(request.kind);
    log::debug!(
        "generate {} via {}: {:?}",
        request.kind,
        connection.provider,
        request.prompt
    );
    Tracked {
        inner: generator.generate(connection, request, cancel),
        guard: Some(guard),
    }
}

/// Offline provider that echoes the prompt back.
///
/// Emits `count` results, one every `delay`, and stops early when cancelled.
/// Images come back as SVG data URLs so they render without a network.
#[derive(Debug, Clone)]
pub struct EchoGenerator {
    pub count: usize,
    pub delay: Duration,
}

impl Default for EchoGenerator {
    fn default() -> Self {
        Self {
            count: 1,
            delay: Duration::from_millis(150),
        }
    }
}

impl EchoGenerator {
    fn output(kind: GenerationKind, prompt: &str, n: usize) -> GenerationOutput {
        match kind {
            GenerationKind::Image => GenerationOutput::Image {
                src: format!(
                    "data:image/svg+xml;utf8,<svg xmlns='http://www.w3.org/2000/svg'><text y='20'>{}#{n}</text></svg>",
                    prompt.replace(['<', '>', '\''], "")
                ),
            },
            GenerationKind::Text => GenerationOutput::Text {
                body: format!("{prompt} ({n})"),
            },
            GenerationKind::Video => GenerationOutput::Video {
                src: format!("echo://video/{n}"),
            },
        }
    }
}

impl Generator for EchoGenerator {
    fn generate(
        &self,
        _connection: &Connection,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> ResultStream {
        let delay = self.delay;
        futures::stream::iter(0..self.count)
            .then(move |n| {
                let cancel = cancel.clone();
                let request = request.clone();
                async move {
                    tokio::select! {
                        _ = cancel.cancelled() => None,
                        _ = tokio::time::sleep(delay) => {
                            Some(Ok::<_, GenerationError>(Self::output(
                                request.kind,
                                &request.full_prompt(),
                                n,
                            )))
                        }
                    }
                }
            })
            .take_while(|item| futures::future::ready(item.is_some()))
            .filter_map(futures::future::ready)
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressCounters;

    #[test]
    fn full_prompt_appends_context() {
        let req = GenerationRequest::new(GenerationKind::Text, "a poem", Size::new(1.0, 1.0))
            .with_context(vec!["salt".into(), "wind".into()]);
        assert_eq!(req.full_prompt(), "a poem\n\nContext:\nsalt\nwind");
    }

    #[test]
    fn output_json_is_tagged() {
        let out = GenerationOutput::Text { body: "hi".into() };
        let json = serde_json::to_string(&out).unwrap();
        assert_eq!(json, r#"{"type":"text","body":"hi"}"#);
    }

    #[tokio::test]
    async fn tracked_stream_releases_on_completion() {
        let progress = Progress::default();
        let generator = EchoGenerator {
            count: 2,
            delay: Duration::from_millis(1),
        };
        let req = GenerationRequest::new(GenerationKind::Image, "dunes", Size::new(200.0, 300.0));
        let mut stream = tracked_generate(
            &generator,
            &progress,
            &Connection::default(),
            req,
            CancellationToken::new(),
        );
        assert_eq!(progress.snapshot().image_gen, 1);
        let mut n = 0;
        while let Some(item) = stream.next().await {
            assert!(item.is_ok());
            n += 1;
        }
        assert_eq!(n, 2);
        // Released at end of stream, before the stream itself is dropped.
        assert_eq!(progress.snapshot(), ProgressCounters::default());
    }

    #[tokio::test]
    async fn tracked_stream_releases_on_early_drop() {
        let progress = Progress::default();
        let generator = EchoGenerator {
            count: 10,
            delay: Duration::from_millis(1),
        };
        let req = GenerationRequest::new(GenerationKind::Text, "x", Size::default());
        let mut stream = tracked_generate(
            &generator,
            &progress,
            &Connection::default(),
            req,
            CancellationToken::new(),
        );
        let _first = stream.next().await;
        assert_eq!(progress.snapshot().text_gen, 1);
        drop(stream);
        assert_eq!(progress.snapshot().text_gen, 0);
    }

    #[tokio::test]
    async fn echo_stops_when_cancelled() {
        let generator = EchoGenerator {
            count: 100,
            delay: Duration::from_secs(3600),
        };
        let token = CancellationToken::new();
        let req = GenerationRequest::new(GenerationKind::Video, "x", Size::default());
        let mut stream = generator.generate(&Connection::default(), req, token.clone());
        token.cancel();
        assert!(stream.next().await.is_none());
    }
}
