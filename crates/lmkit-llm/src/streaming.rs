//! Provider-independent sequencing of streamed chat responses

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures_util::{Stream, StreamExt};
use serde_json::{Value, json};

use crate::error::LlmError;
use crate::transport::ChunkStream;
use crate::types::{ChatOutput, HTTP_RESPONSE_KEY, Message, StreamEvent, StreamOutput};

/// Maps one parsed provider chunk to a provisional event
pub type ChunkParser = Box<dyn FnMut(&Value) -> Result<StreamEvent, LlmError> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No chunk seen yet
    Pending,
    Streaming,
    Finished,
}

/// Pull-based stream of normalized events with the reply accumulated so far
///
/// The first chunk always produces a `Start` event followed by the chunk's
/// own event. A provider `Start` after that becomes `Continue`. The stream
/// ends after `Finish` or `Done`. A transport that closes without either is
/// treated as an implicit finish once anything was received, and as an
/// [`LlmError::UnexpectedResponse`] otherwise. The stream is never restarted.
pub struct DeltaStream {
    model_id: String,
    chunks: ChunkStream,
    parse: ChunkParser,
    phase: Phase,
    reply: String,
    queued: Option<StreamOutput>,
    last_raw: Option<Value>,
}

impl std::fmt::Debug for DeltaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeltaStream")
            .field("model_id", &self.model_id)
            .field("phase", &self.phase)
            .field("reply", &self.reply)
            .finish_non_exhaustive()
    }
}

impl DeltaStream {
    pub fn new(model_id: impl Into<String>, chunks: ChunkStream, parse: ChunkParser) -> Self {
        Self {
            model_id: model_id.into(),
            chunks,
            parse,
            phase: Phase::Pending,
            reply: String::new(),
            queued: None,
            last_raw: None,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Reply accumulated so far
    pub fn reply(&self) -> &str {
        &self.reply
    }

    /// Drive the stream to its end and fold it into a [`ChatOutput`]
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the transport or the adapter
    pub async fn collect_output(mut self) -> Result<ChatOutput, LlmError> {
        let mut last = None;
        while let Some(item) = self.next().await {
            last = Some(item?);
        }

        let Some(last) = last else {
            return Err(LlmError::unexpected("", "stream did not finish"));
        };

        let mut output = ChatOutput::new(self.model_id, vec![Message::assistant(last.reply)]);
        if let StreamEvent::Finish {
            finish_reason,
            usage,
            cost,
            ..
        } = last.event
        {
            output.finish_reason = finish_reason;
            output.usage = usage;
            output.cost = cost;
        }
        if let Some(raw) = last.raw {
            output.extra.insert(HTTP_RESPONSE_KEY.to_owned(), raw);
        }
        Ok(output)
    }

    fn on_chunk(&mut self, chunk: &str) -> Result<StreamOutput, LlmError> {
        let value = serde_json::from_str::<Value>(chunk).unwrap_or_else(|_| json!({ "data": chunk }));

        let event = match (self.parse)(&value) {
            Ok(StreamEvent::Start) => StreamEvent::text(""),
            Ok(event) => event,
            Err(e) => {
                self.phase = Phase::Finished;
                return Err(match e {
                    unexpected @ LlmError::UnexpectedResponse { .. } => unexpected,
                    other => LlmError::unexpected(chunk, other.to_string()),
                });
            }
        };

        self.reply.push_str(event.delta());
        let first = self.phase == Phase::Pending;
        self.phase = if event.is_terminal() { Phase::Finished } else { Phase::Streaming };
        self.last_raw = Some(value.clone());

        let output = StreamOutput {
            model_id: self.model_id.clone(),
            event,
            reply: self.reply.clone(),
            raw: Some(value),
        };

        if first {
            tracing::debug!(model_id = %self.model_id, "stream started");
            self.queued = Some(output);
            return Ok(StreamOutput {
                model_id: self.model_id.clone(),
                event: StreamEvent::Start,
                reply: String::new(),
                raw: None,
            });
        }
        Ok(output)
    }

    fn on_end(&mut self) -> Result<StreamOutput, LlmError> {
        let started = self.phase == Phase::Streaming;
        self.phase = Phase::Finished;

        if !started {
            return Err(LlmError::unexpected("", "stream did not finish"));
        }

        tracing::debug!(model_id = %self.model_id, "stream closed without terminal event, finishing");
        Ok(StreamOutput {
            model_id: self.model_id.clone(),
            event: StreamEvent::finish("", None),
            reply: self.reply.clone(),
            raw: self.last_raw.take(),
        })
    }
}

impl Stream for DeltaStream {
    type Item = Result<StreamOutput, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(output) = this.queued.take() {
            return Poll::Ready(Some(Ok(output)));
        }
        if this.phase == Phase::Finished {
            return Poll::Ready(None);
        }

        match ready!(this.chunks.as_mut().poll_next(cx)) {
            Some(Ok(chunk)) => Poll::Ready(Some(this.on_chunk(&chunk))),
            Some(Err(e)) => {
                this.phase = Phase::Finished;
                Poll::Ready(Some(Err(e)))
            }
            None => Poll::Ready(Some(this.on_end())),
        }
    }
}
