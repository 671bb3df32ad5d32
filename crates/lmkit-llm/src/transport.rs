//! HTTP request description and raw stream framing

use std::pin::Pin;

use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt, TryStreamExt, future};
use http::HeaderMap;
use serde_json::Value;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;
use url::Url;

use crate::error::LlmError;

/// How a provider frames its streaming body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamTransport {
    /// `text/event-stream` frames; each event's `data` is one chunk
    ServerSentEvents,
    /// Newline-delimited payloads, optional `data:` prefix
    Lines,
}

/// A fully built provider request
#[derive(Debug, Clone)]
pub struct HttpRequestSpec {
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Value,
    pub query: Vec<(String, String)>,
}

impl HttpRequestSpec {
    pub fn new(url: Url, body: Value) -> Self {
        Self {
            url,
            headers: HeaderMap::new(),
            body,
            query: Vec::new(),
        }
    }
}

/// Raw text chunks pulled off a streaming response
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Split a streaming body into chunks according to `transport`
///
/// Blank frames are dropped; everything else is handed on verbatim.
pub fn decode_chunks<S>(body: S, transport: StreamTransport) -> ChunkStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    match transport {
        StreamTransport::ServerSentEvents => Box::pin(body.eventsource().filter_map(|result| {
            future::ready(match result {
                Ok(event) => non_blank(&event.data),
                Err(e) => Some(Err(LlmError::Http(format!("event stream error: {e}")))),
            })
        })),
        StreamTransport::Lines => {
            let reader = StreamReader::new(body.map_err(std::io::Error::other));
            Box::pin(FramedRead::new(reader, LinesCodec::new()).filter_map(|result| {
                future::ready(match result {
                    Ok(line) => {
                        let line = line.trim();
                        non_blank(line.strip_prefix("data:").unwrap_or(line))
                    }
                    Err(e) => Some(Err(LlmError::Http(format!("line stream error: {e}")))),
                })
            }))
        }
    }
}

fn non_blank(data: &str) -> Option<Result<String, LlmError>> {
    let data = data.trim();
    (!data.is_empty()).then(|| Ok(data.to_owned()))
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    fn body(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static {
        let parts: Vec<_> = parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect();
        futures::stream::iter(parts)
    }

    #[tokio::test]
    async fn sse_frames_yield_data_fields() {
        let chunks: Vec<_> = decode_chunks(
            body(&["data: {\"a\":1}\n\n: keep-alive\n\nda", "ta: [DONE]\n\n"]),
            StreamTransport::ServerSentEvents,
        )
        .collect()
        .await;

        let chunks: Vec<String> = chunks.into_iter().map(Result::unwrap).collect();
        assert_eq!(chunks, vec!["{\"a\":1}", "[DONE]"]);
    }

    #[tokio::test]
    async fn lines_strip_data_prefix_and_blank_lines() {
        let chunks: Vec<_> = decode_chunks(
            body(&["data: {\"reply\":\"\"}\n\n", "{\"x\":", "2}\n", "plain\n"]),
            StreamTransport::Lines,
        )
        .collect()
        .await;

        let chunks: Vec<String> = chunks.into_iter().map(Result::unwrap).collect();
        assert_eq!(chunks, vec!["{\"reply\":\"\"}", "{\"x\":2}", "plain"]);
    }
}
