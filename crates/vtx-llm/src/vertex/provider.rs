//! Vertex AI Anthropic request building and stream driving.
//!
//! One turn is one request/response cycle:
//! 1. [`build_request`] normalizes and encodes the conversation.
//! 2. [`prepare_request`] resolves the endpoint and bearer token into a
//!    ready-to-send `reqwest` request. The caller sends it (and owns retry).
//! 3. [`stream_vertex_anthropic`] consumes the response and yields
//!    [`AssistantEvent`]s ending in exactly one `done` or `error`.

use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use vtx_core::events::AssistantEvent;
use vtx_core::messages::{AssistantMessage, Context, StopReason};
use vtx_core::models::ModelInfo;
use vtx_core::text::sanitize_wtf8;
use vtx_settings::VertexSettings;

use super::message_converter::{build_system_prompt, convert_messages, convert_tools};
use super::stream_handler::TurnAssembler;
use super::types::{ThinkingConfig, VertexRequest, VertexSseEvent};
use crate::provider::{AccessTokenSource, ProviderError, ProviderResult, StreamOptions};
use crate::sse::decode_sse_events;

// ─────────────────────────────────────────────────────────────────────────────
// Request building
// ─────────────────────────────────────────────────────────────────────────────

/// Build the request body for one turn.
pub fn build_request(
    context: &Context,
    model: &ModelInfo,
    options: &StreamOptions,
    settings: &VertexSettings,
) -> VertexRequest {
    VertexRequest {
        anthropic_version: settings.anthropic_version.clone(),
        messages: convert_messages(&context.messages, &model.identity()),
        max_tokens: calculate_max_tokens(model, options),
        stream: true,
        system: build_system_prompt(context.system_prompt.as_deref()),
        tools: context.tools.as_deref().map(convert_tools),
        thinking: build_thinking_config(model, options),
    }
}

/// `max_tokens`: the caller's value, else a third of the model maximum.
fn calculate_max_tokens(model: &ModelInfo, options: &StreamOptions) -> u64 {
    options
        .max_tokens
        .filter(|&n| n > 0)
        .unwrap_or(model.max_tokens / 3)
}

/// Thinking is sent only when requested and supported by the model.
fn build_thinking_config(model: &ModelInfo, options: &StreamOptions) -> Option<ThinkingConfig> {
    let effort = options.reasoning?;
    if !model.reasoning {
        debug!(model = %model.id, "model does not support reasoning, omitting thinking");
        return None;
    }
    Some(ThinkingConfig::enabled(options.thinking_budgets.resolve(effort)))
}

/// Resolve endpoint and token into a POST the caller can send.
pub async fn prepare_request(
    http: &reqwest::Client,
    settings: &VertexSettings,
    model: &ModelInfo,
    body: &VertexRequest,
    tokens: &dyn AccessTokenSource,
) -> ProviderResult<reqwest::RequestBuilder> {
    let url = settings.stream_url(model)?;
    let token = tokens.access_token().await?;

    debug!(
        model = %model.id,
        max_tokens = body.max_tokens,
        message_count = body.messages.len(),
        has_tools = body.tools.is_some(),
        has_thinking = body.thinking.is_some(),
        "Prepared Vertex request"
    );

    Ok(http
        .post(url)
        .bearer_auth(token)
        .header(CONTENT_TYPE, "application/json")
        .json(body))
}

// ─────────────────────────────────────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────────────────────────────────────

/// Response body as a stream of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ProviderError>> + Send>>;

/// An open response: status plus body.
pub struct WireResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body chunks.
    pub body: ByteStream,
}

impl WireResponse {
    /// Wrap any byte stream.
    pub fn new<S, E>(status: u16, body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<ProviderError> + 'static,
    {
        Self {
            status,
            body: Box::pin(body.map(|chunk: Result<Bytes, E>| -> Result<Bytes, ProviderError> {
                chunk.map_err(Into::into)
            })),
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Read the whole body as text.
    pub async fn text(mut self) -> ProviderResult<String> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(sanitize_wtf8(&buf).into_owned())
    }
}

impl From<reqwest::Response> for WireResponse {
    fn from(response: reqwest::Response) -> Self {
        Self::new(response.status().as_u16(), response.bytes_stream())
    }
}

impl std::fmt::Debug for WireResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireResponse").field("status", &self.status).finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event stream
// ─────────────────────────────────────────────────────────────────────────────

/// Events of one turn. The last item is always `done` or `error`.
#[derive(Debug)]
pub struct AssistantEventStream {
    inner: UnboundedReceiverStream<AssistantEvent>,
}

impl AssistantEventStream {
    /// Drain the stream and return the final turn.
    pub async fn result(mut self) -> ProviderResult<AssistantMessage> {
        while let Some(event) = self.inner.next().await {
            if let Some(message) = event.into_final() {
                return Ok(message);
            }
        }
        Err(ProviderError::Other {
            message: "stream ended without a terminal event".into(),
        })
    }
}

impl Stream for AssistantEventStream {
    type Item = AssistantEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Assemble one turn from `response` on a background task.
///
/// Must be called within a Tokio runtime. Cancelling `cancel` ends the turn
/// as `aborted` at the next read of the body.
pub fn stream_vertex_anthropic(
    model: &ModelInfo,
    response: WireResponse,
    cancel: CancellationToken,
) -> AssistantEventStream {
    let (tx, rx) = mpsc::unbounded_channel();
    drop(tokio::spawn(run_turn(model.clone(), response, cancel, tx)));
    AssistantEventStream {
        inner: UnboundedReceiverStream::new(rx),
    }
}

#[instrument(skip_all, fields(model = %model.id, status = response.status))]
async fn run_turn(
    model: ModelInfo,
    response: WireResponse,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<AssistantEvent>,
) {
    let mut assembler = TurnAssembler::new(&model);
    let terminal = match drive(&mut assembler, response, &cancel, &tx).await {
        Ok(()) => assembler.finish(),
        Err(e) => {
            let reason = if cancel.is_cancelled() {
                StopReason::Aborted
            } else {
                StopReason::Error
            };
            warn!(error = %e, category = e.category(), ?reason, "Vertex turn failed");
            assembler.fail(reason, e.to_string())
        }
    };
    let _ = tx.send(terminal);
}

async fn drive(
    assembler: &mut TurnAssembler,
    response: WireResponse,
    cancel: &CancellationToken,
    tx: &mpsc::UnboundedSender<AssistantEvent>,
) -> ProviderResult<()> {
    if !response.is_success() {
        let status = response.status;
        let message = response.text().await?;
        return Err(ProviderError::Api { status, message });
    }

    let _ = tx.send(assembler.start());

    let events = decode_sse_events::<VertexSseEvent, _, _>(response.body);
    futures::pin_mut!(events);

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ProviderError::Cancelled),
            next = events.next() => next,
        };
        let Some(event) = next else {
            break;
        };
        for out in assembler.handle(event?) {
            if tx.send(out).is_err() {
                debug!("event receiver dropped, stopping turn");
                return Ok(());
            }
        }
    }

    if cancel.is_cancelled() {
        return Err(ProviderError::Cancelled);
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
