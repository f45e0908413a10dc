use crate::exceptions::AidantError;
use crate::llm::api_models::{ChatCompletionRequest, Message, StreamOptions};
use crate::llm::client::{LlmClient, parse_sse_line};
use crate::models::{InteractionResult, TokenUsage};
use futures_util::TryStreamExt;
use std::time::Instant;
use tokio::io::AsyncBufReadExt;
use tracing::{debug, warn};

pub fn build_request(client: &LlmClient, system_prompt: &str, user_prompt: &str) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: client.model_id.clone(),
        messages: vec![Message::system(system_prompt), Message::user(user_prompt)],
        stream: true,
        stream_options: Some(StreamOptions {
            include_usage: true,
        }),
        extra_body: client.get_extra_params(),
    }
}

/// Streams one completion, handing each content delta to `on_delta` as it arrives.
///
/// An interrupted stream keeps whatever was received so far; a stream that
/// fails before any content is a provider error.
pub async fn execute_interaction(
    client: &LlmClient,
    system_prompt: &str,
    user_prompt: &str,
    mut on_delta: impl FnMut(&str),
) -> Result<InteractionResult, AidantError> {
    let req = build_request(client, system_prompt, user_prompt);
    let start_time = Instant::now();
    let response = client.stream_chat(req).await?;

    let mut full_response = String::new();
    let mut usage_data: Option<TokenUsage> = None;

    let stream = response.bytes_stream().map_err(std::io::Error::other);
    let reader = tokio_util::io::StreamReader::new(stream);
    let mut lines = tokio::io::BufReader::new(reader).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some(parsed) = parse_sse_line(&line) else {
                    continue;
                };
                if let Some(text) = parsed
                    .choices
                    .first()
                    .and_then(|c| c.delta.content.as_deref())
                    .filter(|t| !t.is_empty())
                {
                    full_response.push_str(text);
                    on_delta(text);
                }
                if let Some(u) = parsed.usage {
                    let cached = u
                        .prompt_tokens_details
                        .and_then(|d| d.cached_tokens)
                        .or(u.cached_tokens);
                    usage_data = Some(TokenUsage {
                        prompt_tokens: u.prompt_tokens,
                        completion_tokens: u.completion_tokens,
                        total_tokens: u.total_tokens,
                        cached_tokens: cached,
                        cost: u.cost,
                    });
                }
            }
            Ok(None) => break,
            Err(e) if !full_response.is_empty() => {
                warn!(error = %e, "stream interrupted, keeping partial response");
                break;
            }
            Err(e) => return Err(AidantError::Provider(format!("Stream error: {}", e))),
        }
    }

    let duration_ms = start_time.elapsed().as_millis() as u64;
    debug!(chars = full_response.len(), duration_ms, "completion finished");

    Ok(InteractionResult {
        content: full_response,
        token_usage: usage_data,
        duration_ms,
    })
}
