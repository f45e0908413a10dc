use crate::exceptions::AidantError;
use crate::llm::api_models::{ChatCompletionChunk, ChatCompletionRequest};
use reqwest::Client as HttpClient;
use std::env;
use tracing::debug;

#[derive(Debug, PartialEq)]
pub struct ModelSpec {
    pub api_key_env: &'static str,
    pub default_base_url: &'static str,
    pub model_id_short: String,
    pub extra_params: Option<serde_json::Value>,
}

impl ModelSpec {
    /// `provider/model[+key=value...]`, provider being `openai` or `openrouter`.
    pub fn parse(full_str: &str) -> Result<Self, AidantError> {
        let (base_model, params_part) = full_str.split_once('+').unwrap_or((full_str, ""));
        let (provider, model_name) = base_model.split_once('/').ok_or_else(|| {
            AidantError::Configuration(format!(
                "Invalid model format '{}'. Expected 'provider/model'.",
                base_model
            ))
        })?;

        let (api_key_env, default_base_url) = match provider {
            "openrouter" => ("OPENROUTER_API_KEY", "https://openrouter.ai/api/v1"),
            "openai" => ("OPENAI_API_KEY", "https://api.openai.com/v1"),
            _ => {
                return Err(AidantError::Configuration(format!(
                    "Unrecognized provider prefix in '{}'. Use 'openai/' or 'openrouter/'.",
                    full_str
                )));
            }
        };

        let mut extra_map: Option<serde_json::Map<String, serde_json::Value>> = None;
        if provider == "openrouter" {
            extra_map
                .get_or_insert_default()
                .insert("usage".to_string(), serde_json::json!({ "include": true }));
        }

        for param in params_part.split('+').filter(|p| !p.is_empty()) {
            let m = extra_map.get_or_insert_default();
            match param.split_once('=') {
                Some((k, v)) => {
                    let val = serde_json::from_str::<serde_json::Value>(v)
                        .unwrap_or_else(|_| serde_json::Value::String(v.to_string()));
                    m.insert(k.to_string(), val);
                }
                None => {
                    m.insert(param.to_string(), serde_json::Value::Bool(true));
                }
            }
        }

        Ok(Self {
            api_key_env,
            default_base_url,
            model_id_short: model_name.to_string(),
            extra_params: extra_map.map(serde_json::Value::Object),
        })
    }
}

#[derive(Debug)]
pub struct LlmClient {
    http: HttpClient,
    api_key: String,
    base_url: String,
    pub model_id: String,
    extra_params: Option<serde_json::Value>,
}

impl LlmClient {
    pub fn new(full_model_string: &str) -> Result<Self, AidantError> {
        let spec = ModelSpec::parse(full_model_string)?;

        let api_key = env::var(spec.api_key_env).map_err(|_| {
            AidantError::Configuration(format!("{} is required.", spec.api_key_env))
        })?;
        let base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| spec.default_base_url.to_string());

        Ok(Self::from_spec(spec, api_key, base_url))
    }

    pub fn from_spec(spec: ModelSpec, api_key: String, base_url: String) -> Self {
        Self {
            http: crate::utils::setup_http_client(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model_id: spec.model_id_short,
            extra_params: spec.extra_params,
        }
    }

    pub fn get_extra_params(&self) -> Option<serde_json::Value> {
        self.extra_params.clone()
    }

    /// Sends a streaming request; the caller consumes the SSE body.
    pub async fn stream_chat(
        &self,
        req: ChatCompletionRequest,
    ) -> Result<reqwest::Response, AidantError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(%url, model = %req.model, "sending chat request");

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&req)
            .send()
            .await
            .map_err(|e| AidantError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let error_msg = if text.trim().is_empty() {
                format!("API Error (Status: {}): [Empty Body]", status)
            } else {
                format!("API Error (Status: {}): {}", status, text)
            };
            return Err(AidantError::Provider(error_msg));
        }

        Ok(response)
    }
}

/// Parses one SSE line of the form `data: {json}`.
pub fn parse_sse_line(line: &str) -> Option<ChatCompletionChunk> {
    let content = line.trim().strip_prefix("data:")?.trim_start();
    if content == "[DONE]" {
        return None;
    }
    serde_json::from_str(content).ok()
}
