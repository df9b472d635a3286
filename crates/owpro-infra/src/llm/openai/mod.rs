//! OpenAI remote model provider.
//!
//! Uses [`async_openai`] for type-safe chat completion requests and built-in
//! SSE streaming. The health check lists models with a plain `GET /models`
//! so its timeout and error mapping match the local provider's.

pub mod config;
pub mod streaming;

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionStreamOptions,
    CreateChatCompletionRequest,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use owpro_core::llm::provider::{ChunkStream, ModelProvider};
use owpro_observe::genai_attrs::PROVIDER_OPENAI;
use owpro_types::config::RemoteProviderConfig;
use owpro_types::llm::{
    MessageRole, ProviderError, ProviderKind, ProviderRequest, ProviderResponse,
};

use self::config::OpenAiSettings;
use self::streaming::{map_openai_stream, map_usage};
use crate::llm::{map_transport_error, status_error};

/// Remote provider for the OpenAI chat completions API (or any endpoint
/// speaking it, via `base_url`).
///
/// # API Key Security
///
/// Does NOT derive Debug: the `async_openai::Client` holds the API key.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model_aliases: HashMap<String, String>,
    request_timeout: Duration,
}

/// Response body of `GET /models`.
#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl OpenAiProvider {
    /// Create a provider from resolved settings.
    pub fn new(settings: OpenAiSettings) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.request_timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client: Client::with_config(settings.client_config()),
            http,
            base_url: settings.base_url,
            api_key: settings.api_key,
            model_aliases: settings.model_aliases,
            request_timeout: settings.request_timeout,
        })
    }

    pub fn from_config(
        config: &RemoteProviderConfig,
        api_key: Option<SecretString>,
    ) -> Result<Self, ProviderError> {
        Self::new(OpenAiSettings::from_remote_config(config, api_key))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key(&self) -> Result<&SecretString, ProviderError> {
        self.api_key.as_ref().ok_or(ProviderError::AuthenticationFailed)
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Run `fut` under the request timeout.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        tokio::time::timeout(self.request_timeout, fut)
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout_ms()))?
    }

    /// Build a [`CreateChatCompletionRequest`] from a [`ProviderRequest`].
    fn build_request(&self, request: &ProviderRequest, stream: bool) -> CreateChatCompletionRequest {
        let messages = request
            .messages
            .iter()
            .map(|msg| match msg.role {
                MessageRole::System => {
                    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                        content: ChatCompletionRequestSystemMessageContent::Text(
                            msg.content.clone(),
                        ),
                        name: None,
                    })
                }
                MessageRole::User => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                        name: None,
                    })
                }
                MessageRole::Assistant => {
                    #[allow(deprecated)]
                    ChatCompletionRequestMessage::Assistant(
                        ChatCompletionRequestAssistantMessage {
                            content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                                msg.content.clone(),
                            )),
                            refusal: None,
                            name: None,
                            audio: None,
                            tool_calls: None,
                            function_call: None,
                        },
                    )
                }
            })
            .collect();

        let mut req = CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            max_completion_tokens: Some(request.max_tokens),
            temperature: Some(request.temperature as f32),
            ..Default::default()
        };

        if stream {
            req.stream = Some(true);
            req.stream_options = Some(ChatCompletionStreamOptions {
                include_usage: Some(true),
                include_obfuscation: None,
            });
        }

        req
    }
}

impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER_OPENAI
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Remote
    }

    fn translate_model(&self, model_id: &str) -> String {
        self.model_aliases
            .get(model_id)
            .cloned()
            .unwrap_or_else(|| model_id.to_string())
    }

    async fn health_check(&self) -> Result<Vec<String>, ProviderError> {
        let key = self.api_key()?;

        let response = self
            .http
            .get(format!("{}/models", self.base_url))
            .bearer_auth(key.expose_secret())
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.request_timeout))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let list: ModelList = response.json().await.map_err(|e| {
            ProviderError::Deserialization(format!("failed to parse /models: {e}"))
        })?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.api_key()?;
        let oai_request = self.build_request(request, false);

        let response = self
            .bounded(async {
                self.client
                    .chat()
                    .create(oai_request)
                    .await
                    .map_err(|e| map_openai_error(e, self.timeout_ms()))
            })
            .await?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(ProviderResponse {
            model: response.model,
            content,
            usage: response.usage.as_ref().map(map_usage),
        })
    }

    fn generate_stream(&self, request: ProviderRequest) -> ChunkStream {
        let key_missing = self.api_key.is_none();
        let oai_request = self.build_request(&request, true);
        let client = self.client.clone();
        let timeout = self.request_timeout;
        let timeout_ms = self.timeout_ms();

        Box::pin(async_stream::try_stream! {
            if key_missing {
                Err::<(), _>(ProviderError::AuthenticationFailed)?;
                return;
            }

            let oai_stream = tokio::time::timeout(timeout, client.chat().create_stream(oai_request))
                .await
                .map_err(|_| ProviderError::Timeout(timeout_ms))?
                .map_err(|e| map_openai_error(e, timeout_ms))?;

            let mut inner = map_openai_stream(oai_stream);

            use futures_util::StreamExt;
            while let Some(chunk) = inner.next().await {
                yield chunk?;
            }
        })
    }
}

/// Map an `async_openai::error::OpenAIError` to a [`ProviderError`].
///
/// `timeout_ms` is the configured request timeout, reported when the
/// transport gave up waiting.
fn map_openai_error(err: async_openai::error::OpenAIError, timeout_ms: u64) -> ProviderError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "invalid_api_key"
                || error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
                || api_err.message.contains("Invalid API key")
            {
                return ProviderError::AuthenticationFailed;
            }

            let status = if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                429
            } else if code == "server_error" || error_type == "server_error" {
                503
            } else if code == "model_not_found" {
                404
            } else {
                400
            };
            ProviderError::Status {
                status,
                body: api_err.message.clone(),
            }
        }
        OpenAIError::Reqwest(reqwest_err) => match reqwest_err.status() {
            Some(status) if status.as_u16() == 401 || status.as_u16() == 403 => {
                ProviderError::AuthenticationFailed
            }
            Some(status) => ProviderError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None if reqwest_err.is_timeout() => ProviderError::Timeout(timeout_ms),
            None => ProviderError::Transport(err.to_string()),
        },
        OpenAIError::JSONDeserialize(_, content) => {
            ProviderError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::StreamError(stream_err) => ProviderError::Stream(stream_err.to_string()),
        OpenAIError::InvalidArgument(msg) => ProviderError::Status {
            status: 400,
            body: msg.clone(),
        },
        _ => ProviderError::Transport(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use owpro_types::llm::Message;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new(config::openai_defaults(Some(SecretString::from(
            "sk-test".to_string(),
        ))))
        .unwrap()
    }

    fn request(messages: Vec<Message>) -> ProviderRequest {
        ProviderRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages,
            max_tokens: 1024,
            temperature: 0.7,
            stream: false,
        }
    }

    #[test]
    fn test_identity() {
        let provider = provider();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.kind(), ProviderKind::Remote);
        assert_eq!(provider.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_translate_model_uses_aliases() {
        let provider = provider();
        assert_eq!(provider.translate_model("llama2"), "gpt-3.5-turbo");
        assert_eq!(provider.translate_model("mistral"), "gpt-3.5-turbo");
        assert_eq!(provider.translate_model("gpt-4"), "gpt-4");
    }

    #[test]
    fn test_build_request_messages() {
        let provider = provider();
        let mut messages = vec![Message::system("Be helpful"), Message::user("Hello")];
        messages.push(Message {
            role: MessageRole::Assistant,
            content: "Hi there!".to_string(),
        });

        let oai_req = provider.build_request(&request(messages), false);
        assert_eq!(oai_req.model, "gpt-3.5-turbo");
        assert_eq!(oai_req.messages.len(), 3);
        assert_eq!(oai_req.max_completion_tokens, Some(1024));
        assert_eq!(oai_req.temperature, Some(0.7));
        assert!(oai_req.stream.is_none());
        assert!(oai_req.stream_options.is_none());
    }

    #[test]
    fn test_build_request_streaming() {
        let provider = provider();
        let oai_req = provider.build_request(&request(vec![Message::user("Hello")]), true);
        assert_eq!(oai_req.stream, Some(true));
        let opts = oai_req.stream_options.unwrap();
        assert_eq!(opts.include_usage, Some(true));
    }

    #[tokio::test]
    async fn test_generate_without_key_fails_fast() {
        let provider = OpenAiProvider::new(config::openai_defaults(None)).unwrap();
        let err = provider
            .generate(&request(vec![Message::user("Hello")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn test_stream_without_key_fails_fast() {
        use futures_util::StreamExt;

        let provider = OpenAiProvider::new(config::openai_defaults(None)).unwrap();
        let mut stream = provider.generate_stream(request(vec![Message::user("Hello")]));
        let first = stream.next().await.unwrap();
        assert!(matches!(first, Err(ProviderError::AuthenticationFailed)));
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_map_openai_error_api_auth() {
        use async_openai::error::{ApiError, OpenAIError};
        let api_err = ApiError {
            message: "Incorrect API key provided".to_string(),
            r#type: Some("invalid_request_error".to_string()),
            param: None,
            code: Some("invalid_api_key".to_string()),
        };
        let err = map_openai_error(OpenAIError::ApiError(api_err), 30_000);
        assert!(matches!(err, ProviderError::AuthenticationFailed));
    }

    #[test]
    fn test_map_openai_error_rate_limit() {
        use async_openai::error::{ApiError, OpenAIError};
        let api_err = ApiError {
            message: "Rate limit exceeded".to_string(),
            r#type: Some("rate_limit_error".to_string()),
            param: None,
            code: None,
        };
        let err = map_openai_error(OpenAIError::ApiError(api_err), 30_000);
        assert!(matches!(err, ProviderError::Status { status: 429, .. }));
    }

    #[test]
    fn test_map_openai_error_invalid_argument() {
        use async_openai::error::OpenAIError;
        let err = map_openai_error(OpenAIError::InvalidArgument("bad arg".to_string()), 30_000);
        assert!(matches!(err, ProviderError::Status { status: 400, ref body } if body == "bad arg"));
    }

    #[tokio::test]
    async fn test_map_openai_error_timeout_reports_configured_limit() {
        use async_openai::error::OpenAIError;

        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let reqwest_err = reqwest::Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap()
            .get(format!("http://{addr}/v1/models"))
            .send()
            .await
            .unwrap_err();
        assert!(reqwest_err.is_timeout());

        let err = map_openai_error(OpenAIError::Reqwest(reqwest_err), 30_000);
        assert!(matches!(err, ProviderError::Timeout(30_000)));
        assert!(err.to_string().contains("30000"));
        drop(listener);
    }
}
