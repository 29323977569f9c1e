//! Ollama chat API backend.

use std::time::Duration;

use crate::model::{Backend, CompletionRequest, CompletionResult, ModelError, Usage};
use crate::tools::{ProposedInvocation, ToolDeclaration};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

pub const DEFAULT_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "qwen2.5-coder";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiTool<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ApiFunction<'a>,
}

#[derive(Debug, Serialize)]
struct ApiFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    message: ApiResponseMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ApiToolCall>,
}

#[derive(Debug, Deserialize)]
struct ApiToolCall {
    function: ApiFunctionCall,
}

#[derive(Debug, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an Ollama backend.
#[derive(Debug, Clone)]
pub struct OllamaBackendBuilder {
    host: String,
    model: String,
    timeout: Option<Duration>,
    system: Option<String>,
}

impl OllamaBackendBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            model: model.into(),
            timeout: None,
            system: None,
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Bound the whole HTTP exchange.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn build(self) -> Result<OllamaBackend, ModelError> {
        let mut client = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }
        let client = client
            .build()
            .map_err(|e| ModelError::Unavailable(format!("http client: {e}")))?;

        Ok(OllamaBackend {
            client,
            endpoint: format!("{}/api/chat", self.host.trim_end_matches('/')),
            model: self.model,
            system: self.system,
        })
    }
}

/// Ollama chat API backend.
pub struct OllamaBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    system: Option<String>,
}

impl OllamaBackend {
    pub fn builder(model: impl Into<String>) -> OllamaBackendBuilder {
        OllamaBackendBuilder::new(model)
    }

    fn tool_to_api(decl: &ToolDeclaration) -> ApiTool<'_> {
        ApiTool {
            tool_type: "function",
            function: ApiFunction {
                name: &decl.name,
                description: &decl.description,
                parameters: decl.input_schema(),
            },
        }
    }

    fn request_body<'a>(&'a self, request: CompletionRequest<'a>) -> ApiRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system {
            messages.push(ApiMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ApiMessage {
            role: "user",
            content: request.user_text,
        });

        ApiRequest {
            model: &self.model,
            messages,
            tools: request.tools.iter().map(Self::tool_to_api).collect(),
            stream: false,
        }
    }
}

impl std::fmt::Display for OllamaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ollama({}, {})", self.model, self.endpoint)
    }
}

impl Backend for OllamaBackend {
    async fn complete(
        &self,
        request: CompletionRequest<'_>,
    ) -> Result<CompletionResult, ModelError> {
        let body = self.request_body(request);

        info!(
            model = self.model.as_str(),
            tools = request.tools.len(),
            "sending request to ollama"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Unavailable(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ModelError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(ModelError::Api(format!("{status}: {text}")));
        }

        let result = parse_response(&text)?;
        debug!(
            invocations = result.invocations.len(),
            text_len = result.text.len(),
            "received response from ollama"
        );
        Ok(result)
    }
}

/// Parse a non-streaming `/api/chat` response body.
pub fn parse_response(body: &str) -> Result<CompletionResult, ModelError> {
    let api: ApiResponse =
        serde_json::from_str(body).map_err(|e| ModelError::MalformedResponse(e.to_string()))?;

    let invocations = api
        .message
        .tool_calls
        .into_iter()
        .map(|call| {
            let arguments = decode_arguments(&call.function.name, call.function.arguments)?;
            Ok(ProposedInvocation::new(call.function.name, arguments))
        })
        .collect::<Result<Vec<_>, ModelError>>()?;

    Ok(CompletionResult {
        text: api.message.content,
        invocations,
        usage: Usage {
            input_tokens: api.prompt_eval_count.unwrap_or_default(),
            output_tokens: api.eval_count.unwrap_or_default(),
        },
    })
}

/// Some models send arguments as a JSON-encoded string.
fn decode_arguments(tool: &str, arguments: Value) -> Result<Value, ModelError> {
    match arguments {
        Value::Object(_) | Value::Null => Ok(arguments),
        Value::String(encoded) => match serde_json::from_str::<Value>(&encoded) {
            Ok(decoded @ (Value::Object(_) | Value::Null)) => Ok(decoded),
            _ => Err(ModelError::MalformedResponse(format!(
                "arguments for {tool} are not a JSON object: {encoded}"
            ))),
        },
        other => Err(ModelError::MalformedResponse(format!(
            "arguments for {tool} are not a JSON object: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ParamType;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer a single HTTP request with `status` and `body`, returning the host URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&request) {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });
        format!("http://{addr}")
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + length
    }

    async fn complete_against(host: &str) -> Result<CompletionResult, ModelError> {
        let backend = OllamaBackend::builder("qwen2.5-coder")
            .host(host)
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        backend
            .complete(CompletionRequest {
                user_text: "What is 5 plus 3?",
                tools: &[],
            })
            .await
    }

    #[test]
    fn parses_tool_calls_in_order() {
        let body = json!({
            "model": "qwen2.5-coder",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "add_two_numbers", "arguments": {"a": 5, "b": 3}}},
                    {"function": {"name": "divide_two_numbers", "arguments": {"a": 15, "b": 3}}}
                ]
            },
            "done": true,
            "prompt_eval_count": 120,
            "eval_count": 30
        })
        .to_string();

        let result = parse_response(&body).unwrap();
        assert_eq!(result.text, "");
        assert_eq!(result.invocations.len(), 2);
        assert_eq!(result.invocations[0].name, "add_two_numbers");
        assert_eq!(result.invocations[1].arguments, json!({"a": 15, "b": 3}));
        assert_eq!(
            result.usage,
            Usage {
                input_tokens: 120,
                output_tokens: 30
            }
        );
    }

    #[test]
    fn text_only_response_has_no_invocations() {
        let body = r#"{"message":{"role":"assistant","content":"Hello there"},"done":true}"#;
        let result = parse_response(body).unwrap();
        assert_eq!(result.text, "Hello there");
        assert!(result.invocations.is_empty());
        assert_eq!(result.usage, Usage::default());
    }

    #[test]
    fn decodes_string_encoded_arguments() {
        let body = json!({
            "message": {
                "content": "",
                "tool_calls": [{"function": {"name": "list_files", "arguments": "{\"pattern\": \"*.rs\"}"}}]
            }
        })
        .to_string();
        let result = parse_response(&body).unwrap();
        assert_eq!(result.invocations[0].arguments, json!({"pattern": "*.rs"}));
    }

    #[test]
    fn missing_arguments_become_null() {
        let body = r#"{"message":{"content":"","tool_calls":[{"function":{"name":"list_files"}}]}}"#;
        let result = parse_response(body).unwrap();
        assert_eq!(result.invocations[0].arguments, Value::Null);
    }

    #[test]
    fn malformed_bodies_are_reported() {
        assert!(matches!(
            parse_response("not json"),
            Err(ModelError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_response(r#"{"done": true}"#),
            Err(ModelError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_response(
                r#"{"message":{"content":"","tool_calls":[{"function":{"name":"x","arguments":[1]}}]}}"#
            ),
            Err(ModelError::MalformedResponse(_))
        ));
    }

    #[test]
    fn request_body_wraps_declarations_as_functions() {
        let backend = OllamaBackend::builder("llama3.2")
            .host("http://ollama.local:11434/")
            .system("Use tools.")
            .build()
            .unwrap();
        let tools = [ToolDeclaration::new("add_two_numbers", "Adds two numbers together.")
            .param("a", ParamType::Integer, "The first number.")
            .param("b", ParamType::Integer, "The second number.")];

        let body = backend.request_body(CompletionRequest {
            user_text: "What is 5 plus 3?",
            tools: &tools,
        });
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["model"], "llama3.2");
        assert_eq!(value["stream"], false);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1], json!({"role": "user", "content": "What is 5 plus 3?"}));
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "add_two_numbers");
        assert_eq!(
            value["tools"][0]["function"]["parameters"]["required"],
            json!(["a", "b"])
        );
        assert_eq!(backend.to_string(), "ollama(llama3.2, http://ollama.local:11434/api/chat)");
    }

    #[tokio::test]
    async fn unreachable_engine_is_unavailable() {
        let err = complete_against("http://127.0.0.1:1").await.unwrap_err();
        assert!(err.is_unavailable(), "{err:?}");
    }

    #[tokio::test]
    async fn error_status_is_an_api_error() {
        let host = serve_once("500 Internal Server Error", r#"{"error":"model not loaded"}"#).await;
        let err = complete_against(&host).await.unwrap_err();
        let ModelError::Api(message) = err else {
            panic!("expected api error, got {err:?}");
        };
        assert!(message.starts_with("500"), "{message}");
        assert!(message.contains("model not loaded"), "{message}");
    }

    #[tokio::test]
    async fn unparseable_body_is_malformed() {
        let host = serve_once("200 OK", r#"{"done":true}"#).await;
        let err = complete_against(&host).await.unwrap_err();
        assert!(matches!(err, ModelError::MalformedResponse(_)), "{err:?}");
    }

    #[tokio::test]
    async fn successful_exchange_yields_invocations() {
        let host = serve_once(
            "200 OK",
            r#"{"message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"add_two_numbers","arguments":{"a":5,"b":3}}}]},"done":true}"#,
        )
        .await;
        let result = complete_against(&host).await.unwrap();
        assert_eq!(
            result.invocations,
            [ProposedInvocation::new("add_two_numbers", json!({"a": 5, "b": 3}))]
        );
    }
}
