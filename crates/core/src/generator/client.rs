use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    config::GeneratorConfig,
    error::{LifecycleError, Result},
};

/// Body posted to a generation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Game description.
    pub prompt: String,
}

/// Reply from a generation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Whether generation succeeded.
    pub success: bool,
    /// Generated source on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Optional informational message on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failure reason when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationResponse {
    /// Successful reply carrying code.
    pub fn ok(code: impl Into<String>, message: Option<String>) -> Self {
        Self {
            success: true,
            code: Some(code.into()),
            message,
            error: None,
        }
    }

    /// Failed reply carrying a reason.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            code: None,
            message: None,
            error: Some(error.into()),
        }
    }

    /// Collapse the wire shape into generated code or a network error.
    pub fn into_code(self) -> Result<String> {
        if !self.success {
            let reason = self
                .error
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| "Failed to generate game".to_string());
            return Err(LifecycleError::Network(reason));
        }
        match self.code {
            Some(code) if !code.trim().is_empty() => Ok(code),
            _ => Err(LifecycleError::Network(
                "endpoint returned no code".to_string(),
            )),
        }
    }
}

/// Source of generated code: the local template or a remote endpoint.
#[derive(Debug, Clone)]
pub enum GenerationClient {
    /// Fixed template substitution, no network.
    Local,
    /// HTTP endpoint speaking the request/response contract.
    Remote {
        /// HTTP client with the configured timeout.
        http: reqwest::Client,
        /// Absolute URL of the generation endpoint.
        endpoint: String,
    },
}

impl GenerationClient {
    /// Choose a backend from configuration.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        match config.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => {
                let http = reqwest::Client::builder()
                    .timeout(Duration::from_secs(config.timeout_secs))
                    .build()
                    .map_err(|err| LifecycleError::Network(err.to_string()))?;
                Ok(Self::Remote {
                    http,
                    endpoint: endpoint.to_string(),
                })
            }
            _ => Ok(Self::Local),
        }
    }

    /// Short label for status lines.
    pub fn describe(&self) -> String {
        match self {
            Self::Local => "local templates".to_string(),
            Self::Remote { endpoint, .. } => endpoint.clone(),
        }
    }

    /// Answer a request the way the endpoint would.
    pub async fn respond(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        match self {
            Self::Local => Ok(match super::generate(&request.prompt) {
                Ok(code) => GenerationResponse::ok(
                    code,
                    Some("Game generated successfully (demo mode)".to_string()),
                ),
                Err(err) => GenerationResponse::failed(err.to_string()),
            }),
            Self::Remote { http, endpoint } => {
                debug!(%endpoint, "posting generation request");
                let response = http
                    .post(endpoint.as_str())
                    .json(request)
                    .send()
                    .await
                    .map_err(|err| LifecycleError::Network(err.to_string()))?;
                let status = response.status();
                let body: GenerationResponse = response.json().await.map_err(|err| {
                    LifecycleError::Network(format!("invalid response ({status}): {err}"))
                })?;
                if !status.is_success() && body.success {
                    warn!(%status, "endpoint reported success with an error status");
                    return Err(LifecycleError::Network(format!("endpoint returned {status}")));
                }
                Ok(body)
            }
        }
    }

    /// Generate code for a prompt.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(LifecycleError::validation(
                "Please enter a game description",
            ));
        }
        let request = GenerationRequest {
            prompt: prompt.to_string(),
        };
        self.respond(&request).await?.into_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    /// Answer exactly one HTTP request with `status` and `body`.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let read = socket.read(&mut chunk).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..read]);
                if request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/api/generate-game")
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn remote(endpoint: String) -> GenerationClient {
        GenerationClient::from_config(&GeneratorConfig {
            endpoint: Some(endpoint),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn parses_failure_payload() {
        let response: GenerationResponse =
            serde_json::from_value(json!({"success": false, "error": "Failed to generate game"}))
                .unwrap();
        assert_eq!(
            response.into_code(),
            Err(LifecycleError::Network("Failed to generate game".to_string()))
        );
    }

    #[test]
    fn parses_success_payload() {
        let response: GenerationResponse = serde_json::from_value(
            json!({"success": true, "code": "print(1)", "message": "ok"}),
        )
        .unwrap();
        assert_eq!(response.into_code().unwrap(), "print(1)");
    }

    #[test]
    fn empty_code_is_a_failure() {
        let response = GenerationResponse::ok("  ", None);
        assert!(matches!(response.into_code(), Err(LifecycleError::Network(_))));
    }

    #[test]
    fn blank_endpoint_means_local() {
        let config = GeneratorConfig {
            endpoint: Some("   ".to_string()),
            timeout_secs: 5,
        };
        assert!(matches!(
            GenerationClient::from_config(&config).unwrap(),
            GenerationClient::Local
        ));
    }

    #[tokio::test]
    async fn local_client_matches_template() {
        let client = GenerationClient::Local;
        let code = client.generate("Space shooter with aliens").await.unwrap();
        assert_eq!(code, super::super::generate("Space shooter with aliens").unwrap());
    }

    #[tokio::test]
    async fn blank_prompt_is_rejected_before_request() {
        let client = GenerationClient::Local;
        assert!(matches!(
            client.generate(" ").await,
            Err(LifecycleError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn remote_success_returns_code() {
        let endpoint = serve_once(
            "200 OK",
            r#"{"success":true,"code":"print('hi')","message":"ok"}"#,
        )
        .await;
        let client = remote(endpoint);
        assert_eq!(client.generate("Snake").await.unwrap(), "print('hi')");
    }

    #[tokio::test]
    async fn remote_failure_payload_is_network_error() {
        let endpoint = serve_once(
            "500 Internal Server Error",
            r#"{"success":false,"error":"Failed to generate game"}"#,
        )
        .await;
        assert_eq!(
            remote(endpoint).generate("Snake").await,
            Err(LifecycleError::Network("Failed to generate game".to_string()))
        );
    }

    #[tokio::test]
    async fn error_status_with_success_body_is_network_error() {
        let endpoint = serve_once(
            "500 Internal Server Error",
            r#"{"success":true,"code":"print(1)"}"#,
        )
        .await;
        assert!(matches!(
            remote(endpoint).generate("Snake").await,
            Err(LifecycleError::Network(_))
        ));
    }

    #[tokio::test]
    async fn non_json_body_is_network_error() {
        let endpoint = serve_once("200 OK", "<html>gateway timeout</html>").await;
        assert!(matches!(
            remote(endpoint).generate("Snake").await,
            Err(LifecycleError::Network(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        let client = remote("http://127.0.0.1:9/".to_string());
        assert!(matches!(
            client.generate("Snake").await,
            Err(LifecycleError::Network(_))
        ));
    }
}
