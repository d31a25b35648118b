//! Request/response API of the counting service.
//!
//! [`CountApi`] is the seam the engine talks through; [`HttpApi`] implements
//! it over reqwest. Non-success answers become [`ClientError::Api`] with the
//! server's message when the body carries one, and anything that keeps a
//! response from arriving becomes [`ClientError::Transport`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogCategory, Category, ModelCatalog};
use crate::config::Config;
use crate::error::ClientError;
use crate::input::CountPayload;

/// Token count for one model, exactly as the service reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountResult {
    pub model: String,
    pub token_count: u64,
    #[serde(default)]
    pub cost_usd: Option<f64>,
    #[serde(default)]
    pub context_window: Option<u64>,
    #[serde(default)]
    pub context_usage_percent: Option<f64>,
}

/// Pricing and context window of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingInfo {
    pub model: String,
    /// USD per one million input tokens.
    #[serde(default)]
    pub input_price: Option<f64>,
    #[serde(default)]
    pub context_window: Option<u64>,
    #[serde(default)]
    pub context_window_formatted: Option<String>,
}

/// One counting request: a payload sent for a single model.
#[derive(Debug, Clone, Copy)]
pub struct CountRequest<'a> {
    pub payload: &'a CountPayload,
    pub model: &'a str,
    pub category: Category,
}

#[derive(Serialize)]
struct TextCountBody<'a> {
    text: &'a str,
    model: &'a str,
    model_type: Category,
}

#[derive(Serialize)]
struct AddModelBody<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    category: CatalogCategory,
}

/// Error document; `detail` covers servers that report failures that way.
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_code: Option<String>,
    detail: Option<serde_json::Value>,
}

#[async_trait]
pub trait CountApi: Send + Sync {
    /// `GET /models`
    async fn fetch_models(&self) -> Result<ModelCatalog, ClientError>;

    /// `POST /count-tokens` or `POST /count-tokens/file`, depending on the payload.
    async fn count(&self, request: CountRequest<'_>) -> Result<CountResult, ClientError>;

    /// `POST /models`; answers with the updated catalog.
    async fn add_model(
        &self,
        name: &str,
        category: CatalogCategory,
    ) -> Result<ModelCatalog, ClientError>;

    /// `GET /pricing/{model}`
    async fn pricing(&self, model: &str) -> Result<PricingInfo, ClientError>;
}

/// reqwest-backed [`CountApi`].
pub struct HttpApi {
    client: reqwest::Client,
    base: String,
}

impl HttpApi {
    pub fn new(base: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Builds a client with the configured timeout against `config.api_base()`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::new(config.api_base(), client))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

#[async_trait]
impl CountApi for HttpApi {
    async fn fetch_models(&self) -> Result<ModelCatalog, ClientError> {
        let resp = self.client.get(self.url("/models")).send().await?;
        decode(resp).await
    }

    async fn count(&self, request: CountRequest<'_>) -> Result<CountResult, ClientError> {
        let resp = match request.payload {
            CountPayload::Text(text) => {
                let body = TextCountBody {
                    text,
                    model: request.model,
                    model_type: request.category,
                };
                self.client
                    .post(self.url("/count-tokens"))
                    .json(&body)
                    .send()
                    .await?
            }
            CountPayload::File(file) => {
                let name = file.name.clone();
                let part = Part::bytes(file.bytes.clone()).file_name(name);
                let form = Form::new()
                    .part("file", part)
                    .text("model", request.model.to_string())
                    .text("model_type", request.category.as_str());
                self.client
                    .post(self.url("/count-tokens/file"))
                    .multipart(form)
                    .send()
                    .await?
            }
        };
        decode(resp).await
    }

    async fn add_model(
        &self,
        name: &str,
        category: CatalogCategory,
    ) -> Result<ModelCatalog, ClientError> {
        let resp = self
            .client
            .post(self.url("/models"))
            .json(&AddModelBody { name, category })
            .send()
            .await?;
        decode(resp).await
    }

    async fn pricing(&self, model: &str) -> Result<PricingInfo, ClientError> {
        let path = format!("/pricing/{}", model.trim().trim_start_matches('/'));
        let resp = self.client.get(self.url(&path)).send().await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.json::<ErrorBody>().await.ok();
        let (message, code) = match body {
            Some(body) => {
                let detail = body.detail.and_then(|d| match d {
                    serde_json::Value::String(s) => Some(s),
                    _ => None,
                });
                (body.error.or(detail), body.error_code)
            }
            None => (None, None),
        };
        return Err(ClientError::api(status.as_u16(), message, code));
    }
    resp.json::<T>()
        .await
        .map_err(|e| ClientError::Transport(format!("malformed body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::FileUpload;
    use serde_json::json;
    use wiremock::matchers::{body_json, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> HttpApi {
        HttpApi::new(format!("{}/api", server.uri()), reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_fetch_models() {
        let server = MockServer::start().await;
        let body = json!({"official": ["gpt-4o"], "custom": ["microsoft/phi-4"], "version": 3});
        Mock::given(method("GET"))
            .and(path("/api/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let catalog = api(&server).fetch_models().await.unwrap();
        assert_eq!(catalog.official, ["gpt-4o"]);
        assert_eq!(catalog.custom, ["microsoft/phi-4"]);
        assert_eq!(catalog.version, 3);
    }

    #[tokio::test]
    async fn test_count_text_sends_json_body() {
        let server = MockServer::start().await;
        let request = json!({"text": "hello world", "model": "gpt-4", "model_type": "commercial"});
        let response = json!({
            "token_count": 2,
            "cost_usd": 0.00006,
            "context_window": 8192,
            "context_usage_percent": 0.02,
            "model": "gpt-4"
        });
        Mock::given(method("POST"))
            .and(path("/api/count-tokens"))
            .and(body_json(request))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .expect(1)
            .mount(&server)
            .await;

        let payload = CountPayload::Text("hello world".into());
        let result = api(&server)
            .count(CountRequest {
                payload: &payload,
                model: "gpt-4",
                category: Category::Commercial,
            })
            .await
            .unwrap();
        assert_eq!(result.token_count, 2);
        assert_eq!(result.context_window, Some(8192));
    }

    #[tokio::test]
    async fn test_count_file_error_body_message() {
        let server = MockServer::start().await;
        let body = json!({"error": "file too large"});
        Mock::given(method("POST"))
            .and(path("/api/count-tokens/file"))
            .and(header_regex("content-type", "^multipart/form-data"))
            .respond_with(ResponseTemplate::new(413).set_body_json(body))
            .mount(&server)
            .await;

        let payload = CountPayload::File(FileUpload::new("report.pdf", vec![0u8; 16]));
        let err = api(&server)
            .count(CountRequest {
                payload: &payload,
                model: "gpt-4",
                category: Category::Commercial,
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ClientError::Api {
                status: 413,
                message: "file too large".into(),
                code: None
            }
        );
    }

    #[tokio::test]
    async fn test_error_without_body_uses_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/models"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = api(&server).fetch_models().await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP error 500");
    }

    #[tokio::test]
    async fn test_detail_field_is_used_as_message() {
        let server = MockServer::start().await;
        let body = json!({"detail": "unknown model"});
        Mock::given(method("GET"))
            .and(path("/api/pricing/meta/llama-4"))
            .respond_with(ResponseTemplate::new(400).set_body_json(body))
            .mount(&server)
            .await;

        let err = api(&server).pricing("meta/llama-4").await.unwrap_err();
        assert_eq!(err.to_string(), "unknown model");
    }

    #[tokio::test]
    async fn test_add_model_returns_catalog() {
        let server = MockServer::start().await;
        let request = json!({"name": "qwen/qwen3-8b", "type": "custom"});
        let response = json!({"official": [], "custom": ["qwen/qwen3-8b"], "version": 4});
        Mock::given(method("POST"))
            .and(path("/api/models"))
            .and(body_json(request))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .mount(&server)
            .await;

        let catalog = api(&server)
            .add_model("qwen/qwen3-8b", CatalogCategory::Custom)
            .await
            .unwrap();
        assert_eq!(catalog.version, 4);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let api = HttpApi::new("http://127.0.0.1:1/api", reqwest::Client::new());
        let err = api.fetch_models().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
