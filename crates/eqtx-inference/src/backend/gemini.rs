//! Gemini `generateContent` backend over HTTP.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::InferenceError;
use crate::{GenerateRequest, GenerateResponse, InferenceService, Result};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Connection options for [`GeminiBackend`].
#[derive(Debug, Clone)]
pub struct GeminiOptions {
    /// API key. `None` or an empty string means "not configured".
    pub api_key: Option<String>,
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Request timeout in seconds. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for GeminiOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }
}

/// Backend calling the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeminiBackend {
    /// Create a new backend.
    pub fn new(options: GeminiOptions) -> Result<Self> {
        #[allow(unused_mut)]
        let mut builder = Client::builder();

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(secs) = options.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            api_key: options.api_key.filter(|key| !key.is_empty()),
            base_url: options.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint for a model's `generateContent` method.
    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait(?Send)]
impl InferenceService for GeminiBackend {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(InferenceError::MissingCredential)?;

        let url = self.endpoint(&request.model);
        debug!("Sending generateContent request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("Service answered HTTP {} ({} bytes)", status.as_u16(), body.len());

        let parsed: std::result::Result<GenerateResponse, _> = serde_json::from_str(&body);

        match parsed {
            Ok(decoded) => {
                if let Some(message) = decoded.error_message() {
                    warn!("Service reported an error: {}", message);
                    return Err(if status.is_success() {
                        InferenceError::Service(message.to_string())
                    } else {
                        InferenceError::Status {
                            status: status.as_u16(),
                            message: message.to_string(),
                        }
                    });
                }
                if !status.is_success() {
                    return Err(InferenceError::Status {
                        status: status.as_u16(),
                        message: body,
                    });
                }
                Ok(decoded)
            }
            Err(e) if status.is_success() => Err(InferenceError::Decode(e.to_string())),
            Err(_) => Err(InferenceError::Status {
                status: status.as_u16(),
                message: body,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_endpoint_format() {
        let backend = GeminiBackend::new(GeminiOptions {
            api_key: Some("key".to_string()),
            base_url: "https://example.test/v1beta/".to_string(),
            timeout_secs: None,
        })
        .unwrap();

        assert_eq!(
            backend.endpoint("gemini-2.0-flash"),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_empty_key_is_unconfigured() {
        let backend = GeminiBackend::new(GeminiOptions {
            api_key: Some(String::new()),
            ..GeminiOptions::default()
        })
        .unwrap();
        assert!(!backend.is_configured());
    }

    #[tokio::test]
    async fn test_generate_without_key_fails_before_network() {
        let backend = GeminiBackend::new(GeminiOptions::default()).unwrap();
        let request = GenerateRequest::text("gemini-2.0-flash", "hello");

        let err = backend.generate(&request).await.unwrap_err();
        assert!(matches!(err, InferenceError::MissingCredential));
    }
}
