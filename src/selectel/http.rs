//! HTTP utilities for Selectel REST API calls

use crate::error::{ProviderError, Result};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;

/// Header carrying the session token on every authenticated request
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Header in which the identity service returns a freshly issued token
pub const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut cut = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// Pull a human-readable message out of an error body.
/// Selectel services answer with `{"error": "..."}`, `{"error": {"message": "..."}}`
/// or `{"message": "..."}` depending on the service.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return sanitize_for_log(body);
    };

    let message = value
        .get("error")
        .and_then(|e| e.as_str().or_else(|| e.get("message").and_then(|m| m.as_str())))
        .or_else(|| value.get("message").and_then(|m| m.as_str()));

    match message {
        Some(msg) => sanitize_for_log(msg),
        None => sanitize_for_log(body),
    }
}

/// Response of a successful call: headers plus parsed body (`Null` when empty)
#[derive(Debug)]
pub struct ApiResponse {
    pub headers: HeaderMap,
    pub body: Value,
}

/// HTTP client wrapper for Selectel API calls
#[derive(Clone)]
pub struct SelectelHttpClient {
    client: Client,
}

impl SelectelHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("selvpc/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Make a GET request
    pub async fn get(&self, url: &str, token: &str) -> Result<Value> {
        let request = self.request(Method::GET, url, Some(token), None);
        Ok(self.execute(Method::GET, url, request).await?.body)
    }

    /// Make a PATCH request with a JSON body
    pub async fn patch(&self, url: &str, token: &str, body: &Value) -> Result<Value> {
        let request = self.request(Method::PATCH, url, Some(token), Some(body));
        Ok(self.execute(Method::PATCH, url, request).await?.body)
    }

    /// Make a POST request, keeping the response headers
    pub async fn post(
        &self,
        url: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<ApiResponse> {
        let request = self.request(Method::POST, url, token, body);
        self.execute(Method::POST, url, request).await
    }

    fn request(
        &self,
        method: Method,
        url: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> RequestBuilder {
        let mut request = self.client.request(method, url);

        if let Some(token) = token {
            request = request.header(AUTH_TOKEN_HEADER, token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        request
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        request: RequestBuilder,
    ) -> Result<ApiResponse> {
        tracing::debug!("{} {}", method, url);

        let response = request.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        // Handle empty response
        if body.trim().is_empty() {
            return Ok(ApiResponse {
                headers,
                body: Value::Null,
            });
        }

        Ok(ApiResponse {
            headers,
            body: serde_json::from_str(&body)?,
        })
    }
}

/// Format an API error for display
/// Security: Maps common statuses to generic hints instead of raw service details
pub fn format_api_error(error: &ProviderError) -> String {
    match error.status() {
        Some(401) => "Authentication failed. Check token or user/password/domain_name.".to_string(),
        Some(403) => "Permission denied. Check the roles of the user or token.".to_string(),
        Some(404) => "Resource not found.".to_string(),
        Some(409) => "Resource conflict. The resource may already exist or be in use.".to_string(),
        Some(429) => "Rate limit exceeded. Please try again later.".to_string(),
        Some(500) | Some(502) | Some(503) => {
            "Selectel service temporarily unavailable. Please try again.".to_string()
        }
        _ => error.to_string(),
    }
}
