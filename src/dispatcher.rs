use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::ProvisionError;

static HTTP_CLIENT: Lazy<Client> = Lazy::new(Client::new);

/// A fully built outbound request. Everything the handler sends, to Lacework,
/// Honeycomb or the CloudFormation response bucket, goes through this shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        ApiRequest {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    #[cfg(test)]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self, action: &'static str) -> Result<T, ProvisionError> {
        serde_json::from_slice(&self.body)
            .map_err(|source| ProvisionError::Decode { action, source })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn log_received(&self, url: &str) {
        tracing::info!(%url, status = self.status.as_u16(), "Received response");
        tracing::debug!(%url, body = %self.text(), "Response body");
    }
}

#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, ProvisionError>;
}

pub struct HttpDispatcher {
    client: Client,
}

impl HttpDispatcher {
    pub fn new_with_client(client: Client) -> Self {
        HttpDispatcher { client }
    }
}

impl Default for HttpDispatcher {
    fn default() -> Self {
        HttpDispatcher::new_with_client(HTTP_CLIENT.clone())
    }
}

#[async_trait]
impl Dispatch for HttpDispatcher {
    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, ProvisionError> {
        let ApiRequest {
            method,
            url,
            headers,
            body,
        } = request;
        tracing::info!(%method, %url, "Sending request");

        let mut builder = self.client.request(method, &url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let transport = |error: reqwest::Error| ProvisionError::Transport {
            url: url.clone(),
            message: error.to_string(),
        };
        let response = builder.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?.to_vec();

        let response = ApiResponse { status, body };
        response.log_received(&url);
        Ok(response)
    }
}
