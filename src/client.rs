use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;

use crate::config::ApiTarget;
use crate::dispatcher::{ApiRequest, ApiResponse, Dispatch};
use crate::error::ProvisionError;

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Authenticated access to the Lacework v2 API for a single invocation.
pub struct LaceworkClient {
    dispatcher: Arc<dyn Dispatch>,
    host: String,
    token: String,
    sub_account: Option<String>,
}

impl LaceworkClient {
    pub fn new(dispatcher: Arc<dyn Dispatch>, target: &ApiTarget, token: String) -> Self {
        LaceworkClient {
            dispatcher,
            host: target.host.clone(),
            token,
            sub_account: target.sub_account.clone(),
        }
    }

    pub async fn post<T>(&self, path: &str, payload: &T) -> Result<ApiResponse, ProvisionError>
    where
        T: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(payload)?;
        let request = self.request(Method::POST, path).body(body);
        self.send(request).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ProvisionError> {
        let request = self.request(Method::DELETE, path);
        self.send(request).await
    }

    fn request(&self, method: Method, path: &str) -> ApiRequest {
        let request = ApiRequest::new(method, api_url(&self.host, path))
            .header("Authorization", self.token.as_str())
            .header("content-type", CONTENT_TYPE_JSON);
        match &self.sub_account {
            Some(sub_account) => request.header("Account-Name", sub_account.as_str()),
            None => request,
        }
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ProvisionError> {
        let (method, url) = (request.method.clone(), request.url.clone());
        self.dispatcher.dispatch(request).await.map_err(|error| {
            tracing::error!(%method, %url, "Error sending API request: {}", error);
            error
        })
    }
}

pub fn api_url(host: &str, path: &str) -> String {
    format!("https://{}{}", host, path)
}
