use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::client::{api_url, CONTENT_TYPE_JSON};
use crate::config::ApiTarget;
use crate::dispatcher::{ApiRequest, Dispatch};
use crate::error::ProvisionError;

pub const ACCESS_TOKEN_PATH: &str = "/api/v2/access/tokens";
pub const TOKEN_EXPIRY_SECONDS: u32 = 86400;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenRequest<'a> {
    key_id: &'a str,
    expiry_time: u32,
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    #[serde(default)]
    pub expires_at: String,
    pub token: String,
}

impl AccessToken {
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.expires_at)
            .ok()
            .map(|expiry| expiry.with_timezone(&Utc))
    }
}

/// Exchanges the access key for a bearer token. Single attempt; any failure
/// ends the run.
pub async fn issue_access_token(
    dispatcher: &dyn Dispatch,
    target: &ApiTarget,
) -> Result<AccessToken, ProvisionError> {
    let payload = AccessTokenRequest {
        key_id: &target.credentials.key_id,
        expiry_time: TOKEN_EXPIRY_SECONDS,
    };
    let request = ApiRequest::new(Method::POST, api_url(&target.host, ACCESS_TOKEN_PATH))
        .header("X-LW-UAKS", target.credentials.secret.as_str())
        .header("content-type", CONTENT_TYPE_JSON)
        .body(serde_json::to_vec(&payload)?);

    let response = dispatcher.dispatch(request).await?;
    if response.status != StatusCode::CREATED {
        return Err(ProvisionError::UnexpectedStatus {
            action: "get access token",
            status: response.status.as_u16(),
        });
    }

    let token: AccessToken = response.json("get access token")?;
    match token.expiry() {
        Some(expiry) => tracing::info!(expires_at = %expiry, "Received access token"),
        None => tracing::info!(expires_at = %token.expires_at, "Received access token"),
    }
    Ok(token)
}
