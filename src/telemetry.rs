use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::dispatcher::{ApiRequest, Dispatch};

pub const CREATE_STARTED: &str = "create started";
pub const CREATE_COMPLETED: &str = "create completed";
pub const DELETE_STARTED: &str = "delete started";
pub const DELETE_COMPLETED: &str = "delete completed";

const HONEYCOMB_EVENTS_URL: &str = "https://api.honeycomb.io/1/events";
const TECH_PARTNER: &str = "AWS";
const INTEGRATION_NAME: &str = "lacework-aws-security-hub-cloudformation";
const SERVICE: &str = "AWS Security Hub";
const INSTALL_METHOD: &str = "cloudformation";
const FUNCTION: &str = "setup";

#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleEvent {
    pub account: String,
    pub sub_account: String,
    pub label: &'static str,
    pub data: Value,
}

impl LifecycleEvent {
    pub fn new(account: &str, sub_account: Option<&str>, label: &'static str) -> Self {
        LifecycleEvent {
            account: account.to_string(),
            sub_account: sub_account.unwrap_or_default().to_string(),
            label,
            data: Value::Object(Default::default()),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Best-effort lifecycle reporting. Implementations must never fail the caller.
#[async_trait]
pub trait Telemetry: Send + Sync {
    async fn notify(&self, event: LifecycleEvent);
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct HoneycombEvent<'a> {
    account: &'a str,
    sub_account: &'a str,
    tech_partner: &'a str,
    integration_name: &'a str,
    version: &'a str,
    service: &'a str,
    install_method: &'a str,
    function: &'a str,
    event: &'a str,
    event_data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    pub dataset: String,
    pub team_key: Option<String>,
    pub version: String,
}

impl Default for TelemetryConfig {
    // Dataset and team key are baked in by the release build.
    fn default() -> Self {
        TelemetryConfig {
            dataset: option_env!("HONEYCOMB_DATASET")
                .unwrap_or("lacework-alert-integrations")
                .to_string(),
            team_key: option_env!("HONEYCOMB_TEAM").map(str::to_string),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

pub struct HoneycombSink {
    dispatcher: Arc<dyn Dispatch>,
    config: TelemetryConfig,
}

impl HoneycombSink {
    pub fn new(dispatcher: Arc<dyn Dispatch>, config: TelemetryConfig) -> Self {
        HoneycombSink { dispatcher, config }
    }

    async fn send(&self, event: &LifecycleEvent) -> anyhow::Result<Option<StatusCode>> {
        let team_key = match &self.config.team_key {
            Some(team_key) => team_key,
            None => return Ok(None),
        };
        let payload = HoneycombEvent {
            account: &event.account,
            sub_account: &event.sub_account,
            tech_partner: TECH_PARTNER,
            integration_name: INTEGRATION_NAME,
            version: &self.config.version,
            service: SERVICE,
            install_method: INSTALL_METHOD,
            function: FUNCTION,
            event: event.label,
            event_data: event.data.to_string(),
        };
        let url = format!("{}/{}", HONEYCOMB_EVENTS_URL, self.config.dataset);
        let request = ApiRequest::new(Method::POST, url)
            .header("X-Honeycomb-Team", team_key.as_str())
            .header("content-type", "application/json")
            .body(serde_json::to_vec(&payload).context("encoding honeycomb event")?);

        let response = self
            .dispatcher
            .dispatch(request)
            .await
            .with_context(|| format!("sending {:?} to honeycomb", event.label))?;
        if !response.status.is_success() {
            bail!("honeycomb rejected {:?} with status {}", event.label, response.status);
        }
        Ok(Some(response.status))
    }
}

#[async_trait]
impl Telemetry for HoneycombSink {
    async fn notify(&self, event: LifecycleEvent) {
        match self.send(&event).await {
            Ok(Some(status)) => tracing::info!(
                event = event.label,
                status = status.as_u16(),
                "Sent event to Honeycomb"
            ),
            Ok(None) => tracing::debug!(
                event = event.label,
                "Honeycomb team key not configured, event dropped"
            ),
            Err(error) => tracing::warn!(
                event = event.label,
                "Unable to send event to Honeycomb: {:#}",
                error
            ),
        }
    }
}
