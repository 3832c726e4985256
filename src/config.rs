use std::fmt;

use crate::error::ProvisionError;

pub const LACEWORK_URL: &str = "lacework_url";
pub const SUB_ACCOUNT_NAME: &str = "lacework_sub_account_name";
pub const ACCESS_KEY_ID: &str = "lacework_access_key_id";
pub const SECRET_KEY: &str = "lacework_secret_key";
pub const EVENT_BUS_ARN: &str = "event_bus_arn";
pub const ALERT_CHANNEL_NAME: &str = "alert_channel_name";
pub const LOG_STREAM_NAME: &str = "AWS_LAMBDA_LOG_STREAM_NAME";

/// Raw function configuration. Empty values are read as absent.
#[derive(Clone, Default, PartialEq)]
pub struct Settings {
    pub lacework_url: Option<String>,
    pub sub_account_name: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_key: Option<String>,
    pub event_bus_arn: Option<String>,
    pub alert_channel_name: String,
    pub log_stream_name: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("lacework_url", &self.lacework_url)
            .field("sub_account_name", &self.sub_account_name)
            .field("access_key_id", &self.access_key_id)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("event_bus_arn", &self.event_bus_arn)
            .field("alert_channel_name", &self.alert_channel_name)
            .field("log_stream_name", &self.log_stream_name)
            .finish()
    }
}

#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub key_id: String,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Everything needed to talk to the Lacework API for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiTarget {
    pub host: String,
    pub sub_account: Option<String>,
    pub credentials: Credentials,
    pub alert_channel_name: String,
}

/// First label of the API host, e.g. `acct` for `acct.lacework.net`.
fn account_of(host: &str) -> &str {
    host.split('.').next().unwrap_or_default()
}

impl Settings {
    pub fn from_env() -> Self {
        Settings::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|value| !value.is_empty());
        Settings {
            lacework_url: value(LACEWORK_URL),
            sub_account_name: value(SUB_ACCOUNT_NAME),
            access_key_id: value(ACCESS_KEY_ID),
            secret_key: value(SECRET_KEY),
            event_bus_arn: value(EVENT_BUS_ARN),
            alert_channel_name: value(ALERT_CHANNEL_NAME).unwrap_or_default(),
            log_stream_name: value(LOG_STREAM_NAME),
        }
    }

    pub fn account(&self) -> &str {
        self.lacework_url.as_deref().map(account_of).unwrap_or_default()
    }

    /// Validates the values needed by both lifecycle paths, logging every
    /// missing one before failing.
    pub fn api_target(&self) -> Result<ApiTarget, ProvisionError> {
        let mut missing = Vec::new();
        if self.lacework_url.is_none() {
            tracing::error!("{} was not set.", LACEWORK_URL);
            missing.push(LACEWORK_URL);
        }
        if self.sub_account_name.is_none() {
            tracing::warn!("{} was not set.", SUB_ACCOUNT_NAME);
        }
        if self.access_key_id.is_none() {
            tracing::error!("{} was not set.", ACCESS_KEY_ID);
            missing.push(ACCESS_KEY_ID);
        }
        if self.secret_key.is_none() {
            tracing::error!("{} was not set.", SECRET_KEY);
            missing.push(SECRET_KEY);
        }
        self.target_or(missing)
    }

    /// Like [`Settings::api_target`], additionally requiring the event bus
    /// the alert channel forwards to.
    pub fn create_target(&self) -> Result<(ApiTarget, String), ProvisionError> {
        let target = self.api_target();
        let event_bus_arn = self.event_bus_arn.clone();
        if event_bus_arn.is_none() {
            tracing::error!("{} was not set.", EVENT_BUS_ARN);
        }
        match (target, event_bus_arn) {
            (Ok(target), Some(event_bus_arn)) => Ok((target, event_bus_arn)),
            (Ok(_), None) => Err(ProvisionError::MissingConfiguration(vec![EVENT_BUS_ARN])),
            (Err(ProvisionError::MissingConfiguration(mut missing)), None) => {
                missing.push(EVENT_BUS_ARN);
                Err(ProvisionError::MissingConfiguration(missing))
            }
            (Err(error), _) => Err(error),
        }
    }

    fn target_or(&self, missing: Vec<&'static str>) -> Result<ApiTarget, ProvisionError> {
        match (&self.lacework_url, &self.access_key_id, &self.secret_key) {
            (Some(host), Some(key_id), Some(secret)) if missing.is_empty() => Ok(ApiTarget {
                host: host.clone(),
                sub_account: self.sub_account_name.clone(),
                credentials: Credentials {
                    key_id: key_id.clone(),
                    secret: secret.clone(),
                },
                alert_channel_name: self.alert_channel_name.clone(),
            }),
            _ => Err(ProvisionError::MissingConfiguration(missing)),
        }
    }
}
