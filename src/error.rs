use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("unable to run setup due to missing required environment variables: {}", .0.join(", "))]
    MissingConfiguration(Vec<&'static str>),
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("Failed to {action}. Response status is {status}")]
    UnexpectedStatus { action: &'static str, status: u16 },
    #[error("Unable to decode response to {action}: {source}")]
    Decode {
        action: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unable to encode request payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ProvisionError {
    pub fn status(&self) -> Option<u16> {
        match *self {
            ProvisionError::UnexpectedStatus { status, .. } => Some(status),
            _ => None,
        }
    }
}
