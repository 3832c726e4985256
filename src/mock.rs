//! Test doubles for the dispatch and telemetry seams.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing_subscriber::fmt::MakeWriter;

use crate::dispatcher::{ApiRequest, ApiResponse, Dispatch};
use crate::error::ProvisionError;
use crate::telemetry::{LifecycleEvent, Telemetry};

pub struct MockResponse {
    status: u16,
    body: String,
}

impl MockResponse {
    pub fn with_status(status: u16) -> Self {
        MockResponse {
            status,
            body: String::new(),
        }
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }
}

/// Replays queued responses in order and records every request it was asked
/// to send. An exhausted queue answers with a transport error.
#[derive(Clone, Default)]
pub struct MockDispatcher {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl MockDispatcher {
    pub fn with_response(self, response: MockResponse) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|request| format!("{} {}", request.method, request.url))
            .collect()
    }
}

#[async_trait]
impl Dispatch for MockDispatcher {
    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, ProvisionError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(response) => Ok(ApiResponse {
                status: StatusCode::from_u16(response.status).unwrap(),
                body: response.body.into_bytes(),
            }),
            None => Err(ProvisionError::Transport {
                url,
                message: "no mock response queued".to_string(),
            }),
        }
    }
}

pub fn json_body(request: &ApiRequest) -> Value {
    serde_json::from_slice(request.body.as_deref().unwrap_or(&b"null"[..])).unwrap()
}

#[derive(Clone, Default)]
pub struct RecordingTelemetry {
    events: Arc<Mutex<Vec<LifecycleEvent>>>,
}

impl RecordingTelemetry {
    pub fn labels(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.label.to_string())
            .collect()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Telemetry for RecordingTelemetry {
    async fn notify(&self, event: LifecycleEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Buffer-backed log writer; install with `tracing::subscriber::set_default`.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .without_time()
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
