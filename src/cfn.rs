//! CloudFormation custom resource envelope: reading the request CloudFormation
//! sends and uploading the response document it waits for at `ResponseURL`.

use std::collections::HashMap;

use aws_lambda_events::cloudformation::{
    CloudFormationCustomResourceRequest, CloudFormationCustomResourceResponse,
    CloudFormationCustomResourceResponseStatus,
};
use reqwest::Method;

use crate::dispatcher::{ApiRequest, Dispatch};
use crate::error::ProvisionError;

/// Fields shared by every request variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub request_type: &'static str,
    pub request_id: &'a str,
    pub response_url: &'a str,
    pub stack_id: &'a str,
    pub logical_resource_id: &'a str,
    pub resource_type: &'a str,
    pub physical_resource_id: Option<&'a str>,
}

pub fn envelope(request: &CloudFormationCustomResourceRequest) -> Envelope<'_> {
    match request {
        CloudFormationCustomResourceRequest::Create(create) => Envelope {
            request_type: "Create",
            request_id: &create.request_id,
            response_url: &create.response_url,
            stack_id: &create.stack_id,
            logical_resource_id: &create.logical_resource_id,
            resource_type: &create.resource_type,
            physical_resource_id: None,
        },
        CloudFormationCustomResourceRequest::Update(update) => Envelope {
            request_type: "Update",
            request_id: &update.request_id,
            response_url: &update.response_url,
            stack_id: &update.stack_id,
            logical_resource_id: &update.logical_resource_id,
            resource_type: &update.resource_type,
            physical_resource_id: Some(&update.physical_resource_id),
        },
        CloudFormationCustomResourceRequest::Delete(delete) => Envelope {
            request_type: "Delete",
            request_id: &delete.request_id,
            response_url: &delete.response_url,
            stack_id: &delete.stack_id,
            logical_resource_id: &delete.logical_resource_id,
            resource_type: &delete.resource_type,
            physical_resource_id: Some(&delete.physical_resource_id),
        },
    }
}

/// Builds the response for `request`. The physical id is passed through from
/// the request; a create has none, so the log stream name stands in, then the
/// request id.
pub fn response(
    request: &CloudFormationCustomResourceRequest,
    outcome: &Result<(), ProvisionError>,
    log_stream_name: Option<&str>,
) -> CloudFormationCustomResourceResponse {
    let envelope = envelope(request);
    let physical_resource_id = envelope
        .physical_resource_id
        .filter(|id| !id.is_empty())
        .or(log_stream_name)
        .unwrap_or(envelope.request_id)
        .to_string();

    let (status, reason) = match outcome {
        Ok(()) => (CloudFormationCustomResourceResponseStatus::Success, None),
        Err(error) => {
            let reason = match log_stream_name {
                Some(stream) => {
                    format!("{}. Details in CloudWatch Log Stream: {}", error, stream)
                }
                None => error.to_string(),
            };
            (CloudFormationCustomResourceResponseStatus::Failed, Some(reason))
        }
    };

    CloudFormationCustomResourceResponse {
        status,
        reason,
        physical_resource_id,
        stack_id: envelope.stack_id.to_string(),
        request_id: envelope.request_id.to_string(),
        logical_resource_id: envelope.logical_resource_id.to_string(),
        no_echo: false,
        data: HashMap::new(),
    }
}

/// Uploads the response to the pre-signed S3 URL. The signature does not
/// cover a content type, so none is sent.
pub async fn send_response(
    dispatcher: &dyn Dispatch,
    response_url: &str,
    response: &CloudFormationCustomResourceResponse,
) -> Result<(), ProvisionError> {
    let request = ApiRequest::new(Method::PUT, response_url).body(serde_json::to_vec(response)?);
    let answer = dispatcher.dispatch(request).await?;
    if !answer.status.is_success() {
        return Err(ProvisionError::UnexpectedStatus {
            action: "deliver CloudFormation response",
            status: answer.status.as_u16(),
        });
    }
    tracing::info!(status = ?response.status, "Delivered CloudFormation response");
    Ok(())
}
