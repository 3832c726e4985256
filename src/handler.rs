use std::sync::Arc;

use aws_lambda_events::cloudformation::{
    CloudFormationCustomResourceRequest, CloudFormationCustomResourceResponse,
};
use serde_json::{json, Value};

use crate::cfn::{envelope, response, send_response};
use crate::client::LaceworkClient;
use crate::config::Settings;
use crate::dispatcher::Dispatch;
use crate::error::ProvisionError;
use crate::search::ResourceKind;
use crate::telemetry::{
    LifecycleEvent, Telemetry, CREATE_COMPLETED, CREATE_STARTED, DELETE_COMPLETED, DELETE_STARTED,
};
use crate::token::issue_access_token;

/// Runs the lifecycle event and reports the outcome to CloudFormation.
/// Only a failure to deliver the report is returned as an error.
pub async fn respond(
    request: &CloudFormationCustomResourceRequest,
    settings: &Settings,
    dispatcher: Arc<dyn Dispatch>,
    telemetry: &dyn Telemetry,
) -> Result<CloudFormationCustomResourceResponse, ProvisionError> {
    let outcome = handle(request, settings, dispatcher.clone(), telemetry).await;
    if let Err(error) = &outcome {
        tracing::error!(
            request_type = envelope(request).request_type,
            status = ?error.status(),
            "Setup failed: {}",
            error
        );
    }

    let response = response(request, &outcome, settings.log_stream_name.as_deref());
    send_response(dispatcher.as_ref(), envelope(request).response_url, &response).await?;
    Ok(response)
}

pub async fn handle(
    request: &CloudFormationCustomResourceRequest,
    settings: &Settings,
    dispatcher: Arc<dyn Dispatch>,
    telemetry: &dyn Telemetry,
) -> Result<(), ProvisionError> {
    let fields = envelope(request);
    tracing::info!(
        request_type = fields.request_type,
        request_id = fields.request_id,
        stack_id = fields.stack_id,
        logical_resource_id = fields.logical_resource_id,
        resource_type = fields.resource_type,
        "CloudFormation event received"
    );

    match request {
        CloudFormationCustomResourceRequest::Create(_) => {
            create(settings, dispatcher, telemetry).await
        }
        CloudFormationCustomResourceRequest::Delete(_) => {
            delete(settings, dispatcher, telemetry).await;
            Ok(())
        }
        CloudFormationCustomResourceRequest::Update(_) => {
            tracing::warn!(
                request_type = fields.request_type,
                "CloudFormation event not supported"
            );
            Ok(())
        }
    }
}

async fn create(
    settings: &Settings,
    dispatcher: Arc<dyn Dispatch>,
    telemetry: &dyn Telemetry,
) -> Result<(), ProvisionError> {
    telemetry.notify(lifecycle(settings, CREATE_STARTED)).await;
    let outcome = provision(settings, dispatcher).await;
    telemetry
        .notify(lifecycle(settings, CREATE_COMPLETED).with_data(outcome_data(&outcome)))
        .await;
    outcome
}

async fn delete(settings: &Settings, dispatcher: Arc<dyn Dispatch>, telemetry: &dyn Telemetry) {
    telemetry.notify(lifecycle(settings, DELETE_STARTED)).await;
    teardown(settings, dispatcher).await;
    telemetry.notify(lifecycle(settings, DELETE_COMPLETED)).await;
}

fn lifecycle(settings: &Settings, label: &'static str) -> LifecycleEvent {
    LifecycleEvent::new(settings.account(), settings.sub_account_name.as_deref(), label)
}

fn outcome_data(outcome: &Result<(), ProvisionError>) -> Value {
    match outcome {
        Ok(()) => json!({}),
        Err(error) => json!({ "error": error.to_string() }),
    }
}

/// Creates the alert channel and its rule unless a channel with the
/// configured name already exists. A failed lookup does not stop creation.
async fn provision(
    settings: &Settings,
    dispatcher: Arc<dyn Dispatch>,
) -> Result<(), ProvisionError> {
    let (target, event_bus_arn) = settings.create_target()?;

    tracing::info!("Getting access token.");
    let token = issue_access_token(dispatcher.as_ref(), &target).await?;
    let client = LaceworkClient::new(dispatcher, &target, token.token);
    let name = target.alert_channel_name.as_str();

    match client.search(ResourceKind::AlertChannel, name).await {
        Ok(Some(intg_guid)) => {
            tracing::info!(%intg_guid, "Alert Channel already exists.");
            return Ok(());
        }
        Ok(None) => {}
        // TODO: confirm with the Lacework API owners whether a failed lookup
        // should abort instead; creating here can duplicate the channel.
        Err(error) => tracing::warn!("Unable to search: {}", error),
    }

    tracing::info!("Creating Alert Channel.");
    let intg_guid = client
        .create_alert_channel(name, &event_bus_arn)
        .await
        .map_err(|error| {
            tracing::error!("Failed creating alert channel: {}", error);
            error
        })?;

    tracing::info!(%intg_guid, "Creating Alert Rule.");
    client.create_alert_rule(name, &intg_guid).await.map_err(|error| {
        tracing::error!("Failed creating alert rule: {}", error);
        error
    })
}

/// Removes the alert channel, then the alert rule. Nothing here fails the
/// stack: every problem is logged and the next step still runs.
async fn teardown(settings: &Settings, dispatcher: Arc<dyn Dispatch>) {
    let target = match settings.api_target() {
        Ok(target) => target,
        Err(error) => {
            tracing::warn!("Skipping delete of alert channel and alert rule: {}", error);
            return;
        }
    };

    let token = match issue_access_token(dispatcher.as_ref(), &target).await {
        Ok(token) => token,
        Err(error) => {
            tracing::warn!(
                "Did not get access token in order to delete alert channel and alert rule: {}",
                error
            );
            return;
        }
    };

    let client = LaceworkClient::new(dispatcher, &target, token.token);
    remove(&client, ResourceKind::AlertChannel, &target.alert_channel_name).await;
    remove(&client, ResourceKind::AlertRule, &target.alert_channel_name).await;
}

async fn remove(client: &LaceworkClient, kind: ResourceKind, name: &str) {
    let guid = match client.search(kind, name).await {
        Ok(Some(guid)) => guid,
        Ok(None) => {
            tracing::info!("No {} to delete.", kind.label());
            return;
        }
        Err(error) => {
            tracing::warn!("Unable to search: {}", error);
            return;
        }
    };

    let deleted = match kind {
        ResourceKind::AlertChannel => client.delete_alert_channel(&guid).await,
        ResourceKind::AlertRule => client.delete_alert_rule(&guid).await,
    };
    match deleted {
        Ok(()) => tracing::info!(%guid, "Deleted {}.", kind.label()),
        Err(error) => tracing::error!(%guid, "Failed deleting {}: {}", kind.label(), error),
    }
}
