mod cfn;
mod client;
mod config;
mod dispatcher;
mod error;
mod handler;
#[cfg(test)]
mod mock;
mod provisioner;
mod search;
mod telemetry;
mod token;

use std::sync::Arc;

use aws_lambda_events::cloudformation::CloudFormationCustomResourceRequest;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::dispatcher::{Dispatch, HttpDispatcher};
use crate::telemetry::{HoneycombSink, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .without_time()
        .init();

    lambda_runtime::run(service_fn(setup_handler)).await
}

async fn setup_handler(
    event: LambdaEvent<CloudFormationCustomResourceRequest>,
) -> Result<(), Error> {
    let settings = Settings::from_env();
    let dispatcher: Arc<dyn Dispatch> = Arc::new(HttpDispatcher::default());
    let telemetry = HoneycombSink::new(dispatcher.clone(), TelemetryConfig::default());

    handler::respond(&event.payload, &settings, dispatcher, &telemetry).await?;
    Ok(())
}
