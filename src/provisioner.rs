use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::client::LaceworkClient;
use crate::error::ProvisionError;

pub const ALERT_CHANNELS_PATH: &str = "/api/v2/AlertChannels";
pub const ALERT_RULES_PATH: &str = "/api/v2/AlertRules";

const CHANNEL_TYPE: &str = "CloudwatchEb";
const ISSUE_GROUPING: &str = "Events";
const RULE_TYPE: &str = "Event";
const RULE_DESCRIPTION: &str = "Alert rule for Lacework AWS Security Hub";
const ALL_SEVERITIES: [u8; 5] = [1, 2, 3, 4, 5];

#[derive(Serialize, Debug, PartialEq)]
pub struct AlertChannelRequest<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub channel_type: &'a str,
    pub enabled: u8,
    pub data: AlertChannelData<'a>,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertChannelData<'a> {
    pub issue_grouping: &'a str,
    pub event_bus_arn: &'a str,
}

impl<'a> AlertChannelRequest<'a> {
    pub fn event_bus(name: &'a str, event_bus_arn: &'a str) -> Self {
        AlertChannelRequest {
            name,
            channel_type: CHANNEL_TYPE,
            enabled: 1,
            data: AlertChannelData {
                issue_grouping: ISSUE_GROUPING,
                event_bus_arn,
            },
        }
    }
}

#[derive(Deserialize)]
struct AlertChannelResponse {
    data: CreatedAlertChannel,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedAlertChannel {
    intg_guid: String,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertRuleRequest<'a> {
    pub filters: AlertRuleFilters<'a>,
    pub intg_guid_list: Vec<&'a str>,
    #[serde(rename = "type")]
    pub rule_type: &'a str,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertRuleFilters<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub enabled: u8,
    pub resource_groups: Vec<&'a str>,
    pub event_category: Vec<&'a str>,
    pub severity: Vec<u8>,
}

impl<'a> AlertRuleRequest<'a> {
    /// Routes events of every severity and category to a single channel.
    pub fn all_events(name: &'a str, intg_guid: &'a str) -> Self {
        AlertRuleRequest {
            filters: AlertRuleFilters {
                name,
                description: RULE_DESCRIPTION,
                enabled: 1,
                resource_groups: Vec::new(),
                event_category: Vec::new(),
                severity: ALL_SEVERITIES.to_vec(),
            },
            intg_guid_list: vec![intg_guid],
            rule_type: RULE_TYPE,
        }
    }
}

impl LaceworkClient {
    /// Creates the event bus alert channel and returns its `intgGuid`.
    pub async fn create_alert_channel(
        &self,
        name: &str,
        event_bus_arn: &str,
    ) -> Result<String, ProvisionError> {
        let payload = AlertChannelRequest::event_bus(name, event_bus_arn);
        let response = self.post(ALERT_CHANNELS_PATH, &payload).await?;
        expect_status(response.status, StatusCode::CREATED, "send alert channel request")?;

        let created: AlertChannelResponse = response.json("send alert channel request")?;
        tracing::info!(intg_guid = %created.data.intg_guid, "Created alert channel");
        Ok(created.data.intg_guid)
    }

    pub async fn create_alert_rule(
        &self,
        name: &str,
        intg_guid: &str,
    ) -> Result<(), ProvisionError> {
        let payload = AlertRuleRequest::all_events(name, intg_guid);
        let response = self.post(ALERT_RULES_PATH, &payload).await?;
        expect_status(response.status, StatusCode::CREATED, "send alert rule request")?;

        tracing::info!(response = %response.text(), "Created alert rule");
        Ok(())
    }

    pub async fn delete_alert_channel(&self, intg_guid: &str) -> Result<(), ProvisionError> {
        let response = self.delete(&format!("{}/{}", ALERT_CHANNELS_PATH, intg_guid)).await?;
        expect_status(response.status, StatusCode::NO_CONTENT, "send delete alert channel request")
    }

    pub async fn delete_alert_rule(&self, mc_guid: &str) -> Result<(), ProvisionError> {
        let response = self.delete(&format!("{}/{}", ALERT_RULES_PATH, mc_guid)).await?;
        expect_status(response.status, StatusCode::NO_CONTENT, "send delete alert rule request")
    }
}

fn expect_status(
    status: StatusCode,
    expected: StatusCode,
    action: &'static str,
) -> Result<(), ProvisionError> {
    if status == expected {
        Ok(())
    } else {
        Err(ProvisionError::UnexpectedStatus {
            action,
            status: status.as_u16(),
        })
    }
}
