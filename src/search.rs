use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::LaceworkClient;
use crate::error::ProvisionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    AlertChannel,
    AlertRule,
}

impl ResourceKind {
    pub fn search_path(self) -> &'static str {
        match self {
            ResourceKind::AlertChannel => "/api/v2/AlertChannels/search",
            ResourceKind::AlertRule => "/api/v2/AlertRules/search",
        }
    }

    /// Field the name filter is applied to.
    fn name_field(self) -> &'static str {
        match self {
            ResourceKind::AlertChannel => "name",
            ResourceKind::AlertRule => "filters.name",
        }
    }

    /// Identifier projected by the search and used for deletion.
    pub fn id_field(self) -> &'static str {
        match self {
            ResourceKind::AlertChannel => "intgGuid",
            ResourceKind::AlertRule => "mcGuid",
        }
    }

    // Alert channel search answers 204 instead of an empty list on some tenants.
    fn no_content_is_empty(self) -> bool {
        self == ResourceKind::AlertChannel
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::AlertChannel => "alert channel",
            ResourceKind::AlertRule => "alert rule",
        }
    }
}

#[derive(Serialize)]
struct FilterPayload<'a> {
    filters: Vec<FilterExpression<'a>>,
    returns: Vec<&'a str>,
}

#[derive(Serialize)]
struct FilterExpression<'a> {
    expression: &'a str,
    field: &'a str,
    value: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Map<String, Value>>,
}

impl LaceworkClient {
    /// Looks a resource up by name. `Ok(None)` means nothing matched; with
    /// several matches the first one returned by the server wins.
    pub async fn search(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Option<String>, ProvisionError> {
        let payload = FilterPayload {
            filters: vec![FilterExpression {
                expression: "eq",
                field: kind.name_field(),
                value: name,
            }],
            returns: vec![kind.id_field()],
        };
        let response = self.post(kind.search_path(), &payload).await?;

        match response.status {
            StatusCode::OK => {
                let results: SearchResponse = response.json("search")?;
                let guid = results
                    .data
                    .first()
                    .and_then(|found| found.get(kind.id_field()))
                    .and_then(Value::as_str)
                    .filter(|guid| !guid.is_empty())
                    .map(str::to_string);
                if guid.is_none() {
                    tracing::warn!(resource = name, "No {} returned.", kind.label());
                }
                Ok(guid)
            }
            StatusCode::NO_CONTENT if kind.no_content_is_empty() => Ok(None),
            status => Err(ProvisionError::UnexpectedStatus {
                action: "search",
                status: status.as_u16(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::client::LaceworkClient;
    use crate::config::{ApiTarget, Credentials};
    use crate::mock::{json_body, MockDispatcher, MockResponse};
    use crate::search::ResourceKind;
    use serde_json::json;
    use std::sync::Arc;

    fn client(mock: &MockDispatcher) -> LaceworkClient {
        let target = ApiTarget {
            host: "acct.lacework.net".to_string(),
            sub_account: None,
            credentials: Credentials {
                key_id: "KEY".to_string(),
                secret: "SECRET".to_string(),
            },
            alert_channel_name: "sec-hub-channel".to_string(),
        };
        LaceworkClient::new(Arc::new(mock.clone()), &target, "TOKEN".to_string())
    }

    #[tokio::test]
    async fn test_search_alert_channel() {
        let mock = MockDispatcher::default().with_response(
            MockResponse::with_status(200)
                .with_body(r#"{"data":[{"intgGuid":"G1"},{"intgGuid":"G2"}]}"#),
        );

        let guid = client(&mock)
            .search(ResourceKind::AlertChannel, "sec-hub-channel")
            .await
            .unwrap();

        assert_eq!(guid.as_deref(), Some("G1"));
        let request = &mock.requests()[0];
        assert_eq!(request.url, "https://acct.lacework.net/api/v2/AlertChannels/search");
        assert_eq!(
            json_body(request),
            json!({
                "filters": [{"expression": "eq", "field": "name", "value": "sec-hub-channel"}],
                "returns": ["intgGuid"]
            })
        );
    }

    #[tokio::test]
    async fn test_search_alert_rule() {
        let found = MockResponse::with_status(200).with_body(r#"{"data":[{"mcGuid":"R1"}]}"#);
        let mock = MockDispatcher::default().with_response(found);

        let guid = client(&mock)
            .search(ResourceKind::AlertRule, "sec-hub-channel")
            .await
            .unwrap();

        assert_eq!(guid.as_deref(), Some("R1"));
        let request = &mock.requests()[0];
        assert_eq!(request.url, "https://acct.lacework.net/api/v2/AlertRules/search");
        assert_eq!(
            json_body(request),
            json!({
                "filters": [{
                    "expression": "eq",
                    "field": "filters.name",
                    "value": "sec-hub-channel"
                }],
                "returns": ["mcGuid"]
            })
        );
    }

    #[tokio::test]
    async fn test_search_empty_result() {
        let mock = MockDispatcher::default()
            .with_response(MockResponse::with_status(200).with_body(r#"{"data":[]}"#));

        let guid = client(&mock).search(ResourceKind::AlertRule, "missing").await.unwrap();

        assert_eq!(guid, None);
    }

    #[tokio::test]
    async fn test_search_no_content() {
        let mock = MockDispatcher::default()
            .with_response(MockResponse::with_status(204))
            .with_response(MockResponse::with_status(204));
        let client = client(&mock);

        assert_eq!(client.search(ResourceKind::AlertChannel, "x").await.unwrap(), None);
        assert_eq!(
            client.search(ResourceKind::AlertRule, "x").await.unwrap_err().status(),
            Some(204)
        );
    }

    #[tokio::test]
    async fn test_search_unexpected_status() {
        let mock = MockDispatcher::default().with_response(MockResponse::with_status(500));

        let error = client(&mock)
            .search(ResourceKind::AlertChannel, "x")
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "Failed to search. Response status is 500");
    }
}
