use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ==================================================================================================
// Operation Status
// ==================================================================================================

/// Body of `GET /operation/{org}/core/operations/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct OperationStatus {
    pub state: OperationState,
    /// Older responses report the failure text at top level
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationState {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub name_message: Option<NameMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameMessage {
    #[serde(default)]
    pub message_key: Option<String>,
}

impl OperationStatus {
    /// Raw state name as reported by the control plane
    pub fn state_name(&self) -> &str {
        &self.state.name
    }

    pub fn error_code(&self) -> &str {
        self.state.error_code.as_deref().unwrap_or_default()
    }

    pub fn error_message(&self) -> &str {
        self.state
            .error_msg
            .as_deref()
            .or(self.error_message.as_deref())
            .unwrap_or_default()
    }

    pub fn message_key(&self) -> &str {
        self.state
            .name_message
            .as_ref()
            .and_then(|m| m.message_key.as_deref())
            .unwrap_or_default()
    }
}

/// Accept error codes sent as strings or numbers
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

// ==================================================================================================
// Operation Submission
// ==================================================================================================

/// Request body for `POST /network/{org}/aws/operations`
#[derive(Debug, Clone, Serialize)]
pub struct OperationRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub resource_id: String,
    pub resource_type: String,
    pub config: Value,
}

impl OperationRequest {
    pub const RESOURCE_TYPE: &'static str = "network-connectivity-config";

    pub fn new(kind: &str, resource_id: &str, config: Value) -> Self {
        Self {
            kind: kind.to_string(),
            resource_id: resource_id.to_string(),
            resource_type: Self::RESOURCE_TYPE.to_string(),
            config,
        }
    }
}

/// Response to any mutating call
///
/// The task id lives in different places depending on the endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationSubmission {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub config: Option<SubmissionConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionConfig {
    #[serde(default)]
    pub operation_id: Option<String>,
}

impl OperationSubmission {
    /// Task id to poll: `config.operation_id`, then `operation_id`, then `id`
    pub fn task_id(&self) -> Option<&str> {
        self.config
            .as_ref()
            .and_then(|c| c.operation_id.as_deref())
            .or(self.operation_id.as_deref())
            .or(self.id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failed_status_fields() {
        let status: OperationStatus = serde_json::from_value(json!({
            "id": "op-1",
            "state": {
                "name": "FAILED",
                "error_code": "E1",
                "error_msg": "boom",
                "name_message": { "message_key": "k" }
            }
        }))
        .unwrap();

        assert_eq!(status.state_name(), "FAILED");
        assert_eq!(status.error_code(), "E1");
        assert_eq!(status.error_message(), "boom");
        assert_eq!(status.message_key(), "k");
    }

    #[test]
    fn test_minimal_status() {
        let status: OperationStatus =
            serde_json::from_value(json!({ "state": { "name": "STARTED" } })).unwrap();
        assert_eq!(status.state_name(), "STARTED");
        assert_eq!(status.error_code(), "");
        assert_eq!(status.message_key(), "");
    }

    #[test]
    fn test_numeric_error_code_and_top_level_message() {
        let status: OperationStatus = serde_json::from_value(json!({
            "state": { "name": "FAILED", "error_code": 409 },
            "error_message": "group busy"
        }))
        .unwrap();
        assert_eq!(status.error_code(), "409");
        assert_eq!(status.error_message(), "group busy");
    }

    #[test]
    fn test_missing_state_is_an_error() {
        let parsed = serde_json::from_value::<OperationStatus>(json!({ "id": "x" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_task_id_precedence() {
        let nested: OperationSubmission = serde_json::from_value(json!({
            "id": "outer",
            "config": { "operation_id": "inner" }
        }))
        .unwrap();
        assert_eq!(nested.task_id(), Some("inner"));

        let flat: OperationSubmission =
            serde_json::from_value(json!({ "operation_id": "op", "id": "outer" })).unwrap();
        assert_eq!(flat.task_id(), Some("op"));

        let bare: OperationSubmission = serde_json::from_value(json!({ "id": "outer" })).unwrap();
        assert_eq!(bare.task_id(), Some("outer"));

        assert_eq!(OperationSubmission::default().task_id(), None);
    }

    #[test]
    fn test_operation_request_serialization() {
        let request = OperationRequest::new(
            "DELETE_DEPLOYMENT_GROUP",
            "res-1",
            json!({ "type": "AwsDeleteDeploymentGroupConfig" }),
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["type"], "DELETE_DEPLOYMENT_GROUP");
        assert_eq!(value["resource_type"], "network-connectivity-config");
        assert_eq!(value["config"]["type"], "AwsDeleteDeploymentGroupConfig");
    }
}
