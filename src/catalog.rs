// VMC resource catalog
// Thin wrappers over the inventory, network and operation endpoints

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::auth::AccessToken;
use crate::error::{ApiError, Result};
use crate::http_client::VmcHttpClient;
use crate::models::operation::{OperationRequest, OperationStatus, OperationSubmission};
use crate::models::vmc::{ConnectivityConfig, Deployment, DeploymentGroup, Page};
use crate::poller::StatusSource;

/// Decision applied to a pending VPC attachment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachmentAction {
    Accept,
    Reject,
}

impl AttachmentAction {
    fn as_str(self) -> &'static str {
        match self {
            AttachmentAction::Accept => "ACCEPT",
            AttachmentAction::Reject => "REJECT",
        }
    }
}

/// Mutation of an existing group's network connectivity config
#[derive(Clone, Debug, PartialEq)]
pub enum GroupOperation {
    UpdateMembers {
        add: Vec<String>,
        remove: Vec<String>,
    },
    DeleteGroup,
    AddExternalAccount {
        account: String,
    },
    RemoveExternalAccount {
        account: String,
    },
    VpcAttachmentAction {
        attachment_id: String,
        action: AttachmentAction,
    },
    UpdateVpcPrefixes {
        attachment_id: String,
        prefixes: Vec<String>,
    },
    AssociateDxgw {
        dxgw_id: String,
        owner: String,
        region: String,
        prefixes: Vec<String>,
    },
    DisassociateDxgw {
        dxgw_id: String,
        owner: String,
    },
}

impl GroupOperation {
    /// Request body for `POST /network/{org}/aws/operations`
    pub fn to_request(&self, resource_id: &str) -> OperationRequest {
        let (kind, config) = match self {
            GroupOperation::UpdateMembers { add, remove } => (
                "UPDATE_MEMBERS",
                json!({
                    "type": "AwsUpdateDeploymentGroupMembersConfig",
                    "add_members": members(add),
                    "remove_members": members(remove),
                }),
            ),
            GroupOperation::DeleteGroup => (
                "DELETE_DEPLOYMENT_GROUP",
                json!({ "type": "AwsDeleteDeploymentGroupConfig" }),
            ),
            GroupOperation::AddExternalAccount { account } => (
                "ADD_EXTERNAL_ACCOUNT",
                json!({
                    "type": "AwsAddExternalAccountsConfig",
                    "account": { "account_number": account },
                }),
            ),
            GroupOperation::RemoveExternalAccount { account } => (
                "REMOVE_EXTERNAL_ACCOUNT",
                json!({
                    "type": "AwsRemoveExternalAccountsConfig",
                    "account": { "account_number": account },
                }),
            ),
            GroupOperation::VpcAttachmentAction {
                attachment_id,
                action,
            } => (
                "APPLY_ATTACHMENT_ACTION",
                json!({
                    "type": "AwsApplyAttachmentActionConfig",
                    "attachments": [
                        { "action": action.as_str(), "attach_id": attachment_id }
                    ],
                }),
            ),
            GroupOperation::UpdateVpcPrefixes {
                attachment_id,
                prefixes,
            } => (
                "UPDATE_TGW_ATTACHMENT",
                json!({
                    "type": "AwsUpdateVpcAttachmentsConfig",
                    "vpc_attachments": [
                        { "attachment_id": attachment_id, "static_routes": prefixes }
                    ],
                }),
            ),
            GroupOperation::AssociateDxgw {
                dxgw_id,
                owner,
                region,
                prefixes,
            } => (
                "ASSOCIATE_DIRECT_CONNECT_GATEWAY",
                json!({
                    "type": "AwsAssociateDirectConnectGatewayConfig",
                    "direct_connect_gateway_association": {
                        "direct_connect_gateway_id": dxgw_id,
                        "direct_connect_gateway_owner": owner,
                        "peering_region_configs": [
                            { "allowed_prefixes": prefixes, "region": region }
                        ],
                    },
                }),
            ),
            GroupOperation::DisassociateDxgw { dxgw_id, owner } => (
                "DISASSOCIATE_DIRECT_CONNECT_GATEWAY",
                json!({
                    "type": "AwsDisassociateDirectConnectGatewayConfig",
                    "direct_connect_gateway_association": {
                        "direct_connect_gateway_id": dxgw_id,
                        "direct_connect_gateway_owner": owner,
                    },
                }),
            ),
        };

        OperationRequest::new(kind, resource_id, config)
    }
}

fn members(ids: &[String]) -> Value {
    Value::Array(ids.iter().map(|id| json!({ "id": id })).collect())
}

/// VMC API scoped to one organization
pub struct VmcClient {
    http: VmcHttpClient,
    org_id: String,
}

impl VmcClient {
    pub fn new(http: VmcHttpClient, org_id: impl Into<String>) -> Self {
        Self {
            http,
            org_id: org_id.into(),
        }
    }

    /// SDDCs in the organization
    pub async fn list_deployments(&self, token: &AccessToken) -> Result<Page<Deployment>> {
        let path = format!("/inventory/{}/core/deployments", self.org_id);
        self.http.get_json(&path, &[], token).await
    }

    /// SDDC Groups in the organization
    pub async fn list_groups(&self, token: &AccessToken) -> Result<Page<DeploymentGroup>> {
        let path = format!("/inventory/{}/core/deployment-groups", self.org_id);
        self.http.get_json(&path, &[], token).await
    }

    pub async fn get_group(&self, group_id: &str, token: &AccessToken) -> Result<DeploymentGroup> {
        let path = format!(
            "/inventory/{}/core/deployment-groups/{}",
            self.org_id, group_id
        );
        self.http.get_json(&path, &[], token).await
    }

    /// Id of the network connectivity config behind a group
    ///
    /// Group mutations are addressed to this resource, not to the group id.
    pub async fn connectivity_config_id(
        &self,
        group_id: &str,
        token: &AccessToken,
    ) -> Result<String> {
        let path = format!(
            "/network/{}/core/network-connectivity-configs/",
            self.org_id
        );
        let configs: Vec<ConnectivityConfig> = self
            .http
            .get_json(&path, &[("group_id", group_id)], token)
            .await?;

        configs.into_iter().next().map(|c| c.id).ok_or_else(|| {
            ApiError::ValidationError(format!(
                "No network connectivity config found for group {}",
                group_id
            ))
        })
    }

    /// Create a group with a single initial member; returns the task id
    pub async fn create_group(
        &self,
        name: &str,
        deployment_id: &str,
        token: &AccessToken,
    ) -> Result<String> {
        let path = format!(
            "/network/{}/core/network-connectivity-configs/create-group-network-connectivity",
            self.org_id
        );
        let body = json!({
            "name": name,
            "description": name,
            "members": [ { "id": deployment_id } ],
        });

        let submission: OperationSubmission = self.http.post_json(&path, &body, token).await?;
        task_id_of(submission)
    }

    /// Submit a group mutation; returns the task id
    pub async fn submit(
        &self,
        resource_id: &str,
        operation: &GroupOperation,
        token: &AccessToken,
    ) -> Result<String> {
        let path = format!("/network/{}/aws/operations", self.org_id);
        let request = operation.to_request(resource_id);
        tracing::debug!(kind = %request.kind, resource_id = %resource_id, "Submitting operation");

        let submission: OperationSubmission = self.http.post_json(&path, &request, token).await?;
        task_id_of(submission)
    }
}

fn task_id_of(submission: OperationSubmission) -> Result<String> {
    submission.task_id().map(str::to_string).ok_or_else(|| {
        ApiError::TransportError("Submission response did not contain an operation id".into())
    })
}

#[async_trait]
impl StatusSource for VmcClient {
    async fn fetch_status(&self, task_id: &str, token: &AccessToken) -> Result<OperationStatus> {
        let path = format!("/operation/{}/core/operations/{}", self.org_id, task_id);
        self.http.get_json(&path, &[], token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::time::Duration;

    const ORG: &str = "org-1";

    fn client_for(server: &mockito::ServerGuard) -> VmcClient {
        let http =
            VmcHttpClient::new(server.url(), Duration::from_secs(5), Duration::from_secs(5))
                .unwrap();
        VmcClient::new(http, ORG)
    }

    fn token() -> AccessToken {
        AccessToken::new("bearer-1", Duration::from_secs(1800))
    }

    #[test]
    fn test_update_members_payload() {
        let request = GroupOperation::UpdateMembers {
            add: vec!["d-1".to_string()],
            remove: vec![],
        }
        .to_request("res-1");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["type"], "UPDATE_MEMBERS");
        assert_eq!(value["resource_id"], "res-1");
        assert_eq!(value["config"]["type"], "AwsUpdateDeploymentGroupMembersConfig");
        assert_eq!(value["config"]["add_members"], json!([{ "id": "d-1" }]));
        assert_eq!(value["config"]["remove_members"], json!([]));
    }

    #[test]
    fn test_dxgw_association_payload() {
        let request = GroupOperation::AssociateDxgw {
            dxgw_id: "dxgw-1".to_string(),
            owner: "123456789012".to_string(),
            region: "us-west-2".to_string(),
            prefixes: vec!["10.0.0.0/16".to_string()],
        }
        .to_request("res-1");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["type"], "ASSOCIATE_DIRECT_CONNECT_GATEWAY");
        let association = &value["config"]["direct_connect_gateway_association"];
        assert_eq!(association["direct_connect_gateway_id"], "dxgw-1");
        assert_eq!(
            association["peering_region_configs"][0]["allowed_prefixes"],
            json!(["10.0.0.0/16"])
        );
        assert_eq!(association["peering_region_configs"][0]["region"], "us-west-2");
    }

    #[test]
    fn test_attachment_action_payload() {
        let request = GroupOperation::VpcAttachmentAction {
            attachment_id: "tgw-attach-1".to_string(),
            action: AttachmentAction::Reject,
        }
        .to_request("res-1");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["config"]["attachments"][0]["action"], "REJECT");
        assert_eq!(value["config"]["attachments"][0]["attach_id"], "tgw-attach-1");
    }

    #[tokio::test]
    async fn test_list_deployments() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/inventory/org-1/core/deployments")
            .match_header("csp-auth-token", "bearer-1")
            .with_status(200)
            .with_body(
                json!({
                    "content": [ { "id": "d-1", "name": "sddc-a" } ],
                    "empty": false,
                    "total_elements": 1
                })
                .to_string(),
            )
            .create_async()
            .await;

        let page = client_for(&server).list_deployments(&token()).await.unwrap();
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].name, "sddc-a");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connectivity_config_id_takes_first() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/network/org-1/core/network-connectivity-configs/")
            .match_query(Matcher::UrlEncoded("group_id".into(), "g-1".into()))
            .with_status(200)
            .with_body(r#"[{"id":"res-1"},{"id":"res-2"}]"#)
            .create_async()
            .await;

        let id = client_for(&server)
            .connectivity_config_id("g-1", &token())
            .await
            .unwrap();
        assert_eq!(id, "res-1");
    }

    #[tokio::test]
    async fn test_connectivity_config_missing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/network/org-1/core/network-connectivity-configs/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let err = client_for(&server)
            .connectivity_config_id("g-1", &token())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_create_group_returns_operation_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                "/network/org-1/core/network-connectivity-configs/create-group-network-connectivity",
            )
            .match_body(Matcher::Json(json!({
                "name": "grp",
                "description": "grp",
                "members": [ { "id": "d-1" } ]
            })))
            .with_status(200)
            .with_body(r#"{"operation_id":"op-create"}"#)
            .create_async()
            .await;

        let task_id = client_for(&server)
            .create_group("grp", "d-1", &token())
            .await
            .unwrap();
        assert_eq!(task_id, "op-create");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_members_returns_nested_operation_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/network/org-1/aws/operations")
            .match_body(Matcher::PartialJson(json!({ "type": "UPDATE_MEMBERS" })))
            .with_status(200)
            .with_body(r#"{"id":"outer","config":{"operation_id":"op-members"}}"#)
            .create_async()
            .await;

        let operation = GroupOperation::UpdateMembers {
            add: vec![],
            remove: vec!["d-1".to_string()],
        };
        let task_id = client_for(&server)
            .submit("res-1", &operation, &token())
            .await
            .unwrap();
        assert_eq!(task_id, "op-members");
    }

    #[tokio::test]
    async fn test_delete_group_returns_top_level_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/network/org-1/aws/operations")
            .match_body(Matcher::PartialJson(
                json!({ "type": "DELETE_DEPLOYMENT_GROUP" }),
            ))
            .with_status(200)
            .with_body(r#"{"id":"op-delete","config":{"type":"AwsDeleteDeploymentGroupConfig"}}"#)
            .create_async()
            .await;

        let task_id = client_for(&server)
            .submit("res-1", &GroupOperation::DeleteGroup, &token())
            .await
            .unwrap();
        assert_eq!(task_id, "op-delete");
    }

    #[tokio::test]
    async fn test_submission_without_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/network/org-1/aws/operations")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let err = client_for(&server)
            .submit("res-1", &GroupOperation::DeleteGroup, &token())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::TransportError(_)));
    }

    #[tokio::test]
    async fn test_fetch_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/operation/org-1/core/operations/op-1")
            .match_header("csp-auth-token", "bearer-1")
            .with_status(200)
            .with_body(r#"{"id":"op-1","state":{"name":"RUNNING"}}"#)
            .create_async()
            .await;

        let status = client_for(&server)
            .fetch_status("op-1", &token())
            .await
            .unwrap();
        assert_eq!(status.state_name(), "RUNNING");
    }
}
