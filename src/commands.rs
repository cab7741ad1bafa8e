// Command handlers
// Each mutating command resolves its target, submits, then waits on the poller

use anyhow::Context;
use dialoguer::Select;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AccessToken, CredentialManager, TokenIssuer};
use crate::catalog::{AttachmentAction, GroupOperation, VmcClient};
use crate::config::{Command, Config};
use crate::error::{ApiError, Result};
use crate::http_client::VmcHttpClient;
use crate::poller::{format_elapsed, DotProgress, OperationPoller, PollOptions, TaskOutcome};

/// Authenticated session for one CLI invocation
pub struct Session {
    client: Arc<VmcClient>,
    issuer: Arc<dyn TokenIssuer>,
    poller: OperationPoller,
    token: AccessToken,
}

impl Session {
    /// Build clients from configuration and fetch the first access token
    pub async fn connect(config: &Config) -> Result<Self> {
        let http = VmcHttpClient::new(
            config.base_url.clone(),
            Duration::from_secs(config.http_connect_timeout),
            Duration::from_secs(config.http_request_timeout),
        )?;
        let client = VmcClient::new(http, config.org_id.clone());

        let credentials = CredentialManager::new(
            config.csp_auth_url.clone(),
            config.api_token.clone(),
            config.token_validity(),
            Duration::from_secs(config.http_request_timeout),
        )?;
        let token = credentials.issue_token().await?;

        let session = Self::new(client, Arc::new(credentials), config.poll_options(), token);
        Ok(session.with_progress())
    }

    pub fn new(
        client: VmcClient,
        issuer: Arc<dyn TokenIssuer>,
        options: PollOptions,
        token: AccessToken,
    ) -> Self {
        let client = Arc::new(client);
        let poller = OperationPoller::new(client.clone(), issuer.clone(), options);

        Self {
            client,
            issuer,
            poller,
            token,
        }
    }

    /// Print progress dots while waiting
    fn with_progress(mut self) -> Self {
        self.poller = self.poller.with_progress(Box::new(DotProgress));
        self
    }

    /// Token currently held by the session
    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    /// Renew the token if prompts kept the operator busy past its renewal point
    async fn fresh_token(&mut self) -> Result<AccessToken> {
        if self.poller.options().token_needs_renewal(&self.token) {
            tracing::info!(
                token_age_secs = self.token.age().as_secs(),
                "Access token due for renewal, renewing"
            );
            self.token = self.issuer.issue_token().await?;
        }
        Ok(self.token.clone())
    }

    /// Execute one CLI command
    pub async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::ListSddcs => {
                println!("===== SDDC Info =========");
                self.list_sddcs().await
            }
            Command::ListGroups => {
                println!("===== SDDC Groups =========");
                self.list_groups().await
            }
            Command::GroupInfo { group } => {
                println!("===== SDDC Group info =========");
                let group_id = self.select_group(group).await?;
                self.group_info(&group_id).await
            }
            Command::CreateGroup { name, sddc } => {
                println!("=====Creating SDDC Group=========");
                self.create_group(&name, sddc).await.map(drop)
            }
            Command::DeleteGroup { group } => {
                println!("=====Deleting SDDC Group=========");
                self.delete_group(group).await.map(drop)
            }
            Command::AttachSddc { group, sddc } => {
                println!("===== Connecting SDDC =========");
                self.attach_sddc(group, sddc).await.map(drop)
            }
            Command::DetachSddc { group, sddc } => {
                println!("===== Removing SDDC =========");
                self.detach_sddc(group, sddc).await.map(drop)
            }
            Command::ConnectAwsAccount { account, group } => {
                println!("===== Connecting AWS account =========");
                self.apply(group, GroupOperation::AddExternalAccount { account })
                    .await
                    .map(drop)
            }
            Command::DisconnectAwsAccount { account, group } => {
                println!("===== Disconnecting AWS account =========");
                self.apply(group, GroupOperation::RemoveExternalAccount { account })
                    .await
                    .map(drop)
            }
            Command::AttachVpc { attachment, group } => {
                println!("===== Attaching VPC =========");
                let operation = GroupOperation::VpcAttachmentAction {
                    attachment_id: attachment,
                    action: AttachmentAction::Accept,
                };
                self.apply(group, operation).await.map(drop)
            }
            Command::DetachVpc { attachment, group } => {
                println!("===== Detaching VPC =========");
                let operation = GroupOperation::VpcAttachmentAction {
                    attachment_id: attachment,
                    action: AttachmentAction::Reject,
                };
                self.apply(group, operation).await.map(drop)
            }
            Command::SetVpcPrefixes {
                attachment,
                prefixes,
                group,
            } => {
                println!("===== Updating VPC prefixes =========");
                let operation = GroupOperation::UpdateVpcPrefixes {
                    attachment_id: attachment,
                    prefixes,
                };
                self.apply(group, operation).await.map(drop)
            }
            Command::AttachDxgw {
                dxgw_id,
                owner,
                region,
                prefixes,
                group,
            } => {
                println!("===== Attaching Direct Connect Gateway =========");
                let operation = GroupOperation::AssociateDxgw {
                    dxgw_id,
                    owner,
                    region,
                    prefixes,
                };
                self.apply(group, operation).await.map(drop)
            }
            Command::DetachDxgw {
                dxgw_id,
                owner,
                group,
            } => {
                println!("===== Detaching Direct Connect Gateway =========");
                self.apply(group, GroupOperation::DisassociateDxgw { dxgw_id, owner })
                    .await
                    .map(drop)
            }
            Command::Poll { task_id } => self.wait(&task_id).await.map(drop),
        }
    }

    async fn list_sddcs(&mut self) -> Result<()> {
        let token = self.fresh_token().await?;
        let page = self.client.list_deployments(&token).await?;
        if page.is_empty() {
            println!("\n=====No SDDC found=========");
        } else {
            for (i, sddc) in page.content.iter().enumerate() {
                println!("{}: {}", i + 1, sddc.name);
            }
        }
        Ok(())
    }

    async fn list_groups(&mut self) -> Result<()> {
        let token = self.fresh_token().await?;
        let page = self.client.list_groups(&token).await?;
        if page.is_empty() {
            println!("     No SDDC Group found\n");
        } else {
            for (i, group) in page.content.iter().enumerate() {
                println!("{}: {}: {}", i + 1, group.name, group.id);
            }
        }
        Ok(())
    }

    async fn group_info(&mut self, group_id: &str) -> Result<()> {
        let token = self.fresh_token().await?;
        let group = self.client.get_group(group_id, &token).await?;
        println!("Group Name: {}", group.name);
        println!("Group ID  : {}", group.id);
        for member in &group.membership.included {
            println!("Member    : {}", member.deployment_id);
        }
        Ok(())
    }

    pub async fn create_group(&mut self, name: &str, sddc: Option<String>) -> Result<TaskOutcome> {
        let deployment_id = self.select_sddc(sddc, "Select one SDDC to attach").await?;
        let token = self.fresh_token().await?;
        let task_id = self.client.create_group(name, &deployment_id, &token).await?;
        self.wait(&task_id).await
    }

    pub async fn delete_group(&mut self, group: Option<String>) -> Result<TaskOutcome> {
        let group_id = self.select_group(group).await?;
        let token = self.fresh_token().await?;

        let details = self.client.get_group(&group_id, &token).await?;
        if !details.is_empty() {
            return Err(ApiError::ValidationError(
                "SDDC Group not empty: detach all members".to_string(),
            ));
        }

        self.submit(&group_id, GroupOperation::DeleteGroup).await
    }

    pub async fn attach_sddc(
        &mut self,
        group: Option<String>,
        sddc: Option<String>,
    ) -> Result<TaskOutcome> {
        let group_id = self.select_group(group).await?;
        let deployment_id = self.select_sddc(sddc, "Select one SDDC to attach").await?;
        let operation = GroupOperation::UpdateMembers {
            add: vec![deployment_id],
            remove: vec![],
        };
        self.submit(&group_id, operation).await
    }

    pub async fn detach_sddc(
        &mut self,
        group: Option<String>,
        sddc: Option<String>,
    ) -> Result<TaskOutcome> {
        let group_id = self.select_group(group).await?;
        let deployment_id = match sddc {
            Some(id) => id,
            None => self.select_member(&group_id).await?,
        };
        let operation = GroupOperation::UpdateMembers {
            add: vec![],
            remove: vec![deployment_id],
        };
        self.submit(&group_id, operation).await
    }

    /// Resolve the group, then submit `operation` against it
    pub async fn apply(
        &mut self,
        group: Option<String>,
        operation: GroupOperation,
    ) -> Result<TaskOutcome> {
        let group_id = self.select_group(group).await?;
        self.submit(&group_id, operation).await
    }

    async fn submit(&mut self, group_id: &str, operation: GroupOperation) -> Result<TaskOutcome> {
        let token = self.fresh_token().await?;
        let resource_id = self.client.connectivity_config_id(group_id, &token).await?;
        let task_id = self.client.submit(&resource_id, &operation, &token).await?;
        self.wait(&task_id).await
    }

    /// Poll `task_id` to completion and report the result
    pub async fn wait(&mut self, task_id: &str) -> Result<TaskOutcome> {
        tracing::info!(task_id = %task_id, "Waiting for operation");

        match self.poller.await_completion(task_id, &mut self.token).await {
            Ok(outcome) => {
                println!("FINISHED in {}", format_elapsed(outcome.elapsed));
                Ok(outcome)
            }
            Err(ApiError::TaskFailed {
                code,
                message,
                message_key,
            }) => {
                print!("{}", failure_report(&code, &message, &message_key));
                Err(ApiError::TaskFailed {
                    code,
                    message,
                    message_key,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn select_group(&mut self, group: Option<String>) -> Result<String> {
        if let Some(id) = group {
            return Ok(id);
        }

        let token = self.fresh_token().await?;
        let page = self.client.list_groups(&token).await?;
        if page.is_empty() {
            return Err(ApiError::ValidationError("No SDDC Group found".to_string()));
        }

        let labels: Vec<String> = page
            .content
            .iter()
            .map(|g| format!("{}: {}", g.name, g.id))
            .collect();
        let index = prompt_select("Select SDDC Group", &labels)?;
        Ok(page.content[index].id.clone())
    }

    async fn select_sddc(&mut self, sddc: Option<String>, prompt: &str) -> Result<String> {
        if let Some(id) = sddc {
            return Ok(id);
        }

        let token = self.fresh_token().await?;
        let page = self.client.list_deployments(&token).await?;
        if page.is_empty() {
            return Err(ApiError::ValidationError("No SDDC found".to_string()));
        }

        let labels: Vec<String> = page.content.iter().map(|d| d.name.clone()).collect();
        let index = prompt_select(prompt, &labels)?;
        Ok(page.content[index].id.clone())
    }

    async fn select_member(&mut self, group_id: &str) -> Result<String> {
        let token = self.fresh_token().await?;
        let group = self.client.get_group(group_id, &token).await?;
        if group.is_empty() {
            return Err(ApiError::ValidationError(format!(
                "SDDC Group {} has no members",
                group.name
            )));
        }

        let labels: Vec<String> = group
            .membership
            .included
            .iter()
            .map(|m| m.deployment_id.clone())
            .collect();
        let index = prompt_select("Select one SDDC to detach", &labels)?;
        Ok(labels[index].clone())
    }
}

/// Operator-facing lines for a failed task, printed verbatim
fn failure_report(code: &str, message: &str, message_key: &str) -> String {
    format!(
        "Task FAILED\nError code : {}\nMessage    : {}\nMessage key: {}\n",
        code, message, message_key
    )
}

fn prompt_select(prompt: &str, items: &[String]) -> Result<usize> {
    let index = Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact()
        .context("Failed to read selection")?;
    Ok(index)
}
