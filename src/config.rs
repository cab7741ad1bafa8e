use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input, Password};
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ApiError;
use crate::poller::{PollOptions, RenewalPolicy};

pub const DEFAULT_BASE_URL: &str = "https://vmc.vmware.com/api";
pub const DEFAULT_CSP_AUTH_URL: &str =
    "https://console.cloud.vmware.com/csp/gateway/am/api/auth/api-tokens/authorize";

/// SDDC Group control - manage VMC SDDC Groups from the command line
#[derive(Parser, Debug)]
#[command(name = "sddc-groupctl", author, version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// VMC API base URL
    #[arg(long, env = "VMC_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// CSP token exchange endpoint
    #[arg(long, env = "CSP_AUTH_URL", default_value = DEFAULT_CSP_AUTH_URL, global = true)]
    pub csp_url: String,

    /// CSP API token (long-lived refresh token)
    #[arg(short = 't', long, env = "VMC_API_TOKEN", hide_env_values = true, global = true)]
    pub api_token: Option<String>,

    /// Organization ID
    #[arg(short = 'o', long, env = "VMC_ORG_ID", global = true)]
    pub org_id: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn", global = true)]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: String,

    /// Seconds between operation status queries
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "2", global = true)]
    pub poll_interval: u64,

    /// Token age in seconds at which a poll session renews it
    #[arg(long, env = "TOKEN_RENEWAL_THRESHOLD_SECS", default_value = "1700", global = true)]
    pub renewal_threshold: u64,

    /// Token lifetime in seconds assumed when CSP does not say
    #[arg(long, env = "TOKEN_VALIDITY_SECS", default_value = "1800", global = true)]
    pub token_validity: u64,

    /// Token renewal policy during polling (periodic, once)
    #[arg(long, env = "TOKEN_RENEWAL_POLICY", default_value = "periodic", global = true)]
    pub renewal_policy: String,

    /// Give up polling after this many seconds (default: wait forever)
    #[arg(long, env = "POLL_DEADLINE_SECS", global = true)]
    pub poll_deadline: Option<u64>,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "30", global = true)]
    pub http_connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "60", global = true)]
    pub http_timeout: u64,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List SDDCs in the organization
    ListSddcs,

    /// List SDDC Groups in the organization
    ListGroups,

    /// Show the name, id and members of a group
    GroupInfo {
        /// Group id (prompted when omitted)
        #[arg(long)]
        group: Option<String>,
    },

    /// Create a group with one SDDC
    CreateGroup {
        name: String,
        /// SDDC deployment id (prompted when omitted)
        #[arg(long)]
        sddc: Option<String>,
    },

    /// Delete an empty group
    DeleteGroup {
        #[arg(long)]
        group: Option<String>,
    },

    /// Add an SDDC to a group
    AttachSddc {
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        sddc: Option<String>,
    },

    /// Remove an SDDC from a group
    DetachSddc {
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        sddc: Option<String>,
    },

    /// Share the group's transit gateway with an AWS account
    ConnectAwsAccount {
        account: String,
        #[arg(long)]
        group: Option<String>,
    },

    /// Stop sharing the group's transit gateway with an AWS account
    DisconnectAwsAccount {
        account: String,
        #[arg(long)]
        group: Option<String>,
    },

    /// Accept a pending VPC attachment
    AttachVpc {
        attachment: String,
        #[arg(long)]
        group: Option<String>,
    },

    /// Reject or remove a VPC attachment
    DetachVpc {
        attachment: String,
        #[arg(long)]
        group: Option<String>,
    },

    /// Replace the static route prefixes of a VPC attachment
    SetVpcPrefixes {
        attachment: String,
        #[arg(required = true)]
        prefixes: Vec<String>,
        #[arg(long)]
        group: Option<String>,
    },

    /// Associate a Direct Connect Gateway with the group
    AttachDxgw {
        dxgw_id: String,
        /// AWS account owning the gateway
        owner: String,
        #[arg(long)]
        region: String,
        /// Allowed prefix (repeatable)
        #[arg(long = "prefix", required = true)]
        prefixes: Vec<String>,
        #[arg(long)]
        group: Option<String>,
    },

    /// Disassociate a Direct Connect Gateway from the group
    DetachDxgw {
        dxgw_id: String,
        owner: String,
        #[arg(long)]
        group: Option<String>,
    },

    /// Wait for an already submitted operation
    Poll { task_id: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    // Endpoints
    pub base_url: String,
    pub csp_auth_url: String,

    // Credentials
    pub api_token: String,
    pub org_id: String,

    // Polling
    pub poll_interval: u64,
    pub token_renewal_threshold: u64,
    pub token_validity: u64,
    pub renewal_policy: RenewalPolicy,
    pub poll_deadline: Option<u64>,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    pub log_level: String,
    pub json_logs: bool,
}

impl Config {
    /// Build configuration from parsed arguments (CLI > ENV > defaults)
    pub fn from_args(args: &CliArgs) -> std::result::Result<Self, ApiError> {
        let api_token = args.api_token.clone().ok_or_else(|| {
            ApiError::ConfigError(
                "VMC_API_TOKEN is required (use -t or set VMC_API_TOKEN env var)".to_string(),
            )
        })?;
        let org_id = args.org_id.clone().ok_or_else(|| {
            ApiError::ConfigError(
                "VMC_ORG_ID is required (use -o or set VMC_ORG_ID env var)".to_string(),
            )
        })?;

        Ok(Config {
            base_url: args.base_url.clone(),
            csp_auth_url: args.csp_url.clone(),
            api_token,
            org_id,
            poll_interval: args.poll_interval,
            token_renewal_threshold: args.renewal_threshold,
            token_validity: args.token_validity,
            renewal_policy: parse_renewal_policy(&args.renewal_policy)?,
            poll_deadline: args.poll_deadline,
            http_connect_timeout: args.http_connect_timeout,
            http_request_timeout: args.http_timeout,
            log_level: args.log_level.clone(),
            json_logs: args.log_format.eq_ignore_ascii_case("json"),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), ApiError> {
        if self.api_token.trim().is_empty() {
            return Err(ApiError::ConfigError("VMC_API_TOKEN is empty".to_string()));
        }
        if self.org_id.trim().is_empty() {
            return Err(ApiError::ConfigError("VMC_ORG_ID is empty".to_string()));
        }
        let urls = [
            ("VMC_BASE_URL", &self.base_url),
            ("CSP_AUTH_URL", &self.csp_auth_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(ApiError::ConfigError(format!(
                    "{} must be an http(s) URL: {}",
                    name, url
                )));
            }
        }
        if self.poll_interval == 0 {
            return Err(ApiError::ConfigError(
                "POLL_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }
        if self.token_renewal_threshold >= self.token_validity {
            return Err(ApiError::ConfigError(format!(
                "TOKEN_RENEWAL_THRESHOLD_SECS ({}) must be below TOKEN_VALIDITY_SECS ({})",
                self.token_renewal_threshold, self.token_validity
            )));
        }
        Ok(())
    }

    /// Options for the operation poller
    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: Duration::from_secs(self.poll_interval),
            renewal_threshold: Duration::from_secs(self.token_renewal_threshold),
            renewal_policy: self.renewal_policy,
            deadline: self.poll_deadline.map(Duration::from_secs),
            ..PollOptions::default()
        }
    }

    pub fn token_validity(&self) -> Duration {
        Duration::from_secs(self.token_validity)
    }
}

/// Parse renewal policy from string
fn parse_renewal_policy(s: &str) -> std::result::Result<RenewalPolicy, ApiError> {
    match s.to_lowercase().as_str() {
        "periodic" => Ok(RenewalPolicy::Periodic),
        "once" => Ok(RenewalPolicy::Once),
        other => Err(ApiError::ConfigError(format!(
            "TOKEN_RENEWAL_POLICY must be 'periodic' or 'once', got '{}'",
            other
        ))),
    }
}

/// Per-user env file, e.g. ~/.config/sddc-groupctl/.env
pub fn user_env_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sddc-groupctl").join(".env"))
}

/// Load `./.env`, then the per-user env file; already-set variables win
pub fn load_env_files() {
    dotenvy::dotenv().ok();
    if let Some(path) = user_env_file() {
        dotenvy::from_path(path).ok();
    }
}


// === Interactive Setup ===

/// Check if interactive setup is needed (credentials missing and a terminal to ask on)
pub fn needs_interactive_setup(args: &CliArgs) -> bool {
    (args.api_token.is_none() || args.org_id.is_none()) && std::io::stdin().is_terminal()
}

/// Prompt for whatever credentials are missing and fill them into `args`
pub fn run_interactive_setup(args: &mut CliArgs) -> Result<()> {
    println!();
    println!("No VMC credentials found. Let's set them up.");
    println!();

    if args.api_token.is_none() {
        let api_token: String = Password::new()
            .with_prompt("CSP API token (VMC_API_TOKEN)")
            .interact()
            .context("Failed to read VMC_API_TOKEN")?;

        if api_token.trim().is_empty() {
            anyhow::bail!("VMC_API_TOKEN cannot be empty");
        }
        args.api_token = Some(api_token);
    }

    if args.org_id.is_none() {
        let org_id: String = Input::new()
            .with_prompt("Organization ID (VMC_ORG_ID)")
            .interact_text()
            .context("Failed to read VMC_ORG_ID")?;
        args.org_id = Some(org_id);
    }

    if let Some(path) = user_env_file() {
        println!();
        let save = Confirm::new()
            .with_prompt(format!("Save credentials to {}?", path.display()))
            .default(true)
            .interact()
            .context("Failed to read save confirmation")?;

        if save {
            save_env_file(&path, args)?;
            println!("✅ Configuration saved to {}", path.display());
        }
    }

    println!();
    Ok(())
}

/// Save credentials to an env file
fn save_env_file(path: &std::path::Path, args: &CliArgs) -> Result<()> {
    let env_content = format!(
        r#"# SDDC Group control configuration
# Generated by interactive setup

# CSP API token (required)
VMC_API_TOKEN={}

# Organization ID (required)
VMC_ORG_ID={}

# VMC API base URL
VMC_BASE_URL={}

# Logging (trace, debug, info, warn, error)
LOG_LEVEL=warn
"#,
        args.api_token.as_deref().unwrap_or_default(),
        args.org_id.as_deref().unwrap_or_default(),
        args.base_url,
    );

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    // The file holds a long-lived API token
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to restrict {}", path.display()))?;
    }
    file.write_all(env_content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}
