use clap::Parser;

use sddc_groupctl::commands::Session;
use sddc_groupctl::config::{self, CliArgs, Config};
use sddc_groupctl::error::ApiError;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if !e.already_reported() {
            eprintln!("❌ {}", e);
        }
        std::process::exit(e.exit_code());
    }
}

async fn run() -> Result<(), ApiError> {
    // .env files feed clap's env fallbacks, so load them before parsing
    config::load_env_files();
    let mut args = CliArgs::parse();

    if config::needs_interactive_setup(&args) {
        config::run_interactive_setup(&mut args)?;
    }

    let config = Config::from_args(&args)?;
    config.validate()?;

    init_logging(&config);

    tracing::info!(
        base_url = %config.base_url,
        org_id = %config.org_id,
        "sddc-groupctl {} starting",
        env!("CARGO_PKG_VERSION")
    );
    tracing::debug!(
        renewal_policy = ?config.renewal_policy,
        poll_interval = config.poll_interval,
        "Poll settings"
    );

    let mut session = Session::connect(&config).await?;
    tracing::info!(
        "✅ Authentication successful (token: {}...)",
        session.token().preview()
    );

    session.run(args.command).await
}

/// Initialize logging on stderr; stdout is reserved for command output
fn init_logging(config: &Config) {
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    if config.json_logs {
        builder.json().init();
    } else {
        builder
            .with_target(false)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .init();
    }
}
