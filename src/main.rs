use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use stolos::application::services::DagBuilder;
use stolos::infrastructure::config::JsonTaskConfig;
use stolos::infrastructure::store::InMemoryCoordinationStore;
use stolos::presentation::cli::commands::RunCommand;
use stolos::presentation::cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("stolos=debug,info")
    } else {
        EnvFilter::new("stolos=info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let config = JsonTaskConfig::from_env()?;
    let dag = DagBuilder::build(&config)?;
    let store = InMemoryCoordinationStore::new();

    match cli.command {
        Commands::Run {
            app_name,
            job_id,
            bash,
            bypass_scheduler,
            max_retry,
            timeout,
            redirect_to_stderr,
        } => RunCommand::execute(
            &config,
            &dag,
            &store,
            &app_name,
            job_id.as_deref(),
            bash.as_deref(),
            bypass_scheduler,
            max_retry,
            Duration::from_secs(timeout),
            redirect_to_stderr,
        )?,
    }

    Ok(())
}
