pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "stolos")]
#[command(author = "Stolos Contributors")]
#[command(version = "0.1.0")]
#[command(about = "DAG-based distributed job scheduler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Run the executor gate loop for an app, or a single targeted job")]
    Run {
        #[arg(long, help = "App to run (must be declared in the task config)")]
        app_name: String,

        #[arg(long, help = "Run only this specific job id instead of draining the queue")]
        job_id: Option<String>,

        #[arg(long, help = "Shell command template used by the bash plugin executor")]
        bash: Option<String>,

        #[arg(long, help = "Invoke the plugin directly, skipping all queue/lock/parent-gate machinery (requires --job-id)")]
        bypass_scheduler: bool,

        #[arg(long, help = "Overrides the app's configured retry bound for this run")]
        max_retry: Option<u32>,

        #[arg(long, default_value_t = 5, help = "Seconds to block waiting for a queue item before giving up")]
        timeout: u64,

        #[arg(long, help = "Redirect plugin stdout/stderr to this process's stderr")]
        redirect_to_stderr: bool,
    },
}
