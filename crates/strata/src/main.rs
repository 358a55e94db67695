mod commands;
mod context;
mod health;
mod utils;

use clap::{Args, Parser, Subcommand};
use context::Context;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Staged infrastructure install and teardown that finishes what it starts", long_about = None)]
#[command(version)]
struct Cli {
    /// Project file (defaults to strata.kdl discovery)
    #[arg(short, long, global = true, env = "STRATA_PROJECT")]
    project: Option<PathBuf>,

    /// Debug logging (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Init and apply every stage in ascending order
    Install,
    /// Tear every stage down in descending order
    Clean {
        /// Confirm the teardown
        #[arg(short, long)]
        yes: bool,
        /// Skip the refresh pass before destroy
        #[arg(long)]
        no_refresh: bool,
        /// Skip the blocker probe and proactive reclamation
        #[arg(long)]
        no_probe: bool,
        #[command(flatten)]
        retry: RetryArgs,
    },
    /// Show the plan for one stage
    Plan {
        /// Stage id
        stage: String,
    },
    /// Show what a destroy of one stage would touch
    Targets {
        /// Stage id
        stage: String,
        /// Saved `terraform show -json` output to read instead of calling terraform
        #[arg(long)]
        state_file: Option<PathBuf>,
    },
    /// Delete the cluster's leftover cloud resources (load balancers, instances, interfaces, security groups)
    Reclaim {
        /// Confirm the deletion
        #[arg(short, long)]
        yes: bool,
    },
    /// Clear cluster-side teardown blockers (webhooks, stale APIs, stuck namespaces)
    Remediate,
    /// Check the project file
    Validate,
    /// List stages in install order
    Stages,
}

#[derive(Args, Clone, Copy)]
struct RetryArgs {
    /// Retries after the first destroy attempt
    #[arg(long)]
    max_retries: Option<u32>,
    /// Seconds to wait between destroy attempts
    #[arg(long)]
    retry_delay: Option<u64>,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Cancel `token` on the first Ctrl-C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            utils::print_warning("Interrupted, stopping after the current step");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // validate reports load errors itself
    if matches!(cli.command, Commands::Validate) {
        return commands::validate::handle(cli.project.as_deref());
    }

    let ctx = Context::load(cli.project.as_deref())?;
    let cancel = CancellationToken::new();

    match cli.command {
        Commands::Install => {
            cancel_on_ctrl_c(cancel.clone());
            commands::install::handle(&ctx, cancel).await?;
        }
        Commands::Clean {
            yes,
            no_refresh,
            no_probe,
            retry,
        } => {
            cancel_on_ctrl_c(cancel.clone());
            let options = commands::clean::CleanOptions {
                yes,
                no_refresh,
                no_probe,
                max_retries: retry.max_retries,
                retry_delay: retry.retry_delay,
            };
            commands::clean::handle(ctx, options, cancel).await?;
        }
        Commands::Plan { stage } => {
            commands::plan::handle(&ctx, &stage).await?;
        }
        Commands::Targets { stage, state_file } => {
            commands::targets::handle(&ctx, &stage, state_file.as_deref()).await?;
        }
        Commands::Reclaim { yes } => {
            cancel_on_ctrl_c(cancel.clone());
            commands::reclaim::handle(&ctx, yes, cancel).await?;
        }
        Commands::Remediate => {
            commands::remediate::handle(&ctx).await?;
        }
        Commands::Validate => {
            unreachable!("Validate is handled before project loading");
        }
        Commands::Stages => {
            commands::stages::handle(&ctx);
        }
    }

    Ok(())
}
