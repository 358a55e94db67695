use crate::context::Context;
use crate::utils;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

pub struct CleanOptions {
    pub yes: bool,
    pub no_refresh: bool,
    pub no_probe: bool,
    pub max_retries: Option<u32>,
    pub retry_delay: Option<u64>,
}

pub async fn handle(
    mut ctx: Context,
    options: CleanOptions,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    if !options.yes {
        eprintln!(
            "{} clean destroys every stage of '{}'",
            "⚠".yellow().bold(),
            ctx.project.name
        );
        for stage in ctx.project.reverse() {
            eprintln!("  • {}", stage.id.cyan());
        }
        anyhow::bail!("refusing to tear down without --yes");
    }

    if options.no_refresh {
        ctx.settings.clean.refresh = false;
    }
    if options.no_probe {
        ctx.settings.clean.proactive_reclaim = false;
    }
    if let Some(max_retries) = options.max_retries {
        ctx.settings.teardown.max_retries = max_retries;
    }
    if let Some(delay) = options.retry_delay {
        ctx.settings.teardown.retry_delay_secs = delay;
    }

    utils::print_step(&format!(
        "Tearing down {} ({} stages, up to {} retries per stage)",
        ctx.project.name,
        ctx.project.len(),
        ctx.settings.teardown.max_retries
    ));

    let orchestrator = ctx.orchestrator(cancel)?;
    let report = orchestrator.clean().await;
    utils::finish(report, "Teardown complete")
}
