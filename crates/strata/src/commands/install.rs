use crate::context::Context;
use crate::utils;
use tokio_util::sync::CancellationToken;

pub async fn handle(ctx: &Context, cancel: CancellationToken) -> anyhow::Result<()> {
    utils::print_step(&format!(
        "Installing {} ({} stages)",
        ctx.project.name,
        ctx.project.len()
    ));

    let orchestrator = ctx.orchestrator(cancel)?;
    let report = orchestrator.install().await;
    utils::finish(report, "Install complete")
}
