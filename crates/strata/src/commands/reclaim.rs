use crate::context::Context;
use crate::utils;
use tokio_util::sync::CancellationToken;

pub async fn handle(ctx: &Context, yes: bool, cancel: CancellationToken) -> anyhow::Result<()> {
    let engine = ctx
        .reclamation(cancel)
        .ok_or_else(|| anyhow::anyhow!("project '{}' declares no cluster", ctx.project.name))?;

    if !yes {
        anyhow::bail!(
            "refusing to delete resources tagged for cluster '{}' without --yes",
            engine.scope().cluster_id
        );
    }

    utils::print_step(&format!(
        "Reclaiming cloud resources of {} in {}",
        engine.scope().cluster_id,
        engine.scope().region
    ));
    let report = engine.reclaim().await;
    println!("{}", report);

    for warning in &report.warnings {
        utils::print_warning(warning);
    }
    if report.cancelled {
        anyhow::bail!("reclamation cancelled");
    }
    if report.is_clean() {
        utils::print_success("Reclamation complete");
    }
    Ok(())
}
