use crate::context::Context;
use crate::utils;

pub async fn handle(ctx: &Context) -> anyhow::Result<()> {
    let remediation = ctx
        .remediation()
        .ok_or_else(|| anyhow::anyhow!("project '{}' declares no cluster", ctx.project.name))?;

    utils::print_step("Clearing cluster teardown blockers");
    let report = remediation.run().await;
    println!("{}", report);

    if let Some(reason) = &report.skipped {
        utils::print_warning(&format!("Skipped: {}", reason));
        return Ok(());
    }
    for warning in &report.warnings {
        utils::print_warning(warning);
    }
    utils::print_success("Remediation complete");
    Ok(())
}
