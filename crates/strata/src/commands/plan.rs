use crate::context::Context;
use crate::utils;
use tokio_util::sync::CancellationToken;

pub async fn handle(ctx: &Context, stage: &str) -> anyhow::Result<()> {
    utils::print_step(&format!("Planning stage {}", stage));
    let orchestrator = ctx.orchestrator(CancellationToken::new())?;
    let plan = orchestrator.plan(stage).await?;
    println!("{}", plan);
    Ok(())
}
