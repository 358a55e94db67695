use crate::context::Context;
use colored::Colorize;
use std::path::Path;
use strata_iac::{DestroyPlan, StateTree, select_destroy_targets};
use tokio_util::sync::CancellationToken;

pub async fn handle(ctx: &Context, stage_id: &str, state_file: Option<&Path>) -> anyhow::Result<()> {
    let stage = ctx.project.require_stage(stage_id)?;

    let plan = match state_file {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let state = if content.trim().is_empty() {
                None
            } else {
                Some(StateTree::from_json(&content)?)
            };
            select_destroy_targets(&stage.destroy, state.as_ref())
        }
        None => {
            ctx.orchestrator(CancellationToken::new())?
                .targets(stage_id)
                .await?
        }
    };

    println!("Stage: {}", stage.id.cyan());
    if stage.destroy.skip {
        println!("  {}", "destroy is skipped for this stage".yellow());
    }
    match plan {
        DestroyPlan::Full => println!("  full destroy"),
        DestroyPlan::Bypass => println!("  nothing to destroy"),
        DestroyPlan::Targeted(targets) => {
            println!("  {} target(s):", targets.len());
            for target in targets {
                println!("    -target={}", target);
            }
        }
    }
    Ok(())
}
