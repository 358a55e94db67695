use crate::context::Context;
use colored::Colorize;
use std::path::Path;
use strata_core::StageVariable;

pub fn handle(project_file: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "Validating project...".blue());

    let ctx = match Context::load(project_file) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ Invalid project".red().bold());
            eprintln!("  {}", e);
            return Err(e);
        }
    };

    println!(
        "Project file: {}",
        ctx.project_file.display().to_string().cyan()
    );
    println!("{}", "✓ Project file is valid".green().bold());
    println!();
    println!("Summary:");
    println!("  project: {}", ctx.project.name);
    if let Some(cluster) = &ctx.project.cluster {
        println!("  cluster: {} ({})", cluster.name.cyan(), cluster.region);
    }
    if let Some(backend) = &ctx.project.backend {
        let lock = backend.lock_table.as_deref().unwrap_or("(none)");
        println!(
            "  backend: s3://{} lock-table={}",
            backend.bucket.cyan(),
            lock
        );
    }
    println!("  stages: {}", ctx.project.len());
    for stage in ctx.project.forward() {
        let outputs = stage
            .variables
            .values()
            .filter(|v| matches!(v, StageVariable::StageOutput(_)))
            .count();
        println!(
            "    - {} (order {}, {} variables, {} from outputs)",
            stage.id.cyan(),
            stage.order,
            stage.variables.len(),
            outputs
        );
    }

    let missing: Vec<_> = ctx
        .project
        .forward()
        .filter(|stage| !ctx.root.join(&stage.path).is_dir())
        .collect();
    for stage in missing {
        crate::utils::print_warning(&format!(
            "stage '{}' path {} does not exist",
            stage.id,
            stage.path.display()
        ));
    }
    Ok(())
}
