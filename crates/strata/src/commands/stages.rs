use crate::context::Context;
use colored::Colorize;

pub fn handle(ctx: &Context) {
    println!(
        "{} ({})",
        ctx.project.name.bold(),
        ctx.project_file.display().to_string().dimmed()
    );
    for stage in ctx.project.forward() {
        let mut flags = Vec::new();
        if stage.requires_cluster {
            flags.push("requires-cluster");
        }
        if stage.destroy.skip {
            flags.push("destroy-skip");
        } else if !stage.destroy.is_unfiltered() {
            flags.push("filtered-destroy");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!(
            "  {:>5}  {}  {}{}",
            stage.order,
            stage.id.cyan(),
            stage.path.display(),
            flags.dimmed()
        );
    }
}
