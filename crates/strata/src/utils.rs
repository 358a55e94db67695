use colored::Colorize;
use strata_lifecycle::{PhaseOutcome, RunReport, TimingReport};

pub fn print_step(message: &str) {
    println!("{} {}", "▶".cyan().bold(), message.bold());
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Timing table with failed and skipped phases highlighted
pub fn print_timing(timing: &TimingReport) {
    println!();
    println!("{}", "Timing".bold());
    let table = timing.to_string();
    let mut lines = table.lines();
    if let Some(header) = lines.next() {
        println!("  {}", header.dimmed());
    }
    let phases = timing.phases();
    for (index, line) in lines.enumerate() {
        match phases.get(index).map(|p| &p.outcome) {
            Some(PhaseOutcome::Failed(_)) => println!("  {}", line.red()),
            Some(PhaseOutcome::Skipped(_)) => println!("  {}", line.dimmed()),
            _ => println!("  {}", line),
        }
    }
}

/// Print the timing table, then the overall result
pub fn finish(report: RunReport, success: &str) -> anyhow::Result<()> {
    print_timing(&report.timing);
    println!();
    match report.result {
        Ok(()) => {
            print_success(success);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e.to_string().red());
            Err(e.into())
        }
    }
}
