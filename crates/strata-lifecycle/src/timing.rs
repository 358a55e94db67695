//! Per-phase timing summary

use chrono::{DateTime, Local};
use std::future::Future;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    Ok,
    Failed(String),
    Skipped(String),
}

impl std::fmt::Display for PhaseOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseOutcome::Ok => write!(f, "ok"),
            PhaseOutcome::Failed(reason) => write!(f, "failed: {}", reason),
            PhaseOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhaseTiming {
    pub name: String,
    pub duration: Duration,
    pub outcome: PhaseOutcome,
}

/// Durations and outcomes of every phase in one run
#[derive(Debug, Clone)]
pub struct TimingReport {
    started_at: DateTime<Local>,
    phases: Vec<PhaseTiming>,
}

impl Default for TimingReport {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingReport {
    pub fn new() -> Self {
        Self {
            started_at: Local::now(),
            phases: Vec::new(),
        }
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn record(&mut self, name: impl Into<String>, duration: Duration, outcome: PhaseOutcome) {
        let name = name.into();
        tracing::debug!(phase = %name, elapsed_ms = duration.as_millis() as u64, %outcome, "Phase finished");
        self.phases.push(PhaseTiming {
            name,
            duration,
            outcome,
        });
    }

    pub fn skipped(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.record(name, Duration::ZERO, PhaseOutcome::Skipped(reason.into()));
    }

    /// Time a fallible future and record its outcome
    pub async fn measure<T, E, F>(&mut self, name: impl Into<String>, future: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let started = Instant::now();
        let result = future.await;
        let outcome = match &result {
            Ok(_) => PhaseOutcome::Ok,
            Err(e) => PhaseOutcome::Failed(e.to_string()),
        };
        self.record(name, started.elapsed(), outcome);
        result
    }

    pub fn phases(&self) -> &[PhaseTiming] {
        &self.phases
    }

    pub fn phase(&self, name: &str) -> Option<&PhaseTiming> {
        self.phases.iter().find(|p| p.name == name)
    }

    pub fn total(&self) -> Duration {
        self.phases.iter().map(|p| p.duration).sum()
    }

    pub fn failures(&self) -> usize {
        self.phases
            .iter()
            .filter(|p| matches!(p.outcome, PhaseOutcome::Failed(_)))
            .count()
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

impl std::fmt::Display for TimingReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self
            .phases
            .iter()
            .map(|p| p.name.len())
            .max()
            .unwrap_or(5)
            .max(5);

        writeln!(f, "{:<width$}  {:>8}  outcome", "phase", "time", width = width)?;
        for phase in &self.phases {
            writeln!(
                f,
                "{:<width$}  {:>8}  {}",
                phase.name,
                format_duration(phase.duration),
                phase.outcome,
                width = width
            )?;
        }
        write!(
            f,
            "{:<width$}  {:>8}  started {}",
            "total",
            format_duration(self.total()),
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            width = width
        )
    }
}
