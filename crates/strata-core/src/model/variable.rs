//! Stage input variables

use serde::{Deserialize, Serialize};

/// Where a stage input comes from
///
/// Exactly one source per variable; `Unset` resolves to "no value" and the
/// variable is left out so the IaC unit's own default applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageVariable {
    Literal(String),
    /// Environment variable name
    Env(String),
    /// Dotted key in the local config file
    Config(String),
    /// Dotted key in the secret store
    Secret(String),
    /// `<stage>.outputs.<key>` reference, parsed lazily at resolution time
    StageOutput(String),
    Unset,
}

impl StageVariable {
    pub fn source_name(&self) -> &'static str {
        match self {
            StageVariable::Literal(_) => "literal",
            StageVariable::Env(_) => "env",
            StageVariable::Config(_) => "config",
            StageVariable::Secret(_) => "secret",
            StageVariable::StageOutput(_) => "output",
            StageVariable::Unset => "unset",
        }
    }
}

const OUTPUTS_SEPARATOR: &str = ".outputs.";

/// Parsed stage-output reference
///
/// `network.outputs.vpc.id` reads output `vpc` of stage `network` and then
/// queries `id` inside its JSON value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRef {
    pub stage: String,
    pub output: String,
    pub path: Option<String>,
}

impl OutputRef {
    pub fn parse(reference: &str) -> Option<Self> {
        let (stage, key) = reference.trim().split_once(OUTPUTS_SEPARATOR)?;
        if stage.is_empty() || key.is_empty() {
            return None;
        }

        let (output, path) = match key.split_once('.') {
            Some((output, path)) if !path.is_empty() => (output, Some(path.to_string())),
            Some((output, _)) => (output, None),
            None => (key, None),
        };
        if output.is_empty() {
            return None;
        }

        Some(Self {
            stage: stage.to_string(),
            output: output.to_string(),
            path,
        })
    }
}

impl std::fmt::Display for OutputRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.stage, OUTPUTS_SEPARATOR, self.output)?;
        if let Some(path) = &self.path {
            write!(f, ".{}", path)?;
        }
        Ok(())
    }
}
