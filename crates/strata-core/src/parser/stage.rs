//! stage node parsing

use super::{first_string, flag, prop, prop_string};
use crate::error::{CoreError, Result};
use crate::model::{AddressPattern, DestroyPolicy, Stage, StageVariable};
use kdl::KdlNode;

const SOURCES: [&str; 5] = ["literal", "env", "config", "secret", "output"];

/// Parse a `stage "id" order=N path="..." { ... }` node
pub fn parse_stage(node: &KdlNode) -> Result<Stage> {
    let id = first_string(node)
        .ok_or_else(|| CoreError::InvalidConfig("stage requires an id".to_string()))?
        .to_string();

    let order = prop(node, "order")
        .and_then(|v| v.as_integer())
        .ok_or_else(|| invalid(&id, "order= is required"))?;
    let order = i32::try_from(order).map_err(|_| invalid(&id, "order= is out of range"))?;

    let path = prop_string(node, "path").ok_or_else(|| invalid(&id, "path= is required"))?;

    let mut stage = Stage::new(id.clone(), path, order);

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "requires-cluster" | "requires_cluster" => {
                    stage.requires_cluster = flag(child);
                }
                "variables" => {
                    if let Some(vars) = child.children() {
                        for var in vars.nodes() {
                            let name = var.name().value().to_string();
                            let variable = parse_variable(&id, var)?;
                            stage.variables.insert(name, variable);
                        }
                    }
                }
                "destroy" => stage.destroy = parse_destroy(&id, child)?,
                other => {
                    tracing::debug!(stage = %id, node = %other, "Ignoring unknown stage node");
                }
            }
        }
    }

    Ok(stage)
}

/// `name literal="x"`, `name env="X"`, ... or `name "x"` as a literal shorthand
fn parse_variable(stage: &str, node: &KdlNode) -> Result<StageVariable> {
    let name = node.name().value();
    let present: Vec<(&str, &str)> = SOURCES
        .iter()
        .filter_map(|key| prop_string(node, key).map(|value| (*key, value)))
        .collect();

    if present.len() > 1 {
        let keys: Vec<_> = present.iter().map(|(k, _)| *k).collect();
        return Err(invalid(
            stage,
            &format!("variable '{}' has more than one source: {}", name, keys.join(", ")),
        ));
    }

    let variable = match present.first() {
        Some(("literal", v)) => StageVariable::Literal(v.to_string()),
        Some(("env", v)) => StageVariable::Env(v.to_string()),
        Some(("config", v)) => StageVariable::Config(v.to_string()),
        Some(("secret", v)) => StageVariable::Secret(v.to_string()),
        Some(("output", v)) => StageVariable::StageOutput(v.to_string()),
        Some(_) => StageVariable::Unset,
        None => match first_string(node) {
            Some(v) => StageVariable::Literal(v.to_string()),
            None => StageVariable::Unset,
        },
    };
    Ok(variable)
}

fn parse_destroy(stage: &str, node: &KdlNode) -> Result<DestroyPolicy> {
    let mut policy = DestroyPolicy::default();

    let Some(children) = node.children() else {
        return Ok(policy);
    };

    for child in children.nodes() {
        match child.name().value() {
            "skip" => policy.skip = flag(child),
            "override-vars" | "override_vars" => policy.override_vars = flag(child),
            "include" => policy.include.push(parse_pattern(stage, child)?),
            "exclude" => policy.exclude.push(parse_pattern(stage, child)?),
            other => {
                tracing::debug!(stage = %stage, node = %other, "Ignoring unknown destroy node");
            }
        }
    }

    Ok(policy)
}

fn parse_pattern(stage: &str, node: &KdlNode) -> Result<AddressPattern> {
    if let Some(re) = prop_string(node, "regex") {
        return AddressPattern::regex(re);
    }
    first_string(node)
        .map(AddressPattern::exact)
        .ok_or_else(|| invalid(stage, "include/exclude requires an address or regex="))
}

fn invalid(stage: &str, message: &str) -> CoreError {
    CoreError::InvalidStage {
        stage: stage.to_string(),
        message: message.to_string(),
    }
}
