use super::{Phase, Recipe};
use crate::error::{BuildError, Result};
use serde_yaml::Value;
use std::path::Path;

/// Load and parse the recipe file at `path`.
pub fn load(path: &Path) -> Result<Recipe> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| BuildError::io(format!("Failed to read {}", path.display()), e))?;
    parse(&content).map_err(|reason| BuildError::ConfigurationParseError {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parse recipe text. Unknown top-level keys are ignored.
pub fn parse(content: &str) -> Result<Recipe, String> {
    let doc: Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    let Value::Mapping(map) = doc else {
        return Err("top level is not a mapping".to_string());
    };

    let mut recipe = Recipe::new();
    for phase in Phase::ALL {
        if let Some(value) = map.get(phase.key()) {
            recipe = recipe.with_phase(phase, command_list(phase, value)?);
        }
    }
    Ok(recipe)
}

fn command_list(phase: Phase, value: &Value) -> Result<Vec<String>, String> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                scalar_text(item)
                    .ok_or_else(|| format!("'{}' entry {} is not a command string", phase, i + 1))
            })
            .collect(),
        other => scalar_text(other)
            .map(|cmd| vec![cmd])
            .ok_or_else(|| format!("'{}' must be a list of commands", phase)),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
