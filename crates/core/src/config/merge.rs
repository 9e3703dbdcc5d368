//! Deep merge of caller overrides onto the default template.

use serde_json::{Map, Value};

use super::EvaluationConfig;
use crate::error::CoreError;

/// Template paths whose override replaces the default wholesale instead of
/// merging key by key. Their keys are data (attribute names), not schema.
const REPLACE_PATHS: &[&str] = &["post_processing.attribute_groups"];

/// Top-level shorthand keys that belong under `dataset`.
const DATASET_SHORTHANDS: &[&str] = &["protected_attributes", "target_column", "sampling"];

/// Build the configuration for one submission.
///
/// `overrides` must be a JSON object (`null` counts as empty). Missing fields
/// take their template default; a value whose kind does not match its
/// template slot is a [`CoreError::Validation`] naming the dotted path.
pub fn materialize(overrides: &Value) -> Result<EvaluationConfig, CoreError> {
    let overrides = match overrides {
        Value::Null => Map::new(),
        Value::Object(map) => map.clone(),
        other => {
            return Err(CoreError::Validation(format!(
                "Config overrides must be a JSON object, got {}",
                kind(other)
            )))
        }
    };

    let normalized = normalize(overrides)?;

    let mut merged = EvaluationConfig::default().to_json()?;
    deep_merge(&mut merged, &Value::Object(normalized), "")?;

    let config: EvaluationConfig = serde_json::from_value(merged)
        .map_err(|e| CoreError::Validation(format!("Invalid config override: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// Merge `overrides` into `base` in place.
///
/// Objects merge recursively, `null` keeps the base value, everything else
/// replaces it after a kind check. `path` is the dotted location of `base`
/// (empty at the root) and is used in error messages.
pub fn deep_merge(base: &mut Value, overrides: &Value, path: &str) -> Result<(), CoreError> {
    match (base, overrides) {
        (_, Value::Null) => Ok(()),
        (Value::Object(base_map), Value::Object(over_map)) => {
            for (key, over) in over_map {
                let child_path = join(path, key);
                match base_map.get_mut(key) {
                    Some(slot) if REPLACE_PATHS.contains(&child_path.as_str()) => {
                        if !over.is_null() {
                            check_kind(slot, over, &child_path)?;
                            *slot = over.clone();
                        }
                    }
                    Some(slot) => deep_merge(slot, over, &child_path)?,
                    None => {
                        base_map.insert(key.clone(), over.clone());
                    }
                }
            }
            Ok(())
        }
        (base, over) => {
            check_kind(base, over, path)?;
            *base = over.clone();
            Ok(())
        }
    }
}

/// Move request-shaped shorthand keys onto their template paths.
///
/// When both the shorthand and the nested form are given, the nested form
/// wins.
fn normalize(mut overrides: Map<String, Value>) -> Result<Map<String, Value>, CoreError> {
    for key in DATASET_SHORTHANDS {
        if let Some(value) = overrides.remove(*key) {
            let dataset = object_slot(&mut overrides, "dataset")?;
            dataset.entry(key.to_string()).or_insert(value);
        }
    }

    if let Some(Value::Object(model)) = overrides.get_mut("model") {
        if let Some(model_id) = model.remove("model_id") {
            let hf = object_slot(model, "huggingface")?;
            hf.entry("model_id".to_string()).or_insert(model_id);
        }
    }

    if let Some(Value::Object(metrics)) = overrides.get_mut("metrics") {
        for group in ["fairness", "performance"] {
            if let Some(slot) = metrics.get_mut(group) {
                if slot.is_array() {
                    let list = slot.take();
                    let mut wrapped = Map::new();
                    wrapped.insert("metrics".to_string(), list);
                    *slot = Value::Object(wrapped);
                }
            }
        }
    }

    Ok(overrides)
}

/// Get (creating if absent) the object stored under `key`.
fn object_slot<'a>(
    map: &'a mut Map<String, Value>,
    key: &str,
) -> Result<&'a mut Map<String, Value>, CoreError> {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(obj) => Ok(obj),
        other => Err(CoreError::Validation(format!(
            "Config field '{key}' expects object, got {}",
            kind(other)
        ))),
    }
}

fn check_kind(base: &Value, over: &Value, path: &str) -> Result<(), CoreError> {
    if base.is_null() || kind(base) == kind(over) {
        return Ok(());
    }
    Err(CoreError::Validation(format!(
        "Config field '{path}' expects {}, got {}",
        kind(base),
        kind(over)
    )))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
