//! Block state properties and tile data accepted by `setblock`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::registry::CommandError;

const FACES: &[&str] = &["north", "east", "south", "west", "up", "down"];
const ROTATIONS: &[&str] = &[
    "north",
    "north_north_east",
    "north_east",
    "east_north_east",
    "east",
    "east_south_east",
    "south_east",
    "south_south_east",
    "south",
    "south_south_west",
    "south_west",
    "west_south_west",
    "west",
    "west_north_west",
    "north_west",
    "north_north_west",
];
const AXES: &[&str] = &["x", "y", "z"];
const HALVES: &[&str] = &["top", "bottom"];
const SHAPES: &[&str] = &[
    "straight",
    "inner_left",
    "inner_right",
    "outer_left",
    "outer_right",
];
const FLAGS: &[&str] = &["true", "false"];

const TILE_KEYS: &[&str] = &["CustomName", "Text1", "Text2", "Text3", "Text4"];

fn allowed_values(property: &str) -> Option<&'static [&'static str]> {
    match property {
        "facing" => Some(FACES),
        "rotation" => Some(ROTATIONS),
        "axis" => Some(AXES),
        "half" => Some(HALVES),
        "shape" => Some(SHAPES),
        "waterlogged" | "open" | "powered" => Some(FLAGS),
        _ => None,
    }
}

/// Validates and normalises a `block_state` object.
///
/// Property names and values are lowercased. Every entry is checked before
/// anything is returned so a bad entry rejects the whole request.
pub(super) fn parse_state(
    state: &Map<String, Value>,
) -> Result<BTreeMap<String, String>, CommandError> {
    state
        .iter()
        .map(|(property, value)| {
            let property = property.to_ascii_lowercase();
            let rejected = |reason: String| {
                CommandError::domain(format!("Failed to set block state '{property}': {reason}"))
            };
            let allowed = allowed_values(&property)
                .ok_or_else(|| rejected(String::from("unsupported property")))?;
            let value = scalar(value)
                .ok_or_else(|| rejected(String::from("expected a string value")))?
                .to_ascii_lowercase();
            if !allowed.contains(&value.as_str()) {
                return Err(rejected(format!(
                    "invalid value '{value}' (valid: {})",
                    allowed.join(", ")
                )));
            }
            Ok((property, value))
        })
        .collect()
}

/// Extracts the recognised tile data keys from an `nbt` object.
///
/// Unrecognised keys are ignored.
pub(super) fn parse_tile_data(
    nbt: &Map<String, Value>,
) -> Result<BTreeMap<String, String>, CommandError> {
    TILE_KEYS
        .iter()
        .filter_map(|key| nbt.get(*key).map(|value| (*key, value)))
        .map(|(key, value)| {
            scalar(value)
                .map(|text| (key.to_owned(), text))
                .ok_or_else(|| {
                    CommandError::domain(format!(
                        "Failed to set NBT data: '{key}' must be a string"
                    ))
                })
        })
        .collect()
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
