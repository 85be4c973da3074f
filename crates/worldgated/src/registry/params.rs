//! Typed access to request parameters.

use serde_json::{Map, Value};
use worldgate_protocol::Params;

use super::CommandError;
use crate::world::BlockPos;

/// JSON shape a parameter must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// JSON integer, or a float with no fractional part.
    Integer,
    /// Any JSON number.
    Number,
    /// JSON string.
    Text,
}

impl ParamKind {
    const fn describe(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Text => "string",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Integer => as_integer(value).is_some(),
            Self::Number => value.is_number(),
            Self::Text => value.is_string(),
        }
    }
}

/// Required parameter declared by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    /// Key in the `params` object.
    pub name: &'static str,
    /// Expected JSON shape.
    pub kind: ParamKind,
}

impl ParamSpec {
    /// Declares an integer parameter.
    #[must_use]
    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Integer,
        }
    }

    /// Declares a numeric parameter.
    #[must_use]
    pub const fn number(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Number,
        }
    }

    /// Declares a string parameter.
    #[must_use]
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Text,
        }
    }
}

/// Checks presence first, then types, of every declared parameter.
///
/// Presence failures are reported together so the client sees every absent
/// field at once. `null` counts as absent.
pub(crate) fn validate(required: &[ParamSpec], params: &Params) -> Result<(), CommandError> {
    let missing: Vec<&'static str> = required
        .iter()
        .filter(|spec| params.get(spec.name).is_none_or(Value::is_null))
        .map(|spec| spec.name)
        .collect();
    if !missing.is_empty() {
        return Err(CommandError::MissingParameters { names: missing });
    }
    for spec in required {
        if let Some(value) = params.get(spec.name)
            && !spec.kind.accepts(value)
        {
            return Err(CommandError::invalid_parameter(
                spec.name,
                spec.kind.describe(),
            ));
        }
    }
    Ok(())
}

/// Read-only view over a validated `params` object.
#[derive(Debug, Clone, Copy)]
pub struct Arguments<'a> {
    params: &'a Params,
}

impl<'a> Arguments<'a> {
    /// Wraps a parameter map.
    #[must_use]
    pub const fn new(params: &'a Params) -> Self {
        Self { params }
    }

    fn present(&self, name: &str) -> Option<&'a Value> {
        self.params.get(name).filter(|value| !value.is_null())
    }

    /// Returns whether `name` was supplied with a non-null value.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.present(name).is_some()
    }

    /// Reads an optional 64-bit integer.
    ///
    /// # Errors
    ///
    /// Fails when the value is present but not integral.
    pub fn opt_long(&self, name: &str) -> Result<Option<i64>, CommandError> {
        self.present(name)
            .map(|value| {
                as_integer(value).ok_or_else(|| CommandError::invalid_parameter(name, "integer"))
            })
            .transpose()
    }

    /// Reads a required 64-bit integer.
    ///
    /// # Errors
    ///
    /// Fails when the value is absent or not integral.
    pub fn long(&self, name: &'static str) -> Result<i64, CommandError> {
        self.opt_long(name)?.ok_or_else(|| missing(name))
    }

    /// Reads an optional 32-bit integer.
    ///
    /// # Errors
    ///
    /// Fails when the value is present but not an integer in `i32` range.
    pub fn opt_int(&self, name: &str) -> Result<Option<i32>, CommandError> {
        self.opt_long(name)?
            .map(|value| {
                i32::try_from(value).map_err(|_| CommandError::invalid_parameter(name, "integer"))
            })
            .transpose()
    }

    /// Reads a required 32-bit integer.
    ///
    /// # Errors
    ///
    /// Fails when the value is absent or not an integer in `i32` range.
    pub fn int(&self, name: &'static str) -> Result<i32, CommandError> {
        self.opt_int(name)?.ok_or_else(|| missing(name))
    }

    /// Reads an optional number.
    ///
    /// # Errors
    ///
    /// Fails when the value is present but not a number.
    pub fn opt_number(&self, name: &str) -> Result<Option<f64>, CommandError> {
        self.present(name)
            .map(|value| {
                value
                    .as_f64()
                    .ok_or_else(|| CommandError::invalid_parameter(name, "number"))
            })
            .transpose()
    }

    /// Reads a required number.
    ///
    /// # Errors
    ///
    /// Fails when the value is absent or not a number.
    pub fn number(&self, name: &'static str) -> Result<f64, CommandError> {
        self.opt_number(name)?.ok_or_else(|| missing(name))
    }

    /// Reads a required string.
    ///
    /// # Errors
    ///
    /// Fails when the value is absent or not a string.
    pub fn text(&self, name: &'static str) -> Result<&'a str, CommandError> {
        self.present(name)
            .ok_or_else(|| missing(name))?
            .as_str()
            .ok_or_else(|| CommandError::invalid_parameter(name, "string"))
    }

    /// Reads an optional JSON object.
    ///
    /// # Errors
    ///
    /// Fails when the value is present but not an object.
    pub fn object(&self, name: &str) -> Result<Option<&'a Map<String, Value>>, CommandError> {
        self.present(name)
            .map(|value| {
                value
                    .as_object()
                    .ok_or_else(|| CommandError::invalid_parameter(name, "object"))
            })
            .transpose()
    }

    /// Reads three integer parameters as a block position.
    ///
    /// # Errors
    ///
    /// Fails when any component is absent or not an integer.
    pub fn block_pos(
        &self,
        x: &'static str,
        y: &'static str,
        z: &'static str,
    ) -> Result<BlockPos, CommandError> {
        Ok(BlockPos::new(self.int(x)?, self.int(y)?, self.int(z)?))
    }
}

fn missing(name: &'static str) -> CommandError {
    CommandError::MissingParameters { names: vec![name] }
}

fn as_integer(value: &Value) -> Option<i64> {
    if let Some(integer) = value.as_i64() {
        return Some(integer);
    }
    let float = value.as_f64()?;
    let in_range = float >= i64::MIN as f64 && float < i64::MAX as f64;
    (float.fract() == 0.0 && in_range).then_some(float as i64)
}
