//! `time` and `weather`.

use serde_json::{Value, json};

use crate::registry::{Arguments, CommandError};
use crate::world::{DAY_LENGTH, Weather, World};

const TICKS_PER_SECOND: i64 = 20;

pub(super) fn time(world: &mut dyn World, args: Arguments<'_>) -> Result<Value, CommandError> {
    let action = args.text("action")?.trim().to_ascii_lowercase();
    let value = |action: &str| {
        args.opt_long("value")?.ok_or_else(|| {
            CommandError::domain(format!(
                "Missing parameter: value for action '{action}'"
            ))
        })
    };
    match action.as_str() {
        "set" => {
            let ticks = value("set")?;
            let ticks = u32::try_from(ticks)
                .ok()
                .filter(|ticks| *ticks <= DAY_LENGTH)
                .ok_or_else(|| {
                    CommandError::domain(format!(
                        "Value out of range: {ticks} (valid: 0-{DAY_LENGTH})"
                    ))
                })?;
            world.set_time(ticks);
        }
        "add" => {
            let delta = value("add")?;
            let advanced = (i64::from(world.time()) + delta % i64::from(DAY_LENGTH))
                .rem_euclid(i64::from(DAY_LENGTH));
            world.set_time(u32::try_from(advanced).unwrap_or_default());
        }
        "query" => {}
        _ => {
            return Err(CommandError::domain(format!(
                "Invalid action: {action} (valid: set, add, query)"
            )));
        }
    }
    Ok(json!(world.time()))
}

pub(super) fn weather(world: &mut dyn World, args: Arguments<'_>) -> Result<Value, CommandError> {
    let condition = args.text("condition")?.trim().to_ascii_lowercase();
    let weather: Weather = condition.parse().map_err(|_| {
        CommandError::domain(format!(
            "Invalid condition: {condition} (valid: clear, rain, thunder)"
        ))
    })?;
    let duration = args
        .opt_long("duration")?
        .map(|seconds| {
            if seconds < 0 {
                return Err(CommandError::domain(format!(
                    "Invalid duration: {seconds} (must not be negative)"
                )));
            }
            seconds
                .checked_mul(TICKS_PER_SECOND)
                .and_then(|ticks| u32::try_from(ticks).ok())
                .ok_or_else(|| CommandError::domain(format!("Invalid duration: {seconds}")))
        })
        .transpose()?;
    world.set_weather(weather, duration);
    Ok(Value::Bool(true))
}
