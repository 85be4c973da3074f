//! `getpos`, `teleport`, `gamemode`, and `give`.

use serde_json::{Value, json};

use crate::registry::{Arguments, CommandError};
use crate::world::{GameMode, ItemStack, Location, Material, World};

const MAX_STACK: i32 = 64;

pub(super) fn get_position(
    world: &mut dyn World,
    args: Arguments<'_>,
) -> Result<Value, CommandError> {
    let username = args.text("username")?;
    let player = world
        .player(username)
        .ok_or_else(|| CommandError::player_not_found(username))?;
    let block = player.location.block();
    Ok(json!([block.x, block.y, block.z]))
}

pub(super) fn teleport(world: &mut dyn World, args: Arguments<'_>) -> Result<Value, CommandError> {
    let username = args.text("username")?;
    let mut target = Location::at(args.number("x")?, args.number("y")?, args.number("z")?);
    if let (Some(yaw), Some(pitch)) = (args.opt_number("yaw")?, args.opt_number("pitch")?) {
        target.yaw = yaw as f32;
        target.pitch = pitch as f32;
    }
    if world.player(username).is_none() {
        return Err(CommandError::player_not_found(username));
    }
    if world.teleport(username, target) {
        Ok(Value::Bool(true))
    } else {
        Err(CommandError::domain("Teleport failed"))
    }
}

pub(super) fn game_mode(world: &mut dyn World, args: Arguments<'_>) -> Result<Value, CommandError> {
    let username = args.text("username")?;
    let requested = args.text("mode")?;
    let player = world
        .player_mut(username)
        .ok_or_else(|| CommandError::player_not_found(username))?;
    let mode: GameMode = requested.trim().parse().map_err(|_| {
        CommandError::domain(format!(
            "Invalid gamemode: {requested} (valid: survival, creative, adventure, spectator)"
        ))
    })?;
    player.game_mode = mode;
    Ok(Value::Bool(true))
}

pub(super) fn give(world: &mut dyn World, args: Arguments<'_>) -> Result<Value, CommandError> {
    let username = args.text("username")?;
    let item = args.text("item")?;
    let amount = args.opt_int("amount")?.unwrap_or(1);
    let amount = u8::try_from(amount)
        .ok()
        .filter(|amount| (1..=MAX_STACK).contains(&i32::from(*amount)))
        .ok_or_else(|| CommandError::domain("Amount must be between 1 and 64"))?;
    let player = world
        .player_mut(username)
        .ok_or_else(|| CommandError::player_not_found(username))?;
    let material = Material::resolve(item)
        .ok_or_else(|| CommandError::domain(format!("Invalid item type: {item}")))?;
    if material == Material::Air {
        return Err(CommandError::domain("Cannot give air"));
    }
    if !material.is_item() {
        return Err(CommandError::domain(format!("Invalid item type: {item}")));
    }
    player.inventory.push(ItemStack { material, amount });
    Ok(Value::Bool(true))
}
