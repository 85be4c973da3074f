//! `summon` and `kill`.

use serde_json::{Value, json};

use crate::registry::{Arguments, CommandError};
use crate::world::{EntityKind, Location, World, strip_namespace};

/// Most entities a single `kill` removes.
pub(crate) const KILL_LIMIT: usize = 1000;

const PLAYER_SELECTOR: &str = "player:";

pub(super) fn summon(world: &mut dyn World, args: Arguments<'_>) -> Result<Value, CommandError> {
    let requested = args.text("entity_type")?;
    let name = strip_namespace(requested);
    let location = Location::at(args.number("x")?, args.number("y")?, args.number("z")?);
    let kind = EntityKind::resolve(name)
        .ok_or_else(|| CommandError::domain(format!("Invalid entity type: {name}")))?;
    if !kind.is_spawnable() {
        return Err(CommandError::domain(format!(
            "Cannot summon entity type: {name}"
        )));
    }
    let id = world.spawn(kind, location);
    Ok(Value::String(id.to_string()))
}

pub(super) fn kill(world: &mut dyn World, args: Arguments<'_>) -> Result<Value, CommandError> {
    let selector = args.text("selector")?;
    if selector.eq_ignore_ascii_case("all") {
        return Ok(json!(remove_matching(world, |_| true)));
    }
    if let Some(username) = selector.strip_prefix(PLAYER_SELECTOR) {
        let player = world
            .player_mut(username)
            .ok_or_else(|| CommandError::player_not_found(username))?;
        player.health = 0.0;
        return Ok(json!(1));
    }
    let kind = EntityKind::resolve(selector).ok_or_else(|| {
        CommandError::domain(format!(
            "Invalid selector: {selector} (use 'all', 'player:username', or entity type)"
        ))
    })?;
    Ok(json!(remove_matching(world, |candidate| candidate == kind)))
}

/// Removes non-player entities of a matching kind in spawn order, stopping
/// at [`KILL_LIMIT`].
fn remove_matching(world: &mut dyn World, matches: impl Fn(EntityKind) -> bool) -> usize {
    let targets: Vec<_> = world
        .entities()
        .into_iter()
        .filter(|entity| entity.kind != EntityKind::Player && matches(entity.kind))
        .take(KILL_LIMIT)
        .map(|entity| entity.id)
        .collect();
    targets
        .into_iter()
        .filter(|id| world.remove_entity(*id))
        .count()
}
