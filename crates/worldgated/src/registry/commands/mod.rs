//! Built-in command implementations.

mod block_state;
mod blocks;
mod entities;
mod environment;
mod players;

use super::{CommandSpec, ParamSpec};

#[cfg(test)]
pub(crate) use self::blocks::{CLONE_LIMIT, FILL_LIMIT};
#[cfg(test)]
pub(crate) use self::entities::KILL_LIMIT;

const CORNERS: [ParamSpec; 6] = [
    ParamSpec::integer("x1"),
    ParamSpec::integer("y1"),
    ParamSpec::integer("z1"),
    ParamSpec::integer("x2"),
    ParamSpec::integer("y2"),
    ParamSpec::integer("z2"),
];

/// Every command the gateway serves.
pub(crate) const BUILTIN: &[CommandSpec] = &[
    CommandSpec {
        name: "setblock",
        required: &[
            ParamSpec::integer("x"),
            ParamSpec::integer("y"),
            ParamSpec::integer("z"),
            ParamSpec::text("block"),
        ],
        execute: blocks::set_block,
    },
    CommandSpec {
        name: "getblock",
        required: &[
            ParamSpec::integer("x"),
            ParamSpec::integer("y"),
            ParamSpec::integer("z"),
        ],
        execute: blocks::get_block,
    },
    CommandSpec {
        name: "fill",
        required: &[
            CORNERS[0],
            CORNERS[1],
            CORNERS[2],
            CORNERS[3],
            CORNERS[4],
            CORNERS[5],
            ParamSpec::text("block"),
        ],
        execute: blocks::fill,
    },
    CommandSpec {
        name: "clone",
        required: &[
            CORNERS[0],
            CORNERS[1],
            CORNERS[2],
            CORNERS[3],
            CORNERS[4],
            CORNERS[5],
            ParamSpec::integer("dest_x"),
            ParamSpec::integer("dest_y"),
            ParamSpec::integer("dest_z"),
        ],
        execute: blocks::clone_region,
    },
    CommandSpec {
        name: "getpos",
        required: &[ParamSpec::text("username")],
        execute: players::get_position,
    },
    CommandSpec {
        name: "teleport",
        required: &[
            ParamSpec::text("username"),
            ParamSpec::number("x"),
            ParamSpec::number("y"),
            ParamSpec::number("z"),
        ],
        execute: players::teleport,
    },
    CommandSpec {
        name: "gamemode",
        required: &[ParamSpec::text("username"), ParamSpec::text("mode")],
        execute: players::game_mode,
    },
    CommandSpec {
        name: "give",
        required: &[ParamSpec::text("username"), ParamSpec::text("item")],
        execute: players::give,
    },
    CommandSpec {
        name: "time",
        required: &[ParamSpec::text("action")],
        execute: environment::time,
    },
    CommandSpec {
        name: "weather",
        required: &[ParamSpec::text("condition")],
        execute: environment::weather,
    },
    CommandSpec {
        name: "summon",
        required: &[
            ParamSpec::text("entity_type"),
            ParamSpec::number("x"),
            ParamSpec::number("y"),
            ParamSpec::number("z"),
        ],
        execute: entities::summon,
    },
    CommandSpec {
        name: "kill",
        required: &[ParamSpec::text("selector")],
        execute: entities::kill,
    },
];
