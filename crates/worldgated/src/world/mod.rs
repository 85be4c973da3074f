//! Boundary to the simulated world.
//!
//! The gateway never touches world state from a session worker. Every read
//! and write happens inside work submitted to the simulation executor, which
//! owns the single [`World`] instance. [`MemoryWorld`] is the reference
//! implementation shipped with the daemon; an embedding engine supplies its
//! own implementation of the trait.

mod catalog;
mod memory;

use std::collections::BTreeMap;

use strum::{Display, EnumString};
use uuid::Uuid;

pub use self::catalog::{EntityKind, Material};
pub use self::memory::MemoryWorld;

pub(crate) use self::catalog::strip_namespace;

/// Length of a full day in ticks.
pub const DAY_LENGTH: u32 = 24_000;

/// Integer block coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPos {
    /// East-west axis.
    pub x: i32,
    /// Vertical axis.
    pub y: i32,
    /// North-south axis.
    pub z: i32,
}

impl BlockPos {
    /// Builds a position from its components.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Continuous position with optional facing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    /// East-west axis.
    pub x: f64,
    /// Vertical axis.
    pub y: f64,
    /// North-south axis.
    pub z: f64,
    /// Horizontal facing in degrees.
    pub yaw: f32,
    /// Vertical facing in degrees.
    pub pitch: f32,
}

impl Location {
    /// Builds a location facing south with a level gaze.
    #[must_use]
    pub const fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Returns the block containing this location.
    #[must_use]
    pub fn block(&self) -> BlockPos {
        BlockPos::new(
            self.x.floor() as i32,
            self.y.floor() as i32,
            self.z.floor() as i32,
        )
    }
}

/// Placed block: material plus its state properties and tile data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block type.
    pub material: Material,
    /// State properties such as `facing=north`.
    pub state: BTreeMap<String, String>,
    /// Tile data such as sign text or a container name.
    pub data: BTreeMap<String, String>,
}

impl Block {
    /// Builds a block with no state or tile data.
    #[must_use]
    pub const fn plain(material: Material) -> Self {
        Self {
            material,
            state: BTreeMap::new(),
            data: BTreeMap::new(),
        }
    }

    /// Returns whether the cell is empty.
    #[must_use]
    pub fn is_air(&self) -> bool {
        self.material == Material::Air
    }
}

/// Player game modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum GameMode {
    /// Default mode.
    #[default]
    Survival,
    /// Unlimited resources.
    Creative,
    /// Restricted interaction.
    Adventure,
    /// Observer only.
    Spectator,
}

/// Weather conditions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Weather {
    /// Clear skies.
    #[default]
    Clear,
    /// Rain without lightning.
    Rain,
    /// Rain with lightning.
    Thunder,
}

/// Stack of items held in an inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemStack {
    /// Item type.
    pub material: Material,
    /// Stack size in `1..=64`.
    pub amount: u8,
}

/// Connected player.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Entity id shared with the entity list.
    pub id: Uuid,
    /// Account name.
    pub name: String,
    /// Current position.
    pub location: Location,
    /// Current game mode.
    pub game_mode: GameMode,
    /// Health points; zero means dead.
    pub health: f64,
    /// Items received.
    pub inventory: Vec<ItemStack>,
}

/// Entity snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Unique id.
    pub id: Uuid,
    /// Entity type.
    pub kind: EntityKind,
    /// Current position.
    pub location: Location,
}

/// Mutable simulation state reachable only from the simulation thread.
pub trait World: Send + 'static {
    /// Returns the block at `pos`; unset cells read as air.
    fn block(&self, pos: BlockPos) -> Block;

    /// Replaces the block at `pos`.
    fn set_block(&mut self, pos: BlockPos, block: Block);

    /// Looks up an online player by exact name, ignoring case.
    fn player(&self, name: &str) -> Option<&Player>;

    /// Mutable player lookup.
    fn player_mut(&mut self, name: &str) -> Option<&mut Player>;

    /// Moves a player. Returns `false` when the world refuses the move.
    fn teleport(&mut self, name: &str, to: Location) -> bool;

    /// Spawns an entity and returns its id.
    fn spawn(&mut self, kind: EntityKind, at: Location) -> Uuid;

    /// Lists entities in spawn order, players included.
    fn entities(&self) -> Vec<Entity>;

    /// Removes a non-player entity. Returns whether anything was removed.
    fn remove_entity(&mut self, id: Uuid) -> bool;

    /// Time of day in `0..DAY_LENGTH`.
    fn time(&self) -> u32;

    /// Sets the time of day; values wrap at [`DAY_LENGTH`].
    fn set_time(&mut self, ticks: u32);

    /// Current weather.
    fn weather(&self) -> Weather;

    /// Sets the weather, optionally for a number of ticks.
    fn set_weather(&mut self, weather: Weather, duration: Option<u32>);

    /// Advances the simulation by one tick.
    fn tick(&mut self);
}
