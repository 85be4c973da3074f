//! Sparse in-memory world.

use std::collections::HashMap;

use uuid::Uuid;
use worldgate_config::WorldConfig;

use super::{
    Block, BlockPos, DAY_LENGTH, Entity, EntityKind, GameMode, Location, Material, Player, Weather,
    World,
};

const MAX_HEALTH: f64 = 20.0;

/// Reference [`World`] holding every non-air block in a hash map.
#[derive(Debug, Clone)]
pub struct MemoryWorld {
    blocks: HashMap<BlockPos, Block>,
    players: Vec<Player>,
    entities: Vec<Entity>,
    spawn: Location,
    time: u32,
    weather: Weather,
    weather_remaining: Option<u32>,
}

impl MemoryWorld {
    /// Creates an empty world whose players appear at `spawn`.
    #[must_use]
    pub fn new(spawn: Location) -> Self {
        Self {
            blocks: HashMap::new(),
            players: Vec::new(),
            entities: Vec::new(),
            spawn,
            time: 0,
            weather: Weather::Clear,
            weather_remaining: None,
        }
    }

    /// Creates a world with `players` online at `spawn`.
    #[must_use]
    pub fn with_players<I, S>(spawn: Location, players: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut world = Self::new(spawn);
        for name in players {
            world.join(name);
        }
        world
    }

    /// Seeds a world from the `players` and `spawn` configuration keys.
    #[must_use]
    pub fn from_config(config: &WorldConfig) -> Self {
        let [x, y, z] = config.spawn;
        Self::with_players(Location::at(x, y, z), config.players.iter().cloned())
    }

    /// Brings a player online at the spawn point, returning its entity id.
    ///
    /// Joining twice returns the existing id.
    pub fn join(&mut self, name: impl Into<String>) -> Uuid {
        let name = name.into();
        if let Some(existing) = self.player(&name) {
            return existing.id;
        }
        let id = Uuid::new_v4();
        self.players.push(Player {
            id,
            name,
            location: self.spawn,
            game_mode: GameMode::default(),
            health: MAX_HEALTH,
            inventory: Vec::new(),
        });
        self.entities.push(Entity {
            id,
            kind: EntityKind::Player,
            location: self.spawn,
        });
        id
    }

    /// Number of non-air cells.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn player_index(&self, name: &str) -> Option<usize> {
        self.players
            .iter()
            .position(|player| player.name.eq_ignore_ascii_case(name))
    }
}

impl Default for MemoryWorld {
    fn default() -> Self {
        Self::new(Location::at(0.0, 64.0, 0.0))
    }
}

impl World for MemoryWorld {
    fn block(&self, pos: BlockPos) -> Block {
        self.blocks
            .get(&pos)
            .cloned()
            .unwrap_or_else(|| Block::plain(Material::Air))
    }

    fn set_block(&mut self, pos: BlockPos, block: Block) {
        if block.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, block);
        }
    }

    fn player(&self, name: &str) -> Option<&Player> {
        self.player_index(name).map(|index| &self.players[index])
    }

    fn player_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.player_index(name)
            .map(move |index| &mut self.players[index])
    }

    fn teleport(&mut self, name: &str, to: Location) -> bool {
        let finite = [to.x, to.y, to.z].iter().all(|axis| axis.is_finite())
            && to.yaw.is_finite()
            && to.pitch.is_finite();
        let Some(index) = self.player_index(name) else {
            return false;
        };
        let player = &mut self.players[index];
        if !finite || player.health <= 0.0 {
            return false;
        }
        player.location = to;
        let id = player.id;
        if let Some(entity) = self.entities.iter_mut().find(|entity| entity.id == id) {
            entity.location = to;
        }
        true
    }

    fn spawn(&mut self, kind: EntityKind, at: Location) -> Uuid {
        let id = Uuid::new_v4();
        self.entities.push(Entity {
            id,
            kind,
            location: at,
        });
        id
    }

    fn entities(&self) -> Vec<Entity> {
        self.entities.clone()
    }

    fn remove_entity(&mut self, id: Uuid) -> bool {
        let Some(index) = self
            .entities
            .iter()
            .position(|entity| entity.id == id && entity.kind != EntityKind::Player)
        else {
            return false;
        };
        self.entities.remove(index);
        true
    }

    fn time(&self) -> u32 {
        self.time
    }

    fn set_time(&mut self, ticks: u32) {
        self.time = ticks % DAY_LENGTH;
    }

    fn weather(&self) -> Weather {
        self.weather
    }

    fn set_weather(&mut self, weather: Weather, duration: Option<u32>) {
        self.weather = weather;
        self.weather_remaining = duration.filter(|ticks| *ticks > 0);
    }

    fn tick(&mut self) {
        self.time = (self.time + 1) % DAY_LENGTH;
        match self.weather_remaining {
            Some(1) => {
                self.weather = Weather::Clear;
                self.weather_remaining = None;
            }
            Some(remaining) => self.weather_remaining = Some(remaining - 1),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn world() -> MemoryWorld {
        MemoryWorld::with_players(Location::at(0.5, 64.0, 0.5), ["Steve", "Alex"])
    }

    #[rstest]
    fn unset_cells_read_as_air(world: MemoryWorld) {
        assert!(world.block(BlockPos::new(1, 2, 3)).is_air());
    }

    #[rstest]
    fn placing_air_clears_the_cell(mut world: MemoryWorld) {
        let pos = BlockPos::new(4, 5, 6);
        world.set_block(pos, Block::plain(Material::Stone));
        assert_eq!(world.block_count(), 1);

        world.set_block(pos, Block::plain(Material::Air));

        assert_eq!(world.block_count(), 0);
    }

    #[rstest]
    fn players_are_listed_as_entities(world: MemoryWorld) {
        let kinds: Vec<_> = world.entities().iter().map(|entity| entity.kind).collect();
        assert_eq!(kinds, vec![EntityKind::Player, EntityKind::Player]);
    }

    #[rstest]
    fn player_lookup_ignores_case(world: MemoryWorld) {
        assert!(world.player("steve").is_some());
        assert!(world.player("Herobrine").is_none());
    }

    #[rstest]
    fn config_seeds_players_at_spawn() {
        let config = WorldConfig {
            players: vec![String::from("Notch")],
            spawn: [10.0, 70.0, -4.0],
        };

        let world = MemoryWorld::from_config(&config);

        let player = world.player("Notch").expect("seeded player");
        assert_eq!(player.location.block(), BlockPos::new(10, 70, -4));
    }

    #[rstest]
    fn players_cannot_be_removed(mut world: MemoryWorld) {
        let id = world.entities()[0].id;
        assert!(!world.remove_entity(id));
        assert_eq!(world.entities().len(), 2);
    }

    #[rstest]
    fn teleport_moves_player_and_entity(mut world: MemoryWorld) {
        let target = Location::at(10.0, 70.0, -5.0);

        assert!(world.teleport("Alex", target));

        let alex = world.player("Alex").map(|player| (player.id, player.location));
        let Some((id, location)) = alex else {
            panic!("Alex should be online");
        };
        assert_eq!(location, target);
        let entity = world.entities().into_iter().find(|entity| entity.id == id);
        assert_eq!(entity.map(|entity| entity.location), Some(target));
    }

    #[rstest]
    fn dead_players_cannot_teleport(mut world: MemoryWorld) {
        if let Some(player) = world.player_mut("Steve") {
            player.health = 0.0;
        }
        assert!(!world.teleport("Steve", Location::at(1.0, 1.0, 1.0)));
    }

    #[rstest]
    fn time_wraps_at_day_length(mut world: MemoryWorld) {
        world.set_time(DAY_LENGTH - 1);
        world.tick();
        assert_eq!(world.time(), 0);
        world.set_time(DAY_LENGTH);
        assert_eq!(world.time(), 0);
    }

    #[rstest]
    fn timed_weather_clears_after_duration(mut world: MemoryWorld) {
        world.set_weather(Weather::Rain, Some(2));
        world.tick();
        assert_eq!(world.weather(), Weather::Rain);
        world.tick();
        assert_eq!(world.weather(), Weather::Clear);
    }
}
