//! Material and entity catalogues understood by the gateway.

use strum::{Display, EnumString};

const NAMESPACE: &str = "minecraft:";

/// Strips an optional `minecraft:` namespace from an identifier.
pub(crate) fn strip_namespace(name: &str) -> &str {
    name.get(..NAMESPACE.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(NAMESPACE))
        .map_or(name, |_| &name[NAMESPACE.len()..])
}

/// Block and item types known to the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Material {
    /// Empty space; setting it clears a cell.
    Air,
    Stone,
    Granite,
    Diorite,
    Andesite,
    GrassBlock,
    Dirt,
    CoarseDirt,
    Cobblestone,
    MossyCobblestone,
    Bedrock,
    Sand,
    RedSand,
    Gravel,
    Clay,
    Snow,
    Ice,
    Water,
    Lava,
    Obsidian,
    OakLog,
    SpruceLog,
    BirchLog,
    OakLeaves,
    OakPlanks,
    SprucePlanks,
    BirchPlanks,
    OakStairs,
    StoneStairs,
    OakSlab,
    OakDoor,
    OakFence,
    OakSign,
    Glass,
    GlassPane,
    WhiteWool,
    RedWool,
    BlueWool,
    Bricks,
    StoneBricks,
    Bookshelf,
    CraftingTable,
    Furnace,
    Chest,
    Torch,
    Lantern,
    Ladder,
    Lever,
    StoneButton,
    Glowstone,
    Tnt,
    Pumpkin,
    Melon,
    Cactus,
    CoalOre,
    IronOre,
    GoldOre,
    DiamondOre,
    IronBlock,
    GoldBlock,
    DiamondBlock,
    Coal,
    IronIngot,
    GoldIngot,
    Diamond,
    Stick,
    Apple,
    Bread,
    CookedBeef,
    Arrow,
    Bow,
    WoodenSword,
    IronSword,
    DiamondSword,
    IronPickaxe,
    DiamondPickaxe,
    WaterBucket,
    EnderPearl,
}

impl Material {
    /// Resolves a material id, with or without namespace, ignoring case.
    #[must_use]
    pub fn resolve(name: &str) -> Option<Self> {
        strip_namespace(name.trim()).parse().ok()
    }

    /// Returns whether the material can be placed in the world.
    #[must_use]
    pub const fn is_block(self) -> bool {
        !matches!(
            self,
            Self::Coal
                | Self::IronIngot
                | Self::GoldIngot
                | Self::Diamond
                | Self::Stick
                | Self::Apple
                | Self::Bread
                | Self::CookedBeef
                | Self::Arrow
                | Self::Bow
                | Self::WoodenSword
                | Self::IronSword
                | Self::DiamondSword
                | Self::IronPickaxe
                | Self::DiamondPickaxe
                | Self::WaterBucket
                | Self::EnderPearl
        )
    }

    /// Returns whether the material can sit in an inventory.
    #[must_use]
    pub const fn is_item(self) -> bool {
        !matches!(self, Self::Air | Self::Water | Self::Lava)
    }

    /// Namespaced identifier, e.g. `minecraft:stone`.
    #[must_use]
    pub fn id(self) -> String {
        format!("{NAMESPACE}{self}")
    }
}

/// Entity types known to the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EntityKind {
    /// Connected player; never summoned or removed through commands.
    Player,
    Zombie,
    Skeleton,
    Creeper,
    Spider,
    Enderman,
    Witch,
    Slime,
    Pig,
    Cow,
    Sheep,
    Chicken,
    Horse,
    Wolf,
    Cat,
    Villager,
    IronGolem,
    ArmorStand,
    Boat,
    Minecart,
    Tnt,
    Item,
    ExperienceOrb,
    LightningBolt,
    FishingBobber,
}

impl EntityKind {
    /// Resolves an entity type, with or without namespace, ignoring case.
    #[must_use]
    pub fn resolve(name: &str) -> Option<Self> {
        strip_namespace(name.trim()).parse().ok()
    }

    /// Returns whether the type may be created through `summon`.
    #[must_use]
    pub const fn is_spawnable(self) -> bool {
        !matches!(
            self,
            Self::Player | Self::Item | Self::LightningBolt | Self::FishingBobber
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("stone", Some(Material::Stone))]
    #[case("minecraft:stone", Some(Material::Stone))]
    #[case("MINECRAFT:Grass_Block", Some(Material::GrassBlock))]
    #[case("  oak_planks ", Some(Material::OakPlanks))]
    #[case("unobtainium", None)]
    #[case("minecraft:", None)]
    fn materials_resolve_with_optional_namespace(
        #[case] name: &str,
        #[case] expected: Option<Material>,
    ) {
        assert_eq!(Material::resolve(name), expected);
    }

    #[rstest]
    fn material_ids_are_namespaced() {
        assert_eq!(Material::GrassBlock.id(), "minecraft:grass_block");
    }

    #[rstest]
    fn items_are_not_blocks() {
        assert!(!Material::Diamond.is_block());
        assert!(Material::Diamond.is_item());
        assert!(Material::Torch.is_block() && Material::Torch.is_item());
        assert!(!Material::Air.is_item());
    }

    #[rstest]
    #[case("zombie", Some(EntityKind::Zombie))]
    #[case("minecraft:iron_golem", Some(EntityKind::IronGolem))]
    #[case("dragon", None)]
    fn entity_kinds_resolve(#[case] name: &str, #[case] expected: Option<EntityKind>) {
        assert_eq!(EntityKind::resolve(name), expected);
    }

    #[rstest]
    fn players_are_not_spawnable() {
        assert!(!EntityKind::Player.is_spawnable());
        assert!(EntityKind::Pig.is_spawnable());
    }
}
