//! `setblock`, `getblock`, `fill`, and `clone`.

use serde_json::{Value, json};

use super::block_state::{parse_state, parse_tile_data};
use crate::registry::{Arguments, CommandError};
use crate::world::{Block, BlockPos, Material, World};

/// Largest box `fill` will write in one call.
pub(crate) const FILL_LIMIT: u64 = 1_048_576;

/// Largest box `clone` will copy in one call.
pub(crate) const CLONE_LIMIT: u64 = 32_768;

/// Axis-aligned box with inclusive, per-axis normalised corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Region {
    min: BlockPos,
    max: BlockPos,
}

impl Region {
    pub(crate) fn spanning(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    fn from_corners(args: Arguments<'_>) -> Result<Self, CommandError> {
        Ok(Self::spanning(
            args.block_pos("x1", "y1", "z1")?,
            args.block_pos("x2", "y2", "z2")?,
        ))
    }

    pub(crate) fn volume(&self) -> u64 {
        let extent = |low: i32, high: i32| (i64::from(high) - i64::from(low) + 1).unsigned_abs();
        extent(self.min.x, self.max.x)
            .saturating_mul(extent(self.min.y, self.max.y))
            .saturating_mul(extent(self.min.z, self.max.z))
    }

    fn ensure_within(&self, limit: u64) -> Result<u64, CommandError> {
        let volume = self.volume();
        if volume > limit {
            return Err(CommandError::domain(format!(
                "Region too large (max {limit} blocks): {volume}"
            )));
        }
        Ok(volume)
    }

    /// Cells in x-major, then y, then z order.
    pub(crate) fn cells(self) -> impl Iterator<Item = BlockPos> {
        let ys = self.min.y..=self.max.y;
        let zs = self.min.z..=self.max.z;
        (self.min.x..=self.max.x).flat_map(move |x| {
            let zs = zs.clone();
            ys.clone()
                .flat_map(move |y| zs.clone().map(move |z| BlockPos::new(x, y, z)))
        })
    }
}

fn placeable(name: &str) -> Result<Material, CommandError> {
    Material::resolve(name)
        .filter(|material| material.is_block())
        .ok_or_else(|| CommandError::domain(format!("Invalid block type: {name}")))
}

pub(super) fn set_block(world: &mut dyn World, args: Arguments<'_>) -> Result<Value, CommandError> {
    let pos = args.block_pos("x", "y", "z")?;
    let material = placeable(args.text("block")?)?;
    let state = args
        .object("block_state")?
        .map(parse_state)
        .transpose()?
        .unwrap_or_default();
    let data = args
        .object("nbt")?
        .map(parse_tile_data)
        .transpose()?
        .unwrap_or_default();
    world.set_block(
        pos,
        Block {
            material,
            state,
            data,
        },
    );
    Ok(json!(1))
}

pub(super) fn get_block(world: &mut dyn World, args: Arguments<'_>) -> Result<Value, CommandError> {
    let pos = args.block_pos("x", "y", "z")?;
    Ok(Value::String(world.block(pos).material.id()))
}

pub(super) fn fill(world: &mut dyn World, args: Arguments<'_>) -> Result<Value, CommandError> {
    let region = Region::from_corners(args)?;
    let material = placeable(args.text("block")?)?;
    let volume = region.ensure_within(FILL_LIMIT)?;
    for pos in region.cells() {
        world.set_block(pos, Block::plain(material));
    }
    Ok(json!(volume))
}

pub(super) fn clone_region(
    world: &mut dyn World,
    args: Arguments<'_>,
) -> Result<Value, CommandError> {
    let region = Region::from_corners(args)?;
    let dest = args.block_pos("dest_x", "dest_y", "dest_z")?;
    let volume = region.ensure_within(CLONE_LIMIT)?;
    let out_of_range = || CommandError::domain("Destination out of range");
    let offset = |from: i32, base: i32, to: i32| {
        i64::from(to) + i64::from(from) - i64::from(base)
    };

    let mut snapshot = Vec::with_capacity(usize::try_from(volume).unwrap_or_default());
    for source in region.cells() {
        let target = BlockPos::new(
            i32::try_from(offset(source.x, region.min.x, dest.x)).map_err(|_| out_of_range())?,
            i32::try_from(offset(source.y, region.min.y, dest.y)).map_err(|_| out_of_range())?,
            i32::try_from(offset(source.z, region.min.z, dest.z)).map_err(|_| out_of_range())?,
        );
        snapshot.push((target, world.block(source)));
    }
    let copied = snapshot.len();
    for (target, block) in snapshot {
        world.set_block(target, block);
    }
    Ok(json!(copied))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn region_normalises_corner_order() {
        let a = Region::spanning(BlockPos::new(5, 1, 3), BlockPos::new(1, 4, 0));
        let b = Region::spanning(BlockPos::new(1, 4, 0), BlockPos::new(5, 1, 3));
        assert_eq!(a, b);
        assert_eq!(a.volume(), 5 * 4 * 4);
    }

    #[rstest]
    fn cells_iterate_x_then_y_then_z() {
        let region = Region::spanning(BlockPos::new(0, 0, 0), BlockPos::new(1, 1, 1));
        let cells: Vec<_> = region.cells().collect();
        assert_eq!(
            cells,
            vec![
                BlockPos::new(0, 0, 0),
                BlockPos::new(0, 0, 1),
                BlockPos::new(0, 1, 0),
                BlockPos::new(0, 1, 1),
                BlockPos::new(1, 0, 0),
                BlockPos::new(1, 0, 1),
                BlockPos::new(1, 1, 0),
                BlockPos::new(1, 1, 1),
            ]
        );
    }

    #[rstest]
    fn extreme_regions_saturate_instead_of_overflowing() {
        let region = Region::spanning(
            BlockPos::new(i32::MIN, i32::MIN, i32::MIN),
            BlockPos::new(i32::MAX, i32::MAX, i32::MAX),
        );
        assert_eq!(region.volume(), u64::MAX);
    }
}
