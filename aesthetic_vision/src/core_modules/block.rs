// THEORY:
// A `Block` is the spatial unit of the decomposition engine: an axis-aligned
// rectangle over an `IntensityField`. Like the pixel, it is a "dumb" data
// container. It knows its own geometry (area, quadrants, containment) but
// nothing about the intensities underneath it; the field computes statistics
// for a block on demand.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in field coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Mean and population standard deviation of the intensities under a block.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl Block {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The shorter side, which bounds how often the block can still be split.
    pub fn min_side(&self) -> u32 {
        self.width.min(self.height)
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Splits into top-left, top-right, bottom-left, bottom-right.
    ///
    /// The top/left halves are floored, so odd remainders land in the
    /// right and bottom quadrants. Returns `None` for blocks narrower or
    /// shorter than 2 pixels.
    pub fn quadrants(&self) -> Option<[Block; 4]> {
        if self.width < 2 || self.height < 2 {
            return None;
        }
        let left_width = self.width / 2;
        let top_height = self.height / 2;
        let right_width = self.width - left_width;
        let bottom_height = self.height - top_height;
        let mid_x = self.x + left_width;
        let mid_y = self.y + top_height;

        Some([
            Block::new(self.x, self.y, left_width, top_height),
            Block::new(mid_x, self.y, right_width, top_height),
            Block::new(self.x, mid_y, left_width, bottom_height),
            Block::new(mid_x, mid_y, right_width, bottom_height),
        ])
    }

    /// Whether `other` lies entirely inside this block.
    pub fn contains(&self, other: &Block) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn overlaps(&self, other: &Block) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadrants_tile_an_odd_block_exactly() {
        let parent = Block::new(3, 5, 7, 5);
        let children = parent.quadrants().expect("7x5 block must split");

        let total: u64 = children.iter().map(Block::area).sum();
        assert_eq!(total, parent.area());

        assert_eq!(children[0], Block::new(3, 5, 3, 2));
        assert_eq!(children[1], Block::new(6, 5, 4, 2));
        assert_eq!(children[2], Block::new(3, 7, 3, 3));
        assert_eq!(children[3], Block::new(6, 7, 4, 3));

        for (i, a) in children.iter().enumerate() {
            assert!(parent.contains(a));
            for b in children.iter().skip(i + 1) {
                assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn thin_blocks_cannot_split() {
        assert!(Block::new(0, 0, 1, 50).quadrants().is_none());
        assert!(Block::new(0, 0, 50, 1).quadrants().is_none());
        assert!(Block::new(0, 0, 2, 2).quadrants().is_some());
    }
}
