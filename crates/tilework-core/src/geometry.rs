//! Pixel-space geometry derived from tile coordinates.

use crate::id::TilePos;

/// Edge length of one tile in pixels.
pub const TILE_SIZE: i32 = 16;

/// A position in world pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PixelPos {
    /// Horizontal pixel coordinate.
    pub x: f32,
    /// Vertical pixel coordinate.
    pub y: f32,
}

impl PixelPos {
    /// Construct a pixel position.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Top-left pixel of a tile.
    pub fn of_tile(pos: TilePos) -> Self {
        Self {
            x: (i32::from(pos.x) * TILE_SIZE) as f32,
            y: (i32::from(pos.y) * TILE_SIZE) as f32,
        }
    }
}

/// Axis-aligned rectangle in world pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl PixelRect {
    /// Construct a rectangle.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Grow the rectangle by `amount` pixels on every side.
    pub fn inflate(self, amount: i32) -> Self {
        Self {
            x: self.x - amount,
            y: self.y - amount,
            width: self.width + amount * 2,
            height: self.height + amount * 2,
        }
    }

    /// Whether the two rectangles overlap.
    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Whether a point lies inside the rectangle.
    pub fn contains(&self, point: PixelPos) -> bool {
        point.x >= self.x as f32
            && point.y >= self.y as f32
            && point.x < (self.x + self.width) as f32
            && point.y < (self.y + self.height) as f32
    }
}
