//! Grid and vector types shared by both peers.
//!
//! Buildings live on integer grid cells, troops move in continuous grid
//! coordinates. Both serialize as two-element arrays (`[x, y]`) so they match
//! the wire and snapshot formats.

use serde::{Deserialize, Serialize};

/// 2D vector in continuous grid units - troop positions and directions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Vec2 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
}

impl Vec2 {
    /// Creates a new Vec2
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 2] {
        [self.x, self.y]
    }

    /// Creates from array
    #[must_use]
    pub const fn from_array(arr: [f32; 2]) -> Self {
        Self::new(arr[0], arr[1])
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Distance to another point
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }
}

impl From<[f32; 2]> for Vec2 {
    fn from(arr: [f32; 2]) -> Self {
        Self::from_array(arr)
    }
}

impl From<Vec2> for [f32; 2] {
    fn from(v: Vec2) -> Self {
        v.to_array()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Integer grid cell - the top-left corner of a building footprint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct GridPos {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl GridPos {
    /// Creates a new grid position
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell as a continuous point, for distance checks against troops.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }
}

impl From<[i32; 2]> for GridPos {
    fn from(arr: [i32; 2]) -> Self {
        Self::new(arr[0], arr[1])
    }
}

impl From<GridPos> for [i32; 2] {
    fn from(p: GridPos) -> Self {
        [p.x, p.y]
    }
}

impl From<(i32, i32)> for GridPos {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_operations() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(4.0, 6.0);

        let diff = b - a;
        assert_eq!(diff, Vec2::new(3.0, 4.0));
        assert_eq!(diff.length(), 5.0);
        assert_eq!(a.distance(b), 5.0);
        assert_eq!(a.dot(b), 16.0);
    }

    #[test]
    fn test_positions_serialize_as_pairs() {
        let cell = GridPos::new(3, 4);
        assert_eq!(serde_json::to_string(&cell).unwrap(), "[3,4]");

        let back: GridPos = serde_json::from_str("[3,4]").unwrap();
        assert_eq!(back, cell);

        // Integer coordinates are accepted for continuous positions.
        let point: Vec2 = serde_json::from_str("[2,5]").unwrap();
        assert_eq!(point, Vec2::new(2.0, 5.0));
    }
}
