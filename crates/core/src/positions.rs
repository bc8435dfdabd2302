//! Position types for beings on a map

use serde::{Deserialize, Serialize};

/// Tile position with facing direction, as carried by the packed coordinate field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: u16,
    pub y: u16,
    /// Raw server direction (low 4 bits on the wire)
    pub direction: u8,
}

impl Coordinates {
    pub const fn new(x: u16, y: u16, direction: u8) -> Self {
        Self { x, y, direction }
    }

    pub const fn tile(&self) -> TilePosition {
        TilePosition {
            x: self.x,
            y: self.y,
        }
    }
}

/// Plain tile position (warps, map server changes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TilePosition {
    pub x: u16,
    pub y: u16,
}

impl TilePosition {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    pub const fn with_direction(self, direction: u8) -> Coordinates {
        Coordinates::new(self.x, self.y, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_conversion() {
        let coords = Coordinates::new(51, 98, 4);
        assert_eq!(coords.tile(), TilePosition::new(51, 98));
        assert_eq!(TilePosition::new(51, 98).with_direction(4), coords);
    }
}
