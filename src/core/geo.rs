use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// The authoritative view state: where the map is centred and how far it is zoomed.
///
/// Latitude and longitude are not clamped or wrapped here; callers that pan past
/// the poles get whatever the projection produces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    pub zoom: f64,
}

impl Position {
    pub fn new(zoom: f64, lat: f64, lon: f64) -> Self {
        Self { lat, lon, zoom }
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(self.lat, self.lon)
    }
}

/// A tile address in the slippy map scheme.
///
/// Indices are signed because the viewport may extend past the edges of the
/// world; such tiles are still requested and left to the tile server to reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i64,
    pub y: i64,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: i64, y: i64, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Whether the tile lies inside the `2^z × 2^z` world grid
    pub fn is_valid(&self) -> bool {
        let max_coord = 1i64 << self.z;
        (0..max_coord).contains(&self.x) && (0..max_coord).contains(&self.y)
    }
}

/// Size of the drawing surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: i32,
    pub height: i32,
}

impl ViewportSize {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// A viewport with no drawable area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn center(&self) -> (i32, i32) {
        (self.width / 2, self.height / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_coord_validity() {
        assert!(TileCoord::new(0, 0, 0).is_valid());
        assert!(!TileCoord::new(1, 0, 0).is_valid());
        assert!(TileCoord::new(3, 3, 2).is_valid());
        assert!(!TileCoord::new(-1, 2, 2).is_valid());
        assert!(!TileCoord::new(2, 4, 2).is_valid());
    }

    #[test]
    fn test_viewport_emptiness() {
        assert!(ViewportSize::new(0, 600).is_empty());
        assert!(ViewportSize::new(800, -1).is_empty());
        assert!(!ViewportSize::new(800, 600).is_empty());
        assert_eq!(ViewportSize::new(800, 600).center(), (400, 300));
    }

    #[test]
    fn test_position_center() {
        let p = Position::new(15.0, 49.8951, -97.1384);
        assert_eq!(p.center(), LatLng::new(49.8951, -97.1384));
    }
}
