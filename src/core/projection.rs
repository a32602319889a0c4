//! Web Mercator tile-space math
//!
//! Everything here is pure. Tile space at zoom `z` is the square `[0, 2^z)²`
//! where one unit is one tile; `x` grows eastwards and `y` southwards.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// How a tile at the integer level `floor(z)` is magnified on screen at a
/// fractional zoom `z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    /// `2^frac(z)`: continuous across integer boundaries, 1.0 at integer zooms.
    #[default]
    Exponential,
    /// `1 + 0.5 + frac(z)`: the factor early viewers shipped, in `[1.5, 2.5)`.
    Linear,
}

/// Number of tiles along one axis at `zoom`. Fractional zooms interpolate.
pub fn world_tiles(zoom: f64) -> f64 {
    2_f64.powf(zoom)
}

/// Fractional tile-space coordinates of `(lat, lon)` at `zoom`.
///
/// Latitudes of ±90° produce non-finite values; clamping is the caller's job.
pub fn tile_coordinates(zoom: f64, lat: f64, lon: f64) -> (f64, f64) {
    let lat_rad = lat.to_radians();
    let n = world_tiles(zoom);
    let x = (lon + 180.0) / 360.0 * n;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;
    (x, y)
}

/// Inverse of [`tile_coordinates`].
pub fn lat_lon_from_tile(zoom: f64, x: f64, y: f64) -> (f64, f64) {
    let n = world_tiles(zoom);
    let lon = x / n * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * y / n)).sinh().atan();
    (lat_rad.to_degrees(), lon)
}

/// Moves `(lat, lon)` by a pixel delta, with one tile spanning `tile_size` pixels
/// in the tile space of `zoom`.
pub fn pan_by_pixels(zoom: f64, lat: f64, lon: f64, dx: f64, dy: f64, tile_size: u32) -> (f64, f64) {
    let (x, y) = tile_coordinates(zoom, lat, lon);
    let tile_size = tile_size as f64;
    lat_lon_from_tile(zoom, x + dx / tile_size, y + dy / tile_size)
}

/// Pixel panning as the viewer draws it: tiles of level `floor(zoom)` magnified
/// by [`scale_factor`].
pub fn pan_by_pixels_scaled(
    zoom: f64,
    lat: f64,
    lon: f64,
    dx: f64,
    dy: f64,
    tile_size: u32,
    mode: ScaleMode,
) -> (f64, f64) {
    let level = zoom.floor();
    let extent = tile_size as f64 * scale_factor(zoom, mode);
    let (x, y) = tile_coordinates(level, lat, lon);
    lat_lon_from_tile(level, x + dx / extent, y + dy / extent)
}

/// Magnification of level `floor(zoom)` tiles when displayed at `zoom`.
pub fn scale_factor(zoom: f64, mode: ScaleMode) -> f64 {
    let frac = zoom - zoom.floor();
    match mode {
        ScaleMode::Exponential => 2_f64.powf(frac),
        ScaleMode::Linear => 1.0 + (0.5 + frac),
    }
}

/// On-screen size of one tile in whole pixels. The tile set calculator steps by
/// this and the draw pass draws with it, so neighbouring tiles never overlap or gap.
pub fn tile_extent(tile_size: u32, scale: f64) -> i32 {
    ((tile_size as f64 * scale).round() as i32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_zoom_zero_boundaries() {
        let (x, y) = tile_coordinates(0.0, 0.0, -180.0);
        assert_eq!(x, 0.0);
        assert_eq!(y, 0.5);

        let (x, y) = tile_coordinates(0.0, 0.0, 180.0);
        assert_eq!(x, 1.0);
        assert_eq!(y, 0.5);
    }

    #[test]
    fn test_round_trip_across_zooms() {
        for zoom in 0..=18 {
            let zoom = zoom as f64;
            let mut lat = -84.9;
            while lat < 85.0 {
                let mut lon = -179.9;
                while lon < 180.0 {
                    let (x, y) = tile_coordinates(zoom, lat, lon);
                    let (lat2, lon2) = lat_lon_from_tile(zoom, x, y);
                    assert!((lat - lat2).abs() < EPS, "lat {lat} -> {lat2} at z{zoom}");
                    assert!((lon - lon2).abs() < EPS, "lon {lon} -> {lon2} at z{zoom}");
                    lon += 17.3;
                }
                lat += 8.7;
            }
        }
    }

    #[test]
    fn test_fractional_zoom_interpolates() {
        let (x_low, _) = tile_coordinates(3.0, 10.0, 20.0);
        let (x_mid, _) = tile_coordinates(3.5, 10.0, 20.0);
        let (x_high, _) = tile_coordinates(4.0, 10.0, 20.0);
        assert!(x_low < x_mid && x_mid < x_high);
        assert!((x_mid - x_low * 2_f64.sqrt()).abs() < EPS);
    }

    #[test]
    fn test_pole_is_not_finite() {
        let (_, y) = tile_coordinates(5.0, 90.0, 0.0);
        assert!(!y.is_finite());
    }

    #[test]
    fn test_pan_one_tile_shifts_x_by_one() {
        for zoom in [0.0, 4.0, 10.5, 15.0, 18.0] {
            let (lat, lon) = (49.8951, -97.1384);
            let (x0, y0) = tile_coordinates(zoom, lat, lon);
            let (lat2, lon2) = pan_by_pixels(zoom, lat, lon, 256.0, 0.0, 256);
            let (x1, y1) = tile_coordinates(zoom, lat2, lon2);
            assert!((x1 - x0 - 1.0).abs() < EPS, "z{zoom}: dx = {}", x1 - x0);
            assert!((y1 - y0).abs() < EPS);
            // same fractional offset, next tile over
            assert_eq!(x1.floor() as i64, x0.floor() as i64 + 1);
        }
    }

    #[test]
    fn test_scaled_pan_matches_plain_pan_for_exponential() {
        let (lat, lon) = (51.5, -0.12);
        let plain = pan_by_pixels(12.4, lat, lon, 300.0, -120.0, 256);
        let scaled = pan_by_pixels_scaled(12.4, lat, lon, 300.0, -120.0, 256, ScaleMode::Exponential);
        assert!((plain.0 - scaled.0).abs() < 1e-9);
        assert!((plain.1 - scaled.1).abs() < 1e-9);
    }

    #[test]
    fn test_scale_factor_modes() {
        assert_eq!(scale_factor(15.0, ScaleMode::Exponential), 1.0);
        assert!((scale_factor(15.5, ScaleMode::Exponential) - 2_f64.sqrt()).abs() < EPS);
        assert_eq!(scale_factor(15.0, ScaleMode::Linear), 1.5);
        assert!((scale_factor(15.25, ScaleMode::Linear) - 1.75).abs() < EPS);
    }

    #[test]
    fn test_tile_extent_rounds() {
        assert_eq!(tile_extent(256, 1.0), 256);
        assert_eq!(tile_extent(256, 1.5), 384);
        assert_eq!(tile_extent(256, 2_f64.sqrt()), 362);
    }

    #[test]
    fn test_northwest_corner_of_world() {
        let (lat, lon) = lat_lon_from_tile(0.0, 0.0, 0.0);
        assert!((lon + 180.0).abs() < EPS);
        assert!((lat - 85.0511287798).abs() < 1e-6);
    }
}
