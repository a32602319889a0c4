use crate::core::constants::OSM_BASE_URL;
use crate::core::geo::TileCoord;

/// Trait representing anything that can produce tile URLs for a given coordinate.
///
/// The URL doubles as the tile's cache key, so implementations must be
/// deterministic: the same coordinate always yields the same string.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;
}

/// OpenStreetMap's slippy map convention, `{base}/{z}/{x}/{y}.png`.
/// <https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames>
#[derive(Debug, Clone)]
pub struct OpenStreetMapSource {
    base_url: String,
}

impl OpenStreetMapSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }
}

impl Default for OpenStreetMapSource {
    fn default() -> Self {
        Self::new(OSM_BASE_URL)
    }
}

impl TileSource for OpenStreetMapSource {
    fn url(&self, coord: TileCoord) -> String {
        format!("{}/{}/{}/{}.png", self.base_url, coord.z, coord.x, coord.y)
    }
}

/// Provider-agnostic template such as `https://tiles.example.com/{z}/{x}/{y}@2x.png`.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    template: String,
}

impl TemplateSource {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl TileSource for TemplateSource {
    fn url(&self, coord: TileCoord) -> String {
        self.template
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
    }
}
