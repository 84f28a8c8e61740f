//! Configuration for different map providers.

use crate::TileId;
use crate::projection::GeoPos;

/// Los Angeles City Hall.
const LOS_ANGELES: GeoPos = GeoPos::new(-118.2430, 34.0537);

/// Configuration for a map provider.
pub trait MapConfig {
    /// Returns the URL for a given tile.
    fn tile_url(&self, tile: &TileId) -> String;

    /// Returns the attribution text to be displayed on the map. If returns `None`, no attribution is shown.
    fn attribution(&self) -> Option<&String>;

    /// Returns the attribution URL to be linked from the attribution text.
    fn attribution_url(&self) -> Option<&String>;

    /// The default geographical center of the map.
    fn default_center(&self) -> GeoPos;

    /// The default zoom level of the map.
    fn default_zoom(&self) -> u8;
}

/// Configuration for the OpenStreetMap tile server.
///
/// # Example
///
/// ```
/// use pin_map::config::OpenStreetMapConfig;
/// let config = OpenStreetMapConfig::default();
/// ```
#[cfg(feature = "openstreetmap")]
pub struct OpenStreetMapConfig {
    base_url: String,
    attribution: String,
    attribution_url: String,
    default_center: GeoPos,
    default_zoom: u8,
}

#[cfg(feature = "openstreetmap")]
impl Default for OpenStreetMapConfig {
    fn default() -> Self {
        Self {
            base_url: "https://tile.openstreetmap.org".to_string(),
            attribution: "© OpenStreetMap contributors".to_string(),
            attribution_url: "https://www.openstreetmap.org".to_string(),
            default_center: LOS_ANGELES,
            default_zoom: 10,
        }
    }
}

#[cfg(feature = "openstreetmap")]
impl MapConfig for OpenStreetMapConfig {
    fn tile_url(&self, tile: &TileId) -> String {
        format!("{}/{}/{}/{}.png", self.base_url, tile.z, tile.x, tile.y)
    }

    fn attribution(&self) -> Option<&String> {
        Some(&self.attribution)
    }

    fn attribution_url(&self) -> Option<&String> {
        Some(&self.attribution_url)
    }

    fn default_center(&self) -> GeoPos {
        self.default_center
    }

    fn default_zoom(&self) -> u8 {
        self.default_zoom
    }
}

/// Configuration for the CARTO "dark matter" basemap, a dark background that keeps colored
/// request points readable.
///
/// # Example
///
/// ```
/// use pin_map::config::CartoDarkConfig;
/// let config = CartoDarkConfig::default().with_subdomain('b');
/// ```
#[cfg(feature = "carto")]
pub struct CartoDarkConfig {
    subdomain: char,
    attribution: String,
    attribution_url: String,
    default_center: GeoPos,
    default_zoom: u8,
}

#[cfg(feature = "carto")]
impl Default for CartoDarkConfig {
    fn default() -> Self {
        Self {
            subdomain: 'a',
            attribution: "© OpenStreetMap contributors © CARTO".to_string(),
            attribution_url: "https://carto.com/attributions".to_string(),
            default_center: LOS_ANGELES,
            default_zoom: 10,
        }
    }
}

#[cfg(feature = "carto")]
impl CartoDarkConfig {
    /// Uses another of the `a`-`d` tile subdomains.
    pub fn with_subdomain(mut self, subdomain: char) -> Self {
        self.subdomain = subdomain;
        self
    }
}

#[cfg(feature = "carto")]
impl MapConfig for CartoDarkConfig {
    fn tile_url(&self, tile: &TileId) -> String {
        format!(
            "https://{}.basemaps.cartocdn.com/dark_all/{}/{}/{}.png",
            self.subdomain, tile.z, tile.x, tile.y
        )
    }

    fn attribution(&self) -> Option<&String> {
        Some(&self.attribution)
    }

    fn attribution_url(&self) -> Option<&String> {
        Some(&self.attribution_url)
    }

    fn default_center(&self) -> GeoPos {
        self.default_center
    }

    fn default_zoom(&self) -> u8 {
        self.default_zoom
    }
}
