//! Map projection.

use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;
use crate::{MAX_ZOOM, MIN_ZOOM};

/// The size of a map tile in pixels.
pub(crate) const TILE_SIZE: u32 = 256;

/// The northern and southern limit of the Web Mercator projection.
pub const MAX_LATITUDE: f64 = 85.0511287798066;

/// A geographical position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPos {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl GeoPos {
    /// Creates a new `GeoPos`.
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<(f64, f64)> for GeoPos {
    fn from((lon, lat): (f64, f64)) -> Self {
        Self { lon, lat }
    }
}

impl From<GeoPos> for (f64, f64) {
    fn from(pos: GeoPos) -> Self {
        (pos.lon, pos.lat)
    }
}

impl From<geo::Coord<f64>> for GeoPos {
    fn from(coord: geo::Coord<f64>) -> Self {
        Self {
            lon: coord.x,
            lat: coord.y,
        }
    }
}

impl From<GeoPos> for geo::Coord<f64> {
    fn from(pos: GeoPos) -> Self {
        geo::Coord {
            x: pos.lon,
            y: pos.lat,
        }
    }
}

impl From<GeoPos> for geo::Point<f64> {
    fn from(pos: GeoPos) -> Self {
        geo::Point::new(pos.lon, pos.lat)
    }
}

/// Space kept free around a fitted extent, in screen points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Padding {
    /// Top padding.
    pub top: f32,
    /// Bottom padding.
    pub bottom: f32,
    /// Left padding.
    pub left: f32,
    /// Right padding.
    pub right: f32,
}

impl Padding {
    /// The same padding on every side.
    pub const fn same(value: f32) -> Self {
        Self {
            top: value,
            bottom: value,
            left: value,
            right: value,
        }
    }
}

/// Converts longitude to the x-coordinate of a tile at a given zoom level.
pub(crate) fn lon_to_x(lon: f64, zoom: u8) -> f64 {
    (lon + 180.0) / 360.0 * (2.0_f64.powi(zoom as i32))
}

/// Converts latitude to the y-coordinate of a tile at a given zoom level.
pub(crate) fn lat_to_y(lat: f64, zoom: u8) -> f64 {
    (1.0 - lat.to_radians().tan().asinh() / std::f64::consts::PI) / 2.0
        * (2.0_f64.powi(zoom as i32))
}

/// Converts the x-coordinate of a tile to longitude at a given zoom level.
pub(crate) fn x_to_lon(x: f64, zoom: u8) -> f64 {
    x / (2.0_f64.powi(zoom as i32)) * 360.0 - 180.0
}

/// Converts the y-coordinate of a tile to latitude at a given zoom level.
pub(crate) fn y_to_lat(y: f64, zoom: u8) -> f64 {
    let n = std::f64::consts::PI - 2.0 * std::f64::consts::PI * y / (2.0_f64.powi(zoom as i32));
    n.sinh().atan().to_degrees()
}

/// Finds the center and the largest zoom level at which `bounds` fits into a viewport of `size`
/// with `padding` kept free.
pub(crate) fn fit_bounds(bounds: &BoundingBox, size: Vec2, padding: &Padding) -> (GeoPos, u8) {
    let available_w = (size.x - padding.left - padding.right).max(1.0) as f64;
    let available_h = (size.y - padding.top - padding.bottom).max(1.0) as f64;
    let north = bounds.north.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let south = bounds.south.clamp(-MAX_LATITUDE, MAX_LATITUDE);

    let zoom = (MIN_ZOOM..=MAX_ZOOM)
        .rev()
        .find(|&z| {
            let w = (lon_to_x(bounds.east, z) - lon_to_x(bounds.west, z)) * TILE_SIZE as f64;
            let h = (lat_to_y(south, z) - lat_to_y(north, z)) * TILE_SIZE as f64;
            w <= available_w && h <= available_h
        })
        .unwrap_or(MIN_ZOOM);

    // Shift the center so the extent lands in the middle of the padded area.
    let shift_x = (padding.left - padding.right) as f64 / 2.0 / TILE_SIZE as f64;
    let shift_y = (padding.top - padding.bottom) as f64 / 2.0 / TILE_SIZE as f64;
    let center_x = (lon_to_x(bounds.west, zoom) + lon_to_x(bounds.east, zoom)) / 2.0 - shift_x;
    let center_y = (lat_to_y(north, zoom) + lat_to_y(south, zoom)) / 2.0 - shift_y;

    (
        GeoPos {
            lon: x_to_lon(center_x, zoom),
            lat: y_to_lat(center_y, zoom),
        },
        zoom,
    )
}

/// A helper for converting between geographical and screen coordinates.
pub struct MapProjection {
    zoom: u8,
    center: GeoPos,
    widget_rect: Rect,
}

impl MapProjection {
    /// Creates a new `MapProjection`.
    pub(crate) fn new(zoom: u8, center: GeoPos, widget_rect: Rect) -> Self {
        Self {
            zoom,
            center,
            widget_rect,
        }
    }

    /// The zoom level the projection was made for.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Projects a geographical coordinate to a screen coordinate. Latitudes beyond the Mercator
    /// limits are clamped.
    pub fn project(&self, geo_pos: GeoPos) -> Pos2 {
        let center_x = lon_to_x(self.center.lon, self.zoom);
        let center_y = lat_to_y(self.center.lat, self.zoom);

        let tile_x = lon_to_x(geo_pos.lon, self.zoom);
        let tile_y = lat_to_y(geo_pos.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE), self.zoom);

        let dx = (tile_x - center_x) * TILE_SIZE as f64;
        let dy = (tile_y - center_y) * TILE_SIZE as f64;

        self.widget_rect.center() + egui::vec2(dx as f32, dy as f32)
    }

    /// Un-projects a screen coordinate to a geographical coordinate.
    pub fn unproject(&self, screen_pos: Pos2) -> GeoPos {
        let rel_pos = screen_pos - self.widget_rect.min;
        let widget_center_x = self.widget_rect.width() as f64 / 2.0;
        let widget_center_y = self.widget_rect.height() as f64 / 2.0;

        let center_x = lon_to_x(self.center.lon, self.zoom);
        let center_y = lat_to_y(self.center.lat, self.zoom);

        let target_x = center_x + (rel_pos.x as f64 - widget_center_x) / TILE_SIZE as f64;
        let target_y = center_y + (rel_pos.y as f64 - widget_center_y) / TILE_SIZE as f64;

        GeoPos {
            lon: x_to_lon(target_x, self.zoom),
            lat: y_to_lat(target_y, self.zoom),
        }
    }

    /// The geographical extent of the widget.
    pub fn bounds(&self) -> BoundingBox {
        let north_west = self.unproject(self.widget_rect.left_top());
        let south_east = self.unproject(self.widget_rect.right_bottom());
        BoundingBox::new(north_west.lon, south_east.lat, south_east.lon, north_west.lat)
    }
}
