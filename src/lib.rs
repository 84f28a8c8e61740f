#![warn(missing_docs)]

//! An interactive map of municipal service requests for `egui`.
//!
//! The crate provides a slippy `Map` widget with a stack of layers, the layers needed to browse
//! service requests (request points, administrative boundaries and a draggable radius region),
//! and the `PinMap` container that ties them together with per-category counts.
//!
//! # Example
//!
//! ```no_run
//! use eframe::egui;
//! use pin_map::{PinMap, config::CartoDarkConfig, geometry::feature_collection_from_str, store::Store};
//!
//! struct MyApp {
//!     pin_map: PinMap,
//!     store: Store,
//! }
//!
//! impl eframe::App for MyApp {
//!     fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
//!         egui::CentralPanel::default()
//!             .frame(egui::Frame::NONE)
//!             .show(ctx, |ui| {
//!                 for action in self.pin_map.show(ui, &self.store) {
//!                     self.store.dispatch(action);
//!                 }
//!             });
//!     }
//! }
//! ```

/// Configuration traits and types for the map widget.
pub mod config;

/// Geometry helpers for regions, circles and extents.
pub mod geometry;

/// Layers drawn on top of the map tiles.
pub mod layers;

/// Overlay panels shown above the map.
pub mod overlay;

/// The map container.
pub mod pin_map;

pub mod projection;

/// Service request data.
pub mod requests;

/// Spatial and type filtering of service requests.
pub mod filter;

/// Application state shared outside the map.
pub mod store;

pub use pin_map::PinMap;

use eframe::egui;
use egui::{Color32, Rect, Response, Sense, Ui, Vec2, Widget, pos2};
use eyre::{Context, Result};
use log::{debug, error};
use once_cell::sync::Lazy;
use poll_promise::Promise;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::MapConfig;
use crate::geometry::BoundingBox;
use crate::layers::Layer;
use crate::projection::{
    GeoPos, MapProjection, Padding, TILE_SIZE, lat_to_y, lon_to_x, x_to_lon, y_to_lat,
};

/// The minimum zoom level.
pub const MIN_ZOOM: u8 = 0;
/// The maximum zoom level.
pub const MAX_ZOOM: u8 = 19;

// Reuse the reqwest client for all tile downloads by making it a static variable.
static CLIENT: Lazy<reqwest::blocking::Client> = Lazy::new(|| {
    reqwest::blocking::Client::builder()
        .user_agent(format!(
            "{}/{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ))
        .build()
        .expect("Failed to build reqwest client")
});

/// Errors that can occur while loading tiles or map data.
#[derive(Error, Debug)]
pub enum MapError {
    /// An error occurred while making a web request.
    #[error("Connection error")]
    ConnectionError(#[from] reqwest::Error),

    /// A map tile failed to download.
    #[error("A map tile failed to download. HTTP Status: `{0}`")]
    TileDownloadError(String),

    /// The downloaded tile bytes could not be converted to an image.
    #[error("Unable to convert downloaded map tile bytes as image")]
    TileBytesConversionError(#[from] image::ImageError),

    /// A GeoJSON document could not be parsed.
    #[error("Unable to parse GeoJSON")]
    GeoJsonError(#[from] geojson::Error),

    /// The request list could not be parsed.
    #[error("Unable to parse service request data")]
    RequestDataError(#[from] serde_json::Error),

    /// The GeoJSON document is not a feature collection.
    #[error("Expected a GeoJSON FeatureCollection")]
    NotAFeatureCollection,

    /// A feature lacks a property the layer is keyed by.
    #[error("Feature is missing the `{0}` property")]
    MissingProperty(String),

    /// A feature has no geometry.
    #[error("Feature has no geometry")]
    MissingGeometry,

    /// A region feature has a geometry that does not enclose an area.
    #[error("Unsupported geometry `{0}`, expected Polygon or MultiPolygon")]
    UnsupportedGeometry(String),
}

/// A unique identifier for a map tile.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct TileId {
    /// The zoom level.
    pub z: u8,

    /// The x-coordinate of the tile.
    pub x: u32,

    /// The y-coordinate of the tile.
    pub y: u32,
}

impl TileId {
    fn to_url(&self, config: &dyn MapConfig) -> String {
        config.tile_url(self)
    }
}

/// The state of a tile in the cache.
enum Tile {
    /// The tile is being downloaded.
    Loading(Promise<Result<egui::ColorImage, Arc<eyre::Report>>>),

    /// The tile is in memory.
    Loaded(egui::TextureHandle),

    /// The tile failed to download.
    Failed(Arc<eyre::Report>),
}

/// Lifecycle and viewport notifications of the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapEvent {
    /// The map got its first viewport and is ready to receive layers.
    Load,
    /// The viewport stopped changing after a pan, zoom or fit.
    MoveEnd,
    /// All visible tiles finished loading and the viewport is at rest.
    Idle,
}

/// The viewport reported to the application state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapPosition {
    /// The zoom level.
    pub zoom: u8,
    /// The visible extent.
    pub bounds: BoundingBox,
}

/// The map widget.
pub struct Map {
    /// The geographical center of the map.
    pub center: GeoPos,

    /// The zoom level of the map.
    pub zoom: u8,

    /// The geographical position under the mouse pointer, if any.
    pub mouse_pos: Option<GeoPos>,

    tiles: HashMap<TileId, Tile>,

    /// The tiles drawn in the last frame.
    on_screen: Vec<TileId>,

    layers: Vec<(String, Box<dyn Layer>)>,

    /// Configuration for the map, such as the tile server URL.
    config: Box<dyn MapConfig>,

    events: Vec<MapEvent>,

    last_rect: Option<Rect>,

    pending_fit: Option<(BoundingBox, Padding)>,

    loaded: bool,

    moving: bool,

    idle_reported: bool,
}

impl Map {
    /// Creates a new `Map` widget.
    ///
    /// # Arguments
    ///
    /// * `config` - A type that implements `MapConfig`, which provides configuration for the map.
    pub fn new<C: MapConfig + 'static>(config: C) -> Self {
        let center = config.default_center();
        let zoom = config.default_zoom();
        Self {
            tiles: HashMap::new(),
            on_screen: Vec::new(),
            layers: Vec::new(),
            mouse_pos: None,
            config: Box::new(config),
            center,
            zoom,
            events: Vec::new(),
            last_rect: None,
            pending_fit: None,
            loaded: false,
            moving: false,
            idle_reported: false,
        }
    }

    /// Adds a layer on top of the existing ones. A layer with the same key is replaced in place.
    pub fn add_layer(&mut self, key: impl Into<String>, layer: impl Layer) {
        let key = key.into();
        match self.layers.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = Box::new(layer),
            None => self.layers.push((key, Box::new(layer))),
        }
    }

    /// Removes a layer and returns it.
    pub fn remove_layer(&mut self, key: &str) -> Option<Box<dyn Layer>> {
        let index = self.layers.iter().position(|(k, _)| k == key)?;
        Some(self.layers.remove(index).1)
    }

    /// Gets a layer by key, if it exists and is of type `T`.
    pub fn layer<T: Layer>(&self, key: &str) -> Option<&T> {
        self.layers
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, layer)| layer.as_any().downcast_ref::<T>())
    }

    /// Gets a mutable layer by key, if it exists and is of type `T`.
    pub fn layer_mut<T: Layer>(&mut self, key: &str) -> Option<&mut T> {
        self.layers
            .iter_mut()
            .find(|(k, _)| k == key)
            .and_then(|(_, layer)| layer.as_any_mut().downcast_mut::<T>())
    }

    /// The layer keys from bottom to top.
    pub fn layers(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|(k, _)| k.as_str())
    }

    /// Whether the map has received its first viewport.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Moves and zooms the map so that `bounds` is fully visible. Applied on the next frame if
    /// the map has not been laid out yet.
    pub fn fit_bounds(&mut self, bounds: BoundingBox, padding: Padding) {
        match self.last_rect {
            Some(rect) => self.apply_fit(&bounds, &padding, rect.size()),
            None => self.pending_fit = Some((bounds, padding)),
        }
    }

    fn apply_fit(&mut self, bounds: &BoundingBox, padding: &Padding, size: Vec2) {
        let (center, zoom) = projection::fit_bounds(bounds, size, padding);
        debug!("Fitting {:?} at zoom {}", bounds, zoom);
        self.center = center;
        self.zoom = zoom;
        self.idle_reported = false;
        self.events.push(MapEvent::MoveEnd);
    }

    /// The visible extent, once the map has been laid out.
    pub fn bounds(&self) -> Option<BoundingBox> {
        let rect = self.last_rect?;
        Some(MapProjection::new(self.zoom, self.center, rect).bounds())
    }

    /// The current viewport, once the map has been laid out.
    pub fn position(&self) -> Option<MapPosition> {
        Some(MapPosition {
            zoom: self.zoom,
            bounds: self.bounds()?,
        })
    }

    /// Drains the events raised since the last call.
    pub fn take_events(&mut self) -> Vec<MapEvent> {
        std::mem::take(&mut self.events)
    }

    fn view_changed(&mut self) {
        self.idle_reported = false;
    }

    /// Handles user input for panning and zooming.
    fn handle_input(&mut self, ui: &Ui, rect: &Rect, response: &Response) {
        // Handle panning
        if response.dragged() {
            self.moving = true;
            let delta = response.drag_delta();
            let center_in_tiles_x = lon_to_x(self.center.lon, self.zoom);
            let center_in_tiles_y = lat_to_y(self.center.lat, self.zoom);

            let mut new_center_x = center_in_tiles_x - (delta.x as f64 / TILE_SIZE as f64);
            let mut new_center_y = center_in_tiles_y - (delta.y as f64 / TILE_SIZE as f64);

            // Clamp the new center to the map boundaries.
            let world_size_in_tiles = 2.0_f64.powi(self.zoom as i32);
            let view_size_in_tiles_x = rect.width() as f64 / TILE_SIZE as f64;
            let view_size_in_tiles_y = rect.height() as f64 / TILE_SIZE as f64;

            let min_center_x = view_size_in_tiles_x / 2.0;
            let max_center_x = world_size_in_tiles - view_size_in_tiles_x / 2.0;
            let min_center_y = view_size_in_tiles_y / 2.0;
            let max_center_y = world_size_in_tiles - view_size_in_tiles_y / 2.0;

            // If the map is smaller than the viewport, center it. Otherwise, clamp the center.
            new_center_x = if min_center_x > max_center_x {
                world_size_in_tiles / 2.0
            } else {
                new_center_x.clamp(min_center_x, max_center_x)
            };
            new_center_y = if min_center_y > max_center_y {
                world_size_in_tiles / 2.0
            } else {
                new_center_y.clamp(min_center_y, max_center_y)
            };

            self.center = GeoPos {
                lon: x_to_lon(new_center_x, self.zoom),
                lat: y_to_lat(new_center_y, self.zoom),
            };
            self.view_changed();
        }

        if response.drag_stopped() {
            self.moving = false;
            self.events.push(MapEvent::MoveEnd);
        }

        let projection = MapProjection::new(self.zoom, self.center, *rect);

        // Handle double-click to zoom and center
        if response.double_clicked() {
            if let Some(pointer_pos) = response.interact_pointer_pos() {
                let new_zoom = (self.zoom + 1).clamp(MIN_ZOOM, MAX_ZOOM);
                if new_zoom != self.zoom {
                    self.center = projection.unproject(pointer_pos);
                    self.zoom = new_zoom;
                    self.view_changed();
                    self.events.push(MapEvent::MoveEnd);
                }
            }
        }

        // Handle zooming and mouse position
        let Some(mouse_pos) = response.hover_pos() else {
            self.mouse_pos = None;
            return;
        };

        let target = projection.unproject(mouse_pos);
        self.mouse_pos = Some(target);

        let scroll = ui.input(|i| i.raw_scroll_delta.y);
        if scroll == 0.0 {
            return;
        }

        let old_zoom = self.zoom;
        let mut new_zoom = (self.zoom as i32 + scroll.signum() as i32)
            .clamp(MIN_ZOOM as i32, MAX_ZOOM as i32) as u8;

        // If the world would become smaller than the widget, reject the zoom.
        if scroll < 0.0 {
            let world_pixel_size = 2.0_f64.powi(new_zoom as i32) * TILE_SIZE as f64;
            if world_pixel_size < rect.width() as f64 || world_pixel_size < rect.height() as f64 {
                new_zoom = old_zoom;
            }
        }

        if new_zoom != old_zoom {
            // Keep the geo-coordinate under the mouse in place.
            let mouse_rel = mouse_pos - rect.center();
            let new_center_x =
                lon_to_x(target.lon, new_zoom) - mouse_rel.x as f64 / TILE_SIZE as f64;
            let new_center_y =
                lat_to_y(target.lat, new_zoom) - mouse_rel.y as f64 / TILE_SIZE as f64;

            self.zoom = new_zoom;
            self.center = GeoPos {
                lon: x_to_lon(new_center_x, new_zoom),
                lat: y_to_lat(new_center_y, new_zoom),
            };
            self.view_changed();
            self.events.push(MapEvent::MoveEnd);
        }
    }

    /// Draws the map tiles, the layers and the attribution.
    fn draw(&mut self, ui: &mut Ui, rect: &Rect) {
        let painter = ui.painter_at(*rect);
        painter.rect_filled(*rect, 0.0, Color32::from_rgb(38, 38, 38)); // Background

        let visible = self.visible_tiles(rect);
        for (tile_id, tile_pos) in &visible {
            self.load_tile(ui, *tile_id);
            self.draw_tile(ui, &painter, *tile_id, *tile_pos);
        }
        self.on_screen = visible.into_iter().map(|(tile_id, _)| tile_id).collect();

        let projection = MapProjection::new(self.zoom, self.center, *rect);
        for (_, layer) in &self.layers {
            layer.draw(&painter, &projection);
        }

        self.draw_attribution(ui, rect);
    }

    /// Returns the visible tiles that exist at the current zoom level.
    fn visible_tiles(&self, rect: &Rect) -> Vec<(TileId, egui::Pos2)> {
        let center_x = lon_to_x(self.center.lon, self.zoom);
        let center_y = lat_to_y(self.center.lat, self.zoom);

        let widget_center_x = rect.width() / 2.0;
        let widget_center_y = rect.height() / 2.0;

        let x_min = (center_x - widget_center_x as f64 / TILE_SIZE as f64).floor() as i64;
        let y_min = (center_y - widget_center_y as f64 / TILE_SIZE as f64).floor() as i64;
        let x_max = (center_x + widget_center_x as f64 / TILE_SIZE as f64).ceil() as i64;
        let y_max = (center_y + widget_center_y as f64 / TILE_SIZE as f64).ceil() as i64;
        let tile_count = 1_i64 << self.zoom;

        let mut tiles = Vec::new();
        for x in x_min.max(0)..=x_max.min(tile_count - 1) {
            for y in y_min.max(0)..=y_max.min(tile_count - 1) {
                let tile_id = TileId {
                    z: self.zoom,
                    x: x as u32,
                    y: y as u32,
                };
                let screen_x = widget_center_x + (x as f64 - center_x) as f32 * TILE_SIZE as f32;
                let screen_y = widget_center_y + (y as f64 - center_y) as f32 * TILE_SIZE as f32;
                tiles.push((tile_id, rect.min + Vec2::new(screen_x, screen_y)));
            }
        }
        tiles
    }

    /// Starts downloading a tile if it is not cached, and promotes finished downloads to
    /// textures.
    fn load_tile(&mut self, ui: &Ui, tile_id: TileId) {
        let tile_state = self.tiles.entry(tile_id).or_insert_with(|| {
            let url = tile_id.to_url(self.config.as_ref());
            let promise =
                Promise::spawn_thread("download_tile", move || -> Result<_, Arc<eyre::Report>> {
                    let result: Result<_, eyre::Report> = (|| {
                        debug!("Downloading tile from {}", &url);
                        let response = CLIENT.get(&url).send().map_err(MapError::from)?;

                        if !response.status().is_success() {
                            return Err(MapError::TileDownloadError(response.status().to_string()));
                        }

                        let bytes = response.bytes().map_err(MapError::from)?.to_vec();
                        let image = image::load_from_memory(&bytes)
                            .map_err(MapError::from)?
                            .to_rgba8();

                        let size = [image.width() as _, image.height() as _];
                        let pixels = image.into_raw();
                        Ok(egui::ColorImage::from_rgba_unmultiplied(size, &pixels))
                    })()
                    .with_context(|| format!("Failed to download tile from {}", &url));

                    result.map_err(Arc::new)
                });
            Tile::Loading(promise)
        });

        if let Tile::Loading(promise) = tile_state {
            if let Some(result) = promise.ready() {
                match result {
                    Ok(color_image) => {
                        let texture = ui.ctx().load_texture(
                            format!("tile_{}_{}_{}", tile_id.z, tile_id.x, tile_id.y),
                            color_image.clone(),
                            Default::default(),
                        );
                        *tile_state = Tile::Loaded(texture);
                    }
                    Err(e) => {
                        error!("{:?}", e);
                        *tile_state = Tile::Failed(e.clone());
                    }
                }
            }
        }
    }

    /// Draws a single map tile.
    fn draw_tile(&self, ui: &Ui, painter: &egui::Painter, tile_id: TileId, tile_pos: egui::Pos2) {
        let tile_rect =
            Rect::from_min_size(tile_pos, Vec2::new(TILE_SIZE as f32, TILE_SIZE as f32));

        match self.tiles.get(&tile_id) {
            Some(Tile::Loaded(texture)) => {
                painter.image(
                    texture.id(),
                    tile_rect,
                    Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                    Color32::WHITE,
                );
            }
            Some(Tile::Failed(e)) => {
                painter.rect_stroke(
                    tile_rect,
                    0.0,
                    egui::Stroke::new(1.0, Color32::DARK_GRAY),
                    egui::StrokeKind::Inside,
                );
                painter.text(
                    tile_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "!",
                    egui::FontId::proportional(40.0),
                    Color32::RED,
                );

                let response = ui.interact(tile_rect, ui.id().with(tile_id), Sense::hover());
                response.on_hover_text(format!("{}", e));
            }
            Some(Tile::Loading(_)) | None => {
                painter.rect_stroke(
                    tile_rect,
                    0.0,
                    egui::Stroke::new(1.0, Color32::DARK_GRAY),
                    egui::StrokeKind::Inside,
                );

                // The tile is still loading, so we need to tell egui to repaint.
                ui.ctx().request_repaint();
            }
        }
    }

    /// Draws the attribution text.
    fn draw_attribution(&self, ui: &mut Ui, rect: &Rect) {
        if let Some(attribution) = self.config.attribution() {
            let bg_color = if ui.visuals().dark_mode {
                Color32::from_black_alpha(150)
            } else {
                Color32::from_white_alpha(150)
            };

            let frame = egui::Frame::NONE
                .inner_margin(egui::Margin::same(5))
                .fill(bg_color)
                .corner_radius(3.0);

            egui::Area::new(ui.id().with("attribution"))
                .fixed_pos(rect.right_bottom())
                .pivot(egui::Align2::RIGHT_BOTTOM)
                .show(ui.ctx(), |ui| {
                    frame.show(ui, |ui| {
                        ui.style_mut().override_text_style = Some(egui::TextStyle::Small);
                        ui.style_mut().wrap_mode = Some(egui::TextWrapMode::Extend); // Don't wrap attribution text.

                        if let Some(url) = self.config.attribution_url() {
                            ui.hyperlink_to(attribution, url);
                        } else {
                            ui.label(attribution);
                        }
                    });
                });
        }
    }

    /// Raises `Idle` once the viewport is at rest and no tile on screen is loading. Downloads of
    /// tiles that left the view do not hold the map busy.
    fn detect_idle(&mut self) {
        if self.idle_reported || self.moving {
            return;
        }
        let loading = self
            .on_screen
            .iter()
            .any(|id| matches!(self.tiles.get(id), Some(Tile::Loading(_))));
        if loading {
            return;
        }

        self.idle_reported = true;
        for (_, layer) in &mut self.layers {
            layer.on_idle();
        }
        self.events.push(MapEvent::Idle);
    }
}

impl Widget for &mut Map {
    fn ui(self, ui: &mut Ui) -> Response {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), Sense::drag().union(Sense::click()));
        self.last_rect = Some(rect);

        if let Some((bounds, padding)) = self.pending_fit.take() {
            self.apply_fit(&bounds, &padding, rect.size());
        }

        if !self.loaded {
            debug!("Map loaded with viewport {:?}", rect);
            self.loaded = true;
            self.events.push(MapEvent::Load);
        }

        let projection = MapProjection::new(self.zoom, self.center, rect);
        let mut consumed = false;
        for (_, layer) in self.layers.iter_mut().rev() {
            if layer.handle_input(&response, &projection) {
                consumed = true;
                break;
            }
        }
        if !consumed {
            self.handle_input(ui, &rect, &response);
        } else if self.moving {
            self.moving = false;
            self.events.push(MapEvent::MoveEnd);
        }

        self.draw(ui, &rect);
        self.detect_idle();

        if !self.events.is_empty() {
            ui.ctx().request_repaint();
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenStreetMapConfig;
    use crate::layers::address::AddressLayer;
    use crate::layers::requests::RequestsLayer;
    use egui::vec2;

    #[test]
    fn test_tile_id_to_url() {
        let config = OpenStreetMapConfig::default();
        let tile_id = TileId {
            z: 10,
            x: 175,
            y: 408,
        };
        let url = tile_id.to_url(&config);
        assert_eq!(url, "https://tile.openstreetmap.org/10/175/408.png");
    }

    #[test]
    fn test_map_new() {
        let config = OpenStreetMapConfig::default();
        let default_center = config.default_center();
        let default_zoom = config.default_zoom();

        let map = Map::new(config);

        assert_eq!(map.center, default_center);
        assert_eq!(map.zoom, default_zoom);
        assert!(map.mouse_pos.is_none());
        assert!(map.tiles.is_empty());
        assert!(!map.is_loaded());
        assert!(map.position().is_none());
    }

    #[test]
    fn layers_keep_insertion_order() {
        let mut map = Map::new(OpenStreetMapConfig::default());
        map.add_layer("requests", RequestsLayer::default());
        map.add_layer("other", RequestsLayer::default());
        map.add_layer("requests", RequestsLayer::default());
        assert_eq!(map.layers().collect::<Vec<_>>(), vec!["requests", "other"]);

        assert!(map.layer::<RequestsLayer>("other").is_some());
        assert!(map.remove_layer("other").is_some());
        assert!(map.layer::<RequestsLayer>("other").is_none());
        assert!(map.layer_mut::<RequestsLayer>("requests").is_some());
    }

    #[test]
    fn fit_bounds_waits_for_layout() {
        let mut map = Map::new(OpenStreetMapConfig::default());
        let bounds = BoundingBox::new(-118.67, 33.70, -118.15, 34.34);
        map.fit_bounds(bounds, Padding::same(50.0));
        assert!(map.pending_fit.is_some());
        assert!(map.take_events().is_empty());

        map.last_rect = Some(Rect::from_min_size(pos2(0.0, 0.0), vec2(1024.0, 768.0)));
        map.fit_bounds(bounds, Padding::same(50.0));
        assert_eq!(map.take_events(), vec![MapEvent::MoveEnd]);

        let visible = map.bounds().unwrap();
        assert!(visible.contains(GeoPos::new(bounds.west, bounds.north)));
        assert!(visible.contains(GeoPos::new(bounds.east, bounds.south)));
    }

    fn pending_tile() -> Tile {
        Tile::Loading(Promise::from_ready(Err(Arc::new(eyre::eyre!("still downloading")))))
    }

    #[test]
    fn off_screen_downloads_do_not_block_idle() {
        let (sender, receiver) = std::sync::mpsc::channel();
        let mut address = AddressLayer::new(sender);
        address.zoom_to(GeoPos::new(-118.2430, 34.0537));

        let mut map = Map::new(OpenStreetMapConfig::default());
        map.add_layer("address", address);
        map.tiles.insert(TileId { z: 3, x: 0, y: 0 }, pending_tile());

        map.detect_idle();
        assert_eq!(map.take_events(), vec![MapEvent::Idle]);
        assert!(receiver.try_recv().is_ok());
    }

    #[test]
    fn on_screen_downloads_block_idle() {
        let mut map = Map::new(OpenStreetMapConfig::default());
        let tile_id = TileId { z: 10, x: 175, y: 408 };
        map.tiles.insert(tile_id, pending_tile());
        map.on_screen = vec![tile_id];

        map.detect_idle();
        assert!(map.take_events().is_empty());

        map.on_screen.clear();
        map.detect_idle();
        assert_eq!(map.take_events(), vec![MapEvent::Idle]);
    }

    #[test]
    fn idle_is_reported_once_per_rest() {
        let mut map = Map::new(OpenStreetMapConfig::default());
        map.detect_idle();
        map.detect_idle();
        assert_eq!(map.take_events(), vec![MapEvent::Idle]);

        map.moving = true;
        map.view_changed();
        map.detect_idle();
        assert!(map.take_events().is_empty());

        map.moving = false;
        map.detect_idle();
        assert_eq!(map.take_events(), vec![MapEvent::Idle]);
    }
}
