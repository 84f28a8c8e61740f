//! A selectable set of administrative boundaries, such as neighborhood councils or council
//! districts.

use egui::{Color32, CursorIcon, Painter, Response, Stroke};
use geojson::FeatureCollection;
use log::{debug, warn};
use serde_json::Value as JsonValue;
use std::any::Any;
use std::sync::mpsc::Sender;

use crate::MapError;
use crate::geometry::{BoundingBox, RegionGeometry};
use crate::layers::{Layer, RegionSelection, paint_polygon};
use crate::projection::{GeoPos, MapProjection};

/// One administrative region.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    /// The value of the layer's identifier property.
    pub id: String,
    /// The display name.
    pub name: String,
    /// The outline.
    pub geometry: RegionGeometry,
    bbox: Option<BoundingBox>,
}

impl Region {
    /// The extent of the region.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bbox
    }
}

fn property_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Layer implementation that shows administrative regions and lets the user pick one.
pub struct BoundaryLayer {
    source_id: String,
    id_property: String,
    regions: Vec<Region>,
    selected: Option<usize>,
    hovered: Option<usize>,
    visible: bool,
    select_on_idle: bool,
    selections: Sender<RegionSelection>,

    /// The outline of the regions.
    pub stroke: Stroke,

    /// The fill of the hovered region.
    pub hover_fill: Color32,

    /// The fill of the selected region.
    pub selected_fill: Color32,
}

impl BoundaryLayer {
    /// Builds a hidden layer from a feature collection. Each feature must carry `id_property` and
    /// a Polygon or MultiPolygon geometry.
    pub fn new(
        source_id: impl Into<String>,
        source_data: &FeatureCollection,
        id_property: impl Into<String>,
        selections: Sender<RegionSelection>,
    ) -> Result<Self, MapError> {
        let source_id = source_id.into();
        let id_property = id_property.into();

        let regions = source_data
            .features
            .iter()
            .map(|feature| -> Result<Region, MapError> {
                let id = feature
                    .property(&id_property)
                    .map(property_to_string)
                    .ok_or_else(|| MapError::MissingProperty(id_property.clone()))?;
                let name = feature
                    .property("name")
                    .map(property_to_string)
                    .unwrap_or_else(|| id.clone());
                let geometry = feature.geometry.clone().ok_or(MapError::MissingGeometry)?;
                let geometry = RegionGeometry::try_from(geometry)?;
                let bbox = geometry.bounding_box();
                Ok(Region {
                    id,
                    name,
                    geometry,
                    bbox,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Loaded {} regions into `{}`", regions.len(), source_id);

        Ok(Self {
            source_id,
            id_property,
            regions,
            selected: None,
            hovered: None,
            visible: false,
            select_on_idle: false,
            selections,
            stroke: Stroke::new(1.0, Color32::from_rgb(0x87, 0xC8, 0xE8)),
            hover_fill: Color32::from_rgba_unmultiplied(0x87, 0xC8, 0xE8, 40),
            selected_fill: Color32::from_rgba_unmultiplied(0x87, 0xC8, 0xE8, 90),
        })
    }

    /// The source id of the layer.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// The property regions are keyed by.
    pub fn id_property(&self) -> &str {
        &self.id_property
    }

    /// All regions.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Looks up a region by id.
    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// The currently selected region.
    pub fn selected(&self) -> Option<&Region> {
        self.selected.and_then(|i| self.regions.get(i))
    }

    /// The extent of all regions.
    pub fn extent(&self) -> Option<BoundingBox> {
        self.regions
            .iter()
            .filter_map(Region::bounding_box)
            .reduce(|a, b| a.union(&b))
    }

    /// The topmost region containing `pos`.
    pub fn region_at(&self, pos: GeoPos) -> Option<usize> {
        self.regions
            .iter()
            .rposition(|r| r.bbox.is_some_and(|b| b.contains(pos)) && r.geometry.contains_point(pos))
    }

    /// Regions whose name contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<&Region> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.regions
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&query))
            .collect()
    }

    /// Shows the layer.
    pub fn show(&mut self) {
        self.set_visibility(true);
    }

    /// Hides the layer.
    pub fn hide(&mut self) {
        self.set_visibility(false);
    }

    /// Shows or hides the layer.
    pub fn set_visibility(&mut self, visible: bool) {
        self.visible = visible;
        if !visible {
            self.hovered = None;
        }
    }

    /// Whether the layer is drawn.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Selects a region by id and reports it. Returns `false` for unknown ids.
    pub fn select_region(&mut self, id: &str) -> bool {
        match self.regions.iter().position(|r| r.id == id) {
            Some(index) => {
                self.select_index(index);
                true
            }
            None => {
                warn!("No region `{}` in `{}`", id, self.source_id);
                false
            }
        }
    }

    /// Selects a region by id and returns its extent for the map to fit. The region is reported
    /// the next time the map is idle.
    pub fn zoom_to_region(&mut self, id: &str) -> Option<BoundingBox> {
        let index = self.regions.iter().position(|r| r.id == id)?;
        self.selected = Some(index);
        self.select_on_idle = true;
        self.regions[index].bbox
    }

    /// Forgets the selected region.
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.select_on_idle = false;
    }

    fn select_index(&mut self, index: usize) {
        self.selected = Some(index);
        self.report(index);
    }

    fn report(&self, index: usize) {
        let Some(region) = self.regions.get(index) else {
            return;
        };
        let selection = RegionSelection::Boundary {
            source_id: self.source_id.clone(),
            region_id: region.id.clone(),
            name: region.name.clone(),
            geometry: region.geometry.clone(),
        };
        if self.selections.send(selection).is_err() {
            debug!("Region selection dropped, nobody is listening");
        }
    }
}

impl Layer for BoundaryLayer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_idle(&mut self) {
        if std::mem::take(&mut self.select_on_idle) {
            if let Some(index) = self.selected {
                self.report(index);
            }
        }
    }

    fn handle_input(&mut self, response: &Response, projection: &MapProjection) -> bool {
        if !self.visible {
            return false;
        }

        self.hovered = response
            .hover_pos()
            .and_then(|pos| self.region_at(projection.unproject(pos)));
        if self.hovered.is_some() && !response.dragged() {
            response.ctx.set_cursor_icon(CursorIcon::PointingHand);
        }

        if response.clicked() {
            if let Some(index) = response
                .interact_pointer_pos()
                .and_then(|pos| self.region_at(projection.unproject(pos)))
            {
                self.select_index(index);
                return true;
            }
        }

        false
    }

    fn draw(&self, painter: &Painter, projection: &MapProjection) {
        if !self.visible {
            return;
        }

        let view = projection.bounds();
        for (index, region) in self.regions.iter().enumerate() {
            let on_screen = region.bbox.is_some_and(|b| {
                b.west <= view.east && b.east >= view.west && b.south <= view.north && b.north >= view.south
            });
            if !on_screen {
                continue;
            }

            let fill = if Some(index) == self.selected {
                self.selected_fill
            } else if Some(index) == self.hovered {
                self.hover_fill
            } else {
                Color32::TRANSPARENT
            };
            for polygon in region.geometry.polygons() {
                paint_polygon(painter, projection, polygon, fill, self.stroke);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::feature_collection_from_str;
    use std::sync::mpsc::{Receiver, channel};

    const COUNCILS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"nc_id": 52, "name": "Downtown Los Angeles"},
                "geometry": {"type": "Polygon", "coordinates": [[[-118.27, 34.03], [-118.23, 34.03], [-118.23, 34.06], [-118.27, 34.06], [-118.27, 34.03]]]}
            },
            {
                "type": "Feature",
                "properties": {"nc_id": 44, "name": "Historic Cultural"},
                "geometry": {"type": "MultiPolygon", "coordinates": [[[[-118.25, 34.06], [-118.21, 34.06], [-118.21, 34.09], [-118.25, 34.09], [-118.25, 34.06]]]]}
            }
        ]
    }"#;

    fn layer() -> (BoundaryLayer, Receiver<RegionSelection>) {
        let (sender, receiver) = channel();
        let collection = feature_collection_from_str(COUNCILS).unwrap();
        let layer = BoundaryLayer::new("nc", &collection, "nc_id", sender).unwrap();
        (layer, receiver)
    }

    #[test]
    fn boundary_layer_new() {
        let (layer, _) = layer();
        assert_eq!(layer.source_id(), "nc");
        assert_eq!(layer.id_property(), "nc_id");
        assert!(!layer.is_visible());
        assert_eq!(layer.regions().len(), 2);
        assert_eq!(layer.regions()[0].id, "52");
        assert_eq!(layer.regions()[1].name, "Historic Cultural");
        assert_eq!(
            layer.extent(),
            Some(BoundingBox::new(-118.27, 34.03, -118.21, 34.09))
        );
    }

    #[test]
    fn missing_id_property_is_an_error() {
        let (sender, _) = channel();
        let collection = feature_collection_from_str(COUNCILS).unwrap();
        let result = BoundaryLayer::new("cc", &collection, "district", sender);
        assert!(matches!(result, Err(MapError::MissingProperty(p)) if p == "district"));
    }

    #[test]
    fn point_geometry_is_rejected() {
        let (sender, _) = channel();
        let collection = feature_collection_from_str(
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{"name":"x"},"geometry":{"type":"Point","coordinates":[0,0]}}]}"#,
        )
        .unwrap();
        let result = BoundaryLayer::new("cc", &collection, "name", sender);
        assert!(matches!(result, Err(MapError::UnsupportedGeometry(_))));
    }

    #[test]
    fn region_at_finds_containing_region() {
        let (layer, _) = layer();
        assert_eq!(layer.region_at(GeoPos::new(-118.25, 34.04)), Some(0));
        assert_eq!(layer.region_at(GeoPos::new(-118.22, 34.08)), Some(1));
        assert_eq!(layer.region_at(GeoPos::new(-118.40, 34.20)), None);
    }

    #[test]
    fn select_region_reports_boundary() {
        let (mut layer, receiver) = layer();
        assert!(layer.select_region("44"));
        assert_eq!(layer.selected().map(|r| r.name.as_str()), Some("Historic Cultural"));
        match receiver.try_recv().unwrap() {
            RegionSelection::Boundary {
                source_id,
                region_id,
                geometry,
                ..
            } => {
                assert_eq!(source_id, "nc");
                assert_eq!(region_id, "44");
                assert!(geometry.contains_point(GeoPos::new(-118.22, 34.08)));
            }
            other => panic!("unexpected selection {other:?}"),
        }

        assert!(!layer.select_region("999"));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn zoom_to_region_reports_on_idle() {
        let (mut layer, receiver) = layer();
        let bbox = layer.zoom_to_region("52").unwrap();
        assert_eq!(bbox, BoundingBox::new(-118.27, 34.03, -118.23, 34.06));
        assert!(receiver.try_recv().is_err());

        layer.on_idle();
        assert!(matches!(
            receiver.try_recv().unwrap(),
            RegionSelection::Boundary { region_id, .. } if region_id == "52"
        ));
        assert!(layer.zoom_to_region("unknown").is_none());
    }

    #[test]
    fn search_matches_names_case_insensitively() {
        let (layer, _) = layer();
        let found: Vec<_> = layer.search("downtown").iter().map(|r| r.id.clone()).collect();
        assert_eq!(found, vec!["52".to_string()]);
        assert!(layer.search("  ").is_empty());
    }
}
