//! Layers for the map view that can handle input, and draw on top of the map view different kinds of data.
//!
use egui::{Color32, Mesh, Painter, Pos2, Response, Shape, Stroke};
use geo::Polygon;
use log::warn;
use std::any::Any;

use crate::geometry::RegionGeometry;
use crate::projection::{GeoPos, MapProjection};

/// The draggable radius region.
pub mod address;

/// Administrative boundaries.
pub mod boundary;

/// Service request points.
pub mod requests;

/// A trait for map layers.
pub trait Layer: Any {
    /// Handles user input for the layer. Returns `true` if the input was handled and should not be
    /// processed further by the map.
    fn handle_input(&mut self, response: &Response, projection: &MapProjection) -> bool;

    /// Draws the layer.
    fn draw(&self, painter: &Painter, projection: &MapProjection);

    /// Called once each time the map comes to rest with all tiles loaded.
    fn on_idle(&mut self) {}

    /// Gets the layer as a `dyn Any`.
    fn as_any(&self) -> &dyn Any;

    /// Gets the layer as a mutable `dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A region chosen by the user, reported by the address and boundary layers.
#[derive(Clone, Debug, PartialEq)]
pub enum RegionSelection {
    /// The radius region was placed or moved.
    Address {
        /// The center of the circle.
        center: GeoPos,
        /// The circle.
        geometry: Polygon<f64>,
    },
    /// An administrative region was picked.
    Boundary {
        /// The layer the region belongs to.
        source_id: String,
        /// The value of the layer's identifier property.
        region_id: String,
        /// The display name of the region.
        name: String,
        /// The outline of the region.
        geometry: RegionGeometry,
    },
}

impl RegionSelection {
    /// The selected area.
    pub fn geometry(&self) -> RegionGeometry {
        match self {
            RegionSelection::Address { geometry, .. } => RegionGeometry::Polygon(geometry.clone()),
            RegionSelection::Boundary { geometry, .. } => geometry.clone(),
        }
    }

    /// The circle center for address selections.
    pub fn center(&self) -> Option<GeoPos> {
        match self {
            RegionSelection::Address { center, .. } => Some(*center),
            RegionSelection::Boundary { .. } => None,
        }
    }
}

/// Projects a ring, dropping the closing coordinate.
fn project_ring(ring: &geo::LineString<f64>, projection: &MapProjection) -> Vec<Pos2> {
    let coords = &ring.0;
    let open = match (coords.first(), coords.last()) {
        (Some(first), Some(last)) if coords.len() > 1 && first == last => &coords[..coords.len() - 1],
        _ => &coords[..],
    };
    open.iter().map(|c| projection.project((*c).into())).collect()
}

/// Triangulates the area between `exterior` and `holes`. Returns the vertices and the triangle
/// indices into them.
pub(crate) fn triangulate(exterior: &[Pos2], holes: &[Vec<Pos2>]) -> Option<(Vec<Pos2>, Vec<u32>)> {
    if exterior.len() < 3 {
        return None;
    }

    let mut vertices: Vec<Pos2> = exterior.to_vec();
    let mut hole_indices = Vec::with_capacity(holes.len());
    for hole in holes.iter().filter(|h| h.len() >= 3) {
        hole_indices.push(vertices.len());
        vertices.extend_from_slice(hole);
    }

    let flat_points: Vec<f64> = vertices
        .iter()
        .flat_map(|p| [p.x as f64, p.y as f64])
        .collect();
    match earcutr::earcut(&flat_points, &hole_indices, 2) {
        Ok(indices) => Some((vertices, indices.into_iter().map(|i| i as u32).collect())),
        Err(e) => {
            warn!("Unable to triangulate polygon: {:?}", e);
            None
        }
    }
}

/// Fills the area between `exterior` and `holes` with a triangulated mesh.
pub(crate) fn fill_rings(painter: &Painter, exterior: &[Pos2], holes: &[Vec<Pos2>], fill: Color32) {
    if fill == Color32::TRANSPARENT {
        return;
    }
    let Some((vertices, indices)) = triangulate(exterior, holes) else {
        return;
    };

    let mut mesh = Mesh::default();
    mesh.vertices = vertices
        .iter()
        .map(|p| egui::epaint::Vertex {
            pos: *p,
            uv: Default::default(),
            color: fill,
        })
        .collect();
    mesh.indices = indices;
    painter.add(Shape::Mesh(mesh.into()));
}

/// Fills and outlines a polygon with holes.
pub(crate) fn paint_polygon(
    painter: &Painter,
    projection: &MapProjection,
    polygon: &Polygon<f64>,
    fill: Color32,
    stroke: Stroke,
) {
    let exterior = project_ring(polygon.exterior(), projection);
    let holes: Vec<Vec<Pos2>> = polygon
        .interiors()
        .iter()
        .map(|ring| project_ring(ring, projection))
        .collect();

    fill_rings(painter, &exterior, &holes, fill);

    if stroke.width > 0.0 {
        for ring in std::iter::once(&exterior).chain(holes.iter()) {
            if ring.len() >= 2 {
                painter.add(Shape::closed_line(ring.clone(), stroke));
            }
        }
    }
}

/// Projects the interior rings of a polygon.
pub(crate) fn project_holes(polygon: &Polygon<f64>, projection: &MapProjection) -> Vec<Vec<Pos2>> {
    polygon
        .interiors()
        .iter()
        .map(|ring| project_ring(ring, projection))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::make_geo_circle;
    use egui::{Rect, pos2, vec2};

    #[test]
    fn project_ring_drops_closing_coordinate() {
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0));
        let projection = MapProjection::new(12, GeoPos::new(-118.2430, 34.0537), rect);
        let circle = make_geo_circle(GeoPos::new(-118.2430, 34.0537), 1.0);
        let ring = project_ring(circle.exterior(), &projection);
        assert_eq!(ring.len(), circle.exterior().0.len() - 1);
        assert!(ring.iter().all(|p| rect.contains(*p)));
    }

    #[test]
    fn selection_geometry_and_center() {
        let center = GeoPos::new(-118.2430, 34.0537);
        let circle = make_geo_circle(center, 1.0);
        let selection = RegionSelection::Address {
            center,
            geometry: circle.clone(),
        };
        assert_eq!(selection.center(), Some(center));
        assert_eq!(selection.geometry(), RegionGeometry::Polygon(circle.clone()));

        let boundary = RegionSelection::Boundary {
            source_id: "nc".to_string(),
            region_id: "52".to_string(),
            name: "Downtown Los Angeles".to_string(),
            geometry: RegionGeometry::Polygon(circle),
        };
        assert_eq!(boundary.center(), None);
    }
}
