//! A draggable circular region, the "shed", anchored at an address.
//!
//! The layer keeps two sources: `shed`, the circle itself, and `shed-mask`, the rest of the world
//! with the circle cut out, which is shaded to draw attention to the region. The circle can be
//! dragged around with the pointer; when the drag ends the new circle is reported as a
//! [`RegionSelection::Address`].

use egui::{Color32, CursorIcon, Painter, Pos2, Rect, Response, Shape, Stroke};
use geo::{Intersects, Polygon};
use geojson::GeoJson;
use log::debug;
use std::any::Any;
use std::sync::mpsc::Sender;

use crate::geometry::{
    BoundingBox, DEFAULT_RADIUS_MILES, bounding_box, empty_geo, make_geo_circle,
    make_geo_mask, polygon_feature,
};
use crate::layers::{Layer, RegionSelection, fill_rings, project_holes};
use crate::projection::{GeoPos, MapProjection, Padding};

/// The id of the circle source.
pub const SHED_SOURCE: &str = "shed";
/// The id of the mask source.
pub const SHED_MASK_SOURCE: &str = "shed-mask";

/// The padding used when zooming to an address, leaving room for the side panels.
pub const FIT_BOUNDS_PADDING: Padding = Padding {
    top: 65.0,
    bottom: 65.0,
    left: 300.0,
    right: 300.0,
};

/// The drag state of the shed.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DragState {
    /// Nothing is being dragged.
    #[default]
    Idle,
    /// The shed follows the pointer.
    Dragging {
        /// Pointer position minus circle center when the drag started.
        offset: GeoPos,
    },
}

/// Pointer input fed to the drag state machine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    /// A button was pressed at a position.
    Down(GeoPos),
    /// The pointer moved to a position.
    Move(GeoPos),
    /// The button was released, or the pointer left the map.
    Up,
}

/// The radius region layer.
pub struct AddressLayer {
    center: Option<GeoPos>,
    circle: Option<Polygon<f64>>,
    mask: Option<Polygon<f64>>,
    radius_miles: f64,
    visible: bool,
    drag: DragState,
    select_on_idle: bool,
    selections: Sender<RegionSelection>,

    /// Whether the shed can be dragged.
    pub interactive: bool,

    /// The outline of the circle.
    pub border: Stroke,

    /// The color of the mask at full opacity.
    pub mask_color: Color32,
}

impl AddressLayer {
    /// Creates a hidden layer without a center. Selections are sent to `selections`.
    pub fn new(selections: Sender<RegionSelection>) -> Self {
        Self {
            center: None,
            circle: None,
            mask: None,
            radius_miles: DEFAULT_RADIUS_MILES,
            visible: false,
            drag: DragState::default(),
            select_on_idle: false,
            selections,
            interactive: true,
            border: Stroke::new(1.0, Color32::WHITE),
            mask_color: Color32::WHITE,
        }
    }

    /// The center of the circle.
    pub fn center(&self) -> Option<GeoPos> {
        self.center
    }

    /// The circle.
    pub fn circle(&self) -> Option<&Polygon<f64>> {
        self.circle.as_ref()
    }

    /// The radius in miles.
    pub fn radius(&self) -> f64 {
        self.radius_miles
    }

    /// The drag state.
    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    /// The data of the [`SHED_SOURCE`].
    pub fn shed_source(&self) -> GeoJson {
        self.circle.as_ref().map_or_else(empty_geo, polygon_feature)
    }

    /// The data of the [`SHED_MASK_SOURCE`].
    pub fn shed_mask_source(&self) -> GeoJson {
        self.mask.as_ref().map_or_else(empty_geo, polygon_feature)
    }

    /// Moves the circle to `center`, or removes it.
    pub fn set_center(&mut self, center: Option<GeoPos>) {
        self.center = center;
        match center {
            Some(center) => {
                let circle = make_geo_circle(center, self.radius_miles);
                self.mask = Some(make_geo_mask(&circle));
                self.circle = Some(circle);
            }
            None => {
                self.circle = None;
                self.mask = None;
                self.drag = DragState::Idle;
            }
        }
    }

    /// Changes the radius, keeping the center.
    pub fn set_radius(&mut self, miles: f64) {
        if !(miles.is_finite() && miles > 0.0) {
            debug!("Ignoring shed radius {}", miles);
            return;
        }
        self.radius_miles = miles;
        self.set_center(self.center);
    }

    /// Moves the circle to `center` and returns the extent the map should fit with
    /// [`FIT_BOUNDS_PADDING`]. The circle is reported the next time the map is idle.
    pub fn zoom_to(&mut self, center: GeoPos) -> Option<BoundingBox> {
        self.set_center(Some(center));
        self.select_on_idle = true;
        self.circle.as_ref().and_then(bounding_box)
    }

    /// Shows or hides the layer.
    pub fn set_visibility(&mut self, visible: bool) {
        self.visible = visible;
        if !visible {
            self.drag = DragState::Idle;
        }
    }

    /// Whether the layer is drawn.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether `pos` lies on the circle.
    fn hit(&self, pos: GeoPos) -> bool {
        let coord: geo::Coord<f64> = pos.into();
        self.circle.as_ref().is_some_and(|c| c.intersects(&coord))
    }

    /// Advances the drag state machine. Returns `true` while the pointer belongs to the shed.
    pub fn on_pointer(&mut self, event: PointerEvent) -> bool {
        match (self.drag, event) {
            (DragState::Idle, PointerEvent::Down(pos)) => {
                let Some(center) = self.center.filter(|_| self.hit(pos)) else {
                    return false;
                };
                self.drag = DragState::Dragging {
                    offset: GeoPos::new(pos.lon - center.lon, pos.lat - center.lat),
                };
                true
            }
            (DragState::Dragging { offset }, PointerEvent::Move(pos)) => {
                self.set_center(Some(GeoPos::new(pos.lon - offset.lon, pos.lat - offset.lat)));
                true
            }
            (DragState::Dragging { .. }, PointerEvent::Up) => {
                self.drag = DragState::Idle;
                self.select_region();
                true
            }
            (DragState::Dragging { .. }, PointerEvent::Down(_)) => true,
            (DragState::Idle, _) => false,
        }
    }

    /// Reports the current circle.
    pub fn select_region(&self) {
        let (Some(center), Some(circle)) = (self.center, self.circle.as_ref()) else {
            return;
        };
        let selection = RegionSelection::Address {
            center,
            geometry: circle.clone(),
        };
        if self.selections.send(selection).is_err() {
            debug!("Region selection dropped, nobody is listening");
        }
    }

    /// The mask opacity ramps in between zoom levels 10 and 13.
    fn mask_opacity(zoom: u8) -> f32 {
        ((zoom as f32 - 10.0) / 3.0).clamp(0.0, 1.0) * 0.2
    }
}

/// The screen ring standing in for the world ring of the mask: the visible area grown to enclose
/// every hole, so a circle reaching past the view edge stays a hole.
fn mask_exterior(clip: Rect, holes: &[Vec<Pos2>]) -> Vec<Pos2> {
    let bounds = holes
        .iter()
        .flatten()
        .fold(clip, |bounds, p| bounds.union(Rect::from_pos(*p)))
        .expand(1.0);
    vec![
        bounds.left_top(),
        bounds.right_top(),
        bounds.right_bottom(),
        bounds.left_bottom(),
    ]
}

impl Layer for AddressLayer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_idle(&mut self) {
        if std::mem::take(&mut self.select_on_idle) {
            self.select_region();
        }
    }

    fn handle_input(&mut self, response: &Response, projection: &MapProjection) -> bool {
        if !self.visible || !self.interactive {
            return false;
        }

        let mut handled = false;

        if response.drag_started() {
            let press = response
                .ctx
                .input(|i| i.pointer.press_origin())
                .or(response.interact_pointer_pos());
            if let Some(press) = press {
                handled |= self.on_pointer(PointerEvent::Down(projection.unproject(press)));
            }
        }

        if let DragState::Dragging { .. } = self.drag {
            if response.dragged() {
                if let Some(pointer_pos) = response.interact_pointer_pos() {
                    self.on_pointer(PointerEvent::Move(projection.unproject(pointer_pos)));
                }
            }
            if response.drag_stopped() || !response.dragged() {
                self.on_pointer(PointerEvent::Up);
            }
            handled = true;
        }

        if matches!(self.drag, DragState::Dragging { .. }) {
            response.ctx.set_cursor_icon(CursorIcon::Grabbing);
        } else if let Some(hover_pos) = response.hover_pos() {
            if self.hit(projection.unproject(hover_pos)) {
                response.ctx.set_cursor_icon(CursorIcon::Move);
            }
        }

        handled
    }

    fn draw(&self, painter: &Painter, projection: &MapProjection) {
        if !self.visible {
            return;
        }

        if let Some(mask) = &self.mask {
            let opacity = Self::mask_opacity(projection.zoom());
            if opacity > 0.0 {
                let holes = project_holes(mask, projection);
                fill_rings(
                    painter,
                    &mask_exterior(painter.clip_rect(), &holes),
                    &holes,
                    self.mask_color.gamma_multiply(opacity),
                );
            }
        }

        if let Some(circle) = &self.circle {
            let ring: Vec<Pos2> = circle
                .exterior()
                .coords()
                .map(|c| projection.project((*c).into()))
                .collect();
            painter.add(Shape::line(ring, self.border));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::triangulate;
    use std::sync::mpsc::{Receiver, channel};

    const CITY_HALL: GeoPos = GeoPos::new(-118.2430, 34.0537);

    fn layer() -> (AddressLayer, Receiver<RegionSelection>) {
        let (sender, receiver) = channel();
        (AddressLayer::new(sender), receiver)
    }

    #[test]
    fn address_layer_new() {
        let (layer, _) = layer();
        assert!(!layer.is_visible());
        assert!(layer.center().is_none());
        assert_eq!(layer.drag_state(), DragState::Idle);
        assert_eq!(layer.radius(), DEFAULT_RADIUS_MILES);
        assert!(layer.as_any().is::<AddressLayer>());
    }

    #[test]
    fn set_center_fills_both_sources() {
        let (mut layer, _) = layer();
        layer.set_center(Some(CITY_HALL));
        assert!(matches!(layer.shed_source(), GeoJson::Feature(_)));
        assert!(matches!(layer.shed_mask_source(), GeoJson::Feature(_)));
        assert_eq!(
            layer.mask.as_ref().unwrap().interiors()[0],
            *layer.circle().unwrap().exterior()
        );
    }

    #[test]
    fn null_center_empties_both_sources() {
        let (mut layer, _) = layer();
        layer.set_center(Some(CITY_HALL));
        layer.set_center(None);
        assert_eq!(layer.shed_source(), empty_geo());
        assert_eq!(layer.shed_mask_source(), empty_geo());

        let (fresh, _) = self::layer();
        assert_eq!(fresh.shed_source(), empty_geo());
        assert_eq!(fresh.shed_mask_source(), empty_geo());
    }

    #[test]
    fn drag_moves_circle_and_reports_on_release() {
        let (mut layer, receiver) = layer();
        layer.set_center(Some(CITY_HALL));

        // Grab slightly off-center and move by 0.01 degrees each way.
        let grab = GeoPos::new(CITY_HALL.lon + 0.002, CITY_HALL.lat);
        assert!(layer.on_pointer(PointerEvent::Down(grab)));
        assert!(matches!(layer.drag_state(), DragState::Dragging { .. }));

        assert!(layer.on_pointer(PointerEvent::Move(GeoPos::new(grab.lon + 0.01, grab.lat + 0.01))));
        let center = layer.center().unwrap();
        assert!((center.lon - (CITY_HALL.lon + 0.01)).abs() < 1e-9);
        assert!((center.lat - (CITY_HALL.lat + 0.01)).abs() < 1e-9);
        assert!(receiver.try_recv().is_err());

        assert!(layer.on_pointer(PointerEvent::Up));
        assert_eq!(layer.drag_state(), DragState::Idle);
        match receiver.try_recv().unwrap() {
            RegionSelection::Address { center: reported, geometry } => {
                assert_eq!(reported, center);
                assert_eq!(Some(&geometry), layer.circle());
            }
            other => panic!("unexpected selection {other:?}"),
        }
    }

    #[test]
    fn press_outside_circle_does_not_drag() {
        let (mut layer, receiver) = layer();
        layer.set_center(Some(CITY_HALL));
        assert!(!layer.on_pointer(PointerEvent::Down(GeoPos::new(-118.5, 34.3))));
        assert!(!layer.on_pointer(PointerEvent::Move(GeoPos::new(-118.4, 34.2))));
        assert!(!layer.on_pointer(PointerEvent::Up));
        assert_eq!(layer.center(), Some(CITY_HALL));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn zoom_to_reports_on_idle() {
        let (mut layer, receiver) = layer();
        let bbox = layer.zoom_to(CITY_HALL).unwrap();
        assert!(bbox.contains(CITY_HALL));
        assert!(receiver.try_recv().is_err());

        layer.on_idle();
        assert_eq!(
            receiver.try_recv().unwrap().center(),
            Some(CITY_HALL)
        );

        // Only the first idle after zooming reports.
        layer.on_idle();
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn set_radius_rebuilds_circle() {
        let (mut layer, _) = layer();
        layer.set_center(Some(CITY_HALL));
        let small = bounding_box(layer.circle().unwrap()).unwrap();
        layer.set_radius(2.0);
        let large = bounding_box(layer.circle().unwrap()).unwrap();
        assert!((large.north - large.south) > 1.9 * (small.north - small.south));
        assert_eq!(layer.center(), Some(CITY_HALL));

        layer.set_radius(-1.0);
        assert_eq!(layer.radius(), 2.0);
    }

    fn screen_circle(center: Pos2, radius: f32) -> Vec<Pos2> {
        (0..64)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / 64.0;
                center + radius * egui::vec2(angle.cos(), angle.sin())
            })
            .collect()
    }

    fn area(ring: &[Pos2]) -> f32 {
        let twice: f32 = ring
            .iter()
            .zip(ring.iter().cycle().skip(1))
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum();
        twice.abs() / 2.0
    }

    /// The triangles of the mask and the shaded area they cover.
    fn shade(clip: Rect, hole: Vec<Pos2>) -> (Vec<[Pos2; 3]>, f32) {
        let holes = vec![hole];
        let exterior = mask_exterior(clip, &holes);
        let (vertices, indices) = triangulate(&exterior, &holes).unwrap();
        let triangles: Vec<[Pos2; 3]> = indices
            .chunks(3)
            .map(|t| [vertices[t[0] as usize], vertices[t[1] as usize], vertices[t[2] as usize]])
            .collect();
        let shaded = triangles.iter().map(|t| area(t)).sum();
        (triangles, shaded)
    }

    #[test]
    fn view_inside_circle_is_not_shaded() {
        let clip = Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(100.0, 100.0));
        let hole = screen_circle(clip.center(), 400.0);
        let exterior = mask_exterior(clip, std::slice::from_ref(&hole));

        let (triangles, shaded) = shade(clip, hole.clone());
        let expected = area(&exterior) - area(&hole);
        assert!((shaded - expected).abs() < expected * 1e-3);
        for [a, b, c] in triangles {
            let centroid = Pos2::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0);
            assert!(!clip.contains(centroid));
        }
    }

    #[test]
    fn circle_inside_view_shades_the_rest() {
        let clip = Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(800.0, 600.0));
        let hole = screen_circle(clip.center(), 100.0);
        let (_, shaded) = shade(clip, hole.clone());
        let expected = clip.expand(1.0).area() - area(&hole);
        assert!((shaded - expected).abs() < expected * 1e-3);
    }

    #[test]
    fn mask_opacity_ramp() {
        assert_eq!(AddressLayer::mask_opacity(9), 0.0);
        assert_eq!(AddressLayer::mask_opacity(10), 0.0);
        assert!((AddressLayer::mask_opacity(13) - 0.2).abs() < 1e-6);
        assert!((AddressLayer::mask_opacity(16) - 0.2).abs() < 1e-6);
    }
}
