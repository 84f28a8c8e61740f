//! A layer for service request points, rendered either as circles or as a heatmap.

use egui::{Color32, Painter, Pos2, Rect, Response, Stroke, vec2};
use geojson::FeatureCollection;
use log::debug;
use std::any::Any;
use std::collections::HashMap;

use crate::filter::FeatureFilter;
use crate::layers::Layer;
use crate::projection::MapProjection;
use crate::requests::RequestPoint;

/// The two mutually exclusive renderings of the requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RequestsMode {
    /// One circle per request, colored by category.
    #[default]
    Circles,
    /// Request density.
    Heatmap,
}

/// Layer implementation that draws service requests.
pub struct RequestsLayer {
    source: FeatureCollection,
    points: Vec<Option<RequestPoint>>,
    filter: FeatureFilter,
    circles_visible: bool,
    heatmap_visible: bool,

    /// The radius of a request circle in screen points.
    pub circle_radius: f32,

    /// The edge length of a heatmap cell in screen points.
    pub heatmap_cell_size: f32,
}

impl Default for RequestsLayer {
    fn default() -> Self {
        Self::new(FeatureCollection {
            bbox: None,
            features: Vec::new(),
            foreign_members: None,
        })
    }
}

impl RequestsLayer {
    /// Creates a layer showing `source_data` as circles.
    pub fn new(source_data: FeatureCollection) -> Self {
        let mut layer = Self {
            source: FeatureCollection {
                bbox: None,
                features: Vec::new(),
                foreign_members: None,
            },
            points: Vec::new(),
            filter: FeatureFilter::All,
            circles_visible: true,
            heatmap_visible: false,
            circle_radius: 3.0,
            heatmap_cell_size: 16.0,
        };
        layer.set_data(source_data);
        layer
    }

    /// Replaces the requests.
    pub fn set_data(&mut self, source_data: FeatureCollection) {
        self.points = source_data
            .features
            .iter()
            .map(RequestPoint::from_feature)
            .collect();
        debug!("Requests layer holds {} features", self.points.len());
        self.source = source_data;
    }

    /// The requests.
    pub fn source(&self) -> &FeatureCollection {
        &self.source
    }

    /// Sets which requests are drawn, in both renderings.
    pub fn set_filter(&mut self, filter: FeatureFilter) {
        self.filter = filter;
    }

    /// The current filter.
    pub fn filter(&self) -> &FeatureFilter {
        &self.filter
    }

    /// Makes `mode` the only visible rendering.
    pub fn set_mode(&mut self, mode: RequestsMode) {
        self.circles_visible = mode == RequestsMode::Circles;
        self.heatmap_visible = mode == RequestsMode::Heatmap;
    }

    /// The visible rendering.
    pub fn mode(&self) -> RequestsMode {
        if self.heatmap_visible {
            RequestsMode::Heatmap
        } else {
            RequestsMode::Circles
        }
    }

    /// Whether the rendering `mode` is visible.
    pub fn is_visible(&self, mode: RequestsMode) -> bool {
        match mode {
            RequestsMode::Circles => self.circles_visible,
            RequestsMode::Heatmap => self.heatmap_visible,
        }
    }

    /// The requests that pass the filter.
    pub fn visible_points(&self) -> impl Iterator<Item = &RequestPoint> {
        self.source
            .features
            .iter()
            .zip(&self.points)
            .filter(|(feature, _)| self.filter.matches(feature.properties.as_ref()))
            .filter_map(|(_, point)| point.as_ref())
    }

    fn draw_circles(&self, painter: &Painter, projection: &MapProjection) {
        let clip = painter.clip_rect().expand(self.circle_radius);
        let outline = Stroke::new(0.5, Color32::from_black_alpha(120));
        for point in self.visible_points() {
            let pos = projection.project(point.pos);
            if !clip.contains(pos) {
                continue;
            }
            let color = point
                .request_type()
                .map_or(Color32::GRAY, |t| t.color());
            painter.circle(pos, self.circle_radius, color, outline);
        }
    }

    fn draw_heatmap(&self, painter: &Painter, projection: &MapProjection) {
        let clip = painter.clip_rect();
        let cell = self.heatmap_cell_size.max(1.0);
        let positions = self
            .visible_points()
            .map(|p| (projection.project(p.pos), p.weight))
            .filter(|(pos, _)| clip.expand(cell).contains(*pos));
        let bins = heat_bins(positions, cell);

        let Some(max) = bins.values().copied().max() else {
            return;
        };
        for ((x, y), weight) in bins {
            let min = Pos2::new(x as f32 * cell, y as f32 * cell);
            let rect = Rect::from_min_size(min, vec2(cell, cell));
            painter.rect_filled(rect, 0.0, heat_color(weight as f32 / max as f32));
        }
    }
}

/// Sums weights per square screen cell of edge `cell`.
pub(crate) fn heat_bins(
    points: impl Iterator<Item = (Pos2, u32)>,
    cell: f32,
) -> HashMap<(i32, i32), u32> {
    let mut bins = HashMap::new();
    for (pos, weight) in points {
        let key = ((pos.x / cell).floor() as i32, (pos.y / cell).floor() as i32);
        *bins.entry(key).or_insert(0) += weight;
    }
    bins
}

/// The heatmap color ramp, from faint blue at low density to red at the densest cell.
pub(crate) fn heat_color(t: f32) -> Color32 {
    const STOPS: [(f32, [u8; 4]); 5] = [
        (0.0, [33, 102, 172, 60]),
        (0.25, [103, 169, 207, 120]),
        (0.5, [209, 229, 240, 160]),
        (0.75, [253, 219, 199, 190]),
        (1.0, [178, 24, 43, 220]),
    ];

    let t = t.clamp(0.0, 1.0);
    let upper = STOPS.iter().position(|(s, _)| *s >= t).unwrap_or(STOPS.len() - 1);
    if upper == 0 {
        let [r, g, b, a] = STOPS[0].1;
        return Color32::from_rgba_unmultiplied(r, g, b, a);
    }

    let (t0, c0) = STOPS[upper - 1];
    let (t1, c1) = STOPS[upper];
    let f = (t - t0) / (t1 - t0);
    let mix = |i: usize| (c0[i] as f32 + (c1[i] as f32 - c0[i] as f32) * f).round() as u8;
    Color32::from_rgba_unmultiplied(mix(0), mix(1), mix(2), mix(3))
}

impl Layer for RequestsLayer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn handle_input(&mut self, _response: &Response, _projection: &MapProjection) -> bool {
        false
    }

    fn draw(&self, painter: &Painter, projection: &MapProjection) {
        if self.circles_visible {
            self.draw_circles(painter, projection);
        }
        if self.heatmap_visible {
            self.draw_heatmap(painter, projection);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::{PinCluster, RequestType, convert_requests};
    use egui::pos2;
    use std::collections::BTreeSet;

    fn requests() -> FeatureCollection {
        let pin = |id: &str, t: RequestType, count: Option<u32>| PinCluster {
            srnumber: id.to_string(),
            requesttype: t.key().to_string(),
            latitude: 34.05,
            longitude: -118.25,
            count,
        };
        convert_requests(&[
            pin("1", RequestType::BulkyItems, None),
            pin("2", RequestType::Graffiti, Some(3)),
            pin("3", RequestType::Graffiti, None),
        ])
    }

    #[test]
    fn requests_layer_new() {
        let layer = RequestsLayer::new(requests());
        assert_eq!(layer.mode(), RequestsMode::Circles);
        assert!(layer.is_visible(RequestsMode::Circles));
        assert!(!layer.is_visible(RequestsMode::Heatmap));
        assert_eq!(layer.visible_points().count(), 3);
        assert!(layer.as_any().is::<RequestsLayer>());
    }

    #[test]
    fn mode_switch_leaves_exactly_one_rendering() {
        let mut layer = RequestsLayer::default();
        for mode in [
            RequestsMode::Heatmap,
            RequestsMode::Heatmap,
            RequestsMode::Circles,
            RequestsMode::Heatmap,
            RequestsMode::Circles,
        ] {
            layer.set_mode(mode);
            assert_eq!(layer.mode(), mode);
            assert!(layer.is_visible(RequestsMode::Circles) ^ layer.is_visible(RequestsMode::Heatmap));
        }
    }

    #[test]
    fn type_filter_hides_other_requests() {
        let mut layer = RequestsLayer::new(requests());
        let types: BTreeSet<_> = [RequestType::Graffiti].into_iter().collect();
        layer.set_filter(FeatureFilter::type_filter(&types));
        assert_eq!(layer.visible_points().count(), 2);
        assert!(
            layer
                .visible_points()
                .all(|p| p.request_type() == Some(RequestType::Graffiti))
        );

        // The filter survives a mode switch.
        layer.set_mode(RequestsMode::Heatmap);
        assert_eq!(layer.visible_points().count(), 2);
    }

    #[test]
    fn set_data_replaces_requests() {
        let mut layer = RequestsLayer::new(requests());
        layer.set_data(convert_requests(&[]));
        assert_eq!(layer.visible_points().count(), 0);
        assert!(layer.source().features.is_empty());
    }

    #[test]
    fn heat_bins_sum_weights_per_cell() {
        let bins = heat_bins(
            [
                (pos2(1.0, 1.0), 1),
                (pos2(15.0, 2.0), 3),
                (pos2(17.0, 2.0), 1),
                (pos2(-1.0, 2.0), 1),
            ]
            .into_iter(),
            16.0,
        );
        assert_eq!(bins.get(&(0, 0)), Some(&4));
        assert_eq!(bins.get(&(1, 0)), Some(&1));
        assert_eq!(bins.get(&(-1, 0)), Some(&1));
    }

    #[test]
    fn heat_color_ramp_ends() {
        assert_eq!(heat_color(0.0), Color32::from_rgba_unmultiplied(33, 102, 172, 60));
        assert_eq!(heat_color(1.0), Color32::from_rgba_unmultiplied(178, 24, 43, 220));
        assert_eq!(heat_color(2.0), heat_color(1.0));
    }
}
