//! Geometry helpers for regions, circles and extents.

use geo::{BoundingRect, Coord, HaversineDestination, Intersects, LineString, MultiPolygon, Point, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use serde::{Deserialize, Serialize};

use crate::MapError;
use crate::projection::GeoPos;

/// The radius of a freshly placed shed, in miles.
pub const DEFAULT_RADIUS_MILES: f64 = 1.0;

const METERS_PER_MILE: f64 = 1609.344;

/// The number of vertices used to approximate a circle.
const CIRCLE_STEPS: usize = 64;

/// A geographical extent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box.
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// The middle of the extent.
    pub fn center(&self) -> GeoPos {
        GeoPos {
            lon: (self.west + self.east) / 2.0,
            lat: (self.south + self.north) / 2.0,
        }
    }

    /// The smallest extent covering both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }

    /// Whether `pos` lies inside the extent or on its edge.
    pub fn contains(&self, pos: GeoPos) -> bool {
        (self.west..=self.east).contains(&pos.lon) && (self.south..=self.north).contains(&pos.lat)
    }
}

impl From<geo::Rect<f64>> for BoundingBox {
    fn from(rect: geo::Rect<f64>) -> Self {
        BoundingBox {
            west: rect.min().x,
            south: rect.min().y,
            east: rect.max().x,
            north: rect.max().y,
        }
    }
}

/// A closed areal geometry used to bound request points.
#[derive(Clone, Debug, PartialEq)]
pub enum RegionGeometry {
    /// A single polygon, possibly with holes.
    Polygon(Polygon<f64>),
    /// A set of polygons.
    MultiPolygon(MultiPolygon<f64>),
}

impl RegionGeometry {
    /// Whether `pos` lies inside the region. Points on the boundary count as inside.
    pub fn contains_point(&self, pos: GeoPos) -> bool {
        let coord: Coord<f64> = pos.into();
        match self {
            RegionGeometry::Polygon(polygon) => polygon.intersects(&coord),
            RegionGeometry::MultiPolygon(polygons) => polygons.intersects(&coord),
        }
    }

    /// The extent of the region, `None` when it has no coordinates.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        match self {
            RegionGeometry::Polygon(polygon) => polygon.bounding_rect(),
            RegionGeometry::MultiPolygon(polygons) => polygons.bounding_rect(),
        }
        .map(BoundingBox::from)
    }

    /// The polygons making up the region.
    pub fn polygons(&self) -> &[Polygon<f64>] {
        match self {
            RegionGeometry::Polygon(polygon) => std::slice::from_ref(polygon),
            RegionGeometry::MultiPolygon(polygons) => &polygons.0,
        }
    }
}

impl From<Polygon<f64>> for RegionGeometry {
    fn from(polygon: Polygon<f64>) -> Self {
        RegionGeometry::Polygon(polygon)
    }
}

impl TryFrom<Geometry> for RegionGeometry {
    type Error = MapError;

    fn try_from(geometry: Geometry) -> Result<Self, Self::Error> {
        match geometry.value {
            value @ Value::Polygon(_) => Ok(RegionGeometry::Polygon(value.try_into()?)),
            value @ Value::MultiPolygon(_) => Ok(RegionGeometry::MultiPolygon(value.try_into()?)),
            other => Err(MapError::UnsupportedGeometry(geometry_name(&other).to_string())),
        }
    }
}

fn geometry_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// An empty feature collection, the content of a cleared source.
pub fn empty_geo() -> GeoJson {
    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features: Vec::new(),
        foreign_members: None,
    })
}

/// Wraps a polygon into a GeoJSON feature without properties.
pub fn polygon_feature(polygon: &Polygon<f64>) -> GeoJson {
    GeoJson::Feature(Feature {
        geometry: Some(Geometry::new(Value::from(polygon))),
        ..Feature::default()
    })
}

/// Approximates a geodesic circle of `radius_miles` around `center`.
pub fn make_geo_circle(center: GeoPos, radius_miles: f64) -> Polygon<f64> {
    let origin: Point<f64> = center.into();
    let distance = radius_miles * METERS_PER_MILE;

    let mut coords: Vec<Coord<f64>> = (0..CIRCLE_STEPS)
        .map(|i| {
            let bearing = i as f64 * -360.0 / CIRCLE_STEPS as f64;
            origin.haversine_destination(bearing, distance).0
        })
        .collect();
    if let Some(first) = coords.first().copied() {
        coords.push(first);
    }

    Polygon::new(LineString::from(coords), Vec::new())
}

/// A polygon covering the whole world with `circle` cut out of it.
pub fn make_geo_mask(circle: &Polygon<f64>) -> Polygon<f64> {
    let world = LineString::from(vec![
        (180.0, 90.0),
        (-180.0, 90.0),
        (-180.0, -90.0),
        (180.0, -90.0),
        (180.0, 90.0),
    ]);
    Polygon::new(world, vec![circle.exterior().clone()])
}

/// The extent of a polygon.
pub fn bounding_box(polygon: &Polygon<f64>) -> Option<BoundingBox> {
    polygon.bounding_rect().map(BoundingBox::from)
}

/// Parses a JSON document that must hold a feature collection.
pub fn feature_collection_from_str(json: &str) -> Result<FeatureCollection, MapError> {
    match json.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        _ => Err(MapError::NotAFeatureCollection),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Contains, HaversineDistance};

    const CITY_HALL: GeoPos = GeoPos::new(-118.2430, 34.0537);

    #[test]
    fn circle_is_closed_and_round() {
        let circle = make_geo_circle(CITY_HALL, 1.0);
        let ring = circle.exterior();
        assert_eq!(ring.0.len(), CIRCLE_STEPS + 1);
        assert_eq!(ring.0.first(), ring.0.last());

        let center: Point<f64> = CITY_HALL.into();
        for coord in ring.coords() {
            let d = center.haversine_distance(&Point::from(*coord));
            assert!((d - METERS_PER_MILE).abs() < 1.0, "distance was {d}");
        }
    }

    #[test]
    fn circle_contains_center() {
        let circle = make_geo_circle(CITY_HALL, 0.5);
        assert!(circle.contains(&Point::from(CITY_HALL)));
    }

    #[test]
    fn mask_cuts_out_circle() {
        let circle = make_geo_circle(CITY_HALL, 1.0);
        let mask = make_geo_mask(&circle);
        assert_eq!(mask.interiors().len(), 1);
        assert_eq!(&mask.interiors()[0], circle.exterior());

        let mask = RegionGeometry::Polygon(mask);
        assert!(!mask.contains_point(CITY_HALL));
        assert!(mask.contains_point(GeoPos::new(-117.0, 33.0)));
    }

    #[test]
    fn circle_bounding_box() {
        let circle = make_geo_circle(CITY_HALL, 1.0);
        let bbox = bounding_box(&circle).unwrap();
        assert!(bbox.contains(CITY_HALL));
        // One mile is roughly 0.0145 degrees of latitude.
        assert!((bbox.north - bbox.south - 2.0 * 0.01447).abs() < 1e-3);
        assert!(bbox.west < CITY_HALL.lon && CITY_HALL.lon < bbox.east);
    }

    #[test]
    fn empty_geo_has_no_features() {
        match empty_geo() {
            GeoJson::FeatureCollection(collection) => assert!(collection.features.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn region_boundary_counts_as_inside() {
        let square = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
            vec![],
        );
        let region = RegionGeometry::from(square);
        assert!(region.contains_point(GeoPos::new(0.5, 0.5)));
        assert!(region.contains_point(GeoPos::new(1.0, 0.5)));
        assert!(!region.contains_point(GeoPos::new(1.5, 0.5)));
    }

    #[test]
    fn region_from_geojson() {
        let geometry: Geometry = serde_json::from_str(
            r#"{"type":"MultiPolygon","coordinates":[[[[0,0],[1,0],[1,1],[0,0]]],[[[5,5],[6,5],[6,6],[5,5]]]]}"#,
        )
        .unwrap();
        let region = RegionGeometry::try_from(geometry).unwrap();
        assert_eq!(region.polygons().len(), 2);
        assert_eq!(
            region.bounding_box(),
            Some(BoundingBox::new(0.0, 0.0, 6.0, 6.0))
        );

        let point: Geometry =
            serde_json::from_str(r#"{"type":"Point","coordinates":[1,2]}"#).unwrap();
        assert!(matches!(
            RegionGeometry::try_from(point),
            Err(MapError::UnsupportedGeometry(name)) if name == "Point"
        ));
    }

    #[test]
    fn parse_feature_collection() {
        let collection =
            feature_collection_from_str(r#"{"type":"FeatureCollection","features":[]}"#).unwrap();
        assert!(collection.features.is_empty());

        let not_collection =
            feature_collection_from_str(r#"{"type":"Point","coordinates":[1,2]}"#);
        assert!(matches!(not_collection, Err(MapError::NotAFeatureCollection)));
    }
}
