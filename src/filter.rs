//! Spatial and type filtering of service requests.

use geojson::{Feature, FeatureCollection, JsonObject};
use std::collections::{BTreeMap, BTreeSet};

use crate::geometry::RegionGeometry;
use crate::requests::{RequestType, feature_position};

/// The point features of `requests` that lie inside `polygon`. Without a polygon every feature
/// passes.
pub fn within<'a>(
    requests: &'a FeatureCollection,
    polygon: Option<&RegionGeometry>,
) -> Vec<&'a Feature> {
    match polygon {
        None => requests.features.iter().collect(),
        Some(polygon) => requests
            .features
            .iter()
            .filter(|feature| feature_position(feature).is_some_and(|p| polygon.contains_point(p)))
            .collect(),
    }
}

/// Counts the features per selected category. Every selected category gets a bucket, features of
/// other or unknown categories are dropped.
pub fn tally<'a>(
    features: impl IntoIterator<Item = &'a Feature>,
    selected: &BTreeSet<RequestType>,
) -> BTreeMap<RequestType, usize> {
    let mut counts: BTreeMap<RequestType, usize> = selected.iter().map(|t| (*t, 0)).collect();

    for feature in features {
        let request_type = feature
            .property("type")
            .and_then(|v| v.as_str())
            .and_then(RequestType::from_key);
        if let Some(count) = request_type.and_then(|t| counts.get_mut(&t)) {
            *count += 1;
        }
    }

    counts
}

/// A declarative predicate over feature properties.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FeatureFilter {
    /// Every feature matches.
    #[default]
    All,
    /// The string value of `property` is one of `values`.
    In {
        /// The property to test.
        property: String,
        /// The accepted values.
        values: BTreeSet<String>,
    },
}

impl FeatureFilter {
    /// Matches requests whose `type` is one of `types`.
    pub fn type_filter(types: &BTreeSet<RequestType>) -> Self {
        FeatureFilter::In {
            property: "type".to_string(),
            values: types.iter().map(|t| t.key().to_string()).collect(),
        }
    }

    /// Tests a feature's properties against the filter.
    pub fn matches(&self, properties: Option<&JsonObject>) -> bool {
        match self {
            FeatureFilter::All => true,
            FeatureFilter::In { property, values } => properties
                .and_then(|p| p.get(property))
                .and_then(|v| v.as_str())
                .is_some_and(|v| values.contains(v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::make_geo_circle;
    use crate::projection::GeoPos;
    use crate::requests::{PinCluster, convert_requests};
    use geo::{LineString, Polygon};

    fn pin(id: &str, request_type: RequestType, lon: f64, lat: f64) -> PinCluster {
        PinCluster {
            srnumber: id.to_string(),
            requesttype: request_type.key().to_string(),
            latitude: lat,
            longitude: lon,
            count: None,
        }
    }

    fn sample() -> FeatureCollection {
        convert_requests(&[
            pin("1", RequestType::BulkyItems, -118.25, 34.05),
            pin("2", RequestType::BulkyItems, -118.26, 34.06),
            pin("3", RequestType::Graffiti, -118.40, 34.20),
        ])
    }

    fn selected(types: &[RequestType]) -> BTreeSet<RequestType> {
        types.iter().copied().collect()
    }

    fn square(west: f64, south: f64, east: f64, north: f64) -> RegionGeometry {
        RegionGeometry::Polygon(Polygon::new(
            LineString::from(vec![
                (west, south),
                (east, south),
                (east, north),
                (west, north),
                (west, south),
            ]),
            vec![],
        ))
    }

    #[test]
    fn no_polygon_passes_everything() {
        let requests = sample();
        let passed = within(&requests, None);
        assert_eq!(passed.len(), requests.features.len());
        for (passed, original) in passed.iter().zip(&requests.features) {
            assert_eq!(*passed, original);
        }
    }

    #[test]
    fn filtered_points_lie_inside_polygon() {
        let requests = sample();
        let circle = RegionGeometry::from(make_geo_circle(GeoPos::new(-118.255, 34.055), 2.0));
        let passed = within(&requests, Some(&circle));
        assert_eq!(passed.len(), 2);
        for feature in passed {
            assert!(requests.features.contains(feature));
            assert!(circle.contains_point(feature_position(feature).unwrap()));
        }
    }

    #[test]
    fn tally_without_polygon() {
        let requests = sample();
        let types = selected(&[RequestType::BulkyItems, RequestType::Graffiti]);
        let counts = tally(within(&requests, None), &types);
        assert_eq!(
            counts,
            BTreeMap::from([(RequestType::BulkyItems, 2), (RequestType::Graffiti, 1)])
        );
    }

    #[test]
    fn tally_within_polygon() {
        let requests = sample();
        let types = selected(&[RequestType::BulkyItems, RequestType::Graffiti]);
        let region = square(-118.30, 34.00, -118.20, 34.10);
        let counts = tally(within(&requests, Some(&region)), &types);
        assert_eq!(
            counts,
            BTreeMap::from([(RequestType::BulkyItems, 2), (RequestType::Graffiti, 0)])
        );
    }

    #[test]
    fn tally_sums_to_recognized_features() {
        let mut requests = sample();
        let mut unknown = pin("4", RequestType::Other, -118.3, 34.1);
        unknown.requesttype = "Pothole".to_string();
        requests
            .features
            .extend(convert_requests(&[unknown]).features);

        let all: BTreeSet<RequestType> = RequestType::ALL.into_iter().collect();
        let counts = tally(within(&requests, None), &all);
        assert_eq!(counts.len(), RequestType::ALL.len());
        assert_eq!(counts.values().sum::<usize>(), 3);
    }

    #[test]
    fn type_filter_matches_selected_types() {
        let requests = sample();
        let filter = FeatureFilter::type_filter(&selected(&[RequestType::Graffiti]));
        let matching: Vec<_> = requests
            .features
            .iter()
            .filter(|f| filter.matches(f.properties.as_ref()))
            .collect();
        assert_eq!(matching.len(), 1);
        assert!(FeatureFilter::All.matches(None));
        assert!(!filter.matches(None));
    }
}
