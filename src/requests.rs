//! Service request data: the request categories, the raw pin list and its conversion into a
//! GeoJSON feature collection.

use egui::Color32;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

use crate::MapError;
use crate::projection::GeoPos;

/// The categories of service requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RequestType {
    /// Dead animal removal.
    #[serde(rename = "Dead Animal Removal")]
    DeadAnimal,
    /// Homeless encampment.
    #[serde(rename = "Homeless Encampment")]
    HomelessEncampment,
    /// A single broken streetlight.
    #[serde(rename = "Single Streetlight Issue")]
    SingleStreetlight,
    /// Several broken streetlights.
    #[serde(rename = "Multiple Streetlight Issue")]
    MultipleStreetlight,
    /// Bulky items pickup.
    #[serde(rename = "Bulky Items")]
    BulkyItems,
    /// Electronic waste pickup.
    #[serde(rename = "Electronic Waste")]
    ElectronicWaste,
    /// Metal and household appliances pickup.
    #[serde(rename = "Metal/Household Appliances")]
    MetalHouseholdAppliances,
    /// Illegal dumping pickup.
    #[serde(rename = "Illegal Dumping Pickup")]
    IllegalDumping,
    /// Graffiti removal.
    #[serde(rename = "Graffiti Removal")]
    Graffiti,
    /// Feedback.
    #[serde(rename = "Feedback")]
    Feedback,
    /// Everything else.
    #[serde(rename = "Other")]
    Other,
}

impl RequestType {
    /// Every known category, in legend order.
    pub const ALL: [RequestType; 11] = [
        RequestType::DeadAnimal,
        RequestType::HomelessEncampment,
        RequestType::SingleStreetlight,
        RequestType::MultipleStreetlight,
        RequestType::BulkyItems,
        RequestType::ElectronicWaste,
        RequestType::MetalHouseholdAppliances,
        RequestType::IllegalDumping,
        RequestType::Graffiti,
        RequestType::Feedback,
        RequestType::Other,
    ];

    /// The value of the `type` property for this category.
    pub fn key(&self) -> &'static str {
        match self {
            RequestType::DeadAnimal => "Dead Animal Removal",
            RequestType::HomelessEncampment => "Homeless Encampment",
            RequestType::SingleStreetlight => "Single Streetlight Issue",
            RequestType::MultipleStreetlight => "Multiple Streetlight Issue",
            RequestType::BulkyItems => "Bulky Items",
            RequestType::ElectronicWaste => "Electronic Waste",
            RequestType::MetalHouseholdAppliances => "Metal/Household Appliances",
            RequestType::IllegalDumping => "Illegal Dumping Pickup",
            RequestType::Graffiti => "Graffiti Removal",
            RequestType::Feedback => "Feedback",
            RequestType::Other => "Other",
        }
    }

    /// Looks up a category by its `type` property value.
    pub fn from_key(key: &str) -> Option<RequestType> {
        RequestType::ALL.into_iter().find(|t| t.key() == key)
    }

    /// A short name for legends.
    pub fn display_name(&self) -> &'static str {
        match self {
            RequestType::DeadAnimal => "Dead Animal",
            RequestType::HomelessEncampment => "Homeless Encampment",
            RequestType::SingleStreetlight => "Single Streetlight",
            RequestType::MultipleStreetlight => "Multiple Streetlight",
            RequestType::BulkyItems => "Bulky Items",
            RequestType::ElectronicWaste => "E-Waste",
            RequestType::MetalHouseholdAppliances => "Metal/Household Appliances",
            RequestType::IllegalDumping => "Illegal Dumping",
            RequestType::Graffiti => "Graffiti",
            RequestType::Feedback => "Feedback",
            RequestType::Other => "Other",
        }
    }

    /// A three letter abbreviation.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            RequestType::DeadAnimal => "DAN",
            RequestType::HomelessEncampment => "HLE",
            RequestType::SingleStreetlight => "SSL",
            RequestType::MultipleStreetlight => "MSL",
            RequestType::BulkyItems => "BLK",
            RequestType::ElectronicWaste => "EWT",
            RequestType::MetalHouseholdAppliances => "MHA",
            RequestType::IllegalDumping => "ILD",
            RequestType::Graffiti => "GRF",
            RequestType::Feedback => "FBK",
            RequestType::Other => "OTH",
        }
    }

    /// The color of the category on the map and in legends.
    pub fn color(&self) -> Color32 {
        match self {
            RequestType::DeadAnimal => Color32::from_rgb(0x4F, 0xEF, 0xEF),
            RequestType::HomelessEncampment => Color32::from_rgb(0xEC, 0xB8, 0x00),
            RequestType::SingleStreetlight => Color32::from_rgb(0xAD, 0x7B, 0x56),
            RequestType::MultipleStreetlight => Color32::from_rgb(0xF7, 0xAD, 0xAD),
            RequestType::BulkyItems => Color32::from_rgb(0xFF, 0xE6, 0xB7),
            RequestType::ElectronicWaste => Color32::from_rgb(0xDD, 0xEC, 0x9F),
            RequestType::MetalHouseholdAppliances => Color32::from_rgb(0xB8, 0xD0, 0xFF),
            RequestType::IllegalDumping => Color32::from_rgb(0x6A, 0x80, 0x11),
            RequestType::Graffiti => Color32::from_rgb(0xBF, 0x82, 0xBA),
            RequestType::Feedback => Color32::from_rgb(0xFF, 0xC4, 0xC4),
            RequestType::Other => Color32::from_rgb(0xFF, 0xFF, 0xFF),
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A request (or a cluster of requests at the same spot) as delivered by the data store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinCluster {
    /// Service request number.
    pub srnumber: String,
    /// Raw category, see [`RequestType::key`].
    pub requesttype: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Number of requests in the cluster.
    #[serde(default)]
    pub count: Option<u32>,
}

/// Parses a JSON array of pins.
pub fn load_pin_clusters(json: &str) -> Result<Vec<PinCluster>, MapError> {
    Ok(serde_json::from_str(json)?)
}

/// Converts the pin list into point features with `id`, `type` and `point_count` properties.
pub fn convert_requests(pins: &[PinCluster]) -> FeatureCollection {
    let features = pins
        .iter()
        .map(|pin| {
            let mut properties = JsonObject::new();
            properties.insert("id".to_string(), JsonValue::from(pin.srnumber.clone()));
            properties.insert("type".to_string(), JsonValue::from(pin.requesttype.clone()));
            if let Some(count) = pin.count {
                properties.insert("point_count".to_string(), JsonValue::from(count));
            }

            Feature {
                geometry: Some(Geometry::new(Value::Point(vec![pin.longitude, pin.latitude]))),
                properties: Some(properties),
                ..Feature::default()
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// The parts of a request feature the map needs.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestPoint {
    /// The raw category.
    pub kind: String,
    /// The location.
    pub pos: GeoPos,
    /// The number of requests at this spot.
    pub weight: u32,
}

impl RequestPoint {
    /// Reads a request from a point feature. Features without a point geometry yield `None`.
    pub fn from_feature(feature: &Feature) -> Option<RequestPoint> {
        let pos = feature_position(feature)?;
        let kind = feature
            .property("type")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();
        let weight = feature
            .property("point_count")
            .and_then(JsonValue::as_u64)
            .map_or(1, |count| u32::try_from(count.max(1)).unwrap_or(u32::MAX));

        Some(RequestPoint { kind, pos, weight })
    }

    /// The category, if it is a known one.
    pub fn request_type(&self) -> Option<RequestType> {
        RequestType::from_key(&self.kind)
    }
}

/// The position of a point feature.
pub(crate) fn feature_position(feature: &Feature) -> Option<GeoPos> {
    match &feature.geometry.as_ref()?.value {
        Value::Point(coords) if coords.len() >= 2 => Some(GeoPos::new(coords[0], coords[1])),
        _ => None,
    }
}
