//! Application state read by the map container.
//!
//! The store holds the request points and the last reported viewport. It is only changed through
//! [`Store::dispatch`], which applies one [`Action`] at a time.

use log::{debug, info};

use crate::MapPosition;
use crate::requests::PinCluster;

/// A change to the application state.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// New request points arrived.
    ReceivePinClusters(Vec<PinCluster>),
    /// The map viewport came to rest.
    UpdateMapPosition(MapPosition),
    /// The user exported the map.
    TrackMapExport,
}

/// State shared between the map and the rest of the application.
#[derive(Clone, Debug, Default)]
pub struct Store {
    pin_clusters: Vec<PinCluster>,
    pins_revision: u64,
    position: Option<MapPosition>,
    exports: u32,
}

impl Store {
    /// Creates a store holding `pin_clusters`.
    pub fn new(pin_clusters: Vec<PinCluster>) -> Self {
        let mut store = Self::default();
        store.dispatch(Action::ReceivePinClusters(pin_clusters));
        store
    }

    /// Applies an action.
    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::ReceivePinClusters(pins) => {
                debug!("Store received {} pin clusters", pins.len());
                self.pin_clusters = pins;
                self.pins_revision += 1;
            }
            Action::UpdateMapPosition(position) => {
                self.position = Some(position);
            }
            Action::TrackMapExport => {
                self.exports += 1;
                info!("Map exported ({} so far)", self.exports);
            }
        }
    }

    /// The request points.
    pub fn pin_clusters(&self) -> &[PinCluster] {
        &self.pin_clusters
    }

    /// Increases every time the request points are replaced.
    pub fn pins_revision(&self) -> u64 {
        self.pins_revision
    }

    /// The last reported viewport.
    pub fn position(&self) -> Option<&MapPosition> {
        self.position.as_ref()
    }

    /// How many times the map was exported.
    pub fn exports(&self) -> u32 {
        self.exports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    fn pin(id: &str) -> PinCluster {
        PinCluster {
            srnumber: id.to_string(),
            requesttype: "Graffiti Removal".to_string(),
            latitude: 34.05,
            longitude: -118.25,
            count: None,
        }
    }

    #[test]
    fn new_store_holds_pins() {
        let store = Store::new(vec![pin("1"), pin("2")]);
        assert_eq!(store.pin_clusters().len(), 2);
        assert_eq!(store.pins_revision(), 1);
        assert!(store.position().is_none());
    }

    #[test]
    fn receiving_pins_bumps_revision() {
        let mut store = Store::default();
        assert_eq!(store.pins_revision(), 0);
        store.dispatch(Action::ReceivePinClusters(vec![pin("1")]));
        store.dispatch(Action::ReceivePinClusters(vec![]));
        assert_eq!(store.pins_revision(), 2);
        assert!(store.pin_clusters().is_empty());
    }

    #[test]
    fn position_and_exports() {
        let mut store = Store::default();
        let position = MapPosition {
            zoom: 11,
            bounds: BoundingBox::new(-118.67, 33.70, -118.15, 34.34),
        };
        store.dispatch(Action::UpdateMapPosition(position));
        store.dispatch(Action::TrackMapExport);
        store.dispatch(Action::TrackMapExport);

        assert_eq!(store.position(), Some(&position));
        assert_eq!(store.exports(), 2);
        assert_eq!(store.pins_revision(), 0);
    }
}
