//! The map container: owns the map, mounts the layers once the map loads, turns user actions into
//! layer updates and derives the per-category counts of the active region.

use egui::{Context, Id, Rect, Ui};
use geojson::FeatureCollection;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::{Receiver, Sender, channel};

use crate::config::MapConfig;
use crate::filter::{FeatureFilter, tally, within};
use crate::geometry::{BoundingBox, RegionGeometry};
use crate::layers::RegionSelection;
use crate::layers::address::{self, AddressLayer};
use crate::layers::boundary::BoundaryLayer;
use crate::layers::requests::{RequestsLayer, RequestsMode};
use crate::overlay::search::parse_coordinates;
use crate::overlay::{
    GeocoderResult, LayersAction, MapLayers, MapMeta, MapOverview, MapSearch, MetaAction,
    ResultKind, SearchAction, SearchTab,
};
use crate::projection::Padding;
use crate::requests::{RequestType, convert_requests};
use crate::store::{Action, Store};
use crate::{Map, MapError, MapEvent};

/// The region name shown while no region is selected.
pub const INITIAL_REGION_NAME: &str = "All of Los Angeles";

/// The padding used when fitting the initial bounds.
pub const INITIAL_PADDING: Padding = Padding::same(50.0);

/// The key of the requests layer.
pub const REQUESTS_LAYER: &str = "requests";
/// The key of the address layer.
pub const ADDRESS_LAYER: &str = "address";
/// The key of the neighborhood council layer.
pub const NC_LAYER: &str = "nc";
/// The key of the council district layer.
pub const CC_LAYER: &str = "cc";

const MAX_SEARCH_RESULTS: usize = 10;

/// The lifecycle of the container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MapStatus {
    /// The map has not been shown yet.
    #[default]
    Uninitialized,
    /// The map is loading its first view.
    Loading,
    /// The first view is complete and the overlays are shown.
    Ready,
}

/// What moves the container through its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// The map was attached to the UI.
    Mount,
    /// The map became idle.
    Idle,
}

impl MapStatus {
    /// The status after `transition`. Transitions that do not apply leave the status unchanged.
    pub fn next(self, transition: Lifecycle) -> MapStatus {
        match (self, transition) {
            (MapStatus::Uninitialized, Lifecycle::Mount) => MapStatus::Loading,
            (MapStatus::Loading, Lifecycle::Idle) => MapStatus::Ready,
            (status, _) => status,
        }
    }
}

/// Boundary layers waiting for the map to load.
struct PendingLayers {
    nc: BoundaryLayer,
    cc: BoundaryLayer,
}

/// The service request map.
pub struct PinMap {
    map: Map,
    status: MapStatus,
    requests: FeatureCollection,
    pins_revision: Option<u64>,
    mode: RequestsMode,
    selected_types: BTreeSet<RequestType>,
    region_name: String,
    filter_polygon: Option<RegionGeometry>,
    initial_bounds: Option<BoundingBox>,
    pending: Option<PendingLayers>,
    selections_tx: Sender<RegionSelection>,
    selections: Receiver<RegionSelection>,
    search: MapSearch,
    outbox: Vec<Action>,
}

impl PinMap {
    /// Creates the container. The initial view is the extent of `nc_boundaries`.
    ///
    /// # Errors
    ///
    /// Fails if a boundary feature lacks its identifier or has no polygonal geometry.
    pub fn new<C: MapConfig + 'static>(
        config: C,
        nc_boundaries: &FeatureCollection,
        cc_boundaries: &FeatureCollection,
    ) -> Result<Self, MapError> {
        let (selections_tx, selections) = channel();
        let nc = BoundaryLayer::new(NC_LAYER, nc_boundaries, "nc_id", selections_tx.clone())?;
        let cc = BoundaryLayer::new(CC_LAYER, cc_boundaries, "name", selections_tx.clone())?;
        let initial_bounds = nc.extent();

        Ok(Self {
            map: Map::new(config),
            status: MapStatus::Uninitialized,
            requests: convert_requests(&[]),
            pins_revision: None,
            mode: RequestsMode::default(),
            selected_types: RequestType::ALL.into_iter().collect(),
            region_name: INITIAL_REGION_NAME.to_string(),
            filter_polygon: None,
            initial_bounds,
            pending: Some(PendingLayers { nc, cc }),
            selections_tx,
            selections,
            search: MapSearch::default(),
            outbox: Vec::new(),
        })
    }

    /// The lifecycle status.
    pub fn status(&self) -> MapStatus {
        self.status
    }

    /// The map widget.
    pub fn map(&self) -> &Map {
        &self.map
    }

    /// The name of the active region.
    pub fn region_name(&self) -> &str {
        &self.region_name
    }

    /// The area requests are counted in, if any.
    pub fn filter_polygon(&self) -> Option<&RegionGeometry> {
        self.filter_polygon.as_ref()
    }

    /// The shown categories.
    pub fn selected_types(&self) -> &BTreeSet<RequestType> {
        &self.selected_types
    }

    /// The rendering of the requests.
    pub fn requests_mode(&self) -> RequestsMode {
        self.mode
    }

    /// The requests as features.
    pub fn requests(&self) -> &FeatureCollection {
        &self.requests
    }

    /// The extent shown on start and by [`PinMap::zoom_out`].
    pub fn initial_bounds(&self) -> Option<BoundingBox> {
        self.initial_bounds
    }

    /// Shows the map and, once it is ready, the overlays. Returns the actions to dispatch on the
    /// store.
    pub fn show(&mut self, ui: &mut Ui, store: &Store) -> Vec<Action> {
        self.prepare(store);
        let rect = ui.add(&mut self.map).rect;
        self.update();

        if self.status == MapStatus::Ready {
            self.show_overlays(ui.ctx(), ui.id().with("pin_map"), rect, store);
        }

        std::mem::take(&mut self.outbox)
    }

    /// Mounts the map on the first frame and picks up new request data.
    fn prepare(&mut self, store: &Store) {
        if self.status == MapStatus::Uninitialized {
            self.zoom_out();
            self.status = self.status.next(Lifecycle::Mount);
            debug!("Map mounted");
        }
        self.sync_requests(store);
    }

    /// Handles the map events and region selections raised during the frame.
    fn update(&mut self) {
        for event in self.map.take_events() {
            self.on_map_event(event);
        }
        while let Ok(selection) = self.selections.try_recv() {
            self.on_select_region(selection);
        }
    }

    fn sync_requests(&mut self, store: &Store) {
        let revision = store.pins_revision();
        if self.pins_revision == Some(revision) {
            return;
        }
        self.pins_revision = Some(revision);
        self.requests = convert_requests(store.pin_clusters());
        debug!("Converted {} requests", self.requests.features.len());

        if let Some(layer) = self.map.layer_mut::<RequestsLayer>(REQUESTS_LAYER) {
            layer.set_data(self.requests.clone());
        }
    }

    fn on_map_event(&mut self, event: MapEvent) {
        match event {
            MapEvent::Load => self.mount_layers(),
            // Viewport changes are only reported once the layers are in place.
            MapEvent::MoveEnd if self.pending.is_none() => self.update_position(),
            MapEvent::MoveEnd => {}
            MapEvent::Idle => {
                if self.status == MapStatus::Loading && self.pending.is_none() {
                    self.update_position();
                    self.status = self.status.next(Lifecycle::Idle);
                    debug!("Map ready");
                }
            }
        }
    }

    fn mount_layers(&mut self) {
        let Some(PendingLayers { mut nc, mut cc }) = self.pending.take() else {
            return;
        };

        let mut requests = RequestsLayer::new(self.requests.clone());
        requests.set_filter(FeatureFilter::type_filter(&self.selected_types));
        requests.set_mode(self.mode);

        let mut address = AddressLayer::new(self.selections_tx.clone());
        let tab = self.search.tab();
        address.set_visibility(tab == SearchTab::Address);
        nc.set_visibility(tab == SearchTab::Nc);
        cc.set_visibility(tab == SearchTab::Cc);

        self.map.add_layer(REQUESTS_LAYER, requests);
        self.map.add_layer(ADDRESS_LAYER, address);
        self.map.add_layer(NC_LAYER, nc);
        self.map.add_layer(CC_LAYER, cc);
        debug!("Layers mounted: {:?}", self.map.layers().collect::<Vec<_>>());
    }

    fn update_position(&mut self) {
        if let Some(position) = self.map.position() {
            self.outbox.push(Action::UpdateMapPosition(position));
        }
    }

    fn on_select_region(&mut self, selection: RegionSelection) {
        debug!("Region selected: {:?}", selection.center());
        if let RegionSelection::Boundary { name, .. } = &selection {
            self.region_name = name.clone();
        }
        self.filter_polygon = Some(selection.geometry());
    }

    fn boundary_layer_mut(&mut self, kind: ResultKind) -> Option<&mut BoundaryLayer> {
        let key = match kind {
            ResultKind::Nc => NC_LAYER,
            ResultKind::Cc => CC_LAYER,
            ResultKind::Address => return None,
        };
        self.map.layer_mut::<BoundaryLayer>(key)
    }

    /// Zooms to a search result and names the active region after it. The region is selected the
    /// next time the map is idle.
    pub fn on_geocoder_result(&mut self, result: GeocoderResult) {
        self.region_name = result.place_name.clone();

        let (bounds, padding) = match result.kind {
            ResultKind::Nc | ResultKind::Cc => {
                let bounds = self
                    .boundary_layer_mut(result.kind)
                    .and_then(|layer| layer.zoom_to_region(&result.id));
                (bounds, INITIAL_PADDING)
            }
            ResultKind::Address => {
                let bounds = self
                    .map
                    .layer_mut::<AddressLayer>(ADDRESS_LAYER)
                    .and_then(|layer| layer.zoom_to(result.center));
                (bounds, address::FIT_BOUNDS_PADDING)
            }
        };

        match bounds {
            Some(bounds) => self.map.fit_bounds(bounds, padding),
            None => warn!("Nothing to zoom to for {:?}", result),
        }
    }

    /// Shows the layer belonging to `tab`, hides the others and zooms out.
    pub fn on_change_search_tab(&mut self, tab: SearchTab) {
        if let Some(layer) = self.map.layer_mut::<AddressLayer>(ADDRESS_LAYER) {
            layer.set_visibility(tab == SearchTab::Address);
        }
        if let Some(layer) = self.map.layer_mut::<BoundaryLayer>(NC_LAYER) {
            layer.set_visibility(tab == SearchTab::Nc);
        }
        if let Some(layer) = self.map.layer_mut::<BoundaryLayer>(CC_LAYER) {
            layer.set_visibility(tab == SearchTab::Cc);
        }
        self.zoom_out();
    }

    /// Shows only the requests of `selected_types`.
    pub fn on_change_selection(&mut self, selected_types: BTreeSet<RequestType>) {
        if let Some(layer) = self.map.layer_mut::<RequestsLayer>(REQUESTS_LAYER) {
            layer.set_filter(FeatureFilter::type_filter(&selected_types));
        }
        self.selected_types = selected_types;
    }

    /// Switches between circles and heatmap.
    pub fn set_requests_layer(&mut self, mode: RequestsMode) {
        if let Some(layer) = self.map.layer_mut::<RequestsLayer>(REQUESTS_LAYER) {
            layer.set_mode(mode);
        }
        self.mode = mode;
    }

    /// Counts the requests of each selected category inside the active region.
    pub fn selected_requests(&self) -> BTreeMap<RequestType, usize> {
        tally(
            within(&self.requests, self.filter_polygon.as_ref()),
            &self.selected_types,
        )
    }

    /// Fits the initial bounds.
    pub fn zoom_out(&mut self) {
        if let Some(bounds) = self.initial_bounds {
            self.map.fit_bounds(bounds, INITIAL_PADDING);
        }
    }

    /// Exports the map. Only the export is tracked for now.
    pub fn export(&mut self) {
        info!("Exporting map at {:?}", self.map.position());
        self.outbox.push(Action::TrackMapExport);
    }

    /// Clears the active region and zooms out.
    pub fn reset(&mut self) {
        debug!("Resetting map");
        self.filter_polygon = None;
        self.region_name = INITIAL_REGION_NAME.to_string();
        if let Some(layer) = self.map.layer_mut::<AddressLayer>(ADDRESS_LAYER) {
            layer.set_center(None);
        }
        for key in [NC_LAYER, CC_LAYER] {
            if let Some(layer) = self.map.layer_mut::<BoundaryLayer>(key) {
                layer.clear_selection();
            }
        }
        // Drop selections sent before the reset.
        while self.selections.try_recv().is_ok() {}
        self.zoom_out();
    }

    /// Search results for `query` in `tab`.
    pub fn geocode(&self, query: &str, tab: SearchTab) -> Vec<GeocoderResult> {
        let (key, kind) = match tab {
            SearchTab::Address => {
                return parse_coordinates(query)
                    .map(|center| GeocoderResult {
                        kind: ResultKind::Address,
                        id: String::new(),
                        place_name: format!("{:.5}, {:.5}", center.lat, center.lon),
                        center,
                    })
                    .into_iter()
                    .collect();
            }
            SearchTab::Nc => (NC_LAYER, ResultKind::Nc),
            SearchTab::Cc => (CC_LAYER, ResultKind::Cc),
        };

        let Some(layer) = self.map.layer::<BoundaryLayer>(key) else {
            return Vec::new();
        };
        layer
            .search(query)
            .into_iter()
            .take(MAX_SEARCH_RESULTS)
            .filter_map(|region| {
                Some(GeocoderResult {
                    kind,
                    id: region.id.clone(),
                    place_name: region.name.clone(),
                    center: region.bounding_box()?.center(),
                })
            })
            .collect()
    }

    fn show_overlays(&mut self, ctx: &Context, id: Id, rect: Rect, store: &Store) {
        let counts = self.selected_requests();
        MapOverview::new(&self.region_name, &counts).show(ctx, id.with("overview"), rect);

        let results = self.geocode(self.search.query(), self.search.tab());
        let search_actions = self.search.show(ctx, id.with("search"), rect, &results);
        for action in search_actions {
            match action {
                SearchAction::ChangeTab(tab) => self.on_change_search_tab(tab),
                SearchAction::Result(result) => self.on_geocoder_result(result),
            }
        }

        let layers_actions =
            MapLayers::new(&self.selected_types, self.mode).show(ctx, id.with("layers"), rect);
        for action in layers_actions {
            match action {
                LayersAction::ChangeSelection(types) => self.on_change_selection(types),
                LayersAction::SetRequestsLayer(mode) => self.set_requests_layer(mode),
            }
        }

        match MapMeta::new(store.position()).show(ctx, id.with("meta"), rect) {
            Some(MetaAction::Export) => self.export(),
            Some(MetaAction::Reset) => self.reset(),
            None => {}
        }
    }
}
