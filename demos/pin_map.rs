#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release
#![allow(rustdoc::missing_crate_level_docs)] // it's an example

use eframe::egui;
use log::error;
use pin_map::{
    PinMap,
    config::CartoDarkConfig,
    geometry::feature_collection_from_str,
    requests::load_pin_clusters,
    store::{Action, Store},
};

const NC_BOUNDARIES: &str = include_str!("../data/nc-boundary-2019.json");
const CC_BOUNDARIES: &str = include_str!("../data/la-city-council-districts-2012.json");
const OPEN_REQUESTS: &str = include_str!("../data/open_requests.json");

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };

    eframe::run_native(
        "311 service requests",
        options,
        Box::new(|_cc| {
            let app = MyApp::new().map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
            Ok(Box::new(app))
        }),
    )
}

struct MyApp {
    pin_map: PinMap,
    store: Store,
}

impl MyApp {
    fn new() -> Result<Self, pin_map::MapError> {
        let nc = feature_collection_from_str(NC_BOUNDARIES)?;
        let cc = feature_collection_from_str(CC_BOUNDARIES)?;
        let pins = load_pin_clusters(OPEN_REQUESTS)?;

        Ok(Self {
            pin_map: PinMap::new(CartoDarkConfig::default(), &nc, &cc)?,
            store: Store::new(pins),
        })
    }

    fn open_requests(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Requests", &["json"])
            .pick_file()
        else {
            return;
        };

        let pins = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| load_pin_clusters(&json).map_err(|e| e.to_string()));
        match pins {
            Ok(pins) => self.store.dispatch(Action::ReceivePinClusters(pins)),
            Err(e) => error!("Failed to load requests from {}: {}", path.display(), e),
        }
    }
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Open requests…").clicked() {
                    self.open_requests();
                }
                ui.label(format!("{} requests", self.store.pin_clusters().len()));
                ui.label(format!("{} exports", self.store.exports()));
            });
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                for action in self.pin_map.show(ui, &self.store) {
                    self.store.dispatch(action);
                }
            });
    }
}
