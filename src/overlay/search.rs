use egui::{Align2, Context, Id, Rect};
use log::debug;

use crate::overlay::panel;
use crate::projection::GeoPos;

/// What the search box looks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SearchTab {
    /// A place, shown with the radius region.
    #[default]
    Address,
    /// A neighborhood council.
    Nc,
    /// A city council district.
    Cc,
}

impl SearchTab {
    /// All tabs in display order.
    pub const ALL: [SearchTab; 3] = [SearchTab::Address, SearchTab::Nc, SearchTab::Cc];

    /// The tab label.
    pub fn label(&self) -> &'static str {
        match self {
            SearchTab::Address => "Address",
            SearchTab::Nc => "Neighborhood",
            SearchTab::Cc => "Council District",
        }
    }
}

/// The kind of place a search result refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultKind {
    /// A neighborhood council, identified by its `nc_id`.
    Nc,
    /// A council district, identified by its name.
    Cc,
    /// A geographic position.
    Address,
}

/// A search result picked by the user.
#[derive(Clone, Debug, PartialEq)]
pub struct GeocoderResult {
    /// What the result refers to.
    pub kind: ResultKind,
    /// The region id for boundary results.
    pub id: String,
    /// The text shown for the result.
    pub place_name: String,
    /// The position of the result.
    pub center: GeoPos,
}

/// User interaction with the search panel.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchAction {
    /// A different tab was opened.
    ChangeTab(SearchTab),
    /// A result was picked.
    Result(GeocoderResult),
}

/// Parses `"lat, lon"` into a position.
pub fn parse_coordinates(query: &str) -> Option<GeoPos> {
    let (lat, lon) = query.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon))
        .then(|| GeoPos::new(lon, lat))
}

/// The search panel with one tab per kind of region.
#[derive(Debug, Default)]
pub struct MapSearch {
    tab: SearchTab,
    query: String,
}

impl MapSearch {
    /// The open tab.
    pub fn tab(&self) -> SearchTab {
        self.tab
    }

    /// The text in the search box.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Opens `tab` and clears the search box.
    pub fn select_tab(&mut self, tab: SearchTab) -> Option<SearchAction> {
        if tab == self.tab {
            return None;
        }
        debug!("Search tab changed to {:?}", tab);
        self.tab = tab;
        self.query.clear();
        Some(SearchAction::ChangeTab(tab))
    }

    /// Renders the panel in the top right corner of `rect`. `results` are the matches for the
    /// current query and tab.
    pub fn show(
        &mut self,
        ctx: &Context,
        id: Id,
        rect: Rect,
        results: &[GeocoderResult],
    ) -> Vec<SearchAction> {
        panel(ctx, id, rect, Align2::RIGHT_TOP, |ui| {
            let mut actions = Vec::new();
            ui.set_width(260.0);

            ui.horizontal(|ui| {
                for tab in SearchTab::ALL {
                    if ui.selectable_label(self.tab == tab, tab.label()).clicked() {
                        actions.extend(self.select_tab(tab));
                    }
                }
            });

            let hint = match self.tab {
                SearchTab::Address => "lat, lon",
                SearchTab::Nc | SearchTab::Cc => "Name",
            };
            ui.add(egui::TextEdit::singleline(&mut self.query).hint_text(hint));

            if self.query.trim().is_empty() {
                return actions;
            }

            egui::ScrollArea::vertical()
                .max_height(200.0)
                .show(ui, |ui| {
                    if results.is_empty() {
                        ui.weak("No results");
                    }
                    for result in results {
                        if ui.selectable_label(false, &result.place_name).clicked() {
                            actions.push(SearchAction::Result(result.clone()));
                        }
                    }
                });

            if actions.iter().any(|a| matches!(a, SearchAction::Result(_))) {
                self.query.clear();
            }
            actions
        })
    }
}
