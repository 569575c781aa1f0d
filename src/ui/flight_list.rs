use egui::{RichText, Ui};
use egui_extras::{Column, TableBuilder};

use fleet_timeline::engine::{ItemId, Timeline, TimelineItem};
use fleet_timeline::model::Track;

use crate::ui::theme;

/// Actions that the flight list can request.
pub enum FlightListAction {
    None,
    Select(ItemId),
    Edit(ItemId),
}

/// Render the left-side list of working-track flights.
pub fn show_flight_list(
    timeline: &Timeline,
    selected: Option<&ItemId>,
    only_overlaps: &mut bool,
    ui: &mut Ui,
) -> FlightListAction {
    let mut action = FlightListAction::None;

    let mut flights: Vec<&TimelineItem> = timeline
        .items()
        .filter(|item| item.id.track == Track::Modified)
        .collect();
    let total = flights.len();
    let conflicts = flights.iter().filter(|item| item.overlap).count();
    if *only_overlaps {
        flights.retain(|item| item.overlap);
    }
    flights.sort_by(|a, b| (a.group, a.start).cmp(&(b.group, b.start)));

    // Header area
    ui.add_space(2.0);
    ui.horizontal(|ui| {
        ui.label(
            RichText::new("Flights")
                .strong()
                .size(15.0)
                .color(theme::TEXT_PRIMARY),
        );
        ui.add_space(4.0);
        ui.label(
            RichText::new(format!("({})", total))
                .size(11.0)
                .color(theme::TEXT_DIM),
        );
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let badge = if conflicts > 0 { theme::ERROR } else { theme::SUCCESS };
            ui.label(
                RichText::new(format!("{} {}", egui_phosphor::regular::WARNING, conflicts))
                    .size(11.0)
                    .color(badge),
            )
            .on_hover_text("Flights overlapping another flight on the same aircraft");
        });
    });
    ui.add_space(2.0);
    ui.checkbox(only_overlaps, RichText::new("Only overlapping").size(11.0));
    ui.add_space(4.0);
    ui.separator();

    let text_height = egui::TextStyle::Body.resolve(ui.style()).size + 6.0;
    TableBuilder::new(ui)
        .striped(true)
        .resizable(false)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .column(Column::exact(18.0))
        .column(Column::initial(80.0).at_least(60.0))
        .column(Column::exact(32.0))
        .column(Column::initial(110.0).at_least(80.0))
        .column(Column::remainder())
        .header(18.0, |mut header| {
            for title in ["", "FLIGHT", "AC", "ROUTE", "TIME"] {
                header.col(|ui| {
                    ui.label(RichText::new(title).size(9.0).color(theme::TEXT_DIM).strong());
                });
            }
        })
        .body(|body| {
            body.rows(text_height, flights.len(), |mut row| {
                let item = flights[row.index()];
                let is_selected = selected == Some(&item.id);
                row.set_selected(is_selected);

                row.col(|ui| {
                    if item.overlap {
                        ui.label(
                            RichText::new(egui_phosphor::regular::WARNING_CIRCLE)
                                .color(theme::ERROR),
                        )
                        .on_hover_text("Overlaps another flight");
                    } else {
                        let (dot, _) =
                            ui.allocate_exact_size(egui::vec2(6.0, 6.0), egui::Sense::hover());
                        ui.painter().circle_filled(
                            dot.center(),
                            3.0,
                            theme::flight_color(item.card.hue, 1.0),
                        );
                    }
                });
                row.col(|ui| {
                    let label = ui.selectable_label(
                        is_selected,
                        RichText::new(item.id.key.to_string()).size(12.0),
                    );
                    if label.double_clicked() {
                        action = FlightListAction::Edit(item.id.clone());
                    } else if label.clicked() {
                        action = FlightListAction::Select(item.id.clone());
                    }
                });
                row.col(|ui| {
                    ui.label(
                        RichText::new(item.group.aircraft.to_string())
                            .size(11.0)
                            .color(theme::TEXT_SECONDARY),
                    );
                });
                row.col(|ui| {
                    ui.label(
                        RichText::new(format!("{} → {}", item.card.origin, item.card.destination))
                            .size(11.0)
                            .color(theme::TEXT_SECONDARY),
                    );
                });
                row.col(|ui| {
                    ui.label(
                        RichText::new(format!("{}-{}", item.card.departure, item.card.arrival))
                            .size(10.0)
                            .monospace()
                            .color(theme::TEXT_SECONDARY),
                    );
                });
            });
        });

    action
}
