use egui::{Color32, Context, RichText, Ui, Window};

use fleet_timeline::model::DisruptionKind;

use crate::app::FleetApp;
use crate::ui::theme;

/// Render the "Disruption" dialog. The form keeps its text between openings.
pub fn show_disruption_dialog(app: &mut FleetApp, ctx: &Context) {
    let mut should_close = false;
    let mut should_submit = false;
    Window::new(
        RichText::new(format!(
            "{}  Disruption",
            egui_phosphor::regular::LIGHTNING
        ))
        .strong()
        .size(14.0),
    )
    .resizable(false)
    .collapsible(false)
    .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
    .fixed_size([340.0, 0.0])
    .show(ctx, |ui| {
        ui.visuals_mut().faint_bg_color = Color32::TRANSPARENT;
        ui.visuals_mut().striped = false;

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            for kind in DisruptionKind::all() {
                ui.radio_value(&mut app.disruption.kind, *kind, kind_title(*kind));
            }
        });
        ui.add_space(6.0);

        let form = &mut app.disruption;
        egui::Grid::new("disruption_grid")
            .num_columns(2)
            .striped(false)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                let index_label = match form.kind {
                    DisruptionKind::Flight => "Flight",
                    DisruptionKind::Aircraft => "Aircraft",
                    DisruptionKind::Airport => "Airport",
                };
                ui.label(RichText::new(index_label).color(theme::TEXT_SECONDARY));
                ui.add_sized(
                    [180.0, 24.0],
                    egui::TextEdit::singleline(&mut form.index).hint_text(match form.kind {
                        DisruptionKind::Airport => "e.g. PEK",
                        _ => "number",
                    }),
                );
                ui.end_row();

                ui.label(RichText::new("Time").color(theme::TEXT_SECONDARY));
                ui.add_sized(
                    [180.0, 24.0],
                    egui::TextEdit::singleline(&mut form.time).hint_text("minutes"),
                );
                ui.end_row();

                match form.kind {
                    DisruptionKind::Flight => {
                        ui.label(RichText::new("Delay").color(theme::TEXT_SECONDARY));
                        ui.add_sized(
                            [180.0, 24.0],
                            egui::TextEdit::singleline(&mut form.magnitude).hint_text("minutes"),
                        );
                        ui.end_row();
                    }
                    DisruptionKind::Aircraft => {}
                    DisruptionKind::Airport => {
                        ui.label(RichText::new("Closed").color(theme::TEXT_SECONDARY));
                        ui.horizontal(|ui| {
                            ui.add_sized(
                                [70.0, 24.0],
                                egui::TextEdit::singleline(&mut form.window_from)
                                    .hint_text("HHMM"),
                            );
                            ui.label("–");
                            ui.add_sized(
                                [70.0, 24.0],
                                egui::TextEdit::singleline(&mut form.window_to).hint_text("HHMM"),
                            );
                        });
                        ui.end_row();
                    }
                }
            });

        if let Some(error) = &app.disruption_error {
            ui.add_space(6.0);
            ui.colored_label(
                theme::ERROR,
                format!("{} {}", egui_phosphor::regular::WARNING, error),
            );
        }

        ui.add_space(6.0);
        ui.separator();
        ui.add_space(4.0);

        ui.horizontal(|ui| {
            let submit_btn = egui::Button::new(RichText::new("Submit").color(Color32::WHITE))
                .fill(theme::ACCENT)
                .rounding(egui::Rounding::same(4.0));
            if ui.add_sized([80.0, 28.0], submit_btn).clicked() {
                should_submit = true;
            }
            if ui.add_sized([80.0, 28.0], egui::Button::new("Cancel")).clicked() {
                should_close = true;
            }
        });
        ui.add_space(2.0);
    });

    if should_submit {
        app.submit_disruption();
    }
    if should_close || ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        app.show_disruption = false;
        app.disruption_error = None;
    }
}

fn kind_title(kind: DisruptionKind) -> &'static str {
    match kind {
        DisruptionKind::Flight => "Flight delay",
        DisruptionKind::Aircraft => "Aircraft down",
        DisruptionKind::Airport => "Airport closure",
    }
}

/// Render the "About" dialog.
pub fn show_about_dialog(app: &mut FleetApp, ctx: &Context) {
    let mut should_close = false;
    Window::new("About")
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size([320.0, 200.0])
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(12.0);
                ui.heading(RichText::new("Fleet Timeline").strong());
                ui.add_space(2.0);
                ui.label(
                    RichText::new(format!("Version {}", env!("CARGO_PKG_VERSION")))
                        .color(theme::TEXT_SECONDARY),
                );
                ui.add_space(10.0);
                ui.label("Flight schedule timeline with overlap checks,");
                ui.label("built with Rust and egui.");
                ui.add_space(4.0);
                ui.label(
                    RichText::new(format!("Server: {}", app.settings.server_url))
                        .size(10.5)
                        .color(theme::TEXT_DIM),
                );
                ui.add_space(14.0);
                if ui.add_sized([100.0, 28.0], egui::Button::new("Close")).clicked() {
                    should_close = true;
                }
            });
        });
    if should_close || ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        app.show_about = false;
    }
}

/// Strip shown under the toolbar after a failed server call.
pub fn show_retry_panel(app: &mut FleetApp, ui: &mut Ui) {
    let Some(failure) = app.failure.clone() else {
        return;
    };
    let mut retry = false;
    let mut dismiss = false;
    ui.horizontal(|ui| {
        ui.label(
            RichText::new(format!(
                "{}  {} failed: {}",
                egui_phosphor::regular::WARNING_CIRCLE,
                failure.job.label(),
                failure.message
            ))
            .color(theme::ERROR),
        );
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.small_button("Dismiss").clicked() {
                dismiss = true;
            }
            if ui
                .small_button(format!("{} Retry", egui_phosphor::regular::ARROW_CLOCKWISE))
                .clicked()
            {
                retry = true;
            }
        });
    });
    if retry {
        app.retry();
    } else if dismiss {
        app.failure = None;
    }
}
