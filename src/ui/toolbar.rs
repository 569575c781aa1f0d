use egui::{menu, RichText, Ui};
use egui_phosphor::regular as icons;

use crate::app::{FleetApp, RemoteJob};
use crate::ui::theme;

/// Render the top toolbar / menu bar.
pub fn show_toolbar(app: &mut FleetApp, ui: &mut Ui) {
    menu::bar(ui, |ui| {
        ui.menu_button(RichText::new("  File  ").font(theme::font_menu()), |ui| {
            if ui.button(format!("{}  Import CSV...", icons::FILE_ARROW_UP)).clicked() {
                app.import_csv();
                ui.close_menu();
            }
            if ui.button(format!("{}  Export CSV...", icons::FILE_ARROW_DOWN)).clicked() {
                app.export_csv();
                ui.close_menu();
            }
            ui.separator();
            if ui.button(format!("{}  Restore Original", icons::ARROW_COUNTER_CLOCKWISE)).clicked() {
                app.restore_original();
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  View  ").font(theme::font_menu()), |ui| {
            if ui.button("  Zoom In        Ctrl+Scroll ↑").clicked() {
                app.viewport.zoom_in();
                ui.close_menu();
            }
            if ui.button("  Zoom Out      Ctrl+Scroll ↓").clicked() {
                app.viewport.zoom_out();
                ui.close_menu();
            }
            ui.separator();
            if ui.checkbox(&mut app.only_overlaps, "Only overlapping flights").clicked() {
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  Help  ").font(theme::font_menu()), |ui| {
            if ui.button("About").clicked() {
                app.show_about = true;
                ui.close_menu();
            }
        });

        ui.separator();

        // Data file picker
        let mut picked = None;
        egui::ComboBox::from_id_salt("data_file_combo")
            .selected_text(
                RichText::new(format!("{} {}", icons::DATABASE, app.settings.active_file)).size(12.0),
            )
            .show_ui(ui, |ui| {
                for file in &app.settings.data_files {
                    let selected = *file == app.settings.active_file;
                    if ui.selectable_label(selected, file).clicked() {
                        picked = Some(file.clone());
                    }
                }
            });
        if let Some(file) = picked {
            app.select_file(file);
        }

        let loaded = !app.coordinator.store().is_empty();
        let idle = !app.is_busy();

        let upload = ui
            .add_enabled(
                loaded && idle,
                egui::Button::new(format!("{} Upload", icons::CLOUD_ARROW_UP)),
            )
            .on_hover_text("Send the modified schedule to the solver server");
        if upload.clicked() {
            app.spawn(RemoteJob::Upload);
        }

        if ui
            .button(format!("{} Disruption", icons::LIGHTNING))
            .on_hover_text("Describe a disruption scenario")
            .clicked()
        {
            app.show_disruption = true;
        }

        if app.is_calculating() {
            if ui.button(format!("{} Stop", icons::STOP_CIRCLE)).clicked() {
                app.cancel_calculation();
            }
        } else if ui
            .add_enabled(loaded, egui::Button::new(format!("{} Solve", icons::PLAY)))
            .clicked()
        {
            app.spawn(RemoteJob::Calculate);
        }

        if ui
            .add_enabled(
                loaded && idle,
                egui::Button::new(format!("{} Solution", icons::DOWNLOAD_SIMPLE)),
            )
            .on_hover_text("Show the last solved schedule on the original rows")
            .clicked()
        {
            app.spawn(RemoteJob::Solution);
        }

        if ui
            .add_enabled(
                loaded,
                egui::Button::new(format!("{} Restore", icons::ARROW_COUNTER_CLOCKWISE)),
            )
            .on_hover_text("Discard every change")
            .clicked()
        {
            app.restore_original();
        }

        // Right-aligned unsaved marker
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if app.coordinator.unsaved() {
                ui.label(
                    RichText::new(format!("{} not uploaded", icons::CIRCLE))
                        .size(11.0)
                        .color(theme::ERROR),
                );
            }
            if app.is_busy() {
                ui.spinner();
            }
        });
    });
}

/// Render the status bar: last message on the left, counts on the right.
pub fn show_status_bar(app: &FleetApp, ui: &mut Ui) {
    ui.horizontal_centered(|ui| {
        ui.label(
            RichText::new(&app.status_message)
                .size(11.0)
                .color(theme::TEXT_SECONDARY),
        );
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let timeline = app.coordinator.timeline();
            let conflicts = timeline.all_markers().count();
            ui.label(
                RichText::new(format!("Overlaps: {}", conflicts))
                    .size(10.5)
                    .color(if conflicts > 0 { theme::ERROR } else { theme::TEXT_DIM }),
            );
            ui.label(RichText::new(" · ").size(10.5).color(theme::TEXT_DIM));
            ui.label(
                RichText::new(format!(
                    "Flights: {} · Aircraft: {}",
                    app.coordinator.store().len(),
                    app.coordinator.store().aircraft().len()
                ))
                .size(10.5)
                .color(theme::TEXT_DIM),
            );
            if let Some(status) = &app.calculation_status {
                ui.label(RichText::new(" · ").size(10.5).color(theme::TEXT_DIM));
                ui.label(
                    RichText::new(format!("Solver: {}", status))
                        .size(10.5)
                        .color(theme::ACCENT),
                );
            }
        });
    });
}
