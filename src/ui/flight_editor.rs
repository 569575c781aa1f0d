use egui::{Color32, Context, RichText, Window};

use fleet_timeline::engine::EditSession;

use crate::ui::theme;

/// What the edit dialog asks the app to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    None,
    Save,
    Cancel,
}

/// Render the "Edit Flight" dialog over an open edit session. The key of the
/// flight is shown but not editable; every other source column gets a text
/// field.
pub fn show_flight_editor(
    session: &mut EditSession,
    error: Option<&str>,
    ctx: &Context,
) -> EditorAction {
    let mut action = EditorAction::None;

    Window::new(
        RichText::new(format!(
            "{}  Edit Flight {}",
            egui_phosphor::regular::PENCIL_SIMPLE,
            session.id.key
        ))
        .strong()
        .size(14.0),
    )
    .id(egui::Id::new("flight_editor"))
    .resizable(false)
    .collapsible(false)
    .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
    .fixed_size([360.0, 0.0])
    .show(ctx, |ui| {
        ui.visuals_mut().faint_bg_color = Color32::TRANSPARENT;
        ui.add_space(4.0);

        egui::ScrollArea::vertical()
            .max_height(420.0)
            .show(ui, |ui| {
                egui::Grid::new("flight_editor_grid")
                    .num_columns(2)
                    .striped(false)
                    .spacing([12.0, 6.0])
                    .show(ui, |ui| {
                        for (name, value) in session.fields.iter_mut() {
                            ui.label(
                                RichText::new(name.as_str())
                                    .size(11.0)
                                    .color(theme::TEXT_SECONDARY)
                                    .strong(),
                            );
                            ui.add_sized(
                                [200.0, 22.0],
                                egui::TextEdit::singleline(value)
                                    .font(egui::FontId::proportional(12.0))
                                    .text_color(theme::TEXT_PRIMARY),
                            );
                            ui.end_row();
                        }
                    });
            });

        if let Some(error) = error {
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
            let save_btn = egui::Button::new(RichText::new("Save").color(Color32::WHITE))
                .fill(theme::ACCENT)
                .rounding(egui::Rounding::same(4.0));
            if ui.add_sized([80.0, 28.0], save_btn).clicked() {
                action = EditorAction::Save;
            }
            if ui.add_sized([80.0, 28.0], egui::Button::new("Cancel")).clicked() {
                action = EditorAction::Cancel;
            }
        });
        ui.add_space(2.0);
    });

    if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        action = EditorAction::Cancel;
    }
    action
}
