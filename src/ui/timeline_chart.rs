use chrono::{Duration, NaiveDateTime, Timelike};
use egui::{Color32, Id, Pos2, Rect, Rounding, Sense, Stroke, Ui, Vec2};

use fleet_timeline::engine::{GroupId, ItemId, MoveProposal, Timeline, TimelineItem};
use fleet_timeline::model::{TimelineScale, TimelineViewport};

use crate::ui::theme;

const ROW_HEIGHT: f32 = theme::ROW_HEIGHT;
const ROW_PADDING: f32 = theme::ROW_GAP;
const HEADER_HEIGHT: f32 = theme::HEADER_HEIGHT;
const LABEL_WIDTH: f32 = theme::LABEL_WIDTH;

#[derive(Debug, Clone)]
struct DragSnapshot {
    start_pointer: Pos2,
    /// Where the flight would land if released now.
    proposal: Option<MoveProposal>,
}

/// What the operator did in the chart this frame.
#[derive(Debug, Clone, Default)]
pub struct ChartInteraction {
    /// A drag that was released over a row.
    pub moved: Option<MoveProposal>,
    /// A double-click on a flight.
    pub edit: Option<ItemId>,
}

/// Render the timeline (central panel). Items are only read; drops and
/// edit requests are returned to the caller.
pub fn show_timeline_chart(
    timeline: &Timeline,
    viewport: &mut TimelineViewport,
    selected: &mut Option<ItemId>,
    snap_minutes: i64,
    ui: &mut Ui,
) -> ChartInteraction {
    let mut interaction = ChartInteraction::default();
    let available = ui.available_size();
    let groups = timeline.groups();
    let chart_width = (LABEL_WIDTH + viewport.total_width()).max(available.x);
    let chart_height = HEADER_HEIGHT + (groups.len() as f32 * (ROW_HEIGHT + ROW_PADDING)) + 40.0;

    // Handle zoom with scroll wheel
    let scroll_delta = ui.input(|i| i.smooth_scroll_delta);
    if ui.rect_contains_pointer(ui.max_rect()) && ui.input(|i| i.modifiers.ctrl) {
        if scroll_delta.y > 0.0 {
            viewport.zoom_in();
        } else if scroll_delta.y < 0.0 {
            viewport.zoom_out();
        }
    }

    egui::ScrollArea::both()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            let (response, painter) = ui.allocate_painter(
                Vec2::new(chart_width, chart_height.max(available.y)),
                Sense::click(),
            );
            let origin = response.rect.min;
            let timeline_origin = Pos2::new(origin.x + LABEL_WIDTH, origin.y);
            let mut consumed_click = false;

            painter.rect_filled(response.rect, 0.0, theme::BG_DARK);

            draw_timeline_header(&painter, timeline_origin, viewport, chart_width, chart_height);

            // Row backgrounds and labels
            for (i, group) in groups.iter().enumerate() {
                let y = row_top(origin, i);
                let row_bg = if group.id.is_shadow() {
                    theme::BG_SHADOW_ROW
                } else {
                    theme::BG_PANEL
                };
                painter.rect_filled(
                    Rect::from_min_size(
                        Pos2::new(origin.x, y),
                        Vec2::new(chart_width, ROW_HEIGHT + ROW_PADDING),
                    ),
                    0.0,
                    row_bg,
                );
                // Row bottom border
                let border = if group.id.is_shadow() { 1.0 } else { 0.5 };
                painter.line_segment(
                    [
                        Pos2::new(origin.x, y + ROW_HEIGHT + ROW_PADDING),
                        Pos2::new(origin.x + chart_width, y + ROW_HEIGHT + ROW_PADDING),
                    ],
                    Stroke::new(border, theme::BORDER_SUBTLE),
                );
                painter.text(
                    Pos2::new(origin.x + 6.0, y + ROW_HEIGHT / 2.0),
                    egui::Align2::LEFT_CENTER,
                    &group.label,
                    theme::font_header(),
                    if group.id.is_shadow() {
                        theme::TEXT_PRIMARY
                    } else {
                        theme::TEXT_SECONDARY
                    },
                );
            }

            // Overlap markers sit behind the bars
            for marker in timeline.all_markers() {
                let Some(row) = row_of(timeline, marker.group) else {
                    continue;
                };
                let y = row_top(origin, row);
                let rect = Rect::from_min_max(
                    Pos2::new(timeline_origin.x + viewport.time_to_x(marker.start), y),
                    Pos2::new(
                        timeline_origin.x + viewport.time_to_x(marker.end),
                        y + ROW_HEIGHT + ROW_PADDING,
                    ),
                );
                painter.rect_filled(rect, 0.0, theme::OVERLAP_MARKER);
                painter.rect_stroke(rect, 0.0, Stroke::new(1.0, theme::OVERLAP_MARKER_EDGE));
            }

            for item in timeline.items() {
                let Some(row) = row_of(timeline, item.group) else {
                    continue;
                };
                let y = row_top(origin, row) + ROW_PADDING;
                let is_selected = selected.as_ref() == Some(&item.id);
                let bar_rect = draw_flight_bar(&painter, timeline_origin, viewport, item, y, is_selected);

                let sense = if item.editable.can_move_time {
                    Sense::click_and_drag()
                } else {
                    Sense::click()
                };
                let bar_response = ui.interact(
                    bar_rect,
                    ui.make_persistent_id(("flight-bar", &item.id)),
                    sense,
                );

                if bar_response.clicked() {
                    *selected = Some(item.id.clone());
                    consumed_click = true;
                }
                if bar_response.double_clicked() && item.id.track.is_editable() {
                    interaction.edit = Some(item.id.clone());
                    consumed_click = true;
                }

                if bar_response.drag_started() {
                    let pointer = bar_response.interact_pointer_pos().unwrap_or(bar_rect.center());
                    ui.ctx().data_mut(|data| {
                        data.insert_temp(
                            drag_id(&item.id),
                            DragSnapshot {
                                start_pointer: pointer,
                                proposal: None,
                            },
                        );
                    });
                    *selected = Some(item.id.clone());
                    consumed_click = true;
                }

                if bar_response.dragged() {
                    ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
                    let pointer = bar_response.interact_pointer_pos();
                    let snapshot = ui
                        .ctx()
                        .data_mut(|data| data.get_temp::<DragSnapshot>(drag_id(&item.id)));
                    if let (Some(mut snapshot), Some(pointer)) = (snapshot, pointer) {
                        let proposal =
                            propose(timeline, item, viewport, origin, &snapshot, pointer, snap_minutes);
                        draw_ghost(&painter, timeline, timeline_origin, origin, viewport, item, &proposal);
                        snapshot.proposal = Some(proposal);
                        ui.ctx()
                            .data_mut(|data| data.insert_temp(drag_id(&item.id), snapshot));
                    }
                }

                if bar_response.drag_stopped() {
                    let snapshot = ui
                        .ctx()
                        .data_mut(|data| data.get_temp::<DragSnapshot>(drag_id(&item.id)));
                    ui.ctx().data_mut(|data| {
                        data.remove::<DragSnapshot>(drag_id(&item.id));
                    });
                    interaction.moved = snapshot.and_then(|s| s.proposal);
                }

                // Tooltip on hover
                if bar_response.hovered() && !bar_response.dragged() {
                    if item.editable.can_move_time {
                        ui.ctx().set_cursor_icon(egui::CursorIcon::Grab);
                    }
                    egui::show_tooltip_at_pointer(
                        ui.ctx(),
                        ui.layer_id(),
                        Id::new(("flight-tip", &item.id)),
                        |ui| {
                            ui.strong(format!("{} {}", item.card.kind, item.card.number));
                            ui.label(format!(
                                "{} {} → {} {}",
                                item.card.origin,
                                item.card.departure,
                                item.card.destination,
                                item.card.arrival
                            ));
                            ui.label(format!("Aircraft {} ({})", item.group.aircraft, item.id.track));
                            if item.overlap {
                                ui.colored_label(theme::ERROR, "Overlaps another flight");
                            }
                        },
                    );
                }
            }

            draw_scale_badge(&painter, timeline_origin);

            // Empty click on background clears selection
            if response.clicked() && !consumed_click {
                *selected = None;
            }
        });

    interaction
}

fn drag_id(item: &ItemId) -> Id {
    Id::new(("drag", item))
}

fn row_top(origin: Pos2, row: usize) -> f32 {
    origin.y + HEADER_HEIGHT + row as f32 * (ROW_HEIGHT + ROW_PADDING)
}

fn row_of(timeline: &Timeline, group: GroupId) -> Option<usize> {
    timeline.groups().iter().position(|g| g.id == group)
}

/// Row under a y coordinate, if any.
fn row_at(timeline: &Timeline, origin: Pos2, y: f32) -> Option<GroupId> {
    let offset = y - origin.y - HEADER_HEIGHT;
    if offset < 0.0 {
        return None;
    }
    let row = (offset / (ROW_HEIGHT + ROW_PADDING)) as usize;
    timeline.groups().get(row).map(|g| g.id)
}

/// Shift by the pointer travel, snapped to `snap_minutes`.
fn propose(
    timeline: &Timeline,
    item: &TimelineItem,
    viewport: &TimelineViewport,
    origin: Pos2,
    snapshot: &DragSnapshot,
    pointer: Pos2,
    snap_minutes: i64,
) -> MoveProposal {
    let minutes = viewport.delta_minutes(pointer.x - snapshot.start_pointer.x);
    let snap = snap_minutes.max(1);
    let minutes = (minutes as f64 / snap as f64).round() as i64 * snap;
    let group = if item.editable.can_move_group {
        row_at(timeline, origin, pointer.y).unwrap_or(item.group)
    } else {
        item.group
    };
    MoveProposal {
        id: item.id.clone(),
        group,
        start: item.start + Duration::minutes(minutes),
        end: item.end + Duration::minutes(minutes),
    }
}

fn draw_ghost(
    painter: &egui::Painter,
    timeline: &Timeline,
    timeline_origin: Pos2,
    origin: Pos2,
    viewport: &TimelineViewport,
    item: &TimelineItem,
    proposal: &MoveProposal,
) {
    let Some(row) = row_of(timeline, proposal.group) else {
        return;
    };
    let y = row_top(origin, row) + ROW_PADDING + theme::BAR_INSET;
    let rect = Rect::from_min_max(
        Pos2::new(timeline_origin.x + viewport.time_to_x(proposal.start), y),
        Pos2::new(
            timeline_origin.x + viewport.time_to_x(proposal.end),
            y + ROW_HEIGHT - theme::BAR_INSET * 2.0,
        ),
    );
    let allowed = proposal.group.is_shadow();
    let stroke = if allowed {
        theme::BORDER_ACCENT
    } else {
        theme::ERROR
    };
    painter.rect_filled(
        rect,
        Rounding::same(theme::BAR_ROUNDING),
        theme::flight_color(item.card.hue, 0.35),
    );
    painter.rect_stroke(rect, Rounding::same(theme::BAR_ROUNDING), Stroke::new(1.5, stroke));
    painter.text(
        Pos2::new(rect.left(), rect.top() - 2.0),
        egui::Align2::LEFT_BOTTOM,
        format!(
            "{} → {}",
            proposal.start.format("%H%M"),
            proposal.end.format("%H%M")
        ),
        theme::font_small(),
        stroke,
    );
}

fn draw_timeline_header(
    painter: &egui::Painter,
    origin: Pos2,
    viewport: &TimelineViewport,
    width: f32,
    height: f32,
) {
    // Background for header
    painter.rect_filled(
        Rect::from_min_size(Pos2::new(origin.x - LABEL_WIDTH, origin.y), Vec2::new(width, HEADER_HEIGHT)),
        0.0,
        theme::BG_HEADER,
    );

    // Bottom border of header
    painter.line_segment(
        [
            Pos2::new(origin.x - LABEL_WIDTH, origin.y + HEADER_HEIGHT),
            Pos2::new(origin.x - LABEL_WIDTH + width, origin.y + HEADER_HEIGHT),
        ],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );

    let step = viewport.scale.step();
    let mut at = align_down(viewport.start, viewport.scale);
    while at <= viewport.end {
        let x = origin.x + viewport.time_to_x(at);
        if x >= origin.x {
            painter.line_segment(
                [
                    Pos2::new(x, origin.y + HEADER_HEIGHT),
                    Pos2::new(x, origin.y + height),
                ],
                Stroke::new(0.5, theme::GRID_LINE),
            );

            let midnight = at.hour() == 0 && at.minute() == 0;
            match viewport.scale {
                TimelineScale::QuarterHours | TimelineScale::Hours => {
                    painter.text(
                        Pos2::new(x + 3.0, origin.y + 28.0),
                        egui::Align2::LEFT_CENTER,
                        at.format("%H:%M").to_string(),
                        theme::font_sub(),
                        theme::TEXT_SECONDARY,
                    );
                    if midnight {
                        painter.text(
                            Pos2::new(x + 3.0, origin.y + 12.0),
                            egui::Align2::LEFT_CENTER,
                            at.format("%d %b %Y").to_string(),
                            theme::font_header(),
                            theme::TEXT_PRIMARY,
                        );
                    }
                }
                TimelineScale::Days => {
                    painter.text(
                        Pos2::new(x + 5.0, origin.y + 18.0),
                        egui::Align2::LEFT_CENTER,
                        at.format("%d %b").to_string(),
                        theme::font_header(),
                        theme::TEXT_PRIMARY,
                    );
                }
            }
        }
        at += step;
    }
}

fn align_down(at: NaiveDateTime, scale: TimelineScale) -> NaiveDateTime {
    let day = at.date().and_hms_opt(0, 0, 0).unwrap_or(at);
    match scale {
        TimelineScale::Days => day,
        TimelineScale::Hours => day + Duration::hours(at.hour() as i64),
        TimelineScale::QuarterHours => {
            day + Duration::hours(at.hour() as i64) + Duration::minutes((at.minute() / 15 * 15) as i64)
        }
    }
}

fn draw_scale_badge(painter: &egui::Painter, origin: Pos2) {
    let text = "Drag flights on ✎ rows · Double-click to edit · Ctrl+Scroll to zoom";

    let galley = painter.layout_no_wrap(text.to_string(), theme::font_small(), theme::TEXT_DIM);
    let text_width = galley.size().x;

    let badge_rect = Rect::from_min_size(
        Pos2::new(origin.x + 8.0, origin.y + 2.0),
        Vec2::new(text_width + 16.0, 16.0),
    );
    painter.rect_filled(
        badge_rect,
        Rounding::same(8.0),
        Color32::from_rgba_premultiplied(20, 20, 28, 200),
    );
    painter.galley(
        Pos2::new(badge_rect.left() + 8.0, badge_rect.top()),
        galley,
        Color32::TRANSPARENT,
    );
}

fn draw_flight_bar(
    painter: &egui::Painter,
    origin: Pos2,
    viewport: &TimelineViewport,
    item: &TimelineItem,
    y: f32,
    is_selected: bool,
) -> Rect {
    let x_start = origin.x + viewport.time_to_x(item.start);
    let x_end = origin.x + viewport.time_to_x(item.end);
    let bar_width = (x_end - x_start).max(6.0);
    let inset = theme::BAR_INSET;

    let bar_rect = Rect::from_min_size(
        Pos2::new(x_start, y + inset),
        Vec2::new(bar_width, ROW_HEIGHT - inset * 2.0),
    );
    let rounding = Rounding::same(theme::BAR_ROUNDING);

    // Soft shadow
    let shadow_rect = bar_rect.translate(Vec2::new(1.0, 2.0));
    painter.rect_filled(shadow_rect, rounding, Color32::from_black_alpha(35));

    let fill = if item.overlap {
        theme::OVERLAP_FILL
    } else {
        theme::flight_color(item.card.hue, item.card.opacity)
    };
    painter.rect_filled(bar_rect, rounding, fill);

    if !item.id.track.is_editable() {
        // Frozen flights get a dashed-feel top edge
        painter.line_segment(
            [
                Pos2::new(bar_rect.left() + 2.0, bar_rect.top() + 1.0),
                Pos2::new(bar_rect.right() - 2.0, bar_rect.top() + 1.0),
            ],
            Stroke::new(1.0, Color32::from_white_alpha(60)),
        );
    }

    // Selection glow
    if is_selected {
        painter.rect_stroke(
            bar_rect.expand(1.5),
            Rounding::same(theme::BAR_ROUNDING + 1.5),
            Stroke::new(2.0, theme::BORDER_ACCENT),
        );
    }

    // Two-line card, clipped to bar bounds
    if bar_width > 30.0 {
        let clipped = painter.with_clip_rect(bar_rect);
        let text_color = if item.overlap {
            Color32::BLACK
        } else {
            theme::TEXT_ON_BAR
        };
        clipped.text(
            Pos2::new(bar_rect.left() + 5.0, bar_rect.top() + 2.0),
            egui::Align2::LEFT_TOP,
            format!("{} {}", item.card.kind, item.card.number),
            theme::font_bar(),
            text_color,
        );
        clipped.text(
            Pos2::new(bar_rect.left() + 5.0, bar_rect.bottom() - 2.0),
            egui::Align2::LEFT_BOTTOM,
            format!(
                "{} {} → {} {}",
                item.card.origin, item.card.departure, item.card.destination, item.card.arrival
            ),
            theme::font_small(),
            text_color,
        );
    }

    bar_rect
}
