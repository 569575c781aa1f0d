use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;

use chrono::Duration;

use fleet_timeline::config::{AppPaths, Settings, SERVER_ENV};
use fleet_timeline::engine::{EditSession, EditVeto, ItemId, MoveOutcome, MutationCoordinator};
use fleet_timeline::error::RemoteError;
use fleet_timeline::io::csv_export::export_csv;
use fleet_timeline::io::csv_import::import_csv;
use fleet_timeline::io::{JsonSnapshotFile, SolverClient, SolverEvent};
use fleet_timeline::model::{
    Disruption, DisruptionForm, FlightRecord, SourceTable, TimelineViewport, Track,
};

use crate::ui;

/// A call to the solver server. Failed jobs can be retried from the UI.
#[derive(Debug, Clone)]
pub enum RemoteJob {
    Fetch(String),
    Upload,
    Disruption(Disruption),
    Calculate,
    Solution,
}

impl RemoteJob {
    pub fn label(&self) -> &'static str {
        match self {
            RemoteJob::Fetch(_) => "Loading schedule",
            RemoteJob::Upload => "Uploading changes",
            RemoteJob::Disruption(_) => "Submitting disruption",
            RemoteJob::Calculate => "Calculation",
            RemoteJob::Solution => "Loading solution",
        }
    }
}

/// A remote job that failed, shown with a retry button.
#[derive(Debug, Clone)]
pub struct RemoteFailure {
    pub job: RemoteJob,
    pub message: String,
}

/// Results sent back from worker threads.
enum RemoteReply {
    Schedule {
        file: String,
        result: Result<SourceTable, RemoteError>,
    },
    Uploaded(Result<String, RemoteError>),
    Disruption {
        disruption: Disruption,
        result: Result<String, RemoteError>,
    },
    Solution(Result<Vec<FlightRecord>, RemoteError>),
}

enum Progress {
    Event(SolverEvent),
    Finished(Result<bool, RemoteError>),
}

/// A running calculation. Dropping it stops listening.
struct Calculation {
    rx: Receiver<Progress>,
    cancel: Arc<AtomicBool>,
}

/// Main application state.
pub struct FleetApp {
    pub settings: Settings,
    pub paths: AppPaths,
    pub coordinator: MutationCoordinator<JsonSnapshotFile>,
    pub viewport: TimelineViewport,
    pub selected: Option<ItemId>,

    // Dialog state
    pub edit: Option<EditSession>,
    pub edit_error: Option<String>,
    pub disruption: DisruptionForm,
    pub disruption_error: Option<String>,
    pub show_disruption: bool,
    pub show_about: bool,
    pub only_overlaps: bool,

    // Status message
    pub status_message: String,
    /// Latest status reported by the solver.
    pub calculation_status: Option<String>,
    pub failure: Option<RemoteFailure>,
    /// Whether the working track differs from the loaded schedule.
    pub modified: bool,

    client: Option<SolverClient>,
    tx: Sender<RemoteReply>,
    rx: Receiver<RemoteReply>,
    pending: usize,
    calculation: Option<Calculation>,
}

impl FleetApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Register Phosphor icon font as a fallback so icons render inline with text
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);
        ui::theme::apply_theme(&cc.egui_ctx);

        let paths = AppPaths::discover();
        let settings =
            Settings::load_or_init(&paths.settings).with_server_override(std::env::var(SERVER_ENV).ok());
        Self::with_settings(settings, paths)
    }

    fn with_settings(settings: Settings, paths: AppPaths) -> Self {
        let sink = JsonSnapshotFile::new(&paths.snapshot);
        let cached = sink.load();
        let mut coordinator =
            MutationCoordinator::new(settings.columns.clone(), settings.codec(), sink);

        let start = settings.base_date;
        let end = start + Duration::minutes(settings.horizon_minutes.max(60));
        let (tx, rx) = mpsc::channel();

        let mut status_message = "Ready".to_string();
        let client = match SolverClient::new(&settings.server_url, settings.connect_timeout()) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::error!("could not create HTTP client: {}", e);
                status_message = format!("Solver server unavailable: {}", e);
                None
            }
        };

        let mut restored = false;
        if let Some(snapshot) = cached {
            match coordinator.restore(snapshot) {
                Ok(()) => {
                    restored = true;
                    status_message =
                        format!("Restored {} flights from the last session", coordinator.store().len());
                    tracing::info!(flights = coordinator.store().len(), "restored cached snapshot");
                }
                Err(e) => tracing::warn!("discarding cached snapshot: {}", e),
            }
        }
        let modified = restored && coordinator.store().has_modifications();

        let mut app = Self {
            settings,
            paths,
            coordinator,
            viewport: TimelineViewport::new(start, end),
            selected: None,
            edit: None,
            edit_error: None,
            disruption: DisruptionForm::default(),
            disruption_error: None,
            show_disruption: false,
            show_about: false,
            only_overlaps: false,
            status_message,
            calculation_status: None,
            failure: None,
            modified,
            client,
            tx,
            rx,
            pending: 0,
            calculation: None,
        };
        if !restored {
            let file = app.settings.active_file.clone();
            app.spawn(RemoteJob::Fetch(file));
        }
        app
    }

    pub fn is_busy(&self) -> bool {
        self.pending > 0
    }

    pub fn is_calculating(&self) -> bool {
        self.calculation.is_some()
    }

    // --- Remote jobs ---

    /// Run a job on a worker thread. The reply is picked up in `poll_remote`.
    pub fn spawn(&mut self, job: RemoteJob) {
        let Some(client) = self.client.clone() else {
            self.status_message = "No solver server configured".to_string();
            return;
        };
        self.failure = None;

        if let RemoteJob::Calculate = job {
            self.start_calculation(client);
            return;
        }

        let tx = self.tx.clone();
        match job {
            RemoteJob::Fetch(file) => {
                std::thread::spawn(move || {
                    let result = client.fetch_schedule(&file);
                    let _ = tx.send(RemoteReply::Schedule { file, result });
                });
            }
            RemoteJob::Upload => {
                let store = self.coordinator.store();
                let records = store.records(Track::Modified).to_vec();
                let order = store.export_order();
                let columns = store.columns().clone();
                let file = self.settings.active_file.clone();
                std::thread::spawn(move || {
                    let result = client.upload_modification(&file, &records, &order, &columns);
                    let _ = tx.send(RemoteReply::Uploaded(result));
                });
            }
            RemoteJob::Disruption(disruption) => {
                std::thread::spawn(move || {
                    let result = client.submit_disruption(&disruption);
                    let _ = tx.send(RemoteReply::Disruption { disruption, result });
                });
            }
            RemoteJob::Solution => {
                let columns = self.settings.columns.clone();
                std::thread::spawn(move || {
                    let result = client.fetch_solution(&columns);
                    let _ = tx.send(RemoteReply::Solution(result));
                });
            }
            RemoteJob::Calculate => {}
        }
        self.pending += 1;
    }

    fn start_calculation(&mut self, client: SolverClient) {
        self.cancel_calculation();
        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let file = self.settings.active_file.clone();
        let is_modified = self.modified;

        std::thread::spawn(move || {
            let result = client.start_calculation(&file, is_modified).and_then(|()| {
                client.stream_progress(&flag, |event| {
                    let _ = tx.send(Progress::Event(event));
                })
            });
            let _ = tx.send(Progress::Finished(result));
        });

        self.calculation = Some(Calculation { rx, cancel });
        self.calculation_status = Some("started".to_string());
        self.status_message = format!("Calculating {}…", self.settings.active_file);
    }

    /// Stop listening to a running calculation.
    pub fn cancel_calculation(&mut self) {
        if let Some(calculation) = self.calculation.take() {
            calculation.cancel.store(true, Ordering::Relaxed);
            self.calculation_status = Some("cancelled".to_string());
            self.status_message = "Stopped following the calculation".to_string();
        }
    }

    /// Drain worker replies. Called once per frame.
    fn poll_remote(&mut self) {
        while let Ok(reply) = self.rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            self.handle_reply(reply);
        }

        let mut finished = None;
        if let Some(calculation) = &self.calculation {
            loop {
                match calculation.rx.try_recv() {
                    Ok(Progress::Event(SolverEvent::Status(status))) => {
                        self.calculation_status = Some(status);
                    }
                    Ok(Progress::Event(SolverEvent::Completed)) => {
                        self.calculation_status = Some("completed".to_string());
                    }
                    Ok(Progress::Finished(result)) => {
                        finished = Some(result);
                        break;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        finished = Some(Ok(false));
                        break;
                    }
                }
            }
        }

        if let Some(result) = finished {
            self.calculation = None;
            match result {
                Ok(true) => {
                    self.status_message =
                        "Calculation completed. Load the solution to view it".to_string();
                }
                Ok(false) => {}
                Err(e) => self.fail(RemoteJob::Calculate, e),
            }
        }
    }

    fn handle_reply(&mut self, reply: RemoteReply) {
        match reply {
            RemoteReply::Schedule { file, result } => match result {
                Ok(table) => self.load_table(&table, &file),
                Err(e) => self.fail(RemoteJob::Fetch(file), e),
            },
            RemoteReply::Uploaded(result) => match result {
                Ok(message) => {
                    self.coordinator.mark_uploaded();
                    self.status_message = format!("Changes uploaded: {}", message);
                }
                Err(e) => self.fail(RemoteJob::Upload, e),
            },
            RemoteReply::Disruption { disruption, result } => match result {
                Ok(message) => {
                    self.status_message = format!(
                        "Disruption on {} {} submitted: {}",
                        disruption.kind.label(),
                        disruption.index,
                        message
                    );
                }
                Err(e) => self.fail(RemoteJob::Disruption(disruption), e),
            },
            RemoteReply::Solution(result) => match result {
                Ok(records) => {
                    let applied = self.coordinator.apply_solution(&records);
                    self.status_message =
                        format!("Solution applied to {} of {} flights", applied, records.len());
                }
                Err(e) => self.fail(RemoteJob::Solution, e),
            },
        }
    }

    fn fail(&mut self, job: RemoteJob, error: RemoteError) {
        tracing::warn!(job = job.label(), "remote call failed: {}", error);
        self.status_message = format!("{} failed", job.label());
        self.failure = Some(RemoteFailure {
            job,
            message: error.to_string(),
        });
    }

    pub fn retry(&mut self) {
        if let Some(failure) = self.failure.take() {
            tracing::info!(job = failure.job.label(), "retrying");
            self.spawn(failure.job);
        }
    }

    // --- Schedule operations ---

    fn load_table(&mut self, table: &SourceTable, file: &str) {
        match self.coordinator.load(table) {
            Ok(persist_error) => {
                self.selected = None;
                self.edit = None;
                self.modified = false;
                self.settings.active_file = file.to_string();
                self.save_settings();
                self.status_message = format!(
                    "Loaded {} flights on {} aircraft from {}",
                    self.coordinator.store().len(),
                    self.coordinator.store().aircraft().len(),
                    file
                );
                if let Some(e) = persist_error {
                    self.status_message.push_str(&format!(" (not cached: {})", e));
                }
            }
            Err(e) => {
                tracing::warn!(file, "schedule rejected: {}", e);
                self.status_message = format!("Could not load {}: {}", file, e);
            }
        }
    }

    fn confirm_discard(&self, title: &str) -> bool {
        if !self.modified {
            return true;
        }
        let confirm = rfd::MessageDialog::new()
            .set_title(title)
            .set_description("This discards your changes to the schedule. Continue?")
            .set_buttons(rfd::MessageButtons::YesNo)
            .show();
        confirm == rfd::MessageDialogResult::Yes
    }

    /// Switch to another data file from the solver server.
    pub fn select_file(&mut self, file: String) {
        if file == self.settings.active_file && !self.coordinator.store().is_empty() {
            return;
        }
        if !self.confirm_discard("Switch data file") {
            return;
        }
        self.spawn(RemoteJob::Fetch(file));
    }

    pub fn import_csv(&mut self) {
        if !self.confirm_discard("Import CSV") {
            return;
        }
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv", "txt"])
            .pick_file()
        {
            let name = path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("imported.csv")
                .to_string();
            match import_csv(&path) {
                Ok(table) => self.load_table(&table, &name),
                Err(e) => {
                    self.status_message = format!("CSV import failed: {}", e);
                }
            }
        }
    }

    pub fn export_csv(&mut self) {
        if self.coordinator.store().is_empty() {
            self.status_message = "Nothing to export: no schedule loaded".to_string();
            return;
        }

        let stem = self
            .settings
            .active_file
            .trim_end_matches(".csv")
            .to_string();
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .set_file_name(format!("{}_modified.csv", stem))
            .save_file()
        {
            let store = self.coordinator.store();
            match export_csv(
                store.records(Track::Modified),
                &store.export_order(),
                store.columns(),
                &path,
            ) {
                Ok(count) => {
                    self.status_message = format!("Exported {} flights to CSV", count);
                }
                Err(e) => {
                    self.status_message = format!("CSV export failed: {}", e);
                }
            }
        }
    }

    /// Throw away all modifications after confirmation.
    pub fn restore_original(&mut self) {
        let confirm = rfd::MessageDialog::new()
            .set_title("Restore")
            .set_description("Discard every change and restore the loaded schedule?")
            .set_buttons(rfd::MessageButtons::YesNo)
            .show();
        if confirm != rfd::MessageDialogResult::Yes {
            return;
        }
        let persist_error = self.coordinator.reset();
        self.modified = false;
        self.selected = None;
        self.edit = None;
        self.status_message = match persist_error {
            None => "Restored the original schedule".to_string(),
            Some(e) => format!("Restored the original schedule (not cached: {})", e),
        };
    }

    pub fn submit_disruption(&mut self) {
        match self.disruption.parse() {
            Ok(disruption) => {
                self.disruption_error = None;
                self.show_disruption = false;
                self.spawn(RemoteJob::Disruption(disruption));
            }
            Err(e) => self.disruption_error = Some(e.to_string()),
        }
    }

    fn save_settings(&self) {
        if let Err(e) = self.settings.save(&self.paths.settings) {
            tracing::warn!("could not save settings: {}", e);
        }
    }

    // --- Timeline interaction ---

    fn handle_move(&mut self, outcome: MoveOutcome, id: &ItemId) {
        match outcome {
            MoveOutcome::Rejected(veto) => {
                self.status_message = format!("Move rejected: {}", veto);
            }
            MoveOutcome::Reconciled {
                overlap,
                persist_error,
                ..
            } => {
                self.modified = true;
                let aircraft = self
                    .coordinator
                    .timeline()
                    .item(id)
                    .map(|item| item.group.aircraft);
                self.status_message = match aircraft {
                    Some(ac) => format!("Moved {} to aircraft {}", id.key, ac),
                    None => format!("Moved {}", id.key),
                };
                if overlap {
                    self.status_message.push_str(" (overlaps another flight)");
                }
                if let Some(e) = persist_error {
                    self.status_message.push_str(&format!(" (not cached: {})", e));
                }
            }
        }
    }

    pub fn open_editor(&mut self, id: &ItemId) {
        match self.coordinator.request_edit(id) {
            Ok(session) => {
                self.selected = Some(id.clone());
                self.edit = Some(session);
                self.edit_error = None;
            }
            Err(e) => self.status_message = format!("Cannot edit: {}", e),
        }
    }

    fn save_edit(&mut self) {
        let Some(session) = self.edit.take() else {
            return;
        };
        match self.coordinator.submit_edit(&session) {
            Ok(report) => {
                self.edit_error = None;
                if report.groups.is_empty() && report.persist_error.is_none() {
                    self.status_message = format!("Updated {}", session.id.key);
                } else {
                    self.status_message = format!(
                        "Updated {} ({} rows rechecked)",
                        session.id.key,
                        report.groups.len()
                    );
                }
                if self.coordinator.unsaved() {
                    self.modified = true;
                }
                if let Some(e) = report.persist_error {
                    self.status_message.push_str(&format!(" (not cached: {})", e));
                }
            }
            Err(EditVeto::FrozenItem(id)) | Err(EditVeto::UnknownItem(id)) => {
                self.coordinator.cancel_edit();
                self.status_message = format!("Cannot edit {}", id);
            }
            Err(e) => {
                // Keep the dialog open with the operator's input
                self.edit_error = Some(e.to_string());
                self.edit = Some(session);
            }
        }
    }

    fn cancel_edit(&mut self) {
        self.edit = None;
        self.edit_error = None;
        self.coordinator.cancel_edit();
    }
}

impl eframe::App for FleetApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_remote();
        if self.is_busy() || self.is_calculating() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }

        // Top panel: toolbar
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui::toolbar::show_toolbar(self, ui);
        });

        // Bottom panel: status bar
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(ui::theme::STATUS_BAR_HEIGHT)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_HEADER)
                    .inner_margin(egui::Margin::symmetric(10.0, 0.0)),
            )
            .show(ctx, |ui| {
                ui::toolbar::show_status_bar(self, ui);
            });

        if self.failure.is_some() {
            egui::TopBottomPanel::top("retry_panel").show(ctx, |ui| {
                ui::dialogs::show_retry_panel(self, ui);
            });
        }

        // Left panel: flight list
        let mut list_action = ui::flight_list::FlightListAction::None;
        egui::SidePanel::left("flight_panel")
            .default_width(ui::theme::SIDE_PANEL_WIDTH)
            .min_width(220.0)
            .resizable(true)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_PANEL)
                    .inner_margin(egui::Margin::same(8.0))
                    .stroke(egui::Stroke::new(1.0, ui::theme::BORDER_SUBTLE)),
            )
            .show(ctx, |ui| {
                list_action = ui::flight_list::show_flight_list(
                    self.coordinator.timeline(),
                    self.selected.as_ref(),
                    &mut self.only_overlaps,
                    ui,
                );
            });

        match list_action {
            ui::flight_list::FlightListAction::Select(id) => self.selected = Some(id),
            ui::flight_list::FlightListAction::Edit(id) => self.open_editor(&id),
            ui::flight_list::FlightListAction::None => {}
        }

        // Central panel: timeline chart
        let chart_frame = egui::Frame::default()
            .fill(ui::theme::BG_DARK)
            .inner_margin(egui::Margin::ZERO);
        let mut interaction = ui::timeline_chart::ChartInteraction::default();
        egui::CentralPanel::default().frame(chart_frame).show(ctx, |ui| {
            if self.coordinator.timeline().is_empty() {
                ui.centered_and_justified(|ui| {
                    let text = if self.is_busy() {
                        "Loading schedule…"
                    } else {
                        "No schedule loaded"
                    };
                    ui.label(egui::RichText::new(text).color(ui::theme::TEXT_DIM));
                });
                return;
            }
            interaction = ui::timeline_chart::show_timeline_chart(
                self.coordinator.timeline(),
                &mut self.viewport,
                &mut self.selected,
                self.settings.snap_minutes,
                ui,
            );
        });

        if let Some(proposal) = interaction.moved {
            let id = proposal.id.clone();
            let outcome = self.coordinator.on_move(proposal);
            self.handle_move(outcome, &id);
        }
        if let Some(id) = interaction.edit {
            self.open_editor(&id);
        }

        // Dialogs
        let editor_action = match self.edit.as_mut() {
            Some(session) => {
                ui::flight_editor::show_flight_editor(session, self.edit_error.as_deref(), ctx)
            }
            None => ui::flight_editor::EditorAction::None,
        };
        match editor_action {
            ui::flight_editor::EditorAction::Save => self.save_edit(),
            ui::flight_editor::EditorAction::Cancel => self.cancel_edit(),
            ui::flight_editor::EditorAction::None => {}
        }
        if self.show_disruption {
            ui::dialogs::show_disruption_dialog(self, ctx);
        }
        if self.show_about {
            ui::dialogs::show_about_dialog(self, ctx);
        }
    }
}
