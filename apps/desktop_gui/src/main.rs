use std::{sync::Arc, thread};

use clap::Parser;
use client_core::{HttpFoodsApi, MenuController};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use eframe::egui;
use rust_decimal::Decimal;
use shared::{
    domain::FoodId,
    protocol::{FoodDraft, FoodPatch, FoodRecord},
};
use url::Url;

enum BackendCommand {
    LoadFoods,
    CreateFood { draft: FoodDraft },
    UpdateFood { id: FoodId, patch: FoodPatch },
    DeleteFood { id: FoodId },
    SetAvailability { id: FoodId, available: bool },
}

enum UiEvent {
    /// Snapshot of the reconciled store after a mutation settled.
    StoreChanged(Vec<FoodRecord>),
    Info(String),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UiErrorContext {
    Startup,
    Load,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
struct UiError {
    context: UiErrorContext,
    message: String,
}

impl UiError {
    fn new(context: UiErrorContext, message: impl Into<String>) -> Self {
        Self {
            context,
            message: message.into(),
        }
    }

    /// Load and delete failures change what the visible list means, so they
    /// get the banner; create/update failures only touch the status line.
    fn warrants_banner(&self) -> bool {
        matches!(
            self.context,
            UiErrorContext::Startup | UiErrorContext::Load | UiErrorContext::Delete
        )
    }

    fn headline(&self) -> &'static str {
        match self.context {
            UiErrorContext::Startup => "Backend worker failed to start",
            UiErrorContext::Load => "Could not load the menu",
            UiErrorContext::Create => "Could not add the food",
            UiErrorContext::Update => "Could not save the food",
            UiErrorContext::Delete => "Delete may not have reached the server",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusBannerSeverity {
    Error,
}

#[derive(Debug, Clone)]
struct StatusBanner {
    severity: StatusBannerSeverity,
    message: String,
}

/// Text state backing the add/edit dialogs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FoodForm {
    name: String,
    description: String,
    price: String,
    image: String,
}

impl FoodForm {
    fn from_record(record: &FoodRecord) -> Self {
        Self {
            name: record.name.clone(),
            description: record.description.clone(),
            price: record.price.clone(),
            image: record.image.clone(),
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.price.parse::<Decimal>().is_err() {
            return Err(format!("price '{}' is not a decimal amount", self.price));
        }
        if Url::parse(&self.image).is_err() {
            return Err(format!("image '{}' is not a valid URL", self.image));
        }
        Ok(())
    }

    fn to_draft(&self) -> FoodDraft {
        FoodDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price.clone(),
            image: self.image.clone(),
        }
    }

    /// Only the fields the user actually changed relative to the record shown
    /// when the dialog opened; the merge base itself is re-derived from the
    /// live store at submit time.
    fn to_patch(&self, base: &FoodRecord) -> FoodPatch {
        FoodPatch {
            name: (self.name != base.name).then(|| self.name.clone()),
            description: (self.description != base.description)
                .then(|| self.description.clone()),
            price: (self.price != base.price).then(|| self.price.clone()),
            image: (self.image != base.image).then(|| self.image.clone()),
            available: None,
        }
    }
}

enum CardAction {
    EditRequested(FoodRecord),
    Delete(FoodId),
    SetAvailability(FoodId, bool),
}

fn queue_command(cmd_tx: &Sender<BackendCommand>, command: BackendCommand, status: &mut String) {
    match cmd_tx.try_send(command) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            *status = "Backend is busy; action dropped".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status = "Backend worker is gone; restart the app".to_string();
        }
    }
}

struct FoodDashboardApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    foods: Vec<FoodRecord>,

    add_dialog_open: bool,
    edit_dialog_open: bool,
    editing_food: Option<FoodRecord>,
    add_form: FoodForm,
    edit_form: FoodForm,
    form_problem: Option<String>,

    status: String,
    status_banner: Option<StatusBanner>,

    tick: u64,
}

impl FoodDashboardApp {
    fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        let mut status = "Loading menu...".to_string();
        // The one fetch on mount; there is no retry and no refresh timer.
        queue_command(&cmd_tx, BackendCommand::LoadFoods, &mut status);
        Self {
            cmd_tx,
            ui_rx,
            foods: Vec::new(),
            add_dialog_open: false,
            edit_dialog_open: false,
            editing_food: None,
            add_form: FoodForm::default(),
            edit_form: FoodForm::default(),
            form_problem: None,
            status,
            status_banner: None,
            tick: 0,
        }
    }

    fn toggle_add_dialog(&mut self) {
        self.add_dialog_open = !self.add_dialog_open;
        self.form_problem = None;
    }

    fn toggle_edit_dialog(&mut self) {
        self.edit_dialog_open = !self.edit_dialog_open;
        self.form_problem = None;
    }

    /// Opens the edit dialog over `food`. The editing slot is deliberately
    /// not cleared on close; it is only read to prefill the form and carry
    /// the id into the update command.
    fn open_edit_dialog(&mut self, food: FoodRecord) {
        self.edit_form = FoodForm::from_record(&food);
        self.editing_food = Some(food);
        self.edit_dialog_open = true;
        self.form_problem = None;
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::StoreChanged(records) => {
                    self.foods = records;
                }
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::Error(err) => {
                    self.status = format!("{}: {}", err.headline(), err.message);
                    if err.warrants_banner() {
                        self.status_banner = Some(StatusBanner {
                            severity: StatusBannerSeverity::Error,
                            message: format!("{}. {}", err.headline(), err.message),
                        });
                    }
                }
            }
        }
    }

    fn show_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.heading("Food Dashboard");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("New food").clicked() {
                        self.toggle_add_dialog();
                    }
                });
            });
            ui.small(&self.status);
            ui.add_space(4.0);
        });
    }

    fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        if let Some(banner) = self.status_banner.clone() {
            let (fill, stroke) = match banner.severity {
                StatusBannerSeverity::Error => (
                    egui::Color32::from_rgb(111, 53, 53),
                    egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)),
                ),
            };

            egui::Frame::none()
                .fill(fill)
                .stroke(stroke)
                .rounding(8.0)
                .inner_margin(egui::Margin::symmetric(10, 8))
                .show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        ui.label(egui::RichText::new(&banner.message).color(egui::Color32::WHITE));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Dismiss").clicked() {
                                self.status_banner = None;
                            }
                        });
                    });
                });
            ui.add_space(6.0);
        }
    }

    fn show_food_card(ui: &mut egui::Ui, food: &FoodRecord, action: &mut Option<CardAction>) {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.strong(&food.name);
                    ui.label(&food.description);
                    ui.label(egui::RichText::new(format!("R$ {}", food.price)).strong());
                    ui.hyperlink_to("image", &food.image);
                });
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Delete").clicked() {
                        *action = Some(CardAction::Delete(food.id));
                    }
                    if ui.button("Edit").clicked() {
                        *action = Some(CardAction::EditRequested(food.clone()));
                    }
                    let mut available = food.available;
                    if ui.checkbox(&mut available, "Available").changed() {
                        *action = Some(CardAction::SetAvailability(food.id, available));
                    }
                });
            });
        });
    }

    fn show_food_list(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_status_banner(ui);

            if self.foods.is_empty() {
                ui.label("No foods yet. Use \"New food\" to add the first one.");
                return;
            }

            let mut action = None;
            egui::ScrollArea::vertical().show(ui, |ui| {
                for food in &self.foods {
                    Self::show_food_card(ui, food, &mut action);
                    ui.add_space(6.0);
                }
            });

            match action {
                Some(CardAction::EditRequested(food)) => self.open_edit_dialog(food),
                Some(CardAction::Delete(id)) => {
                    queue_command(
                        &self.cmd_tx,
                        BackendCommand::DeleteFood { id },
                        &mut self.status,
                    );
                }
                Some(CardAction::SetAvailability(id, available)) => {
                    queue_command(
                        &self.cmd_tx,
                        BackendCommand::SetAvailability { id, available },
                        &mut self.status,
                    );
                }
                None => {}
            }
        });
    }

    fn form_fields(ui: &mut egui::Ui, form: &mut FoodForm) {
        ui.small("Name");
        ui.add(
            egui::TextEdit::singleline(&mut form.name)
                .hint_text("Ex: Moqueca")
                .desired_width(f32::INFINITY),
        );
        ui.small("Description");
        ui.add(
            egui::TextEdit::singleline(&mut form.description)
                .hint_text("Ex: Fish stew with rice")
                .desired_width(f32::INFINITY),
        );
        ui.small("Price");
        ui.add(
            egui::TextEdit::singleline(&mut form.price)
                .hint_text("Ex: 19.90")
                .desired_width(f32::INFINITY),
        );
        ui.small("Image URL");
        ui.add(
            egui::TextEdit::singleline(&mut form.image)
                .hint_text("Ex: https://example.com/moqueca.png")
                .desired_width(f32::INFINITY),
        );
    }

    fn show_add_dialog(&mut self, ctx: &egui::Context) {
        if !self.add_dialog_open {
            return;
        }

        let mut open = true;
        let mut submitted = false;
        egui::Window::new("New food")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                Self::form_fields(ui, &mut self.add_form);
                if let Some(problem) = &self.form_problem {
                    ui.colored_label(egui::Color32::LIGHT_RED, problem);
                }
                ui.add_space(6.0);
                if ui.button("Add food").clicked() {
                    match self.add_form.validate() {
                        Ok(()) => {
                            queue_command(
                                &self.cmd_tx,
                                BackendCommand::CreateFood {
                                    draft: self.add_form.to_draft(),
                                },
                                &mut self.status,
                            );
                            submitted = true;
                        }
                        Err(problem) => self.form_problem = Some(problem),
                    }
                }
            });

        if submitted {
            self.add_form = FoodForm::default();
            self.form_problem = None;
        }
        if !open || submitted {
            self.add_dialog_open = false;
        }
    }

    fn show_edit_dialog(&mut self, ctx: &egui::Context) {
        if !self.edit_dialog_open {
            return;
        }
        let Some(editing) = self.editing_food.clone() else {
            self.edit_dialog_open = false;
            return;
        };

        let mut open = true;
        let mut submitted = false;
        egui::Window::new(format!("Edit {}", editing.name))
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                Self::form_fields(ui, &mut self.edit_form);
                if let Some(problem) = &self.form_problem {
                    ui.colored_label(egui::Color32::LIGHT_RED, problem);
                }
                ui.add_space(6.0);
                if ui.button("Save changes").clicked() {
                    match self.edit_form.validate() {
                        Ok(()) => {
                            let patch = self.edit_form.to_patch(&editing);
                            if !patch.is_empty() {
                                queue_command(
                                    &self.cmd_tx,
                                    BackendCommand::UpdateFood {
                                        id: editing.id,
                                        patch,
                                    },
                                    &mut self.status,
                                );
                            }
                            submitted = true;
                        }
                        Err(problem) => self.form_problem = Some(problem),
                    }
                }
            });

        if submitted {
            self.form_problem = None;
        }
        if !open || submitted {
            self.edit_dialog_open = false;
        }
    }
}

impl eframe::App for FoodDashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.tick = self.tick.wrapping_add(1);

        self.process_ui_events();
        self.show_header(ctx);
        self.show_food_list(ctx);
        self.show_add_dialog(ctx);
        self.show_edit_dialog(ctx);

        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}

fn spawn_backend_thread(
    server_url: String,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                    UiErrorContext::Startup,
                    format!("failed to build backend runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let api = match HttpFoodsApi::new(&server_url) {
                Ok(api) => api,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                        UiErrorContext::Startup,
                        err.to_string(),
                    )));
                    tracing::error!("refusing to start backend worker: {err}");
                    return;
                }
            };
            let mut controller = MenuController::new(Arc::new(api));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::LoadFoods => match controller.load().await {
                        Ok(count) => {
                            let _ = ui_tx
                                .try_send(UiEvent::StoreChanged(controller.records().to_vec()));
                            let _ = ui_tx.try_send(UiEvent::Info(format!(
                                "Menu loaded ({count} foods)"
                            )));
                        }
                        Err(err) => {
                            let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                                UiErrorContext::Load,
                                err.to_string(),
                            )));
                        }
                    },
                    BackendCommand::CreateFood { draft } => match controller.create(draft).await {
                        Ok(created) => {
                            let _ = ui_tx
                                .try_send(UiEvent::StoreChanged(controller.records().to_vec()));
                            let _ =
                                ui_tx.try_send(UiEvent::Info(format!("Added {}", created.name)));
                        }
                        Err(err) => {
                            tracing::error!("create food failed: {err}");
                            let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                                UiErrorContext::Create,
                                err.to_string(),
                            )));
                        }
                    },
                    BackendCommand::UpdateFood { id, patch } => {
                        match controller.update(id, patch).await {
                            Ok(updated) => {
                                let _ = ui_tx
                                    .try_send(UiEvent::StoreChanged(controller.records().to_vec()));
                                let _ = ui_tx
                                    .try_send(UiEvent::Info(format!("Saved {}", updated.name)));
                            }
                            Err(err) => {
                                tracing::error!(food_id = id.0, "update food failed: {err}");
                                let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                                    UiErrorContext::Update,
                                    err.to_string(),
                                )));
                            }
                        }
                    }
                    BackendCommand::DeleteFood { id } => {
                        let result = controller.delete(id).await;
                        // The local entry is gone either way; mirror that first.
                        let _ =
                            ui_tx.try_send(UiEvent::StoreChanged(controller.records().to_vec()));
                        match result {
                            Ok(()) => {
                                let _ = ui_tx
                                    .try_send(UiEvent::Info(format!("Deleted food {}", id.0)));
                            }
                            Err(err) => {
                                let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                                    UiErrorContext::Delete,
                                    err.to_string(),
                                )));
                            }
                        }
                    }
                    BackendCommand::SetAvailability { id, available } => {
                        match controller.set_available(id, available).await {
                            Ok(updated) => {
                                let _ = ui_tx
                                    .try_send(UiEvent::StoreChanged(controller.records().to_vec()));
                                let verb = if updated.available {
                                    "now available"
                                } else {
                                    "now unavailable"
                                };
                                let _ = ui_tx.try_send(UiEvent::Info(format!(
                                    "{} is {verb}",
                                    updated.name
                                )));
                            }
                            Err(err) => {
                                tracing::error!(food_id = id.0, "availability toggle failed: {err}");
                                let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                                    UiErrorContext::Update,
                                    err.to_string(),
                                )));
                            }
                        }
                    }
                }
            }
        });
    });
}

#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the REST collaborator.
    #[arg(long, default_value = "http://localhost:3333")]
    server_url: String,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    spawn_backend_thread(args.server_url, cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Food Dashboard")
            .with_inner_size([900.0, 640.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Food Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(FoodDashboardApp::new(cmd_tx, ui_rx)))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::FoodId;

    fn food(id: i64, name: &str) -> FoodRecord {
        FoodRecord {
            id: FoodId(id),
            name: name.to_string(),
            description: format!("{name} with rice and salad"),
            price: "19.90".to_string(),
            available: true,
            image: format!("https://example.com/images/{name}.png"),
        }
    }

    fn test_app() -> (FoodDashboardApp, Sender<UiEvent>, Receiver<BackendCommand>) {
        let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(16);
        let (ui_tx, ui_rx) = bounded::<UiEvent>(16);
        (FoodDashboardApp::new(cmd_tx, ui_rx), ui_tx, cmd_rx)
    }

    #[test]
    fn mount_queues_exactly_one_load() {
        let (_app, _ui_tx, cmd_rx) = test_app();
        assert!(matches!(cmd_rx.try_recv(), Ok(BackendCommand::LoadFoods)));
        assert!(cmd_rx.try_recv().is_err());
    }

    #[test]
    fn dialog_toggle_is_its_own_inverse() {
        let (mut app, _ui_tx, _cmd_rx) = test_app();

        assert!(!app.add_dialog_open);
        app.toggle_add_dialog();
        assert!(app.add_dialog_open);
        app.toggle_add_dialog();
        assert!(!app.add_dialog_open);

        app.toggle_edit_dialog();
        app.toggle_edit_dialog();
        assert!(!app.edit_dialog_open);
    }

    #[test]
    fn opening_edit_dialog_sets_slot_and_closing_keeps_it() {
        let (mut app, _ui_tx, _cmd_rx) = test_app();

        app.open_edit_dialog(food(1, "moqueca"));
        assert!(app.edit_dialog_open);
        assert_eq!(app.editing_food, Some(food(1, "moqueca")));
        assert_eq!(app.edit_form, FoodForm::from_record(&food(1, "moqueca")));

        // The slot intentionally survives a close; it is only read while the
        // dialog is open.
        app.toggle_edit_dialog();
        assert!(!app.edit_dialog_open);
        assert_eq!(app.editing_food, Some(food(1, "moqueca")));
    }

    #[test]
    fn store_changed_event_replaces_the_view_mirror() {
        let (mut app, ui_tx, _cmd_rx) = test_app();

        ui_tx
            .try_send(UiEvent::StoreChanged(vec![food(1, "moqueca")]))
            .expect("send");
        app.process_ui_events();
        assert_eq!(app.foods, vec![food(1, "moqueca")]);

        ui_tx
            .try_send(UiEvent::StoreChanged(Vec::new()))
            .expect("send");
        app.process_ui_events();
        assert!(app.foods.is_empty());
    }

    #[test]
    fn load_and_delete_errors_raise_the_banner_but_create_does_not() {
        let (mut app, ui_tx, _cmd_rx) = test_app();

        ui_tx
            .try_send(UiEvent::Error(UiError::new(
                UiErrorContext::Create,
                "boom",
            )))
            .expect("send");
        app.process_ui_events();
        assert!(app.status_banner.is_none());
        assert!(app.status.contains("Could not add the food"));

        ui_tx
            .try_send(UiEvent::Error(UiError::new(UiErrorContext::Delete, "boom")))
            .expect("send");
        app.process_ui_events();
        assert!(app.status_banner.is_some());
    }

    #[test]
    fn edit_patch_contains_only_changed_fields() {
        let base = food(1, "moqueca");
        let mut form = FoodForm::from_record(&base);
        form.price = "9.99".to_string();

        let patch = form.to_patch(&base);
        assert_eq!(patch.price.as_deref(), Some("9.99"));
        assert!(patch.name.is_none());
        assert!(patch.description.is_none());
        assert!(patch.image.is_none());
        assert!(patch.available.is_none());

        let unchanged = FoodForm::from_record(&base).to_patch(&base);
        assert!(unchanged.is_empty());
    }

    #[test]
    fn form_validation_rejects_bad_price_and_image() {
        let mut form = FoodForm::from_record(&food(1, "moqueca"));
        assert!(form.validate().is_ok());

        form.price = "nineteen".to_string();
        assert!(form.validate().is_err());

        form.price = "19.90".to_string();
        form.image = "images/moqueca.png".to_string();
        assert!(form.validate().is_err());

        form.image = "https://example.com/images/moqueca.png".to_string();
        form.name = "  ".to_string();
        assert!(form.validate().is_err());
    }
}
