use crate::domain::models::{
    AppEvent, CalibrationRange, ConnectionState, Notice, Page, Reading, TransportCommand,
};
use crate::domain::session::{MeasurementWizard, SessionResult};
use crate::domain::settings::SettingsService;
use crate::infrastructure::manager::ConnectionManager;
use crate::infrastructure::transport::serial::SerialTransport;
use eframe::egui;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::error;

pub(crate) struct Toast {
    pub notice: Notice,
    pub shown_at: Instant,
}

pub struct RightAngleApp {
    // Services
    pub(crate) settings: Arc<Mutex<SettingsService>>,

    // Device worker
    pub(crate) command_tx: mpsc::UnboundedSender<TransportCommand>,
    pub(crate) event_rx: mpsc::UnboundedReceiver<AppEvent>,

    // Live state
    pub(crate) connection_state: ConnectionState,
    pub(crate) latest_reading: Option<Reading>,
    pub(crate) history_len: usize,
    pub(crate) calibration: CalibrationRange,

    // Last-session results (rehydrated from settings)
    pub(crate) rom_value: Option<i32>,
    pub(crate) strength_value: Option<i32>,
    pub(crate) recommendations: Vec<String>,

    // UI State
    pub(crate) page: Page,
    pub(crate) available_ports: Vec<String>,
    pub(crate) selected_port: Option<String>,
    pub(crate) min_input: String,
    pub(crate) max_input: String,
    pub(crate) wizard: Option<MeasurementWizard>,
    pub(crate) hold_tick: Option<Instant>,
    pub(crate) toasts: Vec<Toast>,
    pub(crate) is_dark_mode: bool,

    // Logging guard
    pub(crate) _logging_guard: Option<crate::infrastructure::logging::LoggingGuard>,
}

impl RightAngleApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings_service = SettingsService::new().expect("Failed to load settings");

        let logging_guard =
            crate::infrastructure::logging::init_logger(&settings_service.get().log_settings)
                .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
                .ok();

        tracing::info!("Starting The Right Angle");

        let is_dark_mode = settings_service.get().dark_mode;
        crate::presentation::theme::apply_theme(&cc.egui_ctx, is_dark_mode);

        let rom_value = settings_service.get().rom_value;
        let strength_value = settings_service.get().strength_value;
        let recommendations = settings_service.get().recommendations.clone();

        let settings = Arc::new(Mutex::new(settings_service));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let manager_settings = settings.clone();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create tokio runtime for device I/O");

            rt.block_on(async move {
                ConnectionManager::new(event_tx, manager_settings)
                    .run(command_rx)
                    .await;
            });
        });

        let calibration = CalibrationRange::DEFAULT;

        Self {
            settings,
            command_tx,
            event_rx,
            connection_state: ConnectionState::Disconnected,
            latest_reading: None,
            history_len: 0,
            calibration,
            rom_value,
            strength_value,
            recommendations,
            page: Page::Home,
            available_ports: SerialTransport::available_ports(),
            selected_port: None,
            min_input: calibration.min.to_string(),
            max_input: calibration.max.to_string(),
            wizard: None,
            hold_tick: None,
            toasts: Vec::new(),
            is_dark_mode,
            _logging_guard: logging_guard,
        }
    }

    pub(crate) fn send_command(&self, command: TransportCommand) {
        if self.command_tx.send(command).is_err() {
            error!("Device worker is gone");
        }
    }

    pub(crate) fn push_notice(&mut self, notice: Notice) {
        self.toasts.push(Toast {
            notice,
            shown_at: Instant::now(),
        });
    }

    pub(crate) fn refresh_ports(&mut self) {
        self.available_ports = SerialTransport::available_ports();
        if let Some(selected) = &self.selected_port {
            if !self.available_ports.contains(selected) {
                self.selected_port = None;
            }
        }
    }

    /// Persist and display a completed session, then return home.
    pub(crate) fn apply_session_result(&mut self, result: SessionResult) {
        if let Ok(mut settings) = self.settings.lock() {
            if let Err(e) = settings.update_results(
                result.rom_degrees,
                result.strength_units,
                result.recommendations.clone(),
            ) {
                error!("Failed to persist session results: {e}");
            }
        }

        self.rom_value = Some(result.rom_degrees);
        self.strength_value = Some(result.strength_units);
        self.recommendations = result.recommendations;

        self.push_notice(
            Notice::success(
                "Test Ended!",
                "Your results are now available on the home page.",
            )
            .with_duration(Duration::from_secs(5)),
        );
        self.page = Page::Home;
        self.wizard = None;
        self.hold_tick = None;
    }

    fn pump_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                AppEvent::Reading {
                    reading,
                    history_len,
                } => {
                    self.latest_reading = Some(reading);
                    self.history_len = history_len;
                }
                AppEvent::ConnectionState(state) => {
                    self.connection_state = state;
                }
                AppEvent::Calibration(range) => {
                    self.calibration = range;
                    self.min_input = range.min.to_string();
                    self.max_input = range.max.to_string();
                }
                AppEvent::Notice(notice) => self.push_notice(notice),
            }
        }
    }

    /// Drive the wizard countdown off the repaint clock, one decrement
    /// per elapsed second.
    fn tick_wizard(&mut self) {
        let Some(wizard) = self.wizard.as_mut() else {
            self.hold_tick = None;
            return;
        };
        if !wizard.strength_test_active() {
            return;
        }

        let due = self
            .hold_tick
            .is_some_and(|last| last.elapsed() >= Duration::from_secs(1));
        if due {
            self.hold_tick = Some(Instant::now());
            if wizard.tick() {
                self.push_notice(Notice::info(
                    "Strength Test Complete",
                    "Unlock the brace and continue ROM.",
                ));
            }
        }
    }

    fn render_toasts(&mut self, ctx: &egui::Context) {
        self.toasts
            .retain(|toast| toast.shown_at.elapsed() < toast.notice.duration);
        if self.toasts.is_empty() {
            return;
        }

        egui::Area::new(egui::Id::new("toasts"))
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-16.0, -16.0))
            .show(ctx, |ui| {
                ui.set_max_width(320.0);
                for toast in &self.toasts {
                    let (bg, fg) = crate::presentation::theme::notice_colors(
                        toast.notice.variant,
                        self.is_dark_mode,
                    );
                    egui::Frame::none()
                        .fill(bg)
                        .rounding(egui::Rounding::same(6.0))
                        .inner_margin(egui::Margin::same(10.0))
                        .show(ui, |ui| {
                            ui.label(
                                egui::RichText::new(&toast.notice.title)
                                    .strong()
                                    .color(fg),
                            );
                            if !toast.notice.description.is_empty() {
                                ui.label(
                                    egui::RichText::new(&toast.notice.description).color(fg),
                                );
                            }
                        });
                    ui.add_space(6.0);
                }
            });
    }
}

impl eframe::App for RightAngleApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump_events();
        self.tick_wizard();

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.label(egui::RichText::new("The Right Angle").strong());
                ui.separator();
                ui.selectable_value(&mut self.page, Page::Home, "Home");
                ui.selectable_value(&mut self.page, Page::Measure, "Measurement");

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let switch_icon = if self.is_dark_mode {
                        "\u{2600} Light"
                    } else {
                        "\u{1f319} Dark"
                    };
                    if ui.button(switch_icon).clicked() {
                        self.is_dark_mode = !self.is_dark_mode;
                        crate::presentation::theme::apply_theme(ctx, self.is_dark_mode);
                        if let Ok(mut settings) = self.settings.lock() {
                            let _ = settings.set_dark_mode(self.is_dark_mode);
                        }
                    }
                });
            });
        });

        // navigating away discards an in-progress session
        if self.page == Page::Home && self.wizard.is_some() {
            self.wizard = None;
            self.hold_tick = None;
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.set_max_width(820.0);
                    ui.add_space(16.0);

                    use crate::presentation::pages;
                    match self.page {
                        Page::Home => pages::home::render(self, ui),
                        Page::Measure => pages::measure::render(self, ui),
                    }

                    ui.add_space(40.0);
                });
            });
        });

        self.render_toasts(ctx);

        // the gauge and the countdown are live views
        ctx.request_repaint_after(Duration::from_millis(50));
    }
}
