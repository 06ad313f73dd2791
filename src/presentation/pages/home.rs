use crate::domain::models::{ConnectionState, Page, TransportCommand};
use crate::domain::session::MeasurementWizard;
use crate::presentation::app::RightAngleApp;
use crate::presentation::components::Components;
use crate::presentation::theme::Palette;
use eframe::egui;

pub fn render(app: &mut RightAngleApp, ui: &mut egui::Ui) {
    Components::heading(ui, "Precision Measurement for Optimal Recovery");
    ui.add_space(16.0);

    ui_connection_panel(app, ui);
    ui.add_space(12.0);

    ui.columns(2, |columns| {
        ui_gauge_panel(app, &mut columns[0]);
        ui_data_panel(app, &mut columns[1]);
    });
    ui.add_space(12.0);

    ui_calibration_panel(app, ui);
    ui.add_space(12.0);

    ui_results_panel(app, ui);
}

fn ui_connection_panel(app: &mut RightAngleApp, ui: &mut egui::Ui) {
    let palette = Palette::new(app.is_dark_mode);

    Components::card(ui, "Device Control & Measurement", |ui| {
        let (status_text, bg_color) = match app.connection_state {
            ConnectionState::Connected(kind) => {
                (format!("CONNECTED ({})", kind.label()), palette.success)
            }
            ConnectionState::Connecting => ("CONNECTING...".to_string(), palette.accent),
            ConnectionState::Reconnecting { attempt } => {
                (format!("RECONNECTING ({attempt}/3)"), palette.accent)
            }
            ConnectionState::Disconnected => ("DISCONNECTED".to_string(), palette.danger),
        };
        Components::status_banner(ui, &status_text, bg_color, egui::Color32::WHITE);
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.label("Serial port:");
            let selected_label = app.selected_port.as_deref().unwrap_or("Select port...");
            egui::ComboBox::from_id_salt("serial_port")
                .selected_text(selected_label)
                .show_ui(ui, |ui| {
                    for port in app.available_ports.clone() {
                        ui.selectable_value(&mut app.selected_port, Some(port.clone()), port);
                    }
                });
            if ui.button("\u{21ba} Refresh").clicked() {
                app.refresh_ports();
            }
        });

        ui.horizontal(|ui| {
            let connected = !matches!(app.connection_state, ConnectionState::Disconnected);

            if ui
                .add_enabled(
                    app.selected_port.is_some(),
                    egui::Button::new("Connect Serial"),
                )
                .clicked()
            {
                if let Some(port) = app.selected_port.clone() {
                    app.send_command(TransportCommand::ConnectSerial { port });
                }
            }
            if ui.button("Connect Bluetooth").clicked() {
                app.send_command(TransportCommand::ConnectBle);
            }
            if ui.button("Start Demo").clicked() {
                app.send_command(TransportCommand::StartDemo);
            }
            if ui
                .add_enabled(connected, egui::Button::new("Disconnect"))
                .clicked()
            {
                app.send_command(TransportCommand::Disconnect);
            }
        });

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("\u{25b6} Start Measurement").clicked() {
                app.wizard = Some(MeasurementWizard::new());
                app.page = Page::Measure;
            }
            if let ConnectionState::Connected(kind) = app.connection_state {
                ui.label(
                    egui::RichText::new(format!("Live Data Stream Active ({})", kind.label()))
                        .color(palette.accent),
                );
            }
        });
    });
}

fn ui_gauge_panel(app: &mut RightAngleApp, ui: &mut egui::Ui) {
    let palette = Palette::new(app.is_dark_mode);
    Components::card(ui, "Angle Gauge", |ui| {
        let angle = app.latest_reading.map_or(0, |r| r.angle);
        ui.vertical_centered(|ui| {
            Components::angle_gauge(ui, angle, 200.0, palette.accent);
        });
    });
}

fn ui_data_panel(app: &mut RightAngleApp, ui: &mut egui::Ui) {
    Components::card(ui, "Live Data", |ui| {
        egui::Grid::new("data_grid").spacing([30.0, 8.0]).show(ui, |ui| {
            ui.label("Potentiometer value:");
            ui.label(
                app.latest_reading
                    .map_or("-".to_string(), |r| r.value.to_string()),
            );
            ui.end_row();

            ui.label("Angle:");
            ui.label(
                app.latest_reading
                    .map_or("-".to_string(), |r| format!("{}\u{b0}", r.angle)),
            );
            ui.end_row();

            ui.label("Calibration range:");
            ui.label(format!("{} - {}", app.calibration.min, app.calibration.max));
            ui.end_row();

            ui.label("History:");
            ui.label(format!("{} / 50 readings", app.history_len));
            ui.end_row();
        });
    });
}

fn ui_calibration_panel(app: &mut RightAngleApp, ui: &mut egui::Ui) {
    Components::card(ui, "Calibration", |ui| {
        ui.horizontal(|ui| {
            ui.label("Min:");
            ui.add_sized([80.0, 22.0], egui::TextEdit::singleline(&mut app.min_input));
            ui.label("Max:");
            ui.add_sized([80.0, 22.0], egui::TextEdit::singleline(&mut app.max_input));

            if ui.button("Apply Range").clicked() {
                // invalid or empty input falls back to the default bounds
                let min = app.min_input.trim().parse().unwrap_or(0);
                let max = app.max_input.trim().parse().unwrap_or(1023);
                app.send_command(TransportCommand::SetRange { min, max });
            }
        });

        ui.horizontal(|ui| {
            if ui.button("Auto-Calibrate").clicked() {
                app.send_command(TransportCommand::Calibrate);
            }
            if ui.button("Reset").clicked() {
                app.send_command(TransportCommand::ResetCalibration);
            }
        });

        ui.label(
            egui::RichText::new(
                "Auto-calibration derives the range from the last 50 readings. \
                 Rotate the device through its full range first.",
            )
            .weak(),
        );
    });
}

fn ui_results_panel(app: &mut RightAngleApp, ui: &mut egui::Ui) {
    ui.columns(3, |columns| {
        Components::card(&mut columns[0], "Range of Motion (ROM)", |ui| {
            match app.rom_value {
                Some(rom) => {
                    ui.label(egui::RichText::new(format!("{rom}\u{b0}")).size(34.0).strong());
                }
                None => {
                    ui.label(egui::RichText::new("No data yet. Complete a measurement.").weak());
                }
            }
        });

        Components::card(&mut columns[1], "Strength Test", |ui| {
            match app.strength_value {
                Some(strength) => {
                    ui.label(
                        egui::RichText::new(format!("{strength} units"))
                            .size(34.0)
                            .strong(),
                    );
                }
                None => {
                    ui.label(egui::RichText::new("No data yet. Complete a measurement.").weak());
                }
            }
        });

        Components::card(&mut columns[2], "Exercise Recommendations", |ui| {
            if app.recommendations.is_empty() {
                ui.label(
                    egui::RichText::new("Recommendations will appear here after measurement.")
                        .weak(),
                );
            } else {
                for recommendation in &app.recommendations {
                    ui.label(format!("\u{2022} {recommendation}"));
                }
            }
        });
    });
}
