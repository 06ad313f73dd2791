use crate::domain::models::Page;
use crate::domain::session::{MeasurementWizard, WizardStep};
use crate::presentation::app::RightAngleApp;
use crate::presentation::components::Components;
use crate::presentation::theme::Palette;
use eframe::egui;
use std::time::Instant;

fn instruction(step: WizardStep, timer_seconds: u32) -> (&'static str, String) {
    match step {
        WizardStep::Preparation => (
            "Step 1: Preparation",
            "Start with your arm fully extended. Ensure the device is securely and \
             comfortably fitted."
                .to_string(),
        ),
        WizardStep::InitialRom => (
            "Step 2: Initial ROM",
            "Slowly start bending your arm. Continue until you reach approximately a \
             90-degree angle."
                .to_string(),
        ),
        WizardStep::StrengthTest => (
            "Step 3: Strength Test",
            format!(
                "STOP at 90 degrees. Lock the brace. Now, PUSH against the brace as if \
                 trying to extend your arm. Hold for {timer_seconds} seconds."
            ),
        ),
        WizardStep::ContinueRom => (
            "Step 4: Continue ROM",
            "Unlock the brace. Continue bending your arm as far as you comfortably can \
             to complete the Range of Motion measurement."
                .to_string(),
        ),
        WizardStep::EndTest => (
            "Step 5: End Test",
            "When you are unable to bend your arm any further, press the 'End Test' \
             button."
                .to_string(),
        ),
    }
}

pub fn render(app: &mut RightAngleApp, ui: &mut egui::Ui) {
    if app.wizard.is_none() {
        app.wizard = Some(MeasurementWizard::new());
    }

    let palette = Palette::new(app.is_dark_mode);
    let (step, timer_seconds, hold_active) = {
        let wizard = app.wizard.as_ref().expect("wizard was just created");
        (
            wizard.step(),
            wizard.timer_seconds(),
            wizard.strength_test_active(),
        )
    };

    ui.horizontal(|ui| {
        if ui.button("\u{2190} Back").clicked() {
            app.page = Page::Home;
        }
        ui.add_space(8.0);
        ui.label(egui::RichText::new(format!("Step {} of 5", step.number())).weak());
    });
    ui.add_space(10.0);

    let (title, text) = instruction(step, timer_seconds);

    Components::card(ui, title, |ui| {
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new("Follow the instructions carefully for accurate results.").weak());
            ui.add_space(12.0);
            ui.label(egui::RichText::new(text).size(17.0));
            ui.add_space(16.0);

            if step == WizardStep::StrengthTest && hold_active {
                ui.label(
                    egui::RichText::new(timer_seconds.to_string())
                        .size(56.0)
                        .strong()
                        .color(palette.success),
                );
                ui.add_space(8.0);
            }

            match step {
                WizardStep::Preparation | WizardStep::InitialRom | WizardStep::ContinueRom => {
                    if ui.button("Next Step \u{2713}").clicked() {
                        if let Some(wizard) = app.wizard.as_mut() {
                            wizard.advance();
                        }
                    }
                }
                WizardStep::StrengthTest => {
                    if hold_active {
                        ui.add_enabled(
                            false,
                            egui::Button::new(format!("Hold... ({timer_seconds}s)")),
                        );
                    } else if ui.button("Start Strength Test").clicked() {
                        if let Some(wizard) = app.wizard.as_mut() {
                            if wizard.start_strength_hold() {
                                app.hold_tick = Some(Instant::now());
                            }
                        }
                    }
                }
                WizardStep::EndTest => {
                    if ui.button("End Test \u{25a0}").clicked() {
                        if let Some(result) = app.wizard.as_mut().and_then(|w| w.finish()) {
                            app.apply_session_result(result);
                        }
                    }
                }
            }
        });
    });
}
