mod domain;
mod infrastructure;
mod presentation;

use eframe::egui;

fn main() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([920.0, 720.0])
            .with_title("The Right Angle"),
        ..Default::default()
    };

    eframe::run_native(
        "The Right Angle",
        options,
        Box::new(|cc| Ok(Box::new(presentation::app::RightAngleApp::new(cc)))),
    )
}
