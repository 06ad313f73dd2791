use eframe::egui;

pub struct Components;

impl Components {
    pub fn heading(ui: &mut egui::Ui, text: &str) {
        ui.label(egui::RichText::new(text).heading().strong());
    }

    pub fn card<R>(
        ui: &mut egui::Ui,
        title: &str,
        add_contents: impl FnOnce(&mut egui::Ui) -> R,
    ) -> R {
        let stroke = ui.style().visuals.widgets.noninteractive.bg_stroke;
        let fill = ui.style().visuals.widgets.noninteractive.bg_fill;

        egui::Frame::none()
            .inner_margin(egui::Margin::same(14.0))
            .rounding(egui::Rounding::same(6.0))
            .stroke(stroke)
            .fill(fill)
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.label(egui::RichText::new(title).strong().size(17.0));
                    ui.add_space(8.0);
                    add_contents(ui)
                })
                .inner
            })
            .inner
    }

    pub fn status_banner(
        ui: &mut egui::Ui,
        text: &str,
        bg_color: egui::Color32,
        text_color: egui::Color32,
    ) {
        ui.add_sized(
            [ui.available_width(), 32.0],
            egui::Label::new(
                egui::RichText::new(text)
                    .color(text_color)
                    .background_color(bg_color)
                    .size(15.0)
                    .strong(),
            )
            .wrap_mode(egui::TextWrapMode::Extend),
        );
    }

    /// Radial gauge for the current angle, 0-360 degrees clockwise from
    /// the top.
    pub fn angle_gauge(ui: &mut egui::Ui, angle: i32, size: f32, accent: egui::Color32) {
        let (rect, _response) =
            ui.allocate_exact_size(egui::vec2(size, size), egui::Sense::hover());
        let painter = ui.painter_at(rect);
        let center = rect.center();
        let radius = size * 0.5 - 12.0;

        let fg = ui.visuals().strong_text_color();
        let track = ui.visuals().widgets.noninteractive.bg_stroke.color;

        painter.circle_stroke(center, radius, egui::Stroke::new(8.0, track));

        let start = -std::f32::consts::FRAC_PI_2;
        let sweep = (angle as f32 / 360.0).clamp(0.0, 1.0) * std::f32::consts::TAU;
        if sweep > 0.0 {
            let points: Vec<egui::Pos2> = (0..=64)
                .map(|i| {
                    let t = start + sweep * (i as f32 / 64.0);
                    center + radius * egui::vec2(t.cos(), t.sin())
                })
                .collect();
            painter.add(egui::Shape::line(points, egui::Stroke::new(8.0, accent)));
        }

        let tip_angle = start + sweep;
        let tip = center + (radius - 14.0) * egui::vec2(tip_angle.cos(), tip_angle.sin());
        painter.line_segment([center, tip], egui::Stroke::new(3.0, fg));
        painter.circle_filled(center, 5.0, fg);

        painter.text(
            center + egui::vec2(0.0, radius * 0.45),
            egui::Align2::CENTER_CENTER,
            format!("{angle}\u{b0}"),
            egui::FontId::proportional(26.0),
            fg,
        );
    }
}
