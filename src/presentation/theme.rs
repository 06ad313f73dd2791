use crate::domain::models::NoticeVariant;
use eframe::egui;

pub struct Palette {
    pub bg: egui::Color32,
    pub panel: egui::Color32,
    pub fg: egui::Color32,
    pub accent: egui::Color32,
    pub success: egui::Color32,
    pub danger: egui::Color32,
}

impl Palette {
    pub fn new(is_dark: bool) -> Self {
        if is_dark {
            Self {
                bg: egui::Color32::from_rgb(18, 24, 38),
                panel: egui::Color32::from_rgb(28, 36, 54),
                fg: egui::Color32::from_rgb(226, 232, 240),
                accent: egui::Color32::from_rgb(96, 165, 250),
                success: egui::Color32::from_rgb(74, 222, 128),
                danger: egui::Color32::from_rgb(248, 113, 113),
            }
        } else {
            Self {
                bg: egui::Color32::from_rgb(241, 245, 250),
                panel: egui::Color32::WHITE,
                fg: egui::Color32::from_rgb(30, 41, 59),
                accent: egui::Color32::from_rgb(37, 99, 235),
                success: egui::Color32::from_rgb(22, 163, 74),
                danger: egui::Color32::from_rgb(220, 38, 38),
            }
        }
    }
}

pub fn apply_theme(ctx: &egui::Context, is_dark: bool) {
    let mut style = (*ctx.style()).clone();
    let palette = Palette::new(is_dark);

    style
        .text_styles
        .iter_mut()
        .for_each(|(text_style, font_id)| {
            font_id.size = match text_style {
                egui::TextStyle::Heading => 26.0,
                egui::TextStyle::Body => 15.0,
                egui::TextStyle::Button => 15.0,
                _ => font_id.size,
            };
        });

    style.spacing.item_spacing = egui::vec2(10.0, 10.0);
    style.spacing.button_padding = egui::vec2(14.0, 8.0);

    let rounding = egui::Rounding::same(6.0);
    style.visuals.widgets.noninteractive.rounding = rounding;
    style.visuals.widgets.noninteractive.bg_fill = palette.panel;
    style.visuals.widgets.noninteractive.bg_stroke =
        egui::Stroke::new(1.0, palette.fg.gamma_multiply(0.25));
    style.visuals.widgets.noninteractive.fg_stroke = egui::Stroke::new(1.0, palette.fg);

    style.visuals.widgets.inactive.rounding = rounding;
    style.visuals.widgets.inactive.fg_stroke = egui::Stroke::new(1.0, palette.fg);

    style.visuals.widgets.hovered.rounding = rounding;
    style.visuals.widgets.hovered.bg_stroke = egui::Stroke::new(1.5, palette.accent);

    style.visuals.widgets.active.rounding = rounding;
    style.visuals.widgets.active.bg_fill = palette.accent.gamma_multiply(0.35);

    style.visuals.selection.bg_fill = palette.accent;
    style.visuals.selection.stroke = egui::Stroke::new(1.0, palette.bg);

    style.visuals.window_rounding = rounding;
    style.visuals.window_fill = palette.panel;
    style.visuals.panel_fill = palette.bg;
    style.visuals.override_text_color = Some(palette.fg);

    ctx.set_style(style);
}

/// Background and foreground for a toast of the given variant.
pub fn notice_colors(variant: NoticeVariant, is_dark: bool) -> (egui::Color32, egui::Color32) {
    let palette = Palette::new(is_dark);
    match variant {
        NoticeVariant::Default => (palette.panel, palette.fg),
        NoticeVariant::Destructive => (palette.danger, egui::Color32::WHITE),
        NoticeVariant::Success => (palette.success, egui::Color32::WHITE),
    }
}
