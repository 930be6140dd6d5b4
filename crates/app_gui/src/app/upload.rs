//! Rendering of the upload form, preview and result banner.

use super::UiApp;
use eframe::egui::{self, Color32, RichText};
use lesion_core::{Banner, Tone};

const PREVIEW_MAX_HEIGHT: f32 = 200.0;

impl UiApp {
    /// Renders the whole screen: header, picker, predict button, preview, banner.
    pub(super) fn render_upload_panel(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(8.0);
            ui.heading("Skin Cancer Classifier");
            ui.label("Upload a skin lesion image to predict if it's benign or malignant.");
        });
        ui.add_space(12.0);

        let busy = self.view.is_busy();
        ui.vertical_centered_justified(|ui| {
            let pick_label = if self.view.selected().is_some() {
                "Change Image"
            } else {
                "Select Image"
            };
            if ui
                .add_enabled(!busy, egui::Button::new(pick_label))
                .clicked()
            {
                self.pick_file();
            }
            if let Some(file) = self.view.selected() {
                ui.label(
                    RichText::new(format!("{} ({} bytes)", file.name(), file.len())).weak(),
                );
            }

            ui.add_space(6.0);
            let predict_label = if busy { "Predicting..." } else { "Predict" };
            if ui
                .add_enabled(self.view.can_submit(), egui::Button::new(predict_label))
                .clicked()
            {
                self.start_prediction(ui.ctx());
            }
            if busy {
                ui.add(egui::ProgressBar::new(0.0).animate(true));
            }
        });

        self.render_preview(ui);
        self.render_banner(ui);

        ui.add_space(16.0);
        ui.separator();
        ui.label(RichText::new(format!("Endpoint: {}", self.config.endpoint)).small().weak());
    }

    fn render_preview(&self, ui: &mut egui::Ui) {
        let Some(preview) = &self.preview else {
            return;
        };
        if self.view.selected().is_none() {
            return;
        }
        ui.add_space(12.0);
        ui.vertical_centered(|ui| {
            ui.label(RichText::new("Preview").strong());
            match &preview.texture {
                Some(texture) => {
                    ui.add(
                        egui::Image::new(texture)
                            .max_height(PREVIEW_MAX_HEIGHT)
                            .max_width(ui.available_width()),
                    );
                }
                None => {
                    ui.label(RichText::new("Preview unavailable").weak());
                }
            }
        });
    }

    fn render_banner(&self, ui: &mut egui::Ui) {
        let Some(banner) = self.view.banner(&self.config.malignant_label) else {
            return;
        };
        let (fill, text) = tone_colors(banner.tone());
        ui.add_space(12.0);
        egui::Frame::new()
            .fill(fill)
            .corner_radius(4.0)
            .inner_margin(egui::Margin::same(10))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                match &banner {
                    Banner::Failure(message) => {
                        ui.label(RichText::new(message).color(text));
                    }
                    Banner::Verdict {
                        label, probability, ..
                    } => {
                        ui.horizontal(|ui| {
                            ui.label(RichText::new("Result:").strong().color(text));
                            ui.label(RichText::new(label).color(text));
                        });
                        ui.horizontal(|ui| {
                            ui.label(RichText::new("Probability:").strong().color(text));
                            ui.label(RichText::new(probability).color(text));
                        });
                    }
                }
            });
    }
}

/// Background and text colour per banner tone.
fn tone_colors(tone: Tone) -> (Color32, Color32) {
    match tone {
        Tone::Success => (
            Color32::from_rgb(237, 247, 237),
            Color32::from_rgb(30, 70, 32),
        ),
        Tone::Warning => (
            Color32::from_rgb(255, 244, 229),
            Color32::from_rgb(102, 60, 0),
        ),
        Tone::Error => (
            Color32::from_rgb(253, 237, 237),
            Color32::from_rgb(95, 33, 32),
        ),
    }
}
