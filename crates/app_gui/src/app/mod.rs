use anyhow::Result;
use eframe::{App, Frame, egui};
use lesion_core::{Classifier, ClientConfig, HttpClassifier, SelectedFile, UploadView};
use rfd::FileDialog;
use std::sync::Arc;
use std::time::Duration;

mod upload;

/// Longest edge of the decoded preview; the widget scales it further down.
const PREVIEW_EDGE: u32 = 800;
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"];

pub struct UiApp {
    config: ClientConfig,
    classifier: Arc<dyn Classifier>,
    view: UploadView,
    preview: Option<Preview>,
}

/// Texture for one preview revision. Dropping it frees the GPU texture.
struct Preview {
    revision: u64,
    texture: Option<egui::TextureHandle>,
}

impl UiApp {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let classifier = HttpClassifier::new(&config)?;
        tracing::info!("Classifier endpoint: {}", classifier.endpoint());
        let classifier = Arc::new(classifier);
        Ok(Self {
            config,
            classifier,
            view: UploadView::new(),
            preview: None,
        })
    }

    fn pick_file(&mut self) {
        // Cancelling the dialog keeps the current selection.
        let Some(path) = FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
        else {
            return;
        };
        match SelectedFile::open(&path) {
            Ok(file) => {
                if file.is_empty() {
                    tracing::warn!("{} is empty", path.display());
                }
                tracing::info!("Selected {} ({} bytes)", file.name(), file.len());
                self.view.select_file(Some(file));
            }
            Err(e) => {
                tracing::warn!("{e:#}");
                self.view.select_file(None);
            }
        }
    }

    fn start_prediction(&mut self, ctx: &egui::Context) {
        let ctx = ctx.clone();
        self.view
            .submit(self.classifier.clone(), move || ctx.request_repaint());
    }

    fn sync_preview(&mut self, ctx: &egui::Context) {
        let revision = self.view.preview_revision();
        if self.preview.as_ref().is_some_and(|p| p.revision == revision) {
            return;
        }
        let texture = self.view.selected().and_then(|file| {
            let color = decode_preview(file.bytes(), PREVIEW_EDGE)?;
            let name = format!("preview:{revision}:{}", file.name());
            Some(ctx.load_texture(name, color, egui::TextureOptions::LINEAR))
        });
        if texture.is_none() && self.view.selected().is_some() {
            tracing::warn!("No preview available for the selected file");
        }
        self.preview = Some(Preview { revision, texture });
    }
}

/// Decodes and downsizes image bytes for display. Returns `None` for data the
/// `image` crate cannot read; the file can still be submitted.
fn decode_preview(bytes: &[u8], max_edge: u32) -> Option<egui::ColorImage> {
    match image::load_from_memory(bytes) {
        Ok(img) => {
            let img = if img.width() > max_edge || img.height() > max_edge {
                img.thumbnail(max_edge, max_edge)
            } else {
                img
            };
            let thumb = img.to_rgba8();
            let (w, h) = thumb.dimensions();
            let size = [w as usize, h as usize];
            let pixels = thumb.into_raw();
            Some(egui::ColorImage::from_rgba_unmultiplied(size, &pixels))
        }
        Err(e) => {
            tracing::warn!("Failed to decode preview: {e}");
            None
        }
    }
}

impl App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.view.poll();
        self.sync_preview(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| self.render_upload_panel(ui));
        });

        if self.view.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
