// src/gui.rs
use anyhow::Result;
use eframe::egui;
use egui::{Color32, RichText, ScrollArea, Ui, Vec2};
use log::{error, info};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[cfg(feature = "clipboard")]
use arboard::Clipboard;

use crate::ai::connector::InvoiceAnalyzer;
use crate::ai::error::AiError;
use crate::ai::gemini::{GeminiClient, GeminiConfig};
use crate::invoice::attachment::{InvoiceImage, SUPPORTED_EXTENSIONS};

const WINDOW_WIDTH: f32 = 560.0;
const WINDOW_HEIGHT: f32 = 720.0;
const MODEL_CHOICES: &[&str] = &["gemini-1.5-flash", "gemini-1.5-pro", "gemini-2.0-flash"];

/// How an answer should be presented. Classification only selects the
/// widget; the text is rendered verbatim either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    Structured,
    Plain,
}

/// Decide whether an answer is a JSON document worth monospace display.
pub fn classify_answer(answer: &str) -> AnswerKind {
    let trimmed = answer.trim();
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
    {
        return AnswerKind::Structured;
    }
    AnswerKind::Plain
}

struct SharedState {
    processing: bool,
    answer: Option<String>,
    error: Option<String>,
    hint: Option<String>,
}

pub struct InvoiceLensApp {
    config: Option<GeminiConfig>,
    config_error: Option<String>,
    state: Arc<Mutex<SharedState>>,
    invoice: Option<InvoiceImage>,
    preview: Option<egui::TextureHandle>,
    pending_preview: Option<image::DynamicImage>,
    question: String,
    model_name: String,
    was_style_initialized: bool,
}

impl Default for InvoiceLensApp {
    fn default() -> Self {
        let (config, config_error) = match GeminiConfig::from_env() {
            Ok(config) => (Some(config), None),
            Err(e) => {
                error!("Gemini configuration unavailable: {}", e);
                (None, Some(e.to_string()))
            }
        };
        let state = Arc::new(Mutex::new(SharedState {
            processing: false,
            answer: None,
            error: None,
            hint: None,
        }));

        Self {
            config,
            config_error,
            state,
            invoice: None,
            preview: None,
            pending_preview: None,
            question: String::new(),
            model_name: MODEL_CHOICES[0].to_string(),
            was_style_initialized: false,
        }
    }
}

impl eframe::App for InvoiceLensApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.was_style_initialized {
            let mut style = (*ctx.style()).clone();
            style.visuals.widgets.inactive.rounding = egui::Rounding::same(6.0);
            style.visuals.widgets.hovered.rounding = egui::Rounding::same(6.0);
            style.visuals.widgets.active.rounding = egui::Rounding::same(6.0);
            style.visuals.selection.bg_fill = Color32::from_rgb(42, 90, 170);
            style.text_styles.insert(
                egui::TextStyle::Body,
                egui::FontId::new(15.0, egui::FontFamily::Proportional),
            );
            style.text_styles.insert(
                egui::TextStyle::Button,
                egui::FontId::new(15.0, egui::FontFamily::Proportional),
            );
            style.text_styles.insert(
                egui::TextStyle::Heading,
                egui::FontId::new(22.0, egui::FontFamily::Proportional),
            );
            ctx.set_style(style);
            self.was_style_initialized = true;
        }

        // Upload a freshly decoded preview to the GPU outside the state lock
        if let Some(decoded) = self.pending_preview.take() {
            let size = [decoded.width() as usize, decoded.height() as usize];
            let egui_image = egui::ColorImage::from_rgba_unmultiplied(
                size,
                decoded.to_rgba8().as_flat_samples().as_slice(),
            );
            self.preview = Some(ctx.load_texture(
                "invoice_preview",
                egui_image,
                egui::TextureOptions::LINEAR,
            ));
        }

        let processing = self.state.lock().unwrap().processing;
        if processing {
            ctx.request_repaint_after(Duration::from_millis(150));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(6.0);
            ui.heading(RichText::new("Invoice Lens").size(22.0));
            ui.separator();
            ui.add_space(8.0);

            if let Some(config_error) = &self.config_error {
                ui.colored_label(Color32::from_rgb(230, 120, 100), config_error);
                ui.label(
                    RichText::new("Set GOOGLE_API_KEY in your environment or a .env file, then restart.")
                        .small(),
                );
                ui.add_space(8.0);
            }

            self.draw_input_row(ui);
            ui.add_space(8.0);
            self.draw_controls_row(ui, processing);
            ui.add_space(8.0);

            ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |scroll_ui| {
                    self.draw_preview(scroll_ui);
                    self.draw_output(scroll_ui);
                });
        });
    }
}

impl InvoiceLensApp {
    fn draw_input_row(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            let text_edit = egui::TextEdit::singleline(&mut self.question)
                .hint_text("Ask a question about the invoice...")
                .desired_width(ui.available_width() - 120.0)
                .margin(egui::vec2(8.0, 6.0))
                .font(egui::TextStyle::Body);
            let response = ui.add(text_edit);
            ui.add_space(4.0);
            if ui
                .add_sized(
                    [108.0, 32.0],
                    egui::Button::new(RichText::new("📂 Attach...").size(14.0))
                        .fill(Color32::from_rgb(45, 45, 45))
                        .rounding(6.0),
                )
                .clicked()
            {
                self.pick_invoice_file();
            }
            // Enter in the question field submits, like the button below
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                self.submit_question();
            }
        });
    }

    fn draw_controls_row(&mut self, ui: &mut Ui, processing: bool) {
        ui.horizontal(|ui| {
            ui.label(RichText::new("Model:").size(14.0));
            let current_model = self.model_name.clone();
            egui::ComboBox::from_id_source("model_selector")
                .selected_text(&current_model)
                .width(180.0)
                .show_ui(ui, |ui| {
                    for model_choice in MODEL_CHOICES {
                        if ui
                            .selectable_label(self.model_name == *model_choice, *model_choice)
                            .clicked()
                        {
                            self.model_name = model_choice.to_string();
                        }
                    }
                });
            ui.add_space(8.0);
            if processing {
                ui.spinner();
                ui.label(RichText::new("Waiting for Gemini...").small());
            } else if ui
                .add_sized(
                    [180.0, 32.0],
                    egui::Button::new(RichText::new("Tell me about the invoice").size(14.0))
                        .fill(Color32::from_rgb(42, 90, 170))
                        .rounding(6.0),
                )
                .clicked()
            {
                self.submit_question();
            }
        });
    }

    fn draw_preview(&mut self, ui: &mut Ui) {
        if let Some(texture) = self.preview.clone() {
            ui.add_space(5.0);
            ui.heading(RichText::new("Uploaded Image").size(18.0));
            ui.add_space(5.0);
            let available_width = ui.available_width();
            let aspect_ratio = texture.size_vec2().x / texture.size_vec2().y;
            let image_height = if aspect_ratio > 0.0 {
                available_width / aspect_ratio
            } else {
                available_width
            };
            let image_size = Vec2::new(available_width, image_height);
            ui.image((texture.id(), image_size));
            if let Some(invoice) = &self.invoice {
                ui.label(
                    RichText::new(format!("{} bytes, {}", invoice.len(), invoice.mime_type()))
                        .small()
                        .color(Color32::from_rgb(150, 150, 150)),
                );
            }
            ui.add_space(8.0);
        }
    }

    fn draw_output(&mut self, ui: &mut Ui) {
        let (answer, error, hint) = {
            let state = self.state.lock().unwrap();
            (state.answer.clone(), state.error.clone(), state.hint.clone())
        };

        if let Some(answer) = answer {
            ui.add_space(5.0);
            ui.heading(RichText::new("The response is:").size(18.0));
            ui.add_space(5.0);
            egui::Frame::none()
                .fill(Color32::from_rgb(35, 35, 35))
                .rounding(8.0)
                .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                .show(ui, |ui| {
                    match classify_answer(&answer) {
                        AnswerKind::Structured => {
                            ui.label(RichText::new(&answer).monospace());
                        }
                        AnswerKind::Plain => {
                            ui.label(RichText::new(&answer));
                        }
                    }
                });
            ui.add_space(4.0);
            if ui
                .add(
                    egui::Button::new(RichText::new("📋 Copy answer").size(13.0))
                        .fill(Color32::from_rgb(45, 45, 45))
                        .rounding(6.0),
                )
                .clicked()
            {
                self.copy_answer_to_clipboard(&answer);
            }
        }

        if let Some(error) = error {
            ui.add_space(5.0);
            ui.colored_label(Color32::from_rgb(230, 120, 100), error);
            if let Some(hint) = hint {
                ui.label(RichText::new(hint).small());
            }
        }
    }

    fn pick_invoice_file(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Invoice images", SUPPORTED_EXTENSIONS)
            .pick_file();
        let Some(path) = picked else {
            return;
        };

        match InvoiceImage::from_path(&path) {
            Ok(invoice) => {
                // Preview decode is best effort; the raw bytes are what gets sent
                match invoice.decode_preview() {
                    Ok(decoded) => self.pending_preview = Some(decoded),
                    Err(e) => {
                        error!("Preview decode failed: {}", e);
                        self.pending_preview = None;
                        self.preview = None;
                    }
                }
                self.invoice = Some(invoice);
                let mut state = self.state.lock().unwrap();
                state.answer = None;
                state.error = None;
                state.hint = None;
            }
            Err(e) => {
                error!("Could not attach {}: {:#}", path.display(), e);
                let mut state = self.state.lock().unwrap();
                state.error = Some(format!("{:#}", e));
                state.hint = None;
            }
        }
    }

    fn submit_question(&mut self) {
        if self.state.lock().unwrap().processing {
            return;
        }

        // The no-image path never spawns a worker, let alone a request
        let Some(invoice) = self.invoice.clone() else {
            let mut state = self.state.lock().unwrap();
            state.answer = None;
            state.error = Some(AiError::MissingImage.to_string());
            state.hint = None;
            return;
        };

        let config = match &self.config {
            Some(config) => config.clone().with_model(self.model_name.clone()),
            None => {
                let error = AiError::Config("GOOGLE_API_KEY is not set".to_string());
                let mut state = self.state.lock().unwrap();
                state.answer = None;
                state.hint = error.hint().map(str::to_string);
                state.error = Some(error.to_string());
                return;
            }
        };

        let question = self.question.trim().to_string();
        let state_clone = Arc::clone(&self.state);
        {
            let mut state = self.state.lock().unwrap();
            state.processing = true;
            state.answer = None;
            state.error = None;
            state.hint = None;
        }

        info!("Submitting invoice question to {}", self.model_name);
        thread::spawn(move || {
            let outcome = GeminiClient::new(config)
                .and_then(|client| client.answer_question(Some(&invoice), &question));

            let mut state = state_clone.lock().unwrap();
            match outcome {
                Ok(answer) => {
                    info!("Received answer ({} chars)", answer.len());
                    state.answer = Some(answer);
                }
                Err(e) => {
                    error!("Invoice question failed: {}", e);
                    state.hint = e.hint().map(str::to_string);
                    state.error = Some(e.to_string());
                }
            }
            state.processing = false;
        });
    }

    fn copy_answer_to_clipboard(&self, answer: &str) {
        #[cfg(feature = "clipboard")]
        {
            match Clipboard::new() {
                Ok(mut clipboard) => {
                    if let Err(e) = clipboard.set_text(answer.to_string()) {
                        error!("Failed to copy answer to clipboard: {}", e);
                    } else {
                        info!("Answer copied to clipboard");
                    }
                }
                Err(e) => {
                    error!("Failed to access clipboard: {}", e);
                }
            }
        }
        #[cfg(not(feature = "clipboard"))]
        {
            let _ = answer;
            let mut state = self.state.lock().unwrap();
            state.error = Some("Clipboard feature not enabled in this build.".to_string());
            error!("Clipboard feature not enabled. Enable the 'clipboard' feature in Cargo.toml");
        }
    }
}

pub fn run_gui() -> Result<()> {
    info!("Invoice Lens GUI starting up...");

    let native_options = eframe::NativeOptions {
        initial_window_size: Some(egui::vec2(WINDOW_WIDTH, WINDOW_HEIGHT)),
        min_window_size: Some(egui::vec2(420.0, 480.0)),
        ..eframe::NativeOptions::default()
    };

    eframe::run_native(
        "Invoice Lens",
        native_options,
        Box::new(|_cc| Box::new(InvoiceLensApp::default())),
    )
    .map_err(|e| anyhow::anyhow!("Failed to start GUI: {}", e))?;

    Ok(())
}
