//! Fullscreen kiosk window
//!
//! A thin display shell: it shows whatever frame the engine last sent and
//! translates keys into engine actions. All composition happens engine-side,
//! so the window never needs the fonts or the layout logic.

use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use image::RgbaImage;

use crate::engine::UserAction;

/// Key bindings, in the order they are dispatched
const KEY_ACTIONS: &[(egui::Key, UserAction)] = &[
    (egui::Key::Escape, UserAction::Quit),
    (egui::Key::Space, UserAction::NewCreation),
    (egui::Key::D, UserAction::Daydream),
    (egui::Key::P, UserAction::ShowPrompt),
    (egui::Key::Q, UserAction::ShowQr),
    (egui::Key::ArrowLeft, UserAction::PreviousRecent),
    (egui::Key::ArrowRight, UserAction::NextRecent),
];

/// The kiosk window state
pub struct KioskApp {
    frames: Receiver<RgbaImage>,
    actions: Sender<UserAction>,
    texture: Option<egui::TextureHandle>,
}

impl KioskApp {
    #[must_use]
    pub fn new(frames: Receiver<RgbaImage>, actions: Sender<UserAction>) -> Self {
        Self {
            frames,
            actions,
            texture: None,
        }
    }

    /// Pull the newest pending frame into a texture, dropping stale ones
    fn refresh_texture(&mut self, ctx: &egui::Context) {
        let mut latest = None;
        while let Ok(frame) = self.frames.try_recv() {
            latest = Some(frame);
        }

        if let Some(frame) = latest {
            let size = [frame.width() as usize, frame.height() as usize];
            let pixels = egui::ColorImage::from_rgba_unmultiplied(size, frame.as_raw());
            self.texture = Some(ctx.load_texture("kiosk-frame", pixels, egui::TextureOptions::LINEAR));
        }
    }

    fn handle_keys(&self, ctx: &egui::Context) {
        for (key, action) in KEY_ACTIONS {
            if ctx.input(|i| i.key_pressed(*key)) {
                tracing::debug!(?action, "key action");
                if self.actions.send(*action).is_err() {
                    tracing::debug!("action channel closed");
                }
                if *action == UserAction::Quit {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            }
        }
    }
}

impl eframe::App for KioskApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.refresh_texture(ctx);
        self.handle_keys(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(egui::Color32::BLACK))
            .show(ctx, |ui| {
                if let Some(texture) = &self.texture {
                    let available = ui.available_size();
                    ui.centered_and_justified(|ui| {
                        ui.add(
                            egui::Image::new(texture)
                                .fit_to_exact_size(available)
                                .maintain_aspect_ratio(true),
                        );
                    });
                }
            });

        // The engine pushes frames asynchronously; poll for them
        ctx.request_repaint_after(std::time::Duration::from_millis(50));
    }
}
