use eframe::egui;
use egui::{Layout, TextureHandle};
use std::sync::mpsc;
use std::time::Duration;

use crate::engine::engine::Engine;
use crate::engine::llm_client::{FallbackClient, HttpTransport};
use crate::engine::orchestrator::TurnOrchestrator;
use crate::engine::protocol::{EngineCommand, EngineResponse, RoundState};
use crate::model::image_slot::{ImageSlot, SceneImage};
use crate::model::policy::{GenerationRequestPolicy, SharedPolicy};
use crate::model::session::SessionHistory;
use crate::model::turn::{Role, Turn};
use crate::ui::center_panel::draw_center_panel;
use crate::ui::settings::{draw_settings_window, AppSettings, SettingsAction, SettingsDraft};
use crate::ui::settings_io;

/* =========================
   UI State
   ========================= */

#[derive(Default)]
pub(crate) struct UiState {
    pub(crate) input_text: String,
    pub(crate) turns: Vec<Turn>,
    pub(crate) round: RoundState,

    /// Set when a submission is sent, cleared when the engine reports `Idle`.
    pub(crate) round_in_flight: bool,

    pub(crate) scene: ImageSlot<TextureHandle>,
    pub(crate) should_auto_scroll: bool,

    settings_draft: Option<SettingsDraft>,
    confirm_clear: bool,
}

/* =========================
   App
   ========================= */

pub struct ClayApp {
    pub(crate) ui: UiState,
    pub(crate) settings: AppSettings,
    policy: SharedPolicy,

    cmd_tx: mpsc::Sender<EngineCommand>,
    resp_rx: mpsc::Receiver<EngineResponse>,
}

impl ClayApp {
    pub fn new(settings: AppSettings) -> anyhow::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();

        let policy = SharedPolicy::new(GenerationRequestPolicy {
            allow_primary_endpoint: settings.allow_primary_endpoint,
            bearer_token: String::new(),
        });

        let transport =
            HttpTransport::new(Duration::from_secs(settings.endpoints.timeout_secs))?;
        let orchestrator = TurnOrchestrator::new(
            FallbackClient::new(transport, settings.endpoints.clone()),
            SessionHistory::load(settings_io::history_path()),
            policy.clone(),
        );

        std::thread::Builder::new()
            .name("engine".into())
            .spawn(move || {
                let mut engine = Engine::new(cmd_rx, resp_tx, orchestrator);
                engine.run();
            })?;

        Ok(Self {
            ui: UiState {
                should_auto_scroll: true,
                ..Default::default()
            },
            settings,
            policy,
            cmd_tx,
            resp_rx,
        })
    }

    pub(crate) fn submit(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() || self.ui.round_in_flight {
            return;
        }

        match self
            .cmd_tx
            .send(EngineCommand::SubmitPlayerInput(text.to_string()))
        {
            Ok(()) => self.ui.round_in_flight = true,
            Err(_) => log::error!("engine thread is not running"),
        }
    }

    pub(crate) fn draw_message(&self, ui: &mut egui::Ui, turn: &Turn) {
        let bg = self.settings.color(turn.role());

        ui.add_space(6.0);

        if turn.role() == Role::User {
            ui.with_layout(Layout::right_to_left(egui::Align::TOP), |ui| {
                bubble(ui, bg, turn.text());
            });
        } else {
            bubble(ui, bg, turn.text());
        }
    }

    fn handle_response(&mut self, ctx: &egui::Context, resp: EngineResponse) {
        match resp {
            EngineResponse::FullMessageHistory(turns) => {
                self.ui.turns = turns;
                self.ui.should_auto_scroll = true;
            }
            EngineResponse::RoundState(state) => {
                self.ui.round = state;
                if state == RoundState::Idle {
                    self.ui.round_in_flight = false;
                }
            }
            EngineResponse::SceneImage(Some(image)) => {
                self.ui.scene.show(upload_scene(ctx, &image));
            }
            EngineResponse::SceneImage(None) => {
                self.ui.scene.clear();
            }
        }
    }

    fn open_settings(&mut self) {
        let policy = self.policy.snapshot();
        self.ui.settings_draft = Some(SettingsDraft {
            bearer_token: policy.bearer_token,
            allow_primary_endpoint: policy.allow_primary_endpoint,
            ui_scale: self.settings.ui_scale,
        });
    }

    fn apply_settings(&mut self, draft: SettingsDraft) {
        self.policy.set(GenerationRequestPolicy {
            allow_primary_endpoint: draft.allow_primary_endpoint,
            bearer_token: draft.bearer_token.trim().to_string(),
        });

        self.settings.allow_primary_endpoint = draft.allow_primary_endpoint;
        self.settings.ui_scale = draft.ui_scale;
        settings_io::save_settings(&self.settings);
    }
}

/* =========================
   egui App
   ========================= */

impl eframe::App for ClayApp {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        ctx.set_pixels_per_point(self.settings.ui_scale);

        while let Ok(resp) = self.resp_rx.try_recv() {
            self.handle_response(ctx, resp);
        }

        /* TOOLBAR */
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("ClayDungeon");
                ui.with_layout(Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Clear story").clicked() {
                        self.ui.confirm_clear = true;
                    }
                    if ui.button("Settings").clicked() {
                        self.open_settings();
                    }
                });
            });
        });

        draw_center_panel(ctx, self);

        if let Some(draft) = self.ui.settings_draft.as_mut() {
            match draw_settings_window(ctx, draft) {
                SettingsAction::None => {}
                SettingsAction::Save => {
                    if let Some(draft) = self.ui.settings_draft.take() {
                        self.apply_settings(draft);
                    }
                }
                SettingsAction::Cancel => self.ui.settings_draft = None,
            }
        }

        if self.ui.confirm_clear {
            egui::Window::new("Clear story")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label("Clear the saved story?");
                    ui.horizontal(|ui| {
                        if ui.button("Clear").clicked() {
                            if self.cmd_tx.send(EngineCommand::ClearHistory).is_err() {
                                log::error!("engine thread is not running");
                            }
                            self.ui.confirm_clear = false;
                        }
                        if ui.button("Cancel").clicked() {
                            self.ui.confirm_clear = false;
                        }
                    });
                });
        }

        if self.ui.round_in_flight {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

/* =========================
   UI Helpers
   ========================= */

fn upload_scene(ctx: &egui::Context, image: &SceneImage) -> TextureHandle {
    let color_image =
        egui::ColorImage::from_rgba_unmultiplied([image.width, image.height], &image.rgba);
    ctx.load_texture("scene", color_image, egui::TextureOptions::LINEAR)
}

pub(crate) fn bubble(ui: &mut egui::Ui, color: egui::Color32, text: &str) {
    egui::Frame::new()
        .fill(color)
        .corner_radius(egui::CornerRadius::same(8))
        .inner_margin(egui::Margin::symmetric(10, 6))
        .show(ui, |ui| {
            ui.label(egui::RichText::new(text).color(egui::Color32::WHITE));
        });
}
