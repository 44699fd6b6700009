use serde::{Deserialize, Serialize};
use egui::Color32;
use std::collections::HashMap;

use crate::engine::llm_client::EndpointConfig;
use crate::model::turn::Role;

/// Everything persisted in `settings.json`. The bearer token is deliberately
/// absent: it lives only as long as the process.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub ui_scale: f32,
    pub allow_primary_endpoint: bool,
    pub endpoints: EndpointConfig,

    // Speaker → color mapping
    pub speaker_colors: HashMap<String, [u8; 4]>,
}

impl Default for AppSettings {
    fn default() -> Self {
        let mut speaker_colors = HashMap::new();

        speaker_colors.insert("User".into(), [40, 70, 120, 255]);
        speaker_colors.insert("Narrator".into(), [60, 60, 60, 255]);

        Self {
            ui_scale: 1.0,
            allow_primary_endpoint: true,
            endpoints: EndpointConfig::default(),
            speaker_colors,
        }
    }
}

impl AppSettings {
    pub fn color(&self, role: Role) -> Color32 {
        let key = match role {
            Role::User => "User",
            Role::Narrator => "Narrator",
        };
        self.speaker_colors
            .get(key)
            .map(|c| Color32::from_rgba_unmultiplied(c[0], c[1], c[2], c[3]))
            .unwrap_or(Color32::DARK_GRAY)
    }
}

/// Editable copy shown in the settings window; applied only on Save.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsDraft {
    pub bearer_token: String,
    pub allow_primary_endpoint: bool,
    pub ui_scale: f32,
}

pub enum SettingsAction {
    None,
    Save,
    Cancel,
}

pub fn draw_settings_window(ctx: &egui::Context, draft: &mut SettingsDraft) -> SettingsAction {
    let mut action = SettingsAction::None;

    egui::Window::new("Settings")
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.label("API token (kept for this session only)");
            ui.add(
                egui::TextEdit::singleline(&mut draft.bearer_token)
                    .password(true)
                    .hint_text("optional"),
            );

            ui.checkbox(
                &mut draft.allow_primary_endpoint,
                "Try the primary endpoint first",
            );

            ui.label("UI Scale");
            ui.add(egui::Slider::new(&mut draft.ui_scale, 0.75..=2.0));

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Save").clicked() {
                    action = SettingsAction::Save;
                }
                if ui.button("Close").clicked() {
                    action = SettingsAction::Cancel;
                }
            });
        });

    action
}
