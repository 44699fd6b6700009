use eframe::egui;

use crate::engine::protocol::RoundState;
use crate::model::turn::Role;
use super::app::{bubble, ClayApp};

const SCENE_MAX_HEIGHT: f32 = 260.0;

pub fn draw_center_panel(ctx: &egui::Context, app: &mut ClayApp) {
    let input_id = egui::Id::new("chat_input_box");
    let input_enabled = !app.ui.round_in_flight;

    // ---------- Input bar ----------
    egui::TopBottomPanel::bottom("chat_input").show(ctx, |ui| {
        let mut send_now = false;

        ui.add_enabled_ui(input_enabled, |ui| {
            ui.horizontal(|ui| {
                let response = ui.add_sized(
                    [ui.available_width() - 60.0, 60.0],
                    egui::TextEdit::multiline(&mut app.ui.input_text)
                        .id(input_id)
                        .hint_text("What do you do? (Do: / Say: / Story:)")
                        .lock_focus(true),
                );

                // Enter vs Shift+Enter
                if response.has_focus()
                    && ui.input(|i| i.key_pressed(egui::Key::Enter) && !i.modifiers.shift)
                {
                    send_now = true;
                }

                if ui.button("Send").clicked() {
                    send_now = true;
                }
            });
        });

        if send_now {
            let text = std::mem::take(&mut app.ui.input_text);
            app.submit(&text);

            // Keep cursor focused
            ui.memory_mut(|m| m.request_focus(input_id));
        }
    });

    // ---------- Scene + story ----------
    egui::CentralPanel::default().show(ctx, |ui| {
        if let Some(texture) = app.ui.scene.current() {
            ui.vertical_centered(|ui| {
                ui.add(
                    egui::Image::new(texture)
                        .max_height(SCENE_MAX_HEIGHT)
                        .max_width(ui.available_width()),
                );
            });
            ui.separator();
        }

        let mut picked: Option<String> = None;

        egui::ScrollArea::vertical()
            .stick_to_bottom(app.ui.should_auto_scroll)
            .show(ui, |ui| {
                for turn in &app.ui.turns {
                    app.draw_message(ui, turn);

                    if turn.role() == Role::Narrator && !turn.choices().is_empty() {
                        ui.horizontal_wrapped(|ui| {
                            for choice in turn.choices() {
                                let button = egui::Button::new(choice.as_str());
                                if ui.add_enabled(input_enabled, button).clicked() {
                                    picked = Some(choice.clone());
                                }
                            }
                        });
                    }
                }

                if app.ui.round_in_flight && app.ui.round != RoundState::AwaitingImageResponse {
                    ui.add_space(6.0);
                    bubble(ui, app.settings.color(Role::Narrator), "… thinking …");
                }
            });

        if let Some(choice) = picked {
            app.submit(&choice);
        }
    });

    app.ui.should_auto_scroll = false;
}
