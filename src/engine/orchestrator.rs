use crate::engine::llm_client::{FallbackClient, Transport};
use crate::engine::prompt_builder::PromptBuilder;
use crate::engine::protocol::{EngineResponse, RoundState};
use crate::model::policy::SharedPolicy;
use crate::model::session::SessionHistory;
use crate::model::turn::Role;

/// Characters of narration used as the image prompt.
pub const IMAGE_PROMPT_CHARS: usize = 120;

/// Stands in for narration that was nothing but choice tokens.
const EMPTY_NARRATION: &str = "…";

/// Runs one submission from player input to scene image.
///
/// Owns the session history; every step is reported through `emit` so the
/// caller can mirror it on screen.
pub struct TurnOrchestrator<T: Transport> {
    client: FallbackClient<T>,
    history: SessionHistory,
    policy: SharedPolicy,
    state: RoundState,
}

impl<T: Transport> TurnOrchestrator<T> {
    pub fn new(client: FallbackClient<T>, history: SessionHistory, policy: SharedPolicy) -> Self {
        Self {
            client,
            history,
            policy,
            state: RoundState::Idle,
        }
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    #[cfg(test)]
    pub fn client(&self) -> &FallbackClient<T> {
        &self.client
    }

    /// Returns `false` when the input was blank or a round was already running.
    pub fn submit(&mut self, input: &str, emit: &mut dyn FnMut(EngineResponse)) -> bool {
        let input = input.trim();
        if input.is_empty() {
            return false;
        }
        if self.state != RoundState::Idle {
            log::warn!("submission ignored, round already in progress");
            return false;
        }

        if self.history.append(Role::User, input, Vec::new()).is_err() {
            return false;
        }
        self.emit_history(emit);
        self.set_state(RoundState::AwaitingTextResponse, emit);

        let prompt = PromptBuilder::build(&self.history, input);
        log::info!("requesting narration ({} history turns)", self.history.len());

        let narration = match self.client.request_text(&prompt, &self.policy.snapshot()) {
            Ok(result) => result,
            Err(e) => {
                log::error!("narration failed: {e}");
                self.append_narrator(&format!("Error: {e}"), Vec::new());
                self.emit_history(emit);
                self.set_state(RoundState::Idle, emit);
                return true;
            }
        };

        let text = if narration.narrative_text.is_empty() {
            EMPTY_NARRATION
        } else {
            narration.narrative_text.as_str()
        };
        self.append_narrator(text, narration.suggested_choices);
        self.emit_history(emit);
        self.set_state(RoundState::AwaitingImageResponse, emit);

        let image_prompt: String = text.chars().take(IMAGE_PROMPT_CHARS).collect();
        let image = self.client.request_image(&image_prompt, &self.policy.snapshot());
        log::debug!("scene image {}", if image.is_some() { "ready" } else { "absent" });
        emit(EngineResponse::SceneImage(image));

        self.set_state(RoundState::Idle, emit);
        true
    }

    pub fn clear_history(&mut self, emit: &mut dyn FnMut(EngineResponse)) {
        self.history.clear();
        log::info!("story cleared");
        self.emit_history(emit);
    }

    pub fn emit_history(&self, emit: &mut dyn FnMut(EngineResponse)) {
        emit(EngineResponse::FullMessageHistory(self.history.turns().to_vec()));
    }

    fn append_narrator(&mut self, text: &str, choices: Vec<String>) {
        if let Err(e) = self.history.append(Role::Narrator, text, choices) {
            log::warn!("narrator turn dropped: {e}");
        }
    }

    fn set_state(&mut self, state: RoundState, emit: &mut dyn FnMut(EngineResponse)) {
        self.state = state;
        emit(EngineResponse::RoundState(state));
    }
}
