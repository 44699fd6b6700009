use crate::model::image_slot::SceneImage;
use crate::model::turn::Turn;

pub enum EngineCommand {
    SubmitPlayerInput(String),
    ClearHistory,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineResponse {
    FullMessageHistory(Vec<Turn>),

    RoundState(RoundState),

    /// `None` hides whatever image was shown before.
    SceneImage(Option<SceneImage>),
}

/// Progress of one submission. Input is accepted only in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundState {
    #[default]
    Idle,
    AwaitingTextResponse,
    AwaitingImageResponse,
}
