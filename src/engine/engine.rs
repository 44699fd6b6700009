use std::sync::mpsc::{Receiver, Sender};

use crate::engine::llm_client::Transport;
use crate::engine::orchestrator::TurnOrchestrator;
use crate::engine::protocol::{EngineCommand, EngineResponse};

/// Worker side of the UI channel pair. Commands are handled one at a time,
/// so a second submission can never overlap a running round.
pub struct Engine<T: Transport> {
    rx: Receiver<EngineCommand>,
    tx: Sender<EngineResponse>,
    orchestrator: TurnOrchestrator<T>,
}

impl<T: Transport> Engine<T> {
    pub fn new(
        rx: Receiver<EngineCommand>,
        tx: Sender<EngineResponse>,
        orchestrator: TurnOrchestrator<T>,
    ) -> Self {
        Self {
            rx,
            tx,
            orchestrator,
        }
    }

    pub fn run(&mut self) {
        let tx = self.tx.clone();
        let mut emit = move |resp: EngineResponse| {
            // The UI has gone away; the loop ends on the next recv.
            let _ = tx.send(resp);
        };

        self.orchestrator.emit_history(&mut emit);

        while let Ok(cmd) = self.rx.recv() {
            match cmd {
                EngineCommand::SubmitPlayerInput(text) => {
                    if !self.orchestrator.submit(&text, &mut emit) {
                        // Let the UI re-enable input it disabled optimistically.
                        emit(EngineResponse::RoundState(self.orchestrator.state()));
                    }
                }

                EngineCommand::ClearHistory => {
                    self.orchestrator.clear_history(&mut emit);
                }
            }
        }

        log::debug!("engine channel closed");
    }
}
