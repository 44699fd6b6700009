use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::session::SessionHistory;
use crate::model::turn::Turn;

/// How many past turns are replayed into each prompt.
pub const CONTEXT_TURNS: usize = 12;

/// Narrator role and output convention sent as the system message.
pub const NARRATOR_INSTRUCTION: &str = "You are a Game Master for an interactive text adventure.\n\
Respond vividly, describe environment, characters, consequences of actions.\n\
At the end, suggest 2-4 concise next moves for the player in format: [Option 1] | [Option 2] ...";

static COMMAND_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^(Do|Say|Story):\s*(.*)$").expect("valid command pattern"));

/// Builds the user message for the narrator.
/// Only formats text: no networking, and the history is never modified.
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build(history: &SessionHistory, player_input: &str) -> String {
        let mut prompt = String::new();

        push_history_lines(&mut prompt, history.recent(CONTEXT_TURNS));
        push_player_action(&mut prompt, player_input);
        prompt.push_str("Narrator: Continue the story.");

        prompt
    }
}

fn push_history_lines(prompt: &mut String, turns: &[Turn]) {
    for turn in turns {
        prompt.push_str(turn.role().speaker());
        prompt.push_str(": ");
        prompt.push_str(turn.text());
        prompt.push('\n');
    }
}

fn push_player_action(prompt: &mut String, player_input: &str) {
    prompt.push_str("Player: ");
    prompt.push_str(&player_command(player_input));
    prompt.push('\n');
}

/// `Do:`, `Say:` and `Story:` prefixes pass through as typed; anything else is an action.
fn player_command(input: &str) -> String {
    match COMMAND_PREFIX.captures(input) {
        Some(caps) => format!("{}: {}", &caps[1], &caps[2]),
        None => format!("Do: {input}"),
    }
}
