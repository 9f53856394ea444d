//! Debate prompt construction
//!
//! Builds the full prompt for the next turn from the topic and the closed
//! turns of the transcript. Pure: identical inputs give identical output.

use crate::state_machine::state::Turn;
use std::fmt::Write;

const OPENING_POSITION: &str = "You will be presenting the opening argument. Take a clear position on this topic and present your initial arguments.\n\n";

const OPPOSING_POSITION: &str = "You will be responding to the opening argument. Take an opposing or alternative perspective and present your counterarguments.\n\n";

const ENGAGE_INSTRUCTION: &str = "Provide your next argument or response. Be thoughtful, specific, and engage directly with the previous points made.\n";

const OPENING_INSTRUCTION: &str =
    "Provide your opening argument. Be thoughtful, specific, and clearly state your position.\n";

/// Compose the prompt for `participant`.
///
/// `is_opening_turn` is true when the participant has not spoken yet: with an
/// empty transcript it opens the debate, otherwise it takes the opposing side.
/// No size cap is applied to `transcript`.
pub fn compose(topic: &str, transcript: &[Turn], participant: &str, is_opening_turn: bool) -> String {
    let mut prompt = String::new();

    let _ = write!(
        prompt,
        "You are participating in a debate on the topic: \"{topic}\"\n\n"
    );
    let _ = write!(
        prompt,
        "You are {participant}. Your role is to present arguments and respond to your opponent's points.\n\n"
    );

    if is_opening_turn {
        if transcript.is_empty() {
            prompt.push_str(OPENING_POSITION);
        } else {
            prompt.push_str(OPPOSING_POSITION);
        }
    }

    if transcript.is_empty() {
        prompt.push_str(OPENING_INSTRUCTION);
    } else {
        prompt.push_str("Previous discussion:\n");
        prompt.push_str(&format_transcript(transcript));
        prompt.push_str("\n\n");
        prompt.push_str(ENGAGE_INSTRUCTION);
    }

    prompt
}

/// Render turns as `[participant]: content`, separated by blank lines.
pub fn format_transcript(transcript: &[Turn]) -> String {
    transcript
        .iter()
        .map(|turn| format!("{}: {}", attribution(&turn.participant), turn.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Tag naming the speaker of a transcript entry
pub fn attribution(participant: &str) -> String {
    format!("[{participant}]")
}
