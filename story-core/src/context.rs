//! Conversation context assembly.
//!
//! The remote service keeps no state between calls, so every request
//! replays the whole story: a fixed preamble, the story's metadata, then
//! each logged prompt and its stored response, then the new prompt.

use crate::story::{Prompt, Story};
use chat::Message;

const INTRODUCTION: &str = "I am a story telling generator that works off of your prompts and feedback. I am best used as a companion for tabletop roleplaying games by providing randomly generated descriptions, names and details of characters, monsters, magical items, places, geographic features, quests, puzzles, and many other elements. Ask me to generate something and I will do my best to give you a brief but detailed description using unique names that are thematically appropriate to your story and ruleset.";

const METADATA_QUESTION: &str =
    "Before we get started, what is your story title and theme and what ruleset are you using?";

const ACKNOWLEDGEMENT: &str =
    "Okay let's get started! Ask me to generate something or to elaborate on something I've already written.";

/// Number of messages that precede the replayed log.
pub const PREAMBLE_LEN: usize = 4;

/// Build the full message sequence for a new request against `story`.
///
/// `story` must be the state before the new request. The result always has
/// `PREAMBLE_LEN + 2 * story.log.len() + 1` messages.
pub fn assemble(story: &Story, request: &Prompt) -> Vec<Message> {
    let mut messages = Vec::with_capacity(PREAMBLE_LEN + 2 * story.log.len() + 1);

    messages.push(Message::system(INTRODUCTION));
    messages.push(Message::system(METADATA_QUESTION));
    messages.push(Message::user(story_metadata(story)));
    messages.push(Message::system(ACKNOWLEDGEMENT));

    for entry in &story.log {
        messages.push(Message::user(replay_phrase(&entry.prompt)));
        messages.push(Message::system(entry.response.clone()));
    }

    messages.push(Message::user(request_phrase(request)));
    messages
}

fn story_metadata(story: &Story) -> String {
    format!(
        "My story is titled \"{}\", the theme is \"{}\" and the ruleset is \"{}.\"",
        story.title, story.theme, story.ruleset
    )
}

/// How a logged prompt is restated when the history is replayed.
fn replay_phrase(prompt: &Prompt) -> String {
    match prompt {
        Prompt::Generation { prompt, keywords } => generation_phrase(prompt, keywords.as_deref()),
        Prompt::Elaboration { prompt } => {
            format!("Elaborate and provide unique names for any proper nouns on: \"{prompt}\".")
        }
    }
}

/// How the pending request is phrased.
fn request_phrase(prompt: &Prompt) -> String {
    match prompt {
        Prompt::Generation { prompt, keywords } => generation_phrase(prompt, keywords.as_deref()),
        Prompt::Elaboration { prompt } => format!("Elaborate briefly on \"{prompt}\"."),
    }
}

fn generation_phrase(prompt: &str, keywords: Option<&str>) -> String {
    match keywords {
        Some(keywords) => {
            format!("Generate a \"{prompt}\" using the following keywords: {keywords}.")
        }
        None => format!("Generate a \"{prompt}\"."),
    }
}
