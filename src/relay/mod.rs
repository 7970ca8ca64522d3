//! Streaming inference relay to the external completion service

pub mod client;

pub use client::{EndReason, InferenceClient, RelayEvent};

/// Stop sequence marking the start of the next human turn
pub const HUMAN_TURN_MARKER: &str = "\n### Human:";

/// Format a user message into the provider's prompt template: a fixed
/// system instruction followed by a human/assistant turn marker.
pub fn format_prompt(instruction: &str, message: &str) -> String {
    format!("{}\n\n### Human: {}\n### Assistant:", instruction, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_template() {
        let prompt = format_prompt("Be helpful.", "What is Rust?");
        assert_eq!(prompt, "Be helpful.\n\n### Human: What is Rust?\n### Assistant:");
    }

    #[test]
    fn test_stop_marker_matches_template() {
        let prompt = format_prompt("inst", "q");
        assert!(prompt.contains("### Human:"));
        assert!(HUMAN_TURN_MARKER.starts_with('\n'));
    }
}
