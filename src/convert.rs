//! Jsonmend - Chat-transcript conversion
//!
//! Maps (invalid, fixed) pairs into the two-turn transcripts used as SFT
//! input by the external trainer.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::client::ChatMessage;
use crate::pretty::{self, FormatError};
use crate::records::Example;

/// One training transcript.
#[derive(Debug, Serialize)]
pub struct Conversation {
    pub conversations: Vec<ChatMessage>,
}

/// Build the two-turn transcript for one example. The assistant turn carries
/// the prettified ground truth inside a ```json fence so the model learns to
/// answer in exactly that shape.
pub fn to_conversation(example: &Example) -> Result<Conversation, FormatError> {
    let fixed_pretty = pretty::prettify(&example.fixed_json)?;

    Ok(Conversation {
        conversations: vec![
            ChatMessage::user(format!("Fix this JSON:\n{}", example.invalid_json)),
            ChatMessage::assistant(format!("```json\n{}\n```\n", fixed_pretty)),
        ],
    })
}

/// Convert a whole dataset, failing with the offending record's line number
/// if any ground truth does not parse.
pub fn convert_all(examples: &[Example]) -> Result<Vec<Conversation>> {
    examples
        .iter()
        .enumerate()
        .map(|(i, example)| {
            to_conversation(example)
                .with_context(|| format!("record {}: fixed_json does not parse", i + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_turn_structure() {
        let example = Example {
            invalid_json: "{a: 1}".to_string(),
            fixed_json: r#"{"a": 1}"#.to_string(),
            fixed_reason: String::new(),
        };

        let conversation = to_conversation(&example).unwrap();
        assert_eq!(conversation.conversations.len(), 2);
        assert_eq!(conversation.conversations[0].role, "user");
        assert_eq!(
            conversation.conversations[0].content,
            "Fix this JSON:\n{a: 1}"
        );
        assert_eq!(conversation.conversations[1].role, "assistant");
        assert_eq!(
            conversation.conversations[1].content,
            "```json\n{\n  \"a\": 1\n}\n```\n"
        );
    }

    #[test]
    fn test_assistant_turn_expands_embedded_json() {
        let example = Example {
            invalid_json: "irrelevant".to_string(),
            fixed_json: r#"{"payload": "{\"x\":1}"}"#.to_string(),
            fixed_reason: String::new(),
        };

        let conversation = to_conversation(&example).unwrap();
        assert!(conversation.conversations[1].content.contains("\"x\": 1"));
    }

    #[test]
    fn test_invalid_ground_truth_fails() {
        let example = Example {
            invalid_json: "{a: 1}".to_string(),
            fixed_json: "{a: 1}".to_string(),
            fixed_reason: String::new(),
        };
        assert!(to_conversation(&example).is_err());

        let err = convert_all(&[example]).unwrap_err();
        assert!(err.to_string().contains("record 1"));
    }
}
