use std::{fmt::Write, time::Duration};

use chorus_common::ChatRecord;

/// Render the instruction sent to the model for one generation cycle.
#[must_use]
pub fn build_prompt(history: &[ChatRecord], window: Duration, batch_size: usize) -> String {
    let mut transcript = String::new();
    for record in history {
        let _ = writeln!(transcript, "<{}> {}", record.sender, record.content);
    }

    format!(
        "You are a viewer chatting in a Kick live stream.\n\
         Below is everything said in chat over the last {secs} seconds.\n\
         ---\n\
         {transcript}\
         ---\n\
         Write {batch_size} new chat messages that would fit in naturally here. \
         Match the tone, length, slang, and casing of the messages above. \
         Emotes appear as [emote:ID:NAME]; reuse that exact form when you use one. \
         Do not explain anything or write like an assistant.\n\
         Reply with a JSON object of the form {{\"messages\": [\"...\", \"...\"]}}.",
        secs = window.as_secs(),
    )
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_transcript_and_parameters() {
        let history = vec![
            ChatRecord::new("1", "what a clutch [emote:37226:KEKW]", "streamfan", ""),
            ChatRecord::new("2", "no way", "lurker", ""),
        ];
        let prompt = build_prompt(&history, Duration::from_secs(30), 100);

        assert!(prompt.contains("last 30 seconds"));
        assert!(prompt.contains("<streamfan> what a clutch [emote:37226:KEKW]\n<lurker> no way\n"));
        assert!(prompt.contains("Write 100 new chat messages"));
        assert!(prompt.contains(r#"{"messages": ["#));
    }
}
