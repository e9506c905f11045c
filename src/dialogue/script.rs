//! Conversation scripts
//!
//! A script is the ordered list of lines one team speaks in a round. Each
//! line is released once a simulated reader could have got through every
//! line before it, so lines carry a cumulative reading offset measured in
//! characters (or tokens, when the script provides a count).

use serde::{Deserialize, Serialize};

use crate::core::config::DialogueConfig;
use crate::core::error::Result;
use crate::core::types::{GroupId, MemberId};

/// One raw script entry. Every field is optional so that broken entries
/// survive loading and can be skipped at playback time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueEntry {
    #[serde(default, alias = "id")]
    pub speaker_id: Option<MemberId>,
    #[serde(default, alias = "message", alias = "line")]
    pub text: Option<String>,
    #[serde(default, alias = "token")]
    pub token_count: Option<u32>,
}

impl DialogueEntry {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker_id: Some(MemberId::new(speaker)),
            text: Some(text.into()),
            token_count: None,
        }
    }

    pub fn with_token_count(mut self, tokens: u32) -> Self {
        self.token_count = Some(tokens);
        self
    }

    /// Reading weight: the token count if positive, else the character count
    pub fn weight(&self) -> u32 {
        match self.token_count {
            Some(tokens) if tokens > 0 => tokens,
            _ => self
                .text
                .as_deref()
                .map(|t| t.chars().count() as u32)
                .unwrap_or(0),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.speaker_id.is_some() && self.text.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    pub entry: DialogueEntry,
    /// Sum of the weights of every earlier line
    pub cumulative_offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    lines: Vec<ScriptLine>,
}

impl Script {
    pub fn new(entries: Vec<DialogueEntry>) -> Self {
        let mut offset = 0u32;
        let lines = entries
            .into_iter()
            .map(|entry| {
                let line = ScriptLine {
                    cumulative_offset: offset,
                    entry,
                };
                offset = offset.saturating_add(line.entry.weight());
                line
            })
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[ScriptLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Serialized form: `[{"team_id": 1, "conversation": [...]}, ...]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamScript {
    pub team_id: GroupId,
    #[serde(default)]
    pub conversation: Vec<DialogueEntry>,
}

impl TeamScript {
    pub fn from_json(content: &str) -> Result<Vec<TeamScript>> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &std::path::Path) -> Result<Vec<TeamScript>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// Split into pieces of at most `chunk_size` characters. An empty line
/// still yields one (empty) chunk.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || chunk_size == 0 {
        return vec![text.to_string()];
    }
    chars
        .chunks(chunk_size)
        .map(|c| c.iter().collect())
        .collect()
}

/// How long a chunk stays on screen
pub fn chunk_duration_ms(chunk: &str, config: &DialogueConfig) -> u64 {
    let chars = chunk.chars().count() as u64;
    (chars * config.ms_per_char).max(config.min_chunk_duration_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cumulative_offsets() {
        let script = Script::new(vec![
            DialogueEntry::new("a", "hello").with_token_count(3),
            DialogueEntry::new("b", "world!"),
            DialogueEntry::new("a", "zero tokens").with_token_count(0),
            DialogueEntry::new("b", "last"),
        ]);
        let offsets: Vec<u32> = script.lines().iter().map(|l| l.cumulative_offset).collect();
        assert_eq!(offsets, vec![0, 3, 9, 20]);
    }

    #[test]
    fn test_chunking_250_chars() {
        let config = DialogueConfig::default();
        let text = "A".repeat(250);
        let chunks = chunk_text(&text, config.chunk_size);

        let lengths: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(lengths, vec![100, 100, 50]);

        let durations: Vec<u64> = chunks.iter().map(|c| chunk_duration_ms(c, &config)).collect();
        assert_eq!(durations, vec![6000, 6000, 3000]);
    }

    #[test]
    fn test_chunking_counts_characters_not_bytes() {
        let text = "午".repeat(150);
        let chunks = chunk_text(&text, 100);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 100);
        assert_eq!(chunks[1].chars().count(), 50);
    }

    #[test]
    fn test_empty_line_is_one_chunk() {
        let config = DialogueConfig::default();
        let chunks = chunk_text("", 100);
        assert_eq!(chunks, vec![String::new()]);
        assert_eq!(chunk_duration_ms(&chunks[0], &config), 1500);
    }

    #[test]
    fn test_json_accepts_short_field_names() {
        let json = r#"[{"team_id": 2, "conversation": [
            {"id": "m1", "message": "hi", "token": 4},
            {"speaker_id": "m2", "text": "hello"},
            {"message": "who said this?"}
        ]}]"#;
        let scripts = TeamScript::from_json(json).unwrap();
        let entries = &scripts[0].conversation;

        assert_eq!(entries[0].speaker_id, Some(MemberId::new("m1")));
        assert_eq!(entries[0].token_count, Some(4));
        assert_eq!(entries[1].text.as_deref(), Some("hello"));
        assert!(!entries[2].is_well_formed());
    }
}
