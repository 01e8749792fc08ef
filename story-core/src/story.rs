//! Stories and their append-only logs.

use crate::id::{EntryId, StoryId};
use serde::{Deserialize, Serialize};

/// What a log entry (or a pending request) asked the service for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Generate something new, optionally steered by keywords.
    Generation {
        prompt: String,
        keywords: Option<String>,
    },
    /// Expand on text the service already produced.
    Elaboration { prompt: String },
}

impl Prompt {
    /// A keyword-less generation request.
    pub fn generate(prompt: impl Into<String>) -> Self {
        Prompt::Generation {
            prompt: prompt.into(),
            keywords: None,
        }
    }

    /// A generation request steered by keywords.
    pub fn generate_with_keywords(prompt: impl Into<String>, keywords: impl Into<String>) -> Self {
        Prompt::Generation {
            prompt: prompt.into(),
            keywords: Some(keywords.into()),
        }
    }

    pub fn elaborate(prompt: impl Into<String>) -> Self {
        Prompt::Elaboration {
            prompt: prompt.into(),
        }
    }

    /// Build an elaboration from text the user selected in a previous response.
    ///
    /// Returns `None` when the selection is blank.
    pub fn elaborate_on(selection: &str) -> Option<Self> {
        let trimmed = selection.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self::elaborate(trimmed))
        }
    }

    /// The prompt text, whichever variant this is.
    pub fn text(&self) -> &str {
        match self {
            Prompt::Generation { prompt, .. } | Prompt::Elaboration { prompt } => prompt,
        }
    }

    pub fn keywords(&self) -> Option<&str> {
        match self {
            Prompt::Generation { keywords, .. } => keywords.as_deref(),
            Prompt::Elaboration { .. } => None,
        }
    }

    pub fn is_elaboration(&self) -> bool {
        matches!(self, Prompt::Elaboration { .. })
    }
}

/// One prompt/response exchange in a story's log.
///
/// Serialized in the flat `{id, elaboration, prompt, keywords, response}`
/// shape so snapshots stay readable by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LogEntryRecord", into = "LogEntryRecord")]
pub struct LogEntry {
    pub id: EntryId,
    pub prompt: Prompt,
    pub response: String,
}

impl LogEntry {
    /// Create an entry with a freshly minted id.
    pub fn new(prompt: Prompt, response: impl Into<String>) -> Self {
        Self {
            id: EntryId::new(),
            prompt,
            response: response.into(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct LogEntryRecord {
    id: EntryId,
    elaboration: bool,
    prompt: String,
    #[serde(default)]
    keywords: Option<String>,
    response: String,
}

impl From<LogEntryRecord> for LogEntry {
    fn from(record: LogEntryRecord) -> Self {
        let prompt = if record.elaboration {
            Prompt::Elaboration {
                prompt: record.prompt,
            }
        } else {
            Prompt::Generation {
                prompt: record.prompt,
                keywords: record.keywords,
            }
        };

        Self {
            id: record.id,
            prompt,
            response: record.response,
        }
    }
}

impl From<LogEntry> for LogEntryRecord {
    fn from(entry: LogEntry) -> Self {
        let (elaboration, prompt, keywords) = match entry.prompt {
            Prompt::Generation { prompt, keywords } => (false, prompt, keywords),
            Prompt::Elaboration { prompt } => (true, prompt, None),
        };

        Self {
            id: entry.id,
            elaboration,
            prompt,
            keywords,
            response: entry.response,
        }
    }
}

/// A named session with theme/ruleset metadata and its own log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: StoryId,
    pub title: String,
    pub theme: String,
    pub ruleset: String,
    #[serde(default)]
    pub log: Vec<LogEntry>,
}

impl Story {
    /// Create a story with an empty log and a fresh id.
    ///
    /// Field validation lives in [`crate::StoryStore::create`].
    pub fn new(
        title: impl Into<String>,
        theme: impl Into<String>,
        ruleset: impl Into<String>,
    ) -> Self {
        Self {
            id: StoryId::new(),
            title: title.into(),
            theme: theme.into(),
            ruleset: ruleset.into(),
            log: Vec::new(),
        }
    }

    pub fn entry(&self, id: EntryId) -> Option<&LogEntry> {
        self.log.iter().find(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elaborate_on_trims_selection() {
        let prompt = Prompt::elaborate_on("  the Obsidian Gate \n").unwrap();
        assert_eq!(prompt, Prompt::elaborate("the Obsidian Gate"));
    }

    #[test]
    fn test_elaborate_on_blank_selection() {
        assert!(Prompt::elaborate_on("   ").is_none());
        assert!(Prompt::elaborate_on("").is_none());
    }

    #[test]
    fn test_prompt_accessors() {
        let generation = Prompt::generate_with_keywords("tavern", "smoky, loud");
        assert_eq!(generation.text(), "tavern");
        assert_eq!(generation.keywords(), Some("smoky, loud"));
        assert!(!generation.is_elaboration());

        let elab = Prompt::elaborate("the innkeeper");
        assert_eq!(elab.text(), "the innkeeper");
        assert_eq!(elab.keywords(), None);
        assert!(elab.is_elaboration());
    }

    #[test]
    fn test_log_entry_flat_shape() {
        let entry = LogEntry::new(Prompt::generate("ancient door"), "A rusted iron door.");
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["elaboration"], false);
        assert_eq!(value["prompt"], "ancient door");
        assert!(value["keywords"].is_null());
        assert_eq!(value["response"], "A rusted iron door.");
        assert_eq!(value["id"], entry.id.to_string());
    }

    #[test]
    fn test_log_entry_reads_elaboration_record() {
        let id = EntryId::new();
        let json = format!(
            r#"{{"id":"{id}","elaboration":true,"prompt":"the door","keywords":null,"response":"It hums."}}"#
        );
        let entry: LogEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(entry.id, id);
        assert_eq!(entry.prompt, Prompt::elaborate("the door"));
        assert_eq!(entry.response, "It hums.");
    }

    #[test]
    fn test_story_entry_lookup() {
        let mut story = Story::new("Ruins", "Gothic", "D&D5e");
        let entry = LogEntry::new(Prompt::generate("bell tower"), "A cracked bell.");
        let id = entry.id;
        story.log.push(entry);

        assert_eq!(story.entry(id).map(|e| e.response.as_str()), Some("A cracked bell."));
        assert!(story.entry(EntryId::new()).is_none());
    }
}
