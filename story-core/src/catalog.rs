//! Prompt, theme and ruleset catalog offered to the user.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors from loading a catalog document.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

const DEFAULT_PROMPTS: &[&str] = &[
    "Ancient Ruin",
    "Bandit Camp",
    "Cursed Item",
    "Dungeon Room",
    "Forest",
    "Guild",
    "Innkeeper",
    "Legendary Weapon",
    "Magic Item",
    "Merchant",
    "Monster",
    "Mountain Pass",
    "Noble House",
    "Non-Player Character",
    "Potion",
    "Puzzle",
    "Quest",
    "Riddle",
    "Shop",
    "Tavern",
    "Town",
    "Trap",
    "Villain",
];

const DEFAULT_THEMES: &[&str] = &[
    "Cyberpunk",
    "Dark Fantasy",
    "Gothic Horror",
    "High Fantasy",
    "Post-Apocalyptic",
    "Sci-Fi",
    "Steampunk",
    "Swashbuckling",
    "Weird West",
];

const DEFAULT_RULESETS: &[&str] = &[
    "Call of Cthulhu",
    "D&D 5e",
    "Pathfinder 2e",
    "Savage Worlds",
    "Starfinder",
    "System Agnostic",
];

/// The lists a front end offers when creating stories and picking prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptCatalog {
    #[serde(default)]
    pub prompts: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub rulesets: Vec<String>,
}

impl Default for PromptCatalog {
    fn default() -> Self {
        let owned = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            prompts: owned(DEFAULT_PROMPTS),
            themes: owned(DEFAULT_THEMES),
            rulesets: owned(DEFAULT_RULESETS),
        }
    }
}

impl PromptCatalog {
    /// Parse a `{prompts, themes, rulesets}` JSON document.
    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Prompts containing `term` (case-insensitive), alphabetically.
    ///
    /// A blank term matches everything.
    pub fn search(&self, term: &str) -> Vec<&str> {
        let needle = term.trim().to_lowercase();
        let mut matches: Vec<&str> = self
            .prompts
            .iter()
            .map(String::as_str)
            .filter(|p| p.to_lowercase().contains(&needle))
            .collect();

        matches.sort_by(|a, b| {
            a.to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b))
        });
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(prompts: &[&str]) -> PromptCatalog {
        PromptCatalog {
            prompts: prompts.iter().map(|s| s.to_string()).collect(),
            themes: vec![],
            rulesets: vec![],
        }
    }

    #[test]
    fn test_search_case_insensitive() {
        let catalog = catalog(&["Tavern", "Magic Item", "cursed item", "Villain"]);
        assert_eq!(catalog.search("ITEM"), vec!["cursed item", "Magic Item"]);
    }

    #[test]
    fn test_search_blank_returns_sorted_all() {
        let catalog = catalog(&["trap", "Bandit Camp", "Quest"]);
        assert_eq!(catalog.search("  "), vec!["Bandit Camp", "Quest", "trap"]);
    }

    #[test]
    fn test_search_no_match() {
        assert!(PromptCatalog::default().search("spaceship").is_empty());
    }

    #[test]
    fn test_default_catalog_is_populated() {
        let catalog = PromptCatalog::default();
        assert!(!catalog.prompts.is_empty());
        assert!(catalog.themes.iter().any(|t| t == "High Fantasy"));
        assert!(catalog.rulesets.iter().any(|r| r == "D&D 5e"));
    }

    #[test]
    fn test_from_json() {
        let catalog = PromptCatalog::from_json(
            r#"{"prompts": ["Shrine"], "themes": ["Gothic"], "rulesets": ["D&D5e"]}"#,
        )
        .unwrap();
        assert_eq!(catalog.prompts, vec!["Shrine"]);
        assert_eq!(catalog.themes, vec!["Gothic"]);
        assert_eq!(catalog.rulesets, vec!["D&D5e"]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PromptCatalog::load("/nonexistent/catalog.json").unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }
}
