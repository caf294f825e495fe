//! Prompt templates.
//!
//! Templates use `{name}` placeholders; `{{` and `}}` produce literal
//! braces. Nothing is checked when a template is stored: a bad template
//! only fails when a generator fills it.

mod defaults;

use crate::config::Locale;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub use defaults::default_template;

/// Which template a generator asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKey {
    NpcGenerateAll,
    NpcGenerateBackground,
    LocationGenerate,
    StoryGenerate,
    ChaptersGenerate,
    ChapterRefine,
    InsertChapterRefine,
}

impl PromptKey {
    pub const ALL: [PromptKey; 7] = [
        PromptKey::NpcGenerateAll,
        PromptKey::NpcGenerateBackground,
        PromptKey::LocationGenerate,
        PromptKey::StoryGenerate,
        PromptKey::ChaptersGenerate,
        PromptKey::ChapterRefine,
        PromptKey::InsertChapterRefine,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PromptKey::NpcGenerateAll => "npc_generate_all",
            PromptKey::NpcGenerateBackground => "npc_generate_background",
            PromptKey::LocationGenerate => "location_generate",
            PromptKey::StoryGenerate => "story_generate",
            PromptKey::ChaptersGenerate => "chapters_generate",
            PromptKey::ChapterRefine => "chapter_refine",
            PromptKey::InsertChapterRefine => "insert_chapter_refine",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }

    /// Placeholders the generator for this key supplies.
    pub fn placeholders(self) -> &'static [&'static str] {
        match self {
            PromptKey::NpcGenerateAll => &["gender", "profession"],
            PromptKey::NpcGenerateBackground => &["name", "gender", "profession"],
            PromptKey::LocationGenerate => &["name"],
            PromptKey::StoryGenerate => &["npcs", "locations", "style"],
            PromptKey::ChaptersGenerate => &["story", "npcs", "locations"],
            PromptKey::ChapterRefine | PromptKey::InsertChapterRefine => &[
                "previous_chapter",
                "current_chapter",
                "next_chapter",
                "chapter_index",
                "total_chapters",
                "previous_title",
                "current_title",
                "next_title",
            ],
        }
    }
}

impl fmt::Display for PromptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure filling a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template references unknown placeholder {{{name}}}")]
    UnknownPlaceholder { name: String },

    #[error("unmatched '{brace}' at byte {position}")]
    UnbalancedBrace { brace: char, position: usize },
}

/// Substitute `{name}` placeholders. Supplied values that the template
/// does not use are ignored.
pub fn fill(template: &str, values: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' => {
                if chars.next_if(|&(_, next)| next == '{').is_some() {
                    out.push('{');
                    continue;
                }
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, ch)) if ch != '{' => name.push(ch),
                        _ => return Err(TemplateError::UnbalancedBrace { brace: '{', position }),
                    }
                }
                let value = values
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
                    .ok_or(TemplateError::UnknownPlaceholder { name })?;
                out.push_str(value);
            }
            '}' => {
                if chars.next_if(|&(_, next)| next == '}').is_none() {
                    return Err(TemplateError::UnbalancedBrace { brace: '}', position });
                }
                out.push('}');
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// Session-scoped templates: built-in defaults plus user overrides.
#[derive(Debug, Clone, Default)]
pub struct PromptStore {
    locale: Locale,
    overrides: HashMap<PromptKey, String>,
}

impl PromptStore {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            overrides: HashMap::new(),
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// The override if one is set and non-blank, else the default.
    pub fn get(&self, key: PromptKey) -> &str {
        self.overrides
            .get(&key)
            .filter(|template| !template.trim().is_empty())
            .map(String::as_str)
            .unwrap_or_else(|| default_template(self.locale, key))
    }

    /// Override a template for the rest of the session.
    pub fn set(&mut self, key: PromptKey, template: impl Into<String>) {
        self.overrides.insert(key, template.into());
    }

    /// Drop an override, returning it.
    pub fn reset(&mut self, key: PromptKey) -> Option<String> {
        self.overrides.remove(&key)
    }

    pub fn is_overridden(&self, key: PromptKey) -> bool {
        self.overrides.contains_key(&key)
    }

    /// Overridden keys in declaration order.
    pub fn overrides(&self) -> Vec<PromptKey> {
        PromptKey::ALL
            .into_iter()
            .filter(|key| self.overrides.contains_key(key))
            .collect()
    }

    /// Fill the current template for `key`.
    pub fn render(&self, key: PromptKey, values: &[(&str, &str)]) -> Result<String, TemplateError> {
        fill(self.get(key), values)
    }
}
