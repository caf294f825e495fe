//! Content generators.
//!
//! Each generator fills a template from the session's [`PromptStore`],
//! sends it through a [`Generate`] implementation and turns the text into
//! a domain value. Failures stop at this boundary as a [`ContentError`],
//! which knows how to describe itself to the user.

mod chapter;
mod location;
mod npc;
mod story;

pub use chapter::{split_manually, ChapterGenerator};
pub use location::LocationGenerator;
pub use npc::NpcGenerator;
pub use story::StoryGenerator;

use crate::config::{Locale, StudioConfig};
use crate::model::{Location, Npc};
use crate::prompts::{PromptKey, PromptStore, TemplateError};
use chat::Generate;
use thiserror::Error;

/// Why a generation request produced nothing usable.
#[derive(Debug, Clone, Error)]
pub enum ContentError {
    #[error(transparent)]
    Generation(#[from] chat::Error),

    #[error("Prompt template error: {0}")]
    Template(#[from] TemplateError),
}

impl ContentError {
    /// A missing credential halts the workflow until one is supplied.
    pub fn is_blocking(&self) -> bool {
        matches!(self, ContentError::Generation(chat::Error::MissingCredential))
    }

    /// Message to show the user. Upstream bodies are passed through verbatim.
    pub fn user_message(&self, locale: Locale) -> String {
        use chat::Error as E;
        match (locale, self) {
            (Locale::Zh, ContentError::Generation(E::MissingCredential)) => {
                "请先在首页设置API密钥".to_string()
            }
            (Locale::En, ContentError::Generation(E::MissingCredential)) => {
                "Set an API key on the home page first.".to_string()
            }
            (Locale::Zh, ContentError::Generation(E::Upstream { status, body })) => {
                format!("生成服务拒绝了请求（状态码 {status}）：{body}")
            }
            (Locale::En, ContentError::Generation(E::Upstream { status, body })) => {
                format!("The generation service rejected the request (status {status}): {body}")
            }
            (Locale::Zh, ContentError::Generation(e)) if e.is_transport() => {
                "生成失败：无法连接到生成服务，请稍后重试".to_string()
            }
            (Locale::En, ContentError::Generation(e)) if e.is_transport() => {
                "Generation failed: the service could not be reached. Try again later.".to_string()
            }
            (Locale::Zh, ContentError::Generation(e)) => format!("生成失败: {e}"),
            (Locale::En, ContentError::Generation(e)) => format!("Generation failed: {e}"),
            (Locale::Zh, ContentError::Template(e)) => format!("Prompt模板有误: {e}"),
            (Locale::En, ContentError::Template(e)) => format!("The prompt template is invalid: {e}"),
        }
    }
}

pub type ContentResult<T> = Result<T, ContentError>;

/// Shared handles every generator works from.
#[derive(Clone, Copy)]
pub struct Studio<'a> {
    llm: &'a dyn Generate,
    prompts: &'a PromptStore,
    config: &'a StudioConfig,
}

impl<'a> Studio<'a> {
    pub fn new(llm: &'a dyn Generate, prompts: &'a PromptStore, config: &'a StudioConfig) -> Self {
        Self {
            llm,
            prompts,
            config,
        }
    }

    pub fn npcs(self) -> NpcGenerator<'a> {
        NpcGenerator::new(self)
    }

    pub fn locations(self) -> LocationGenerator<'a> {
        LocationGenerator::new(self)
    }

    pub fn stories(self) -> StoryGenerator<'a> {
        StoryGenerator::new(self)
    }

    pub fn chapters(self) -> ChapterGenerator<'a> {
        ChapterGenerator::new(self)
    }

    fn locale(&self) -> Locale {
        self.config.locale
    }

    async fn run(&self, key: PromptKey, values: &[(&str, &str)], temperature: f32) -> ContentResult<String> {
        let prompt = self.prompts.render(key, values)?;
        Ok(self.llm.complete(&prompt, temperature).await?)
    }
}

// ============================================================================
// Shared formatting
// ============================================================================

/// NPC roster for prompts, one `- name (gender, profession) — background` per line.
pub(crate) fn format_npcs(npcs: &[Npc], locale: Locale) -> String {
    if npcs.is_empty() {
        return match locale {
            Locale::Zh => "（无指定NPC）",
            Locale::En => "(no NPCs specified)",
        }
        .to_string();
    }
    npcs.iter()
        .map(|npc| match locale {
            Locale::Zh => format!(
                "- {}（{}，{}）—— {}",
                npc.name, npc.gender, npc.profession, npc.background
            ),
            Locale::En => format!(
                "- {} ({}, {}) — {}",
                npc.name, npc.gender, npc.profession, npc.background
            ),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Location list for prompts, one `- name: descriptions` per line.
pub(crate) fn format_locations(locations: &[Location], locale: Locale) -> String {
    if locations.is_empty() {
        return match locale {
            Locale::Zh => "（无指定地点）",
            Locale::En => "(no locations specified)",
        }
        .to_string();
    }
    locations
        .iter()
        .map(|location| {
            let descriptions = if location.descriptions.is_empty() {
                match locale {
                    Locale::Zh => "（无详细描述）".to_string(),
                    Locale::En => "(no detailed description)".to_string(),
                }
            } else {
                match locale {
                    Locale::Zh => location.descriptions.join("；"),
                    Locale::En => location.descriptions.join("; "),
                }
            };
            match locale {
                Locale::Zh => format!("- {}：{}", location.name, descriptions),
                Locale::En => format!("- {}: {}", location.name, descriptions),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_npcs() {
        let npcs = vec![Npc::new("Mira", "female", "smith", "Forged the king's blade.")];
        assert_eq!(
            format_npcs(&npcs, Locale::En),
            "- Mira (female, smith) — Forged the king's blade."
        );
        assert_eq!(format_npcs(&[], Locale::Zh), "（无指定NPC）");
    }

    #[test]
    fn test_format_locations() {
        let locations = vec![
            Location::new("Harbor", vec!["Salt air".into(), "Gulls".into()]),
            Location::new("Crypt", Vec::new()),
        ];
        assert_eq!(
            format_locations(&locations, Locale::En),
            "- Harbor: Salt air; Gulls\n- Crypt: (no detailed description)"
        );
    }

    #[test]
    fn test_user_messages() {
        let missing = ContentError::from(chat::Error::MissingCredential);
        assert!(missing.is_blocking());
        assert_eq!(missing.user_message(Locale::Zh), "请先在首页设置API密钥");

        let upstream = ContentError::from(chat::Error::Upstream {
            status: 429,
            body: "{\"error\":\"slow down\"}".to_string(),
        });
        assert!(!upstream.is_blocking());
        assert!(upstream
            .user_message(Locale::En)
            .ends_with("(status 429): {\"error\":\"slow down\"}"));

        let timeout = ContentError::from(chat::Error::Timeout(chat::REQUEST_TIMEOUT));
        assert!(timeout.user_message(Locale::En).starts_with("Generation failed"));
    }
}
