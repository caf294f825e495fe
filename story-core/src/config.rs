//! Settings shared by the content generators and the session.

use chat::ClientConfig;
use serde::{Deserialize, Serialize};

/// Language used for default prompts, fallback titles and user messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Zh,
    En,
}

impl Locale {
    /// Parse a language tag such as `zh`, `zh-CN` or `en-US`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let lang = tag.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        match lang.as_str() {
            "zh" | "cn" => Some(Locale::Zh),
            "en" => Some(Locale::En),
            _ => None,
        }
    }

    /// System message sent ahead of every prompt.
    pub fn system_prompt(self) -> &'static str {
        match self {
            Locale::Zh => "你是一个专业的游戏故事创作助手。",
            Locale::En => "You are a professional game story writing assistant.",
        }
    }

    /// Story style used when the user leaves it blank.
    pub fn default_style(self) -> &'static str {
        match self {
            Locale::Zh => "奇幻冒险",
            Locale::En => "fantasy adventure",
        }
    }

    /// Input value meaning "let the model decide" for NPC gender/profession.
    pub fn unconstrained(self) -> &'static str {
        match self {
            Locale::Zh => "不限",
            Locale::En => "any",
        }
    }
}

/// Configuration for a story studio session.
#[derive(Debug, Clone)]
pub struct StudioConfig {
    /// Language for defaults and messages.
    pub locale: Locale,

    /// Temperature for every call except story generation.
    pub temperature: f32,

    /// Temperature for story generation.
    pub story_temperature: f32,

    /// Completion endpoint settings.
    pub client: ClientConfig,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self::new(Locale::default())
    }
}

impl StudioConfig {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            temperature: 0.7,
            story_temperature: 0.8,
            client: ClientConfig::default().with_system_prompt(locale.system_prompt()),
        }
    }

    /// Defaults, with `STORY_LOCALE` choosing the language and the client
    /// settings taken from [`ClientConfig::from_env`].
    pub fn from_env() -> Self {
        let locale = std::env::var("STORY_LOCALE")
            .ok()
            .and_then(|tag| Locale::from_tag(&tag))
            .unwrap_or_default();
        let mut config = Self::new(locale);
        config.client = ClientConfig::from_env().with_system_prompt(locale.system_prompt());
        config
    }

    /// Switch language, keeping the endpoint but swapping the system prompt.
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self.client.system_prompt = locale.system_prompt().to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_story_temperature(mut self, temperature: f32) -> Self {
        self.story_temperature = temperature;
        self
    }

    pub fn with_client(mut self, client: ClientConfig) -> Self {
        self.client = client;
        self
    }
}
