use super::{ContentResult, Studio};
use crate::model::Npc;
use crate::prompts::PromptKey;
use chat::extract_structured;
use tracing::instrument;

/// Drafts NPCs and NPC backgrounds.
pub struct NpcGenerator<'a> {
    studio: Studio<'a>,
}

impl<'a> NpcGenerator<'a> {
    pub fn new(studio: Studio<'a>) -> Self {
        Self { studio }
    }

    /// Draft a whole NPC. Fields the model leaves out fall back to the
    /// requested gender/profession, and the background to the raw reply.
    #[instrument(skip(self))]
    pub async fn generate_full(&self, gender: &str, profession: &str) -> ContentResult<Npc> {
        let raw = self
            .studio
            .run(
                PromptKey::NpcGenerateAll,
                &[("gender", gender), ("profession", profession)],
                self.studio.config.temperature,
            )
            .await?;
        Ok(npc_from_reply(&raw, gender, profession))
    }

    /// Draft a background for an NPC the user has already named.
    #[instrument(skip(self))]
    pub async fn generate_background(
        &self,
        name: &str,
        gender: &str,
        profession: &str,
    ) -> ContentResult<String> {
        self.studio
            .run(
                PromptKey::NpcGenerateBackground,
                &[("name", name), ("gender", gender), ("profession", profession)],
                self.studio.config.temperature,
            )
            .await
    }
}

fn npc_from_reply(raw: &str, gender: &str, profession: &str) -> Npc {
    let reply = extract_structured(raw);
    Npc {
        name: reply.text_field("name").unwrap_or_default(),
        gender: reply.text_field("gender").unwrap_or_else(|| gender.to_string()),
        profession: reply
            .text_field("profession")
            .unwrap_or_else(|| profession.to_string()),
        background: reply
            .text_field("background")
            .unwrap_or_else(|| raw.to_string()),
    }
}
