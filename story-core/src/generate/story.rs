use super::{format_locations, format_npcs, ContentResult, Studio};
use crate::model::{Location, Npc};
use crate::prompts::PromptKey;
use tracing::instrument;

/// Drafts the story from the selected cast and settings.
pub struct StoryGenerator<'a> {
    studio: Studio<'a>,
}

impl<'a> StoryGenerator<'a> {
    pub fn new(studio: Studio<'a>) -> Self {
        Self { studio }
    }

    /// Write a story in `style`. Runs hotter than the other generators.
    #[instrument(skip(self, npcs, locations), fields(npcs = npcs.len(), locations = locations.len()))]
    pub async fn generate(
        &self,
        npcs: &[Npc],
        locations: &[Location],
        style: &str,
    ) -> ContentResult<String> {
        let locale = self.studio.locale();
        let npcs = format_npcs(npcs, locale);
        let locations = format_locations(locations, locale);
        self.studio
            .run(
                PromptKey::StoryGenerate,
                &[
                    ("npcs", npcs.as_str()),
                    ("locations", locations.as_str()),
                    ("style", style),
                ],
                self.studio.config.story_temperature,
            )
            .await
    }
}
