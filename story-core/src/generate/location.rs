use super::{ContentResult, Studio};
use crate::prompts::PromptKey;
use tracing::instrument;

/// Drafts location descriptions.
pub struct LocationGenerator<'a> {
    studio: Studio<'a>,
}

impl<'a> LocationGenerator<'a> {
    pub fn new(studio: Studio<'a>) -> Self {
        Self { studio }
    }

    #[instrument(skip(self))]
    pub async fn generate_description(&self, name: &str) -> ContentResult<String> {
        self.studio
            .run(
                PromptKey::LocationGenerate,
                &[("name", name)],
                self.studio.config.temperature,
            )
            .await
    }
}
