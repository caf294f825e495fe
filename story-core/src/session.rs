//! Session - the primary public API for the story workflow.
//!
//! A [`Session`] holds everything one user has produced: NPCs, locations,
//! the story and its chapters, plus the credential, stage and prompt
//! overrides. Operations that need the model take an explicit
//! [`Generate`] so callers choose the client (or a mock).
//!
//! [`SessionStore`] keeps many sessions apart, each behind its own lock so
//! edits to one chapter list are applied one at a time.

use crate::config::{Locale, StudioConfig};
use crate::generate::{ContentError, Studio};
use crate::model::{pick, Chapter, Location, Npc, Story, StoryData};
use crate::prompts::{PromptKey, PromptStore};
use crate::samples::sample_locations;
use crate::sequencer::{ChapterSequencer, StructuralViolation};
use crate::workflow::{check_gate, GateError, Stage, MIN_LOCATIONS, MIN_NPCS};
use chat::{Client, Generate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Errors from Session operations. State is unchanged when one is returned.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Structure(#[from] StructuralViolation),

    #[error("NPC field '{field}' must not be blank")]
    IncompleteNpc { field: &'static str },

    #[error("location name must not be blank")]
    MissingLocationName,

    #[error("a location needs at least one description")]
    NoDescriptions,

    #[error("NPC index {index} out of range for {len} NPCs")]
    InvalidNpc { index: usize, len: usize },

    #[error("location index {index} out of range for {len} locations")]
    InvalidLocation { index: usize, len: usize },

    #[error("at least {need} NPCs must be selected (got {have})")]
    TooFewNpcsSelected { have: usize, need: usize },

    #[error("at least {need} location must be selected (got {have})")]
    TooFewLocationsSelected { have: usize, need: usize },

    #[error("story content must not be blank")]
    EmptyStory,

    #[error("API key must not be blank")]
    EmptyCredential,

    #[error("there is no text to complete")]
    EmptyDraft,

    #[error("sample locations can only be loaded into an empty list")]
    LocationsNotEmpty,

    #[error("no prompt template named '{0}'")]
    UnknownPrompt(String),

    #[error("no session with id {0}")]
    UnknownSession(SessionId),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Identifies a session in a [`SessionStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user's workflow state.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    config: StudioConfig,
    prompts: PromptStore,
    credential: Option<String>,
    stage: Stage,
    /// NPCs, locations and story. `data.chapters` stays empty; the
    /// sequencer owns the chapter list.
    data: StoryData,
    sequencer: ChapterSequencer,
}

impl Session {
    pub fn new(config: StudioConfig) -> Self {
        let locale = config.locale;
        Self {
            id: SessionId::new(),
            config,
            prompts: PromptStore::new(locale),
            credential: None,
            stage: Stage::Home,
            data: StoryData::default(),
            sequencer: ChapterSequencer::new(locale),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn locale(&self) -> Locale {
        self.config.locale
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    // ========================================================================
    // Credential
    // ========================================================================

    pub fn set_credential(&mut self, key: impl Into<String>) -> SessionResult<()> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(SessionError::EmptyCredential);
        }
        self.credential = Some(key.trim().to_string());
        Ok(())
    }

    pub fn clear_credential(&mut self) {
        self.credential = None;
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// An HTTP client for this session's endpoint and credential.
    pub fn client(&self) -> Result<Client, chat::Error> {
        let client = Client::new(self.config.client.clone())?;
        Ok(match &self.credential {
            Some(key) => client.with_api_key(key.clone()),
            None => client,
        })
    }

    // ========================================================================
    // Prompts
    // ========================================================================

    pub fn prompts(&self) -> &PromptStore {
        &self.prompts
    }

    /// Session prompt overrides. Changes apply to every later generation.
    pub fn prompts_mut(&mut self) -> &mut PromptStore {
        &mut self.prompts
    }

    /// Override the template stored under `name` (e.g. `chapter_refine`).
    pub fn set_prompt(&mut self, name: &str, template: impl Into<String>) -> SessionResult<PromptKey> {
        let key = PromptKey::parse(name.trim())
            .ok_or_else(|| SessionError::UnknownPrompt(name.to_string()))?;
        self.prompts.set(key, template);
        debug!(prompt = %key, "Prompt overridden");
        Ok(key)
    }

    /// Restore the built-in template stored under `name`.
    pub fn reset_prompt(&mut self, name: &str) -> SessionResult<PromptKey> {
        let key = PromptKey::parse(name.trim())
            .ok_or_else(|| SessionError::UnknownPrompt(name.to_string()))?;
        self.prompts.reset(key);
        Ok(key)
    }

    // ========================================================================
    // Stages
    // ========================================================================

    /// Move to the stage after the current one. At the last stage this
    /// stays put.
    pub fn advance(&mut self) -> SessionResult<Stage> {
        if let Some(next) = self.stage.next() {
            self.advance_to(next)?;
        }
        Ok(self.stage)
    }

    /// Move to `target`. Earlier stages are always reachable.
    pub fn advance_to(&mut self, target: Stage) -> SessionResult<()> {
        if target > self.stage {
            check_gate(target, &self.data, self.has_credential())?;
        }
        if target != self.stage {
            info!(from = self.stage.label(), to = target.label(), "Stage changed");
        }
        self.stage = target;
        Ok(())
    }

    // ========================================================================
    // NPCs and locations
    // ========================================================================

    pub fn npcs(&self) -> &[Npc] {
        &self.data.npcs
    }

    pub fn locations(&self) -> &[Location] {
        &self.data.locations
    }

    /// Append an NPC; returns its index.
    pub fn add_npc(&mut self, npc: Npc) -> SessionResult<usize> {
        if let Some(field) = npc.missing_field() {
            return Err(SessionError::IncompleteNpc { field });
        }
        debug!(npc = %npc.label(), total = self.data.npcs.len() + 1, "Added NPC");
        self.data.npcs.push(npc);
        Ok(self.data.npcs.len() - 1)
    }

    pub fn update_npc(&mut self, index: usize, npc: Npc) -> SessionResult<()> {
        if let Some(field) = npc.missing_field() {
            return Err(SessionError::IncompleteNpc { field });
        }
        let len = self.data.npcs.len();
        let slot = self
            .data
            .npcs
            .get_mut(index)
            .ok_or(SessionError::InvalidNpc { index, len })?;
        *slot = npc;
        Ok(())
    }

    /// Append a location; returns its index.
    pub fn add_location(&mut self, location: Location) -> SessionResult<usize> {
        if location.name.trim().is_empty() {
            return Err(SessionError::MissingLocationName);
        }
        if location.descriptions.iter().all(|d| d.trim().is_empty()) {
            return Err(SessionError::NoDescriptions);
        }
        self.data.locations.push(location);
        debug!(total = self.data.locations.len(), "Added location");
        Ok(self.data.locations.len() - 1)
    }

    /// Append a location from multi-line description text.
    pub fn add_location_text(&mut self, name: &str, text: &str) -> SessionResult<usize> {
        self.add_location(Location::from_text(name.trim(), text))
    }

    /// Fill an empty location list with the first sample, or all of them.
    /// Returns how many were added.
    pub fn load_sample_locations(&mut self, all: bool) -> SessionResult<usize> {
        if !self.data.locations.is_empty() {
            return Err(SessionError::LocationsNotEmpty);
        }
        let mut samples = sample_locations(self.locale());
        if !all {
            samples.truncate(1);
        }
        let count = samples.len();
        self.data.locations = samples;
        Ok(count)
    }

    // ========================================================================
    // Story
    // ========================================================================

    pub fn story(&self) -> Option<&Story> {
        self.data.story.as_ref()
    }

    /// Save the story with the NPCs and locations it uses. A blank style
    /// becomes the locale default.
    pub fn save_story(
        &mut self,
        content: &str,
        style: &str,
        npc_ids: Vec<usize>,
        location_ids: Vec<usize>,
    ) -> SessionResult<()> {
        if content.trim().is_empty() {
            return Err(SessionError::EmptyStory);
        }
        self.check_selection(&npc_ids, &location_ids)?;
        let style = if style.trim().is_empty() {
            self.locale().default_style().to_string()
        } else {
            style.trim().to_string()
        };
        self.data.story = Some(Story {
            content: content.to_string(),
            style,
            npc_ids,
            location_ids,
        });
        info!("Story saved");
        Ok(())
    }

    pub fn selected_npcs(&self) -> Vec<Npc> {
        self.data.selected_npcs()
    }

    pub fn selected_locations(&self) -> Vec<Location> {
        self.data.selected_locations()
    }

    fn check_selection(&self, npc_ids: &[usize], location_ids: &[usize]) -> SessionResult<()> {
        if npc_ids.len() < MIN_NPCS {
            return Err(SessionError::TooFewNpcsSelected {
                have: npc_ids.len(),
                need: MIN_NPCS,
            });
        }
        if location_ids.len() < MIN_LOCATIONS {
            return Err(SessionError::TooFewLocationsSelected {
                have: location_ids.len(),
                need: MIN_LOCATIONS,
            });
        }
        let len = self.data.npcs.len();
        if let Some(&index) = npc_ids.iter().find(|&&i| i >= len) {
            return Err(SessionError::InvalidNpc { index, len });
        }
        let len = self.data.locations.len();
        if let Some(&index) = location_ids.iter().find(|&&i| i >= len) {
            return Err(SessionError::InvalidLocation { index, len });
        }
        Ok(())
    }

    // ========================================================================
    // Chapters
    // ========================================================================

    pub fn chapters(&self) -> &[Chapter] {
        self.sequencer.chapters()
    }

    /// Whether a structural edit happened since the last full refine.
    pub fn chapters_dirty(&self) -> bool {
        self.sequencer.is_dirty()
    }

    pub fn insert_chapter_after(&mut self, index: usize) -> SessionResult<usize> {
        Ok(self.sequencer.insert_after(index)?)
    }

    pub fn insert_chapter_before(&mut self, index: usize) -> SessionResult<usize> {
        Ok(self.sequencer.insert_before(index)?)
    }

    pub fn delete_chapter(&mut self, index: usize) -> SessionResult<Chapter> {
        self.sequencer.delete(index).map_err(|violation| {
            warn!(index, %violation, "Chapter delete refused");
            violation.into()
        })
    }

    pub fn move_chapter(&mut self, from: usize, to: usize) -> SessionResult<()> {
        Ok(self.sequencer.move_chapter(from, to)?)
    }

    pub fn rename_chapter(&mut self, index: usize, title: &str) -> SessionResult<()> {
        Ok(self.sequencer.rename(index, title.trim())?)
    }

    /// Replace a chapter's text with the user's own edit.
    pub fn edit_chapter(&mut self, index: usize, content: &str) -> SessionResult<()> {
        Ok(self.sequencer.apply_refinement(index, content, None)?)
    }

    /// Positions of chapters that still need completion.
    pub fn incomplete_chapters(&self) -> Vec<usize> {
        self.sequencer.incomplete_indices()
    }

    /// The finished story as one document.
    pub fn compose(&self) -> String {
        self.sequencer.compose()
    }

    // ========================================================================
    // Snapshot and reset
    // ========================================================================

    /// Everything produced so far, chapters included.
    pub fn snapshot(&self) -> StoryData {
        StoryData {
            chapters: self.sequencer.chapters().to_vec(),
            ..self.data.clone()
        }
    }

    /// Clear all content and overrides and return to Home. The credential
    /// is kept.
    pub fn reset(&mut self) {
        let locale = self.locale();
        self.data = StoryData::default();
        self.sequencer = ChapterSequencer::new(locale);
        self.prompts = PromptStore::new(locale);
        self.stage = Stage::Home;
        info!(session = %self.id, "Session reset");
    }

    // ========================================================================
    // AI-assisted operations
    // ========================================================================

    fn studio<'a>(&'a self, llm: &'a dyn Generate) -> Studio<'a> {
        Studio::new(llm, &self.prompts, &self.config)
    }

    fn or_unconstrained<'a>(&self, value: &'a str) -> &'a str {
        if value.trim().is_empty() {
            self.locale().unconstrained()
        } else {
            value
        }
    }

    /// Draft a whole NPC. Nothing is saved; pass the result to [`Session::add_npc`].
    #[instrument(skip(self, llm), fields(session = %self.id))]
    pub async fn draft_npc(
        &self,
        llm: &dyn Generate,
        gender: &str,
        profession: &str,
    ) -> SessionResult<Npc> {
        let gender = self.or_unconstrained(gender);
        let profession = self.or_unconstrained(profession);
        Ok(self.studio(llm).npcs().generate_full(gender, profession).await?)
    }

    #[instrument(skip(self, llm), fields(session = %self.id))]
    pub async fn draft_background(
        &self,
        llm: &dyn Generate,
        name: &str,
        gender: &str,
        profession: &str,
    ) -> SessionResult<String> {
        let gender = self.or_unconstrained(gender);
        let profession = self.or_unconstrained(profession);
        Ok(self
            .studio(llm)
            .npcs()
            .generate_background(name, gender, profession)
            .await?)
    }

    #[instrument(skip(self, llm), fields(session = %self.id))]
    pub async fn draft_location_description(
        &self,
        llm: &dyn Generate,
        name: &str,
    ) -> SessionResult<String> {
        if name.trim().is_empty() {
            return Err(SessionError::MissingLocationName);
        }
        Ok(self
            .studio(llm)
            .locations()
            .generate_description(name.trim())
            .await?)
    }

    /// Draft a story from the chosen NPCs and locations. Nothing is saved;
    /// pass the text to [`Session::save_story`].
    #[instrument(skip(self, llm, npc_ids, location_ids), fields(session = %self.id))]
    pub async fn draft_story(
        &self,
        llm: &dyn Generate,
        npc_ids: &[usize],
        location_ids: &[usize],
        style: &str,
    ) -> SessionResult<String> {
        self.check_selection(npc_ids, location_ids)?;
        let npcs = pick(&self.data.npcs, npc_ids);
        let locations = pick(&self.data.locations, location_ids);
        let style = if style.trim().is_empty() {
            self.locale().default_style()
        } else {
            style.trim()
        };
        Ok(self
            .studio(llm)
            .stories()
            .generate(&npcs, &locations, style)
            .await?)
    }

    /// Split the saved story into three chapters, replacing any existing
    /// chapters. Returns the chapter count.
    #[instrument(skip(self, llm), fields(session = %self.id))]
    pub async fn generate_chapters(&mut self, llm: &dyn Generate) -> SessionResult<usize> {
        let story = self.data.story.as_ref().ok_or(GateError::NoStory)?;
        let drafts = self
            .studio(llm)
            .chapters()
            .generate_three(
                &story.content,
                &self.data.selected_npcs(),
                &self.data.selected_locations(),
            )
            .await?;
        self.sequencer.seed(drafts);
        info!(chapters = self.sequencer.len(), "Chapters generated");
        Ok(self.sequencer.len())
    }

    /// Rewrite one chapter against its neighbours without storing it.
    ///
    /// `edited` is the user's unsaved text; when blank, the stored text is
    /// refined. Keep the result with [`Session::edit_chapter`].
    #[instrument(skip(self, llm, edited), fields(session = %self.id))]
    pub async fn draft_refinement(
        &self,
        llm: &dyn Generate,
        index: usize,
        edited: &str,
    ) -> SessionResult<String> {
        let mut context = self.sequencer.refinement_context(index)?;
        if !edited.trim().is_empty() {
            context = context.with_current(edited);
        }
        Ok(self.studio(llm).chapters().refine(&context).await?)
    }

    /// Rewrite one chapter against its neighbours and store the result.
    #[instrument(skip(self, llm), fields(session = %self.id))]
    pub async fn refine_chapter(&mut self, llm: &dyn Generate, index: usize) -> SessionResult<()> {
        let content = self.draft_refinement(llm, index, "").await?;
        self.sequencer.apply_refinement(index, content, None)?;
        Ok(())
    }

    /// Complete a partial chapter. `draft` is the user's unsaved text; when
    /// blank, the chapter's stored text is used instead.
    #[instrument(skip(self, llm, draft), fields(session = %self.id))]
    pub async fn complete_chapter(
        &mut self,
        llm: &dyn Generate,
        index: usize,
        draft: &str,
    ) -> SessionResult<()> {
        let mut context = self.sequencer.refinement_context(index)?;
        if !draft.trim().is_empty() {
            context = context.with_current(draft);
        }
        if context.current_content.trim().is_empty() {
            return Err(SessionError::EmptyDraft);
        }
        let content = self.studio(llm).chapters().refine_inserted(&context).await?;
        self.sequencer.apply_refinement(index, content, None)?;
        Ok(())
    }

    /// Refine every chapter against the others and clear the dirty flag.
    /// On failure no chapter is changed.
    #[instrument(skip(self, llm), fields(session = %self.id))]
    pub async fn refine_all_chapters(&mut self, llm: &dyn Generate) -> SessionResult<()> {
        let refined = self
            .studio(llm)
            .chapters()
            .refine_all(self.sequencer.chapters())
            .await?;
        self.sequencer.apply_all(refined)?;
        info!(chapters = self.sequencer.len(), "All chapters refined");
        Ok(())
    }
}

// ============================================================================
// Session store
// ============================================================================

/// Sessions keyed by id. Cloning shares the same sessions.
#[derive(Clone, Default)]
pub struct SessionStore {
    config: StudioConfig,
    sessions: Arc<RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>>,
}

impl SessionStore {
    /// New sessions start from `config`.
    pub fn new(config: StudioConfig) -> Self {
        Self {
            config,
            sessions: Arc::default(),
        }
    }

    pub async fn create(&self) -> SessionId {
        let session = Session::new(self.config.clone());
        let id = session.id();
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        info!(session = %id, "Session created");
        id
    }

    /// The session's handle. Lock it to read or mutate.
    pub async fn get(&self, id: SessionId) -> SessionResult<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::UnknownSession(id))
    }

    pub async fn remove(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!(session = %id, "Session removed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGenerator;

    fn session() -> Session {
        let mut session = Session::new(StudioConfig::new(Locale::En));
        session.set_credential("key").unwrap();
        session
    }

    fn with_cast() -> Session {
        let mut session = session();
        for name in ["Mira", "Oren", "Tess"] {
            session
                .add_npc(Npc::new(name, "any", "smith", "bg"))
                .unwrap();
        }
        session.add_location_text("Harbor", "Foggy\n\n  Loud  ").unwrap();
        session
    }

    #[test]
    fn test_credential_validation() {
        let mut session = Session::new(StudioConfig::default());
        assert!(matches!(
            session.set_credential("   "),
            Err(SessionError::EmptyCredential)
        ));
        assert!(!session.has_credential());
        assert!(matches!(
            session.advance_to(Stage::Npcs),
            Err(SessionError::Gate(GateError::NoCredential))
        ));
        session.set_credential(" sk-1 ").unwrap();
        session.advance_to(Stage::Npcs).unwrap();
        assert_eq!(session.stage(), Stage::Npcs);
    }

    #[test]
    fn test_going_back_is_always_allowed() {
        let mut session = with_cast();
        session.advance_to(Stage::Story).unwrap();
        session.clear_credential();
        session.advance_to(Stage::Npcs).unwrap();
        assert_eq!(session.stage(), Stage::Npcs);
    }

    #[test]
    fn test_incomplete_npc_rejected() {
        let mut session = session();
        let err = session
            .add_npc(Npc::new("Mira", "", "smith", "bg"))
            .unwrap_err();
        assert!(matches!(err, SessionError::IncompleteNpc { field: "gender" }));
        assert!(session.npcs().is_empty());
    }

    #[test]
    fn test_location_text_is_split() {
        let session = with_cast();
        assert_eq!(
            session.locations()[0].descriptions,
            vec!["Foggy".to_string(), "Loud".to_string()]
        );

        let mut session = session;
        assert!(matches!(
            session.add_location_text("Crypt", " \n "),
            Err(SessionError::NoDescriptions)
        ));
        assert!(matches!(
            session.add_location_text(" ", "text"),
            Err(SessionError::MissingLocationName)
        ));
    }

    #[test]
    fn test_sample_locations_only_into_empty_list() {
        let mut session = session();
        assert_eq!(session.load_sample_locations(false).unwrap(), 1);
        assert!(matches!(
            session.load_sample_locations(true),
            Err(SessionError::LocationsNotEmpty)
        ));

        let mut session = Session::new(StudioConfig::new(Locale::Zh));
        assert_eq!(session.load_sample_locations(true).unwrap(), 5);
    }

    #[test]
    fn test_save_story_validates_selection() {
        let mut session = with_cast();
        assert!(matches!(
            session.save_story("tale", "", vec![0, 1], vec![0]),
            Err(SessionError::TooFewNpcsSelected { have: 2, need: 3 })
        ));
        assert!(matches!(
            session.save_story("tale", "", vec![0, 1, 7], vec![0]),
            Err(SessionError::InvalidNpc { index: 7, len: 3 })
        ));
        assert!(matches!(
            session.save_story("tale", "", vec![0, 1, 2], vec![]),
            Err(SessionError::TooFewLocationsSelected { .. })
        ));
        assert!(matches!(
            session.save_story("  ", "", vec![0, 1, 2], vec![0]),
            Err(SessionError::EmptyStory)
        ));
        assert!(session.story().is_none());

        session.save_story("tale", "", vec![2, 0, 1], vec![0]).unwrap();
        let story = session.story().unwrap();
        assert_eq!(story.style, "fantasy adventure");
        assert_eq!(session.selected_npcs()[0].name, "Tess");
    }

    #[test]
    fn test_reset_keeps_credential() {
        let mut session = with_cast();
        session.prompts_mut().set(crate::prompts::PromptKey::StoryGenerate, "x");
        session.advance_to(Stage::Locations).unwrap();

        session.reset();

        assert!(session.has_credential());
        assert_eq!(session.stage(), Stage::Home);
        assert_eq!(session.snapshot(), StoryData::default());
        assert!(session.prompts().overrides().is_empty());
    }

    #[test]
    fn test_client_carries_credential() {
        let session = session();
        let client = session.client().unwrap();
        assert!(client.has_credential());
        assert!(!Session::new(StudioConfig::default())
            .client()
            .unwrap()
            .has_credential());
    }

    #[tokio::test]
    async fn test_generate_chapters_requires_story() {
        let llm = MockGenerator::new();
        let mut session = with_cast();
        let err = session.generate_chapters(&llm).await.unwrap_err();
        assert!(matches!(err, SessionError::Gate(GateError::NoStory)));
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_refine_leaves_chapter() {
        let llm = MockGenerator::with_replies([
            r#"{"chapters": [{"title": "A", "content": "a"}, {"title": "B", "content": "b"}, {"title": "C", "content": "c"}]}"#,
        ]);
        llm.push_error(chat::Error::Timeout(chat::REQUEST_TIMEOUT));
        let mut session = with_cast();
        session.save_story("tale", "", vec![0, 1, 2], vec![0]).unwrap();
        session.generate_chapters(&llm).await.unwrap();

        let err = session.refine_chapter(&llm, 1).await.unwrap_err();

        assert!(matches!(err, SessionError::Content(_)));
        assert_eq!(session.chapters()[1].content, "b");
    }

    #[tokio::test]
    async fn test_draft_refinement_keeps_chapter_until_applied() {
        let llm = MockGenerator::new();
        let mut session = with_cast();
        session.save_story("a b c d e f", "", vec![0, 1, 2], vec![0]).unwrap();
        session.generate_chapters(&llm).await.unwrap();
        session
            .set_prompt("chapter_refine", "{previous_chapter}|{current_chapter}|{next_chapter}")
            .unwrap();

        llm.push_reply("The second part, rewritten.");
        let draft = session
            .draft_refinement(&llm, 1, "c d, as the user edited it")
            .await
            .unwrap();

        assert_eq!(draft, "The second part, rewritten.");
        assert_eq!(
            llm.calls().last().unwrap().prompt,
            "a b|c d, as the user edited it|e f"
        );
        assert_eq!(session.chapters()[1].content, "c d");

        session.edit_chapter(1, &draft).unwrap();
        assert_eq!(session.chapters()[1].content, "The second part, rewritten.");
        assert_eq!(session.chapters()[1].order, 1);
    }

    #[tokio::test]
    async fn test_draft_refinement_of_stored_text() {
        let llm = MockGenerator::new();
        let mut session = with_cast();
        session.save_story("a b c d e f", "", vec![0, 1, 2], vec![0]).unwrap();
        session.generate_chapters(&llm).await.unwrap();
        session.set_prompt("chapter_refine", "{current_chapter}").unwrap();

        session.draft_refinement(&llm, 2, "  ").await.unwrap();

        assert_eq!(llm.calls().last().unwrap().prompt, "e f");
        assert!(matches!(
            session.draft_refinement(&llm, 3, "text").await,
            Err(SessionError::Structure(_))
        ));
    }

    #[test]
    fn test_prompts_by_name() {
        let mut session = session();
        assert_eq!(
            session.set_prompt("story_generate", "{style}").unwrap(),
            PromptKey::StoryGenerate
        );
        assert_eq!(session.prompts().get(PromptKey::StoryGenerate), "{style}");
        assert!(matches!(
            session.set_prompt("story", "x"),
            Err(SessionError::UnknownPrompt(name)) if name == "story"
        ));

        session.reset_prompt("story_generate").unwrap();
        assert!(!session.prompts().is_overridden(PromptKey::StoryGenerate));
    }

    #[test]
    fn test_advance_steps_through_gates() {
        let mut session = with_cast();
        assert_eq!(session.advance().unwrap(), Stage::Npcs);
        assert_eq!(session.advance().unwrap(), Stage::Locations);
        assert_eq!(session.advance().unwrap(), Stage::Story);
        assert!(matches!(
            session.advance(),
            Err(SessionError::Gate(GateError::NoStory))
        ));
        assert_eq!(session.stage(), Stage::Story);

        session.save_story("tale", "", vec![0, 1, 2], vec![0]).unwrap();
        assert_eq!(session.advance().unwrap(), Stage::Chapters);
        assert_eq!(session.advance().unwrap(), Stage::Chapters);
    }

    #[tokio::test]
    async fn test_complete_chapter_needs_text() {
        let llm = MockGenerator::new();
        let mut session = with_cast();
        session.save_story("one two three", "", vec![0, 1, 2], vec![0]).unwrap();
        session.generate_chapters(&llm).await.unwrap();
        let position = session.insert_chapter_after(0).unwrap();

        let err = session
            .complete_chapter(&llm, position, "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::EmptyDraft));

        llm.push_reply("The door creaked open onto the harbor at dawn.");
        session
            .complete_chapter(&llm, position, "The door")
            .await
            .unwrap();
        assert_eq!(
            session.chapters()[position].content,
            "The door creaked open onto the harbor at dawn."
        );
    }

    #[tokio::test]
    async fn test_store_isolates_sessions() {
        let store = SessionStore::new(StudioConfig::new(Locale::En));
        let a = store.create().await;
        let b = store.create().await;
        assert_ne!(a, b);
        assert_eq!(store.len().await, 2);

        store
            .get(a)
            .await
            .unwrap()
            .lock()
            .await
            .set_credential("key-a")
            .unwrap();
        assert!(!store.get(b).await.unwrap().lock().await.has_credential());

        assert!(store.remove(a).await);
        assert!(matches!(
            store.get(a).await,
            Err(SessionError::UnknownSession(id)) if id == a
        ));
    }
}
