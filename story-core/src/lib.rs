//! Guided story workflow with AI drafting.
//!
//! This crate provides:
//! - NPC, location and story drafting through editable prompt templates
//! - A chapter sequencer that keeps chapter order contiguous across edits
//! - Neighbour-aware chapter refinement
//! - Per-session state with stage gates, and a store for many sessions
//!
//! # Quick Start
//!
//! ```ignore
//! use story_core::{Session, Stage, StudioConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = Session::new(StudioConfig::from_env());
//!     session.set_credential(std::env::var("OPENAI_API_KEY")?)?;
//!     let client = session.client()?;
//!
//!     let npc = session.draft_npc(&client, "female", "smith").await?;
//!     session.add_npc(npc)?;
//!     // ... two more NPCs, a location and a saved story ...
//!
//!     session.advance_to(Stage::Chapters)?;
//!     session.generate_chapters(&client).await?;
//!     println!("{}", session.compose());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod generate;
pub mod model;
pub mod prompts;
pub mod samples;
pub mod sequencer;
pub mod session;
pub mod testing;
pub mod workflow;

// Primary public API
pub use config::{Locale, StudioConfig};
pub use generate::{ContentError, ContentResult, Studio};
pub use model::{Chapter, Location, Npc, Story, StoryData};
pub use prompts::{PromptKey, PromptStore, TemplateError};
pub use sequencer::{ChapterDraft, ChapterSequencer, StructuralViolation};
pub use session::{Session, SessionError, SessionId, SessionResult, SessionStore};
pub use testing::{MockGenerator, TestHarness};
pub use workflow::{GateError, Stage};

pub use chat::{Extracted, Generate};
