//! Workflow stages and the gates between them.

use crate::model::StoryData;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// NPCs needed before moving on to locations and the story.
pub const MIN_NPCS: usize = 3;

/// Locations needed before writing the story.
pub const MIN_LOCATIONS: usize = 1;

/// A step of the guided workflow, in order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Home,
    Npcs,
    Locations,
    Story,
    Chapters,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Home,
        Stage::Npcs,
        Stage::Locations,
        Stage::Story,
        Stage::Chapters,
    ];

    pub fn next(self) -> Option<Stage> {
        Self::ALL.get(self.number() + 1).copied()
    }

    /// Position in the workflow, starting at 0 for [`Stage::Home`].
    pub fn number(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Home => "home",
            Stage::Npcs => "npcs",
            Stage::Locations => "locations",
            Stage::Story => "story",
            Stage::Chapters => "chapters",
        }
    }
}

/// Why a stage cannot be entered yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("an API key is required before starting")]
    NoCredential,

    #[error("at least {need} NPCs are required (have {have})")]
    NotEnoughNpcs { have: usize, need: usize },

    #[error("at least {need} location is required (have {have})")]
    NotEnoughLocations { have: usize, need: usize },

    #[error("a story must be saved first")]
    NoStory,
}

/// Check whether `target` may be entered given the current data.
///
/// Stages before or equal to Home are always reachable.
pub fn check_gate(target: Stage, data: &StoryData, has_credential: bool) -> Result<(), GateError> {
    if target > Stage::Home && !has_credential {
        return Err(GateError::NoCredential);
    }
    if target >= Stage::Locations && data.npcs.len() < MIN_NPCS {
        return Err(GateError::NotEnoughNpcs {
            have: data.npcs.len(),
            need: MIN_NPCS,
        });
    }
    if target >= Stage::Story && data.locations.len() < MIN_LOCATIONS {
        return Err(GateError::NotEnoughLocations {
            have: data.locations.len(),
            need: MIN_LOCATIONS,
        });
    }
    if target >= Stage::Chapters && data.story.is_none() {
        return Err(GateError::NoStory);
    }
    Ok(())
}
