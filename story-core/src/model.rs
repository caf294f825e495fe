//! Domain entities produced by the workflow.
//!
//! NPCs and locations are identified by their position in append-only
//! lists; a [`Story`] refers to them by those positions.

use serde::{Deserialize, Serialize};

// ============================================================================
// NPCs
// ============================================================================

/// A non-player character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Npc {
    pub name: String,
    pub gender: String,
    pub profession: String,
    pub background: String,
}

impl Npc {
    pub fn new(
        name: impl Into<String>,
        gender: impl Into<String>,
        profession: impl Into<String>,
        background: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            gender: gender.into(),
            profession: profession.into(),
            background: background.into(),
        }
    }

    /// Name of the first blank required field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("gender", &self.gender),
            ("profession", &self.profession),
            ("background", &self.background),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }

    /// One-line label such as `Mira (female, smith)`.
    pub fn label(&self) -> String {
        format!("{} ({}, {})", self.name, self.gender, self.profession)
    }
}

// ============================================================================
// Locations
// ============================================================================

/// A place the story can visit, with one or more descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub descriptions: Vec<String>,
}

impl Location {
    pub fn new(name: impl Into<String>, descriptions: Vec<String>) -> Self {
        Self {
            name: name.into(),
            descriptions,
        }
    }

    /// Build from multi-line text: one description per non-blank line.
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        let descriptions = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(name, descriptions)
    }
}

// ============================================================================
// Story and chapters
// ============================================================================

/// The session's single story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub content: String,
    pub style: String,
    /// Positions in the NPC list at the time the story was saved.
    pub npc_ids: Vec<usize>,
    /// Positions in the location list at the time the story was saved.
    pub location_ids: Vec<usize>,
}

/// One chapter. `order` equals its list position after every structural edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub content: String,
    pub order: usize,
}

impl Chapter {
    pub fn new(title: impl Into<String>, content: impl Into<String>, order: usize) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            order,
        }
    }
}

/// Everything a session has produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryData {
    pub npcs: Vec<Npc>,
    pub locations: Vec<Location>,
    pub story: Option<Story>,
    pub chapters: Vec<Chapter>,
}

impl StoryData {
    /// NPCs referenced by the story. Ids that no longer resolve are skipped.
    pub fn selected_npcs(&self) -> Vec<Npc> {
        self.story
            .as_ref()
            .map(|story| pick(&self.npcs, &story.npc_ids))
            .unwrap_or_default()
    }

    /// Locations referenced by the story. Ids that no longer resolve are skipped.
    pub fn selected_locations(&self) -> Vec<Location> {
        self.story
            .as_ref()
            .map(|story| pick(&self.locations, &story.location_ids))
            .unwrap_or_default()
    }
}

pub(crate) fn pick<T: Clone>(items: &[T], ids: &[usize]) -> Vec<T> {
    ids.iter().filter_map(|&id| items.get(id).cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npc_missing_field() {
        let npc = Npc::new("Mira", "female", "  ", "Raised by smiths.");
        assert_eq!(npc.missing_field(), Some("profession"));
        let npc = Npc::new("Mira", "female", "smith", "Raised by smiths.");
        assert_eq!(npc.missing_field(), None);
        assert_eq!(npc.label(), "Mira (female, smith)");
    }

    #[test]
    fn test_location_from_text_drops_blank_lines() {
        let location = Location::from_text("Harbor", "  Salt air \n\n   \nGulls overhead\n");
        assert_eq!(location.descriptions, vec!["Salt air", "Gulls overhead"]);
    }

    #[test]
    fn test_selection_skips_stale_ids() {
        let data = StoryData {
            npcs: vec![
                Npc::new("A", "f", "x", "a"),
                Npc::new("B", "m", "y", "b"),
            ],
            locations: vec![Location::new("Town", vec!["quiet".into()])],
            story: Some(Story {
                content: "text".into(),
                style: "noir".into(),
                npc_ids: vec![1, 7, 0],
                location_ids: vec![0, 3],
            }),
            chapters: Vec::new(),
        };

        let names: Vec<_> = data.selected_npcs().into_iter().map(|n| n.name).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(data.selected_locations().len(), 1);
    }

    #[test]
    fn test_no_story_selects_nothing() {
        let data = StoryData::default();
        assert!(data.selected_npcs().is_empty());
        assert!(data.selected_locations().is_empty());
    }
}
