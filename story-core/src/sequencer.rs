//! Chapter sequencing.
//!
//! [`ChapterSequencer`] owns the ordered chapter list. Every structural edit
//! renumbers the list so that `chapters[i].order == i`, and every refinement
//! request gets its neighbour context from here so it stays correct after
//! inserts and deletes.

use crate::config::Locale;
use crate::model::Chapter;
use thiserror::Error;
use tracing::debug;

/// Chapters shorter than this many characters still need completion.
pub const INCOMPLETE_THRESHOLD: usize = 50;

/// A structural request that was refused. The list is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StructuralViolation {
    #[error("cannot delete the last remaining chapter")]
    LastChapter,

    #[error("chapter index {index} out of range for {len} chapters")]
    OutOfRange { index: usize, len: usize },
}

/// True when a chapter is empty or shorter than [`INCOMPLETE_THRESHOLD`].
pub fn classify_incomplete(chapter: &Chapter) -> bool {
    chapter.content.chars().count() < INCOMPLETE_THRESHOLD
}

/// Contents and titles either side of a chapter; empty at the boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborContext {
    pub previous_content: String,
    pub previous_title: String,
    pub next_content: String,
    pub next_title: String,
}

impl NeighborContext {
    /// Neighbours of position `index`. Empty for any index that is not a
    /// chapter, including `chapters.len()`.
    pub fn around(chapters: &[Chapter], index: usize) -> Self {
        if index >= chapters.len() {
            return Self::default();
        }
        let previous = index.checked_sub(1).and_then(|i| chapters.get(i));
        let next = index.checked_add(1).and_then(|i| chapters.get(i));
        Self {
            previous_content: previous.map(|c| c.content.clone()).unwrap_or_default(),
            previous_title: previous.map(|c| c.title.clone()).unwrap_or_default(),
            next_content: next.map(|c| c.content.clone()).unwrap_or_default(),
            next_title: next.map(|c| c.title.clone()).unwrap_or_default(),
        }
    }
}

/// Everything a refinement prompt needs about one chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinementContext {
    pub previous_content: String,
    pub previous_title: String,
    pub current_content: String,
    pub current_title: String,
    pub next_content: String,
    pub next_title: String,
    /// 1-based chapter number.
    pub index: usize,
    pub total: usize,
}

impl RefinementContext {
    /// Context for the chapter at position `index`, if it exists.
    pub fn at(chapters: &[Chapter], index: usize) -> Option<Self> {
        let current = chapters.get(index)?;
        let neighbors = NeighborContext::around(chapters, index);
        Some(Self {
            previous_content: neighbors.previous_content,
            previous_title: neighbors.previous_title,
            current_content: current.content.clone(),
            current_title: current.title.clone(),
            next_content: neighbors.next_content,
            next_title: neighbors.next_title,
            index: index + 1,
            total: chapters.len(),
        })
    }

    /// Replace the current content, e.g. with an unsaved partial draft.
    pub fn with_current(mut self, content: impl Into<String>) -> Self {
        self.current_content = content.into();
        self
    }
}

/// Title given to an inserted chapter, numbered by the new list length.
pub fn placeholder_title(locale: Locale, number: usize) -> String {
    match locale {
        Locale::Zh => format!("第{number}章"),
        Locale::En => format!("Chapter {number}"),
    }
}

/// Content given to a generated chapter that came back empty.
pub fn placeholder_content(locale: Locale, number: usize) -> String {
    match locale {
        Locale::Zh => format!("第{number}章的内容待完善..."),
        Locale::En => format!("Chapter {number} content to be completed..."),
    }
}

/// A chapter title and text before it is placed in the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDraft {
    pub title: String,
    pub content: String,
}

impl ChapterDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// The ordered chapter list and its needs-realignment flag.
#[derive(Debug, Clone, Default)]
pub struct ChapterSequencer {
    chapters: Vec<Chapter>,
    dirty: bool,
    locale: Locale,
}

impl ChapterSequencer {
    pub fn new(locale: Locale) -> Self {
        Self {
            chapters: Vec::new(),
            dirty: false,
            locale,
        }
    }

    /// Adopt an existing list, sorting and renumbering it.
    pub fn from_chapters(chapters: Vec<Chapter>, locale: Locale) -> Self {
        let mut sequencer = Self {
            chapters,
            dirty: false,
            locale,
        };
        sequencer.normalize();
        sequencer
    }

    /// Replace the list with freshly generated chapters.
    ///
    /// Empty contents get a placeholder so the chapter is still listed as
    /// needing completion.
    pub fn seed(&mut self, drafts: Vec<ChapterDraft>) {
        self.chapters = drafts
            .into_iter()
            .enumerate()
            .map(|(order, draft)| {
                let content = if draft.content.trim().is_empty() {
                    placeholder_content(self.locale, order + 1)
                } else {
                    draft.content
                };
                Chapter::new(draft.title, content, order)
            })
            .collect();
        self.dirty = false;
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn get(&self, index: usize) -> Option<&Chapter> {
        self.chapters.get(index)
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Whether a structural edit happened since the last full refine.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn into_chapters(self) -> Vec<Chapter> {
        self.chapters
    }

    /// Sort by `order`, then set every `order` to its position. Idempotent.
    pub fn normalize(&mut self) {
        self.chapters.sort_by_key(|chapter| chapter.order);
        for (index, chapter) in self.chapters.iter_mut().enumerate() {
            chapter.order = index;
        }
    }

    /// Insert an empty chapter after position `index`; returns its position.
    pub fn insert_after(&mut self, index: usize) -> Result<usize, StructuralViolation> {
        self.check_index(index)?;
        Ok(self.insert_at(index + 1))
    }

    /// Insert an empty chapter at position `index`, shifting it and
    /// everything after it down. `index == len()` appends.
    pub fn insert_before(&mut self, index: usize) -> Result<usize, StructuralViolation> {
        if index > self.chapters.len() {
            return Err(self.out_of_range(index));
        }
        Ok(self.insert_at(index))
    }

    fn insert_at(&mut self, position: usize) -> usize {
        for chapter in &mut self.chapters[position..] {
            chapter.order += 1;
        }
        let title = placeholder_title(self.locale, self.chapters.len() + 1);
        self.chapters
            .insert(position, Chapter::new(title, String::new(), position));
        self.normalize();
        self.dirty = true;
        debug!(position, total = self.chapters.len(), "Inserted chapter");
        position
    }

    /// Remove the chapter at `index`. The last remaining chapter is kept.
    pub fn delete(&mut self, index: usize) -> Result<Chapter, StructuralViolation> {
        if self.chapters.len() == 1 {
            return Err(StructuralViolation::LastChapter);
        }
        self.check_index(index)?;
        let removed = self.chapters.remove(index);
        self.normalize();
        self.dirty = true;
        debug!(index, total = self.chapters.len(), "Deleted chapter");
        Ok(removed)
    }

    /// Move the chapter at `from` so it ends up at position `to`.
    pub fn move_chapter(&mut self, from: usize, to: usize) -> Result<(), StructuralViolation> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from != to {
            let chapter = self.chapters.remove(from);
            self.chapters.insert(to, chapter);
            for (index, chapter) in self.chapters.iter_mut().enumerate() {
                chapter.order = index;
            }
            self.dirty = true;
        }
        Ok(())
    }

    /// Positions of every chapter that still needs completion.
    pub fn incomplete_indices(&self) -> Vec<usize> {
        self.chapters
            .iter()
            .enumerate()
            .filter(|(_, chapter)| classify_incomplete(chapter))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn neighbor_context(&self, index: usize) -> NeighborContext {
        NeighborContext::around(&self.chapters, index)
    }

    pub fn refinement_context(&self, index: usize) -> Result<RefinementContext, StructuralViolation> {
        RefinementContext::at(&self.chapters, index).ok_or_else(|| self.out_of_range(index))
    }

    /// Replace the content, and optionally the title, of one chapter.
    pub fn apply_refinement(
        &mut self,
        index: usize,
        content: impl Into<String>,
        title: Option<String>,
    ) -> Result<(), StructuralViolation> {
        let len = self.chapters.len();
        let chapter = self
            .chapters
            .get_mut(index)
            .ok_or(StructuralViolation::OutOfRange { index, len })?;
        chapter.content = content.into();
        if let Some(title) = title {
            chapter.title = title;
        }
        Ok(())
    }

    pub fn rename(&mut self, index: usize, title: impl Into<String>) -> Result<(), StructuralViolation> {
        let len = self.chapters.len();
        let chapter = self
            .chapters
            .get_mut(index)
            .ok_or(StructuralViolation::OutOfRange { index, len })?;
        chapter.title = title.into();
        Ok(())
    }

    /// Take titles and contents from a full refine pass, position by
    /// position, and clear the dirty flag. The pass must cover every chapter.
    pub fn apply_all(&mut self, refined: Vec<Chapter>) -> Result<(), StructuralViolation> {
        if refined.len() != self.chapters.len() {
            return Err(self.out_of_range(refined.len()));
        }
        for (chapter, refined) in self.chapters.iter_mut().zip(refined) {
            chapter.title = refined.title;
            chapter.content = refined.content;
        }
        self.dirty = false;
        Ok(())
    }

    /// The finished story: a `## title` heading and the text of each chapter.
    pub fn compose(&self) -> String {
        self.chapters
            .iter()
            .map(|chapter| format!("## {}\n\n{}", chapter.title, chapter.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn check_index(&self, index: usize) -> Result<(), StructuralViolation> {
        if index < self.chapters.len() {
            Ok(())
        } else {
            Err(self.out_of_range(index))
        }
    }

    fn out_of_range(&self, index: usize) -> StructuralViolation {
        StructuralViolation::OutOfRange {
            index,
            len: self.chapters.len(),
        }
    }
}
