//! Testing utilities for the story workflow.
//!
//! This module provides tools for integration testing:
//! - `MockGenerator` for deterministic testing without API calls
//! - `TestHarness` for scripted sessions
//! - Assertion helpers for verifying chapter state

use crate::config::{Locale, StudioConfig};
use crate::model::{Location, Npc};
use crate::session::{Session, SessionResult};
use crate::workflow::Stage;
use async_trait::async_trait;
use chat::Generate;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Reply returned once the script runs out.
pub const DEFAULT_REPLY: &str = "The generator has no more scripted replies.";

/// One prompt the mock received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub prompt: String,
    pub temperature: f32,
}

/// A generator that returns scripted replies in order and records every
/// prompt it was sent.
#[derive(Default)]
pub struct MockGenerator {
    replies: Mutex<VecDeque<Result<String, chat::Error>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that answers with `replies`, in order.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        for reply in replies {
            mock.push_reply(reply);
        }
        mock
    }

    /// Queue a successful reply.
    pub fn push_reply(&self, reply: impl Into<String>) {
        lock(&self.replies).push_back(Ok(reply.into()));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: chat::Error) {
        lock(&self.replies).push_back(Err(error));
    }

    /// Every prompt received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Scripted replies not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Generate for MockGenerator {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, chat::Error> {
        lock(&self.calls).push(RecordedCall {
            prompt: prompt.to_string(),
            temperature,
        });
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Ok(DEFAULT_REPLY.to_string()))
    }
}

/// Test harness for running scripted sessions.
pub struct TestHarness {
    /// The mock generator.
    pub llm: MockGenerator,
    /// The session under test.
    pub session: Session,
}

impl TestHarness {
    /// Create a harness with an English session that already has a credential.
    pub fn new() -> Self {
        Self::with_config(StudioConfig::new(Locale::En))
    }

    pub fn with_config(config: StudioConfig) -> Self {
        let mut session = Session::new(config);
        // The mock ignores it; only the stage gates look at it.
        session
            .set_credential("test-key")
            .expect("static key is non-blank");
        Self {
            llm: MockGenerator::new(),
            session,
        }
    }

    /// Queue a reply.
    pub fn expect_reply(&mut self, text: impl Into<String>) -> &mut Self {
        self.llm.push_reply(text);
        self
    }

    /// Queue a failure.
    pub fn expect_error(&mut self, error: chat::Error) -> &mut Self {
        self.llm.push_error(error);
        self
    }

    /// Add three NPCs and one location, enough to reach the story stage.
    pub fn with_cast(&mut self) -> SessionResult<&mut Self> {
        for (name, profession) in [("Mira", "smith"), ("Oren", "keeper"), ("Tess", "thief")] {
            self.session.add_npc(Npc::new(
                name,
                "any",
                profession,
                format!("{name} grew up by the harbor."),
            ))?;
        }
        self.session
            .add_location(Location::new("Harbor", vec!["Foggy docks".to_string()]))?;
        Ok(self)
    }

    /// Add the cast, save a story using all of it and move to the chapter stage.
    pub fn with_story(&mut self, content: &str) -> SessionResult<&mut Self> {
        self.with_cast()?;
        self.session.save_story(content, "", vec![0, 1, 2], vec![0])?;
        self.session.advance_to(Stage::Chapters)?;
        Ok(self)
    }

    /// Chapter titles in list order.
    pub fn titles(&self) -> Vec<String> {
        self.session
            .chapters()
            .iter()
            .map(|chapter| chapter.title.clone())
            .collect()
    }

    /// Chapter `order` fields in list order.
    pub fn orders(&self) -> Vec<usize> {
        self.session
            .chapters()
            .iter()
            .map(|chapter| chapter.order)
            .collect()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert that every chapter's `order` equals its position.
#[track_caller]
pub fn assert_contiguous(harness: &TestHarness) {
    let orders = harness.orders();
    let expected: Vec<usize> = (0..orders.len()).collect();
    assert_eq!(orders, expected, "Chapter orders are not contiguous");
}

/// Assert the session is at `stage`.
#[track_caller]
pub fn assert_stage(harness: &TestHarness, stage: Stage) {
    assert_eq!(
        harness.session.stage(),
        stage,
        "Expected stage {stage:?}, got {:?}",
        harness.session.stage()
    );
}

/// Assert the chapter list needs a full refine.
#[track_caller]
pub fn assert_dirty(harness: &TestHarness) {
    assert!(
        harness.session.chapters_dirty(),
        "Expected chapters to need realignment"
    );
}
