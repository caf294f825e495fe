use super::{format_locations, format_npcs, ContentResult, Studio};
use crate::config::Locale;
use crate::model::{Chapter, Location, Npc};
use crate::prompts::PromptKey;
use crate::sequencer::{ChapterDraft, RefinementContext};
use chat::{extract_structured, Extracted};
use serde_json::Value;
use tracing::{debug, info, instrument};

/// Number of chapters the initial split produces.
const INITIAL_CHAPTERS: usize = 3;

/// Fields tried, in order, when a model nests chapter text in an object.
const NESTED_CONTENT_KEYS: [&str; 4] = ["text", "beginning", "middle", "end"];

fn default_titles(locale: Locale) -> [&'static str; INITIAL_CHAPTERS] {
    match locale {
        Locale::Zh => ["开端", "发展", "结局"],
        Locale::En => ["Beginning", "Development", "Ending"],
    }
}

/// Splits stories into chapters and refines chapters against their neighbours.
pub struct ChapterGenerator<'a> {
    studio: Studio<'a>,
}

impl<'a> ChapterGenerator<'a> {
    pub fn new(studio: Studio<'a>) -> Self {
        Self { studio }
    }

    /// Ask for a three-chapter split of `story`.
    ///
    /// When the reply does not hold at least three usable chapters the story
    /// is split on whitespace instead, so this always yields three drafts.
    #[instrument(skip_all, fields(npcs = npcs.len(), locations = locations.len()))]
    pub async fn generate_three(
        &self,
        story: &str,
        npcs: &[Npc],
        locations: &[Location],
    ) -> ContentResult<Vec<ChapterDraft>> {
        let locale = self.studio.locale();
        let npcs = format_npcs(npcs, locale);
        let locations = format_locations(locations, locale);
        let raw = self
            .studio
            .run(
                PromptKey::ChaptersGenerate,
                &[
                    ("story", story),
                    ("npcs", npcs.as_str()),
                    ("locations", locations.as_str()),
                ],
                self.studio.config.temperature,
            )
            .await?;

        match drafts_from_reply(&extract_structured(&raw), locale) {
            Some(drafts) => Ok(drafts),
            None => {
                info!("Chapter reply unusable, splitting story manually");
                Ok(split_manually(story, locale))
            }
        }
    }

    /// Rewrite a finished chapter so it fits its neighbours.
    #[instrument(skip_all, fields(index = context.index, total = context.total))]
    pub async fn refine(&self, context: &RefinementContext) -> ContentResult<String> {
        let current_title = match self.studio.locale() {
            Locale::Zh => "当前章节",
            Locale::En => "current chapter",
        };
        self.refine_with(PromptKey::ChapterRefine, context, current_title)
            .await
    }

    /// Complete a partially written (usually newly inserted) chapter.
    #[instrument(skip_all, fields(index = context.index, total = context.total))]
    pub async fn refine_inserted(&self, context: &RefinementContext) -> ContentResult<String> {
        let current_title = match self.studio.locale() {
            Locale::Zh => "新章节",
            Locale::En => "new chapter",
        };
        self.refine_with(PromptKey::InsertChapterRefine, context, current_title)
            .await
    }

    /// Refine every chapter in list order.
    ///
    /// Each call sees the original text of its neighbours, not text refined
    /// earlier in the same pass. Titles and `order` are carried over.
    #[instrument(skip_all, fields(total = chapters.len()))]
    pub async fn refine_all(&self, chapters: &[Chapter]) -> ContentResult<Vec<Chapter>> {
        let mut refined = Vec::with_capacity(chapters.len());
        for (index, chapter) in chapters.iter().enumerate() {
            let Some(context) = RefinementContext::at(chapters, index) else {
                continue;
            };
            let content = self.refine(&context).await?;
            debug!(index, "Refined chapter");
            refined.push(Chapter {
                title: chapter.title.clone(),
                content,
                order: chapter.order,
            });
        }
        Ok(refined)
    }

    async fn refine_with(
        &self,
        key: PromptKey,
        context: &RefinementContext,
        untitled: &str,
    ) -> ContentResult<String> {
        let (no_previous, no_next) = match self.studio.locale() {
            Locale::Zh => ("（无前一章）", "（无后一章）"),
            Locale::En => ("(no previous chapter)", "(no next chapter)"),
        };
        let or = |value: &str, fallback: &str| -> String {
            if value.is_empty() {
                fallback.to_string()
            } else {
                value.to_string()
            }
        };

        let previous_chapter = or(&context.previous_content, no_previous);
        let next_chapter = or(&context.next_content, no_next);
        let previous_title = or(&context.previous_title, no_previous);
        let current_title = if context.current_title.is_empty() {
            untitled.to_string()
        } else {
            context.current_title.clone()
        };
        let next_title = or(&context.next_title, no_next);
        let chapter_index = context.index.to_string();
        let total_chapters = context.total.to_string();

        self.studio
            .run(
                key,
                &[
                    ("previous_chapter", previous_chapter.as_str()),
                    ("current_chapter", context.current_content.as_str()),
                    ("next_chapter", next_chapter.as_str()),
                    ("chapter_index", chapter_index.as_str()),
                    ("total_chapters", total_chapters.as_str()),
                    ("previous_title", previous_title.as_str()),
                    ("current_title", current_title.as_str()),
                    ("next_title", next_title.as_str()),
                ],
                self.studio.config.temperature,
            )
            .await
    }
}

/// Split `story` into three runs of whitespace-separated tokens.
///
/// The first two chapters get `len / 3` tokens each and the last takes the
/// remainder. Tokens are re-joined with single spaces.
pub fn split_manually(story: &str, locale: Locale) -> Vec<ChapterDraft> {
    let words: Vec<&str> = story.split_whitespace().collect();
    let chunk = words.len() / INITIAL_CHAPTERS;

    default_titles(locale)
        .into_iter()
        .enumerate()
        .map(|(i, title)| {
            let start = i * chunk;
            let end = if i + 1 < INITIAL_CHAPTERS {
                start + chunk
            } else {
                words.len()
            };
            ChapterDraft::new(title, words[start..end].join(" "))
        })
        .collect()
}

/// The first three chapters of a `{"chapters": [...]}` reply, if it has
/// at least three.
fn drafts_from_reply(reply: &Extracted, locale: Locale) -> Option<Vec<ChapterDraft>> {
    let chapters = reply.field("chapters")?.as_array()?;
    if chapters.len() < INITIAL_CHAPTERS {
        return None;
    }

    let defaults = default_titles(locale);
    let drafts = chapters
        .iter()
        .take(INITIAL_CHAPTERS)
        .enumerate()
        .map(|(i, entry)| match entry {
            Value::Object(fields) => {
                let title = fields
                    .get("title")
                    .or_else(|| fields.get("name"))
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|title| !title.is_empty())
                    .map_or_else(|| defaults[i].to_string(), str::to_string);
                let content = fields.get("content").map(flatten_content).unwrap_or_default();
                ChapterDraft::new(title, content)
            }
            other => {
                let title = match locale {
                    Locale::Zh => format!("第{}章", i + 1),
                    Locale::En => format!("Chapter {}", i + 1),
                };
                ChapterDraft::new(title, scalar_text(other))
            }
        })
        .collect();

    Some(drafts)
}

/// Chapter text from a `content` value that may be nested.
fn flatten_content(value: &Value) -> String {
    match value {
        Value::Object(fields) => NESTED_CONTENT_KEYS
            .iter()
            .find_map(|key| fields.get(*key))
            .map_or_else(|| value.to_string(), scalar_text),
        other => scalar_text(other),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StudioConfig;
    use crate::prompts::PromptStore;
    use crate::sequencer::ChapterSequencer;
    use crate::testing::MockGenerator;
    use serde_json::json;

    fn structured(value: Value) -> Extracted {
        Extracted::Structured(value)
    }

    #[test]
    fn test_manual_split_even() {
        let tokens: Vec<String> = (0..300).map(|i| format!("w{i}")).collect();
        let story = tokens.join(" ");

        let drafts = split_manually(&story, Locale::Zh);

        assert_eq!(drafts.len(), 3);
        let titles: Vec<_> = drafts.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["开端", "发展", "结局"]);
        for draft in &drafts {
            assert_eq!(draft.content.split_whitespace().count(), 100);
        }
        let rejoined = drafts
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(rejoined, story);
    }

    #[test]
    fn test_manual_split_remainder_goes_last() {
        let drafts = split_manually("a b c d e f g h", Locale::En);
        assert_eq!(drafts[0].content, "a b");
        assert_eq!(drafts[1].content, "c d");
        assert_eq!(drafts[2].content, "e f g h");
        assert_eq!(drafts[2].title, "Ending");
    }

    #[test]
    fn test_manual_split_short_story() {
        let drafts = split_manually("tiny tale", Locale::En);
        assert_eq!(drafts[0].content, "");
        assert_eq!(drafts[1].content, "");
        assert_eq!(drafts[2].content, "tiny tale");
    }

    #[test]
    fn test_reply_with_three_chapters() {
        let reply = structured(json!({"chapters": [
            {"title": "Dawn", "content": "one"},
            {"name": "Noon", "content": "two"},
            {"title": "  ", "content": "three"},
            {"title": "Extra", "content": "four"}
        ]}));
        let drafts = drafts_from_reply(&reply, Locale::En).unwrap();
        assert_eq!(
            drafts,
            vec![
                ChapterDraft::new("Dawn", "one"),
                ChapterDraft::new("Noon", "two"),
                ChapterDraft::new("Ending", "three"),
            ]
        );
    }

    #[test]
    fn test_reply_with_too_few_chapters() {
        let reply = structured(json!({"chapters": [{"title": "a", "content": "b"}]}));
        assert!(drafts_from_reply(&reply, Locale::En).is_none());
        assert!(drafts_from_reply(&Extracted::Raw("text".into()), Locale::En).is_none());
        assert!(drafts_from_reply(&structured(json!({"chapters": "x"})), Locale::En).is_none());
    }

    #[test]
    fn test_nested_and_scalar_content_is_flattened() {
        let reply = structured(json!({"chapters": [
            {"title": "A", "content": {"beginning": "It began", "end": "It ended"}},
            {"title": "B", "content": 42},
            "bare text"
        ]}));
        let drafts = drafts_from_reply(&reply, Locale::Zh).unwrap();
        assert_eq!(drafts[0].content, "It began");
        assert_eq!(drafts[1].content, "42");
        assert_eq!(drafts[2], ChapterDraft::new("第3章", "bare text"));
    }

    #[test]
    fn test_nested_content_without_known_keys_is_stringified() {
        assert_eq!(flatten_content(&json!({"other": 1})), r#"{"other":1}"#);
        assert_eq!(flatten_content(&json!({"text": "t", "end": "e"})), "t");
    }

    #[tokio::test]
    async fn test_generate_three_falls_back_on_plain_reply() {
        let llm = MockGenerator::with_replies(["Sorry, I cannot split this."]);
        let prompts = PromptStore::new(Locale::Zh);
        let config = StudioConfig::new(Locale::Zh);

        let drafts = Studio::new(&llm, &prompts, &config)
            .chapters()
            .generate_three("a b c d e f", &[], &[])
            .await
            .unwrap();

        assert_eq!(drafts.len(), 3);
        assert_eq!(drafts[0], ChapterDraft::new("开端", "a b"));
        assert!(llm.calls()[0].prompt.contains("（无指定NPC）"));
    }

    #[tokio::test]
    async fn test_refine_marks_missing_neighbours() {
        let llm = MockGenerator::with_replies(["refined"]);
        let mut prompts = PromptStore::new(Locale::En);
        prompts.set(
            PromptKey::ChapterRefine,
            "{chapter_index}/{total_chapters}|{previous_title}:{previous_chapter}|{current_title}:{current_chapter}|{next_title}:{next_chapter}",
        );
        let config = StudioConfig::new(Locale::En);
        let sequencer = ChapterSequencer::from_chapters(
            vec![Chapter::new("", "only", 0)],
            Locale::En,
        );

        let context = sequencer.refinement_context(0).unwrap();
        let text = Studio::new(&llm, &prompts, &config)
            .chapters()
            .refine(&context)
            .await
            .unwrap();

        assert_eq!(text, "refined");
        assert_eq!(
            llm.calls()[0].prompt,
            "1/1|(no previous chapter):(no previous chapter)|current chapter:only|(no next chapter):(no next chapter)"
        );
    }

    #[tokio::test]
    async fn test_refine_inserted_uses_its_own_template() {
        let llm = MockGenerator::with_replies(["completed"]);
        let mut prompts = PromptStore::new(Locale::En);
        prompts.set(PromptKey::InsertChapterRefine, "INSERT {current_title}: {current_chapter}");
        let config = StudioConfig::new(Locale::En);
        let chapters = vec![
            Chapter::new("A", "alpha", 0),
            Chapter::new("", "", 1),
            Chapter::new("B", "beta", 2),
        ];

        let context = RefinementContext::at(&chapters, 1)
            .unwrap()
            .with_current("she opened the door");
        let text = Studio::new(&llm, &prompts, &config)
            .chapters()
            .refine_inserted(&context)
            .await
            .unwrap();

        assert_eq!(text, "completed");
        assert_eq!(llm.calls()[0].prompt, "INSERT new chapter: she opened the door");
    }

    #[tokio::test]
    async fn test_refine_all_uses_original_neighbours() {
        let llm = MockGenerator::with_replies(["A'", "B'", "C'"]);
        let mut prompts = PromptStore::new(Locale::En);
        prompts.set(
            PromptKey::ChapterRefine,
            "{chapter_index}/{total_chapters} prev={previous_chapter} next={next_chapter}",
        );
        let config = StudioConfig::new(Locale::En);
        let chapters = vec![
            Chapter::new("one", "A", 0),
            Chapter::new("two", "B", 1),
            Chapter::new("three", "C", 2),
        ];

        let refined = Studio::new(&llm, &prompts, &config)
            .chapters()
            .refine_all(&chapters)
            .await
            .unwrap();

        assert_eq!(
            refined,
            vec![
                Chapter::new("one", "A'", 0),
                Chapter::new("two", "B'", 1),
                Chapter::new("three", "C'", 2),
            ]
        );
        let prompts: Vec<_> = llm.calls().into_iter().map(|c| c.prompt).collect();
        assert_eq!(
            prompts,
            vec![
                "1/3 prev=(no previous chapter) next=B",
                "2/3 prev=A next=C",
                "3/3 prev=B next=(no next chapter)",
            ]
        );
    }

    #[tokio::test]
    async fn test_refine_all_stops_on_first_failure() {
        let llm = MockGenerator::new();
        llm.push_reply("A'");
        llm.push_error(chat::Error::Transport("reset".into()));
        let prompts = PromptStore::new(Locale::En);
        let config = StudioConfig::new(Locale::En);
        let chapters = vec![Chapter::new("one", "A", 0), Chapter::new("two", "B", 1)];

        let result = Studio::new(&llm, &prompts, &config)
            .chapters()
            .refine_all(&chapters)
            .await;

        assert!(result.is_err());
        assert_eq!(llm.calls().len(), 2);
    }
}
