//! Built-in templates, one set per locale.

use super::PromptKey;
use crate::config::Locale;

/// The built-in template for `key`.
pub fn default_template(locale: Locale, key: PromptKey) -> &'static str {
    match locale {
        Locale::Zh => zh(key),
        Locale::En => en(key),
    }
}

fn zh(key: PromptKey) -> &'static str {
    match key {
        PromptKey::NpcGenerateAll => {
            r#"请为一款角色扮演游戏设计一个NPC。
性别：{gender}
职业：{profession}
（"不限"表示由你自行决定。）

请只返回如下格式的JSON：
{{"name": "姓名", "gender": "性别", "profession": "职业", "background": "200字左右的背景故事"}}"#
        }
        PromptKey::NpcGenerateBackground => {
            r#"请为以下NPC撰写一段200字左右的背景故事，包括出身、重要经历和性格特点。
姓名：{name}
性别：{gender}
职业：{profession}

直接输出背景故事正文。"#
        }
        PromptKey::LocationGenerate => {
            r#"请为游戏中的地点"{name}"撰写一段生动的描述，包括环境、氛围以及可能发生的事件。
直接输出描述正文。"#
        }
        PromptKey::StoryGenerate => {
            r#"请根据以下角色和地点，创作一个{style}风格的完整故事。

角色：
{npcs}

地点：
{locations}

要求：所有角色都要有戏份，故事至少发生在一个给定地点，情节有开端、发展和结局。"#
        }
        PromptKey::ChaptersGenerate => {
            r#"请将下面的故事分成三个章节：开端、发展、结局。

故事：
{story}

参与的角色：
{npcs}

故事发生的地点：
{locations}

每章需要一个描述性的标题和完整的正文。请只返回如下格式的JSON：
{{"chapters": [{{"title": "标题", "content": "正文"}}, {{"title": "标题", "content": "正文"}}, {{"title": "标题", "content": "正文"}}]}}"#
        }
        PromptKey::ChapterRefine => {
            r#"你正在优化一个共{total_chapters}章的故事中的第{chapter_index}章。

上一章《{previous_title}》：
{previous_chapter}

当前章节《{current_title}》：
{current_chapter}

下一章《{next_title}》：
{next_chapter}

请改写当前章节，使其与前后章节衔接自然、人物和情节前后一致，保持原有风格。只输出改写后的当前章节正文。"#
        }
        PromptKey::InsertChapterRefine => {
            r#"用户在一个共{total_chapters}章的故事中插入了第{chapter_index}章，并写下了部分内容。

上一章《{previous_title}》：
{previous_chapter}

新章节《{current_title}》的部分内容：
{current_chapter}

下一章《{next_title}》：
{next_chapter}

请在保留已有内容意图的基础上，把新章节补写完整，使其承上启下。只输出完整的新章节正文。"#
        }
    }
}

fn en(key: PromptKey) -> &'static str {
    match key {
        PromptKey::NpcGenerateAll => {
            r#"Design an NPC for a role-playing game.
Gender: {gender}
Profession: {profession}
("any" means you decide.)

Return only JSON in this shape:
{{"name": "name", "gender": "gender", "profession": "profession", "background": "a background of about 150 words"}}"#
        }
        PromptKey::NpcGenerateBackground => {
            r#"Write a background of about 150 words for this NPC, covering origins, defining events and personality.
Name: {name}
Gender: {gender}
Profession: {profession}

Output only the background text."#
        }
        PromptKey::LocationGenerate => {
            r#"Write a vivid description of the game location "{name}", covering its surroundings, atmosphere and what might happen there.
Output only the description."#
        }
        PromptKey::StoryGenerate => {
            r#"Write a complete {style} story using these characters and locations.

Characters:
{npcs}

Locations:
{locations}

Every character must play a part, the story must take place in at least one listed location, and it needs a beginning, development and ending."#
        }
        PromptKey::ChaptersGenerate => {
            r#"Split the story below into three chapters: beginning, development and ending.

Story:
{story}

Characters:
{npcs}

Locations:
{locations}

Each chapter needs a descriptive title and its full text. Return only JSON in this shape:
{{"chapters": [{{"title": "title", "content": "text"}}, {{"title": "title", "content": "text"}}, {{"title": "title", "content": "text"}}]}}"#
        }
        PromptKey::ChapterRefine => {
            r#"You are refining chapter {chapter_index} of {total_chapters}.

Previous chapter "{previous_title}":
{previous_chapter}

Current chapter "{current_title}":
{current_chapter}

Next chapter "{next_title}":
{next_chapter}

Rewrite the current chapter so it flows naturally from the previous chapter into the next, keeping characters and plot consistent and preserving the style. Output only the rewritten current chapter."#
        }
        PromptKey::InsertChapterRefine => {
            r#"The user inserted chapter {chapter_index} of {total_chapters} and drafted part of it.

Previous chapter "{previous_title}":
{previous_chapter}

Draft of the new chapter "{current_title}":
{current_chapter}

Next chapter "{next_title}":
{next_chapter}

Complete the new chapter, keeping the intent of the draft and bridging the surrounding chapters. Output only the full text of the new chapter."#
        }
    }
}
