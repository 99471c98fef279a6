use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const FALLBACK_EMOJI: &str = "🍴";
pub const PLACEHOLDER_DESCRIPTION: &str = "Creative recipe variation";
pub const MAX_TITLE_CHARS: usize = 80;
pub const MAX_DESCRIPTION_CHARS: usize = 200;
pub const IDEAS_PER_RESPONSE: usize = 3;

/// One short suggestion as shown on an idea card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeIdea {
    pub emoji: String,
    pub title: String,
    #[serde(alias = "desc")]
    pub description: String,
}

lazy_static! {
    static ref LEADING_EMOJI: Regex = Regex::new(
        r"^(?:\p{Emoji_Presentation}|\p{Extended_Pictographic})\x{FE0F}?\p{Emoji_Modifier}?(?:\x{200D}(?:\p{Emoji_Presentation}|\p{Extended_Pictographic})\x{FE0F}?\p{Emoji_Modifier}?)*"
    )
    .unwrap();
    static ref BLOCK_SEPARATOR: Regex = Regex::new(r"\n\s*\n").unwrap();
    static ref LEAKED_GUIDANCE: [Regex; 7] = [
        Regex::new(r"(?s)INTERNAL GUIDANCE.*?RESPOND ONLY WITH THE 3 RECIPE IDEAS[^\n]*?:").unwrap(),
        Regex::new(r"INTERNAL GUIDANCE[^\n]*(?:\n|$)").unwrap(),
        Regex::new(r"ADVENTUROUSNESS SCALE[^\n]*(?:\n|$)").unwrap(),
        Regex::new(r"INSPIRATION LEVEL:[^\n]*(?:\n|$)").unwrap(),
        Regex::new(r"User adventurousness level:[^\n]*(?:\n|$)").unwrap(),
        Regex::new(r"Adjust your suggestions accordingly:[^\n]*(?:\n|$)").unwrap(),
        Regex::new(r"RESPOND ONLY WITH THE 3 RECIPE IDEAS[^\n]*(?:\n|$)").unwrap(),
    ];
    static ref EM_DASH: Regex = Regex::new(r"^([^\n]*?)\s*—\s*((?s:.*))$").unwrap();
    static ref EN_DASH: Regex = Regex::new(r"^([^\n]*?)\s*–\s*((?s:.*))$").unwrap();
    static ref MINUS_SIGN: Regex = Regex::new(r"^([^\n]*?)\s*−\s*((?s:.*))$").unwrap();
    static ref DOUBLE_HYPHEN: Regex = Regex::new(r"^([^\n]*?)\s*--\s*((?s:.*))$").unwrap();
    // A hyphen inside a word ("Stir-fry") is not a separator.
    static ref HYPHEN: Regex = Regex::new(r"^([^\n]*?)(?:\s+-\s*|\s*-\s+)((?s:.*))$").unwrap();
    static ref WRAPPING_BOLD: Regex = Regex::new(r"^\*\*(.*)\*\*$").unwrap();
    static ref WRAPPING_ITALIC: Regex = Regex::new(r"^\*(.*)\*$").unwrap();
    static ref FIRST_BOLD_SPAN: Regex = Regex::new(r"\*\*(.*?)\*\*").unwrap();
    static ref MARKDOWN_EMPHASIS: Regex = Regex::new(r"[*_`]").unwrap();
}

/// Title/description recovery tiers, tried in declaration order.
///
/// `DoubleHyphen` runs before `Hyphen` so `--` is never read as a hyphen plus a stray dash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdeaStrategy {
    EmDash,
    EnDash,
    MinusSign,
    DoubleHyphen,
    Hyphen,
    TitleLineThenBody,
    BoldSpan,
    LeadingWords,
    WholeLine,
    Placeholder,
}

impl IdeaStrategy {
    pub const DASHES: [IdeaStrategy; 5] = [
        IdeaStrategy::EmDash,
        IdeaStrategy::EnDash,
        IdeaStrategy::MinusSign,
        IdeaStrategy::DoubleHyphen,
        IdeaStrategy::Hyphen,
    ];

    fn dash_pattern(self) -> Option<&'static Regex> {
        match self {
            IdeaStrategy::EmDash => Some(&*EM_DASH),
            IdeaStrategy::EnDash => Some(&*EN_DASH),
            IdeaStrategy::MinusSign => Some(&*MINUS_SIGN),
            IdeaStrategy::Hyphen => Some(&*HYPHEN),
            IdeaStrategy::DoubleHyphen => Some(&*DOUBLE_HYPHEN),
            _ => None,
        }
    }
}

/// Raw split of one block before post-processing, tagged with the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdeaSplit {
    pub strategy: IdeaStrategy,
    pub title: String,
    pub description: String,
}

/// Removes steering text the model echoed back despite being told not to.
pub fn strip_leaked_guidance(raw: &str) -> String {
    let mut text = raw.to_string();
    for pattern in LEAKED_GUIDANCE.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }
    text.trim().to_string()
}

/// Splits a cleaned response into blank-line separated idea blocks.
pub fn split_idea_blocks(cleaned: &str) -> Vec<&str> {
    BLOCK_SEPARATOR
        .split(cleaned.trim())
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .collect()
}

/// Parses a whole idea response into exactly three cards.
///
/// Missing blocks become placeholder cards so the caller can always render three boxes.
pub fn parse_idea_response(raw: &str) -> Vec<RecipeIdea> {
    let cleaned = strip_leaked_guidance(raw);
    let blocks = split_idea_blocks(&cleaned);
    (0..IDEAS_PER_RESPONSE)
        .map(|idx| parse_idea_block(blocks.get(idx).copied().unwrap_or(""), idx))
        .collect()
}

/// Leading emoji of `text`, or the fallback emoji.
pub fn extract_emoji(text: &str) -> &str {
    LEADING_EMOJI
        .find(text.trim_start())
        .map(|m| m.as_str())
        .unwrap_or(FALLBACK_EMOJI)
}

/// Parses one idea block. Total: malformed input degrades to placeholder text.
pub fn parse_idea_block(raw_block: &str, index: usize) -> RecipeIdea {
    let block = raw_block.trim();
    let emoji = extract_emoji(block).to_string();
    let without_emoji = match LEADING_EMOJI.find(block) {
        Some(m) => block[m.end()..].trim(),
        None => block,
    };

    let split = split_title_description(without_emoji, index);
    finish(emoji, split.title, split.description, index)
}

/// Runs the strategy chain over emoji-free block text.
pub fn split_title_description(text: &str, index: usize) -> IdeaSplit {
    for strategy in IdeaStrategy::DASHES {
        if let Some(split) = try_dash(strategy, text) {
            return split;
        }
    }

    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    match lines.as_slice() {
        [] => IdeaSplit {
            strategy: IdeaStrategy::Placeholder,
            title: placeholder_title(index),
            description: PLACEHOLDER_DESCRIPTION.to_string(),
        },
        [line] => split_single_line(line),
        [first, rest @ ..] => IdeaSplit {
            strategy: IdeaStrategy::TitleLineThenBody,
            title: (*first).to_string(),
            description: rest.join(" "),
        },
    }
}

fn try_dash(strategy: IdeaStrategy, text: &str) -> Option<IdeaSplit> {
    let caps = strategy.dash_pattern()?.captures(text)?;
    let title = unwrap_emphasis(caps.get(1).map_or("", |m| m.as_str()).trim());
    let description = caps
        .get(2)
        .map_or("", |m| m.as_str())
        .trim_start_matches(['—', '–', '−', '-'])
        .lines()
        .next()
        .unwrap_or("")
        .trim()
        .to_string();
    Some(IdeaSplit {
        strategy,
        title,
        description,
    })
}

fn split_single_line(line: &str) -> IdeaSplit {
    if let Some(caps) = FIRST_BOLD_SPAN.captures(line) {
        let title = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
        let description = FIRST_BOLD_SPAN
            .replacen(line, 1, "")
            .trim()
            .trim_start_matches(['—', '–', '−', '-'])
            .trim()
            .to_string();
        return IdeaSplit {
            strategy: IdeaStrategy::BoldSpan,
            title,
            description,
        };
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    if words.len() > 6 {
        IdeaSplit {
            strategy: IdeaStrategy::LeadingWords,
            title: words[..4].join(" "),
            description: words[4..].join(" "),
        }
    } else {
        IdeaSplit {
            strategy: IdeaStrategy::WholeLine,
            title: line.to_string(),
            description: PLACEHOLDER_DESCRIPTION.to_string(),
        }
    }
}

fn unwrap_emphasis(title: &str) -> String {
    let title = WRAPPING_BOLD.replace(title, "$1");
    let title = title.trim();
    WRAPPING_ITALIC.replace(title, "$1").trim().to_string()
}

fn finish(emoji: String, title: String, description: String, index: usize) -> RecipeIdea {
    let mut title = MARKDOWN_EMPHASIS.replace_all(&title, "").trim().to_string();
    let mut description = MARKDOWN_EMPHASIS
        .replace_all(&description, "")
        .trim()
        .to_string();

    if title.is_empty() {
        title = placeholder_title(index);
    }
    if description.is_empty() {
        description = PLACEHOLDER_DESCRIPTION.to_string();
    }

    RecipeIdea {
        emoji,
        title: truncate_with_ellipsis(&title, MAX_TITLE_CHARS),
        description: truncate_with_ellipsis(&description, MAX_DESCRIPTION_CHARS),
    }
}

fn placeholder_title(index: usize) -> String {
    format!("Recipe Idea {}", index + 1)
}

/// Cuts `text` to at most `max` characters, the last three being `...`.
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}
