//! Extraction of shopping and brand signals from assistant responses.
//!
//! Shopping mentions come from the ranked list most assistants answer
//! "best X for Y" prompts with. Brand mentions attach a lexicon sentiment to
//! every tracked brand the response names, and to each listed brand using its
//! own list item as context.

mod lexicon;

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

pub use lexicon::{lexicon_score, strongest_word};

const POSITIVE_THRESHOLD: f32 = 0.1;
const NEGATIVE_THRESHOLD: f32 = -0.1;
const MAX_BRAND_NAME_CHARS: usize = 80;

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s+(.+?)\s*$").expect("valid regex"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"));

/// One brand recommended in a ranked list.
#[derive(Debug, Clone, PartialEq)]
pub struct ShoppingMention {
    pub brand_name: String,
    /// 1-based position in the list.
    pub rank: u32,
    pub weight: f32,
    pub is_tracked_brand: bool,
}

/// How a response talks about one brand.
#[derive(Debug, Clone, PartialEq)]
pub struct BrandMention {
    pub brand_name: String,
    pub descriptor: Option<String>,
    pub sentiment: Sentiment,
    pub sentiment_score: f32,
    pub is_tracked_brand: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    #[must_use]
    pub fn from_score(score: f32) -> Self {
        if score > POSITIVE_THRESHOLD {
            Sentiment::Positive
        } else if score < NEGATIVE_THRESHOLD {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

/// Shopping and brand signals extracted from one response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseAnalysis {
    pub shopping: Vec<ShoppingMention>,
    pub brand: Vec<BrandMention>,
}

/// Hex SHA-256 of a response body, stored alongside the conversation row.
#[must_use]
pub fn response_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Extracts shopping and brand signals from `text`.
///
/// `tracked_brands` is matched case-insensitively.
#[must_use]
pub fn analyze_response(text: &str, tracked_brands: &[String]) -> ResponseAnalysis {
    let items = ranked_items(text);
    let is_tracked = |name: &str| {
        tracked_brands
            .iter()
            .any(|tracked| tracked.eq_ignore_ascii_case(name))
    };

    let shopping: Vec<ShoppingMention> = items
        .iter()
        .map(|item| ShoppingMention {
            brand_name: item.brand_name.clone(),
            rank: item.rank,
            weight: rank_weight(item.rank),
            is_tracked_brand: is_tracked(&item.brand_name),
        })
        .collect();

    let mut brand = Vec::new();
    for tracked in tracked_brands {
        let context = sentences_mentioning(text, tracked);
        if context.is_empty() {
            continue;
        }
        brand.push(brand_mention(tracked, &context, true));
    }
    for item in &items {
        if is_tracked(&item.brand_name) {
            continue;
        }
        brand.push(brand_mention(&item.brand_name, &item.line, false));
    }

    ResponseAnalysis { shopping, brand }
}

#[derive(Debug)]
struct RankedItem {
    brand_name: String,
    rank: u32,
    line: String,
}

/// List items in document order; repeated brands keep their first rank.
fn ranked_items(text: &str) -> Vec<RankedItem> {
    let mut items: Vec<RankedItem> = Vec::new();
    let mut position = 0u32;
    for line in text.lines() {
        let Some(caps) = LIST_ITEM.captures(line) else {
            continue;
        };
        let body = caps.get(1).map_or("", |m| m.as_str());
        let Some(brand_name) = brand_from_item(body) else {
            continue;
        };
        position += 1;
        if items
            .iter()
            .any(|existing| existing.brand_name.eq_ignore_ascii_case(&brand_name))
        {
            continue;
        }
        items.push(RankedItem {
            brand_name,
            rank: position,
            line: body.to_string(),
        });
    }
    items
}

/// Bold text if present, else the text before the first separator.
fn brand_from_item(body: &str) -> Option<String> {
    let raw = if let Some(caps) = BOLD.captures(body) {
        caps.get(1).map_or("", |m| m.as_str()).to_string()
    } else {
        let cut = [" - ", " – ", " — ", ":", "(", ","]
            .iter()
            .filter_map(|sep| body.find(sep))
            .min()
            .unwrap_or(body.len());
        body[..cut].to_string()
    };
    let name = raw
        .trim()
        .trim_end_matches([':', '.', '-', '–', '—'])
        .trim()
        .to_string();
    if name.is_empty() || name.chars().count() > MAX_BRAND_NAME_CHARS {
        None
    } else {
        Some(name)
    }
}

fn rank_weight(rank: u32) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let rank = rank.max(1) as f32;
    1.0 / rank
}

/// Sentences of `text` that name `brand` as a whole word, joined by spaces.
fn sentences_mentioning(text: &str, brand: &str) -> String {
    let Ok(pattern) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(brand))) else {
        return String::new();
    };
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|sentence| pattern.is_match(sentence))
        .collect::<Vec<_>>()
        .join(" ")
}

fn brand_mention(brand: &str, context: &str, is_tracked_brand: bool) -> BrandMention {
    let score = lexicon_score(context);
    BrandMention {
        brand_name: brand.to_string(),
        descriptor: strongest_word(context),
        sentiment: Sentiment::from_score(score),
        sentiment_score: score,
        is_tracked_brand,
    }
}
