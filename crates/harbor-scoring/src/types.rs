use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Best rank and mention count of the tracked brand in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRank {
    pub category: String,
    /// `None` when the brand was never ranked in this category.
    pub best_rank: Option<u32>,
    pub mentions: u32,
}

/// Shopping results for one scan, shaped for scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingData {
    /// Distinct (prompt, model) responses examined.
    pub total_queries: u32,
    /// Responses in which the tracked brand appeared.
    pub total_mentions: u32,
    pub categories: Vec<CategoryRank>,
    /// Mentions per competitor brand name.
    pub competitor_mentions: BTreeMap<String, u32>,
    /// Tracked-brand mentions per model slug.
    pub model_mentions: BTreeMap<String, u32>,
    pub models_queried: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

impl SentimentCounts {
    #[must_use]
    pub fn total(&self) -> u32 {
        self.positive + self.neutral + self.negative
    }
}

/// Brand results for one scan, shaped for scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandData {
    pub total_responses: u32,
    /// Responses that named the tracked brand.
    pub mentioned_responses: u32,
    pub sentiment: SentimentCounts,
    /// Descriptors attached to the tracked brand, possibly repeated.
    pub descriptors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Critical,
    Warning,
    Info,
}

impl IssueSeverity {
    /// Parses the stored severity label; unknown labels are treated as `info`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "critical" | "error" => IssueSeverity::Critical,
            "warning" | "warn" => IssueSeverity::Warning,
            _ => IssueSeverity::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteIssue {
    pub severity: IssueSeverity,
    pub message: String,
}

/// Website audit results for one scan, shaped for scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebsiteData {
    /// Percentage (0-100) of analyzed pages carrying structured data.
    pub schema_coverage_pct: f64,
    pub pages_analyzed: u32,
    pub issues: Vec<WebsiteIssue>,
}
