use serde::Serialize;

use crate::types::ShoppingData;
use crate::{ratio, round1, to_total};

pub const W_MENTION_RATE: u32 = 30;
pub const W_RANK_QUALITY: u32 = 30;
pub const W_CATEGORY_COVERAGE: u32 = 15;
pub const W_MODEL_COVERAGE: u32 = 10;
pub const W_SHARE_OF_VOICE: u32 = 15;

const _: () = assert!(
    W_MENTION_RATE + W_RANK_QUALITY + W_CATEGORY_COVERAGE + W_MODEL_COVERAGE + W_SHARE_OF_VOICE
        == 100,
    "visibility weights must sum to exactly 100"
);

const TOP_COMPETITORS: usize = 5;

/// Points earned per component, one decimal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisibilityBreakdown {
    pub mention_rate: f64,
    pub rank_quality: f64,
    pub category_coverage: f64,
    pub model_coverage: f64,
    pub share_of_voice: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompetitorShare {
    pub brand_name: String,
    pub mentions: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisibilityScore {
    pub total: u8,
    pub breakdown: VisibilityBreakdown,
    pub top_competitors: Vec<CompetitorShare>,
}

/// Fraction of full rank credit for a list position.
///
/// 1 → 1.0, 2 → 0.8, 3 → 0.6, 4–5 → 0.4, 6–10 → 0.2, anything else 0.
#[must_use]
pub fn rank_points(rank: Option<u32>) -> f64 {
    match rank {
        Some(1) => 1.0,
        Some(2) => 0.8,
        Some(3) => 0.6,
        Some(4..=5) => 0.4,
        Some(6..=10) => 0.2,
        _ => 0.0,
    }
}

/// Shopping visibility of the tracked brand.
#[must_use]
pub fn calculate_visibility_score(data: &ShoppingData) -> VisibilityScore {
    let mention_rate = ratio(data.total_mentions, data.total_queries).min(1.0);

    let rank_quality = if data.categories.is_empty() {
        0.0
    } else {
        let sum: f64 = data.categories.iter().map(|c| rank_points(c.best_rank)).sum();
        #[allow(clippy::cast_precision_loss)]
        let count = data.categories.len() as f64;
        sum / count
    };

    let covered = data.categories.iter().filter(|c| c.mentions > 0).count();
    let category_coverage = ratio(
        u32::try_from(covered).unwrap_or(u32::MAX),
        u32::try_from(data.categories.len()).unwrap_or(u32::MAX),
    );

    let models_with_mentions = data.model_mentions.values().filter(|&&m| m > 0).count();
    let model_coverage =
        ratio(u32::try_from(models_with_mentions).unwrap_or(u32::MAX), data.models_queried)
            .min(1.0);

    let competitor_total: u32 = data.competitor_mentions.values().sum();
    let share_of_voice = ratio(
        data.total_mentions,
        data.total_mentions.saturating_add(competitor_total),
    );

    let points = [
        mention_rate * f64::from(W_MENTION_RATE),
        rank_quality * f64::from(W_RANK_QUALITY),
        category_coverage * f64::from(W_CATEGORY_COVERAGE),
        model_coverage * f64::from(W_MODEL_COVERAGE),
        share_of_voice * f64::from(W_SHARE_OF_VOICE),
    ];

    let mut top_competitors: Vec<CompetitorShare> = data
        .competitor_mentions
        .iter()
        .map(|(name, &mentions)| CompetitorShare {
            brand_name: name.clone(),
            mentions,
        })
        .collect();
    // Stable sort keeps BTreeMap (alphabetical) order among equal counts.
    top_competitors.sort_by(|a, b| b.mentions.cmp(&a.mentions));
    top_competitors.truncate(TOP_COMPETITORS);

    VisibilityScore {
        total: to_total(points.iter().sum()),
        breakdown: VisibilityBreakdown {
            mention_rate: round1(points[0]),
            rank_quality: round1(points[1]),
            category_coverage: round1(points[2]),
            model_coverage: round1(points[3]),
            share_of_voice: round1(points[4]),
        },
        top_competitors,
    }
}
