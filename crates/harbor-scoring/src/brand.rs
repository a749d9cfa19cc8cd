use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::BrandData;
use crate::{ratio, round1, to_total};

pub const W_SENTIMENT: u32 = 50;
pub const W_RECOGNITION: u32 = 30;
pub const W_DESCRIPTOR_RICHNESS: u32 = 20;

const _: () = assert!(
    W_SENTIMENT + W_RECOGNITION + W_DESCRIPTOR_RICHNESS == 100,
    "brand weights must sum to exactly 100"
);

/// Distinct descriptors needed for full richness credit.
const DESCRIPTOR_TARGET: u32 = 10;
const TOP_DESCRIPTORS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BrandBreakdown {
    pub sentiment: f64,
    pub recognition: f64,
    pub descriptor_richness: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BrandVisibilityScore {
    pub total: u8,
    pub breakdown: BrandBreakdown,
    /// Most frequent descriptors, lowercase, ties in alphabetical order.
    pub top_descriptors: Vec<String>,
}

/// How favourably and how often assistants describe the tracked brand.
#[must_use]
pub fn calculate_brand_visibility_score(data: &BrandData) -> BrandVisibilityScore {
    let counts = data.sentiment;
    let all = counts.total();
    let sentiment = if all == 0 {
        0.0
    } else {
        (f64::from(counts.positive) + 0.5 * f64::from(counts.neutral)) / f64::from(all)
    };

    let recognition = ratio(data.mentioned_responses, data.total_responses).min(1.0);

    let mut frequency: BTreeMap<String, u32> = BTreeMap::new();
    for descriptor in &data.descriptors {
        let key = descriptor.trim().to_lowercase();
        if !key.is_empty() {
            *frequency.entry(key).or_default() += 1;
        }
    }
    let unique = u32::try_from(frequency.len()).unwrap_or(u32::MAX);
    let richness = f64::from(unique.min(DESCRIPTOR_TARGET)) / f64::from(DESCRIPTOR_TARGET);

    let points = [
        sentiment * f64::from(W_SENTIMENT),
        recognition * f64::from(W_RECOGNITION),
        richness * f64::from(W_DESCRIPTOR_RICHNESS),
    ];

    let mut ranked: Vec<(String, u32)> = frequency.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let top_descriptors = ranked
        .into_iter()
        .take(TOP_DESCRIPTORS)
        .map(|(word, _)| word)
        .collect();

    BrandVisibilityScore {
        total: to_total(points.iter().sum()),
        breakdown: BrandBreakdown {
            sentiment: round1(points[0]),
            recognition: round1(points[1]),
            descriptor_richness: round1(points[2]),
        },
        top_descriptors,
    }
}
