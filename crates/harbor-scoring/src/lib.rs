//! Score aggregation for a scan's results.
//!
//! Every function here is pure: the caller shapes database rows into the
//! input types and gets back 0-100 scores with a breakdown suitable for UI
//! display. Identical inputs always produce identical outputs.

mod brand;
mod types;
mod visibility;
mod website;

pub use brand::{calculate_brand_visibility_score, BrandBreakdown, BrandVisibilityScore};
pub use types::{
    BrandData, CategoryRank, IssueSeverity, SentimentCounts, ShoppingData, WebsiteData,
    WebsiteIssue,
};
pub use visibility::{
    calculate_visibility_score, rank_points, CompetitorShare, VisibilityBreakdown, VisibilityScore,
};
pub use website::{
    calculate_website_readiness_score, IssueCounts, WebsiteBreakdown, WebsiteReadinessScore,
};

/// Weight of the shopping visibility score in the Harbor score (percent).
pub const HARBOR_W_VISIBILITY: u32 = 50;
/// Weight of the brand visibility score in the Harbor score (percent).
pub const HARBOR_W_BRAND: u32 = 30;
/// Weight of the website readiness score in the Harbor score (percent).
pub const HARBOR_W_WEBSITE: u32 = 20;

const _: () = assert!(
    HARBOR_W_VISIBILITY + HARBOR_W_BRAND + HARBOR_W_WEBSITE == 100,
    "harbor score weights must sum to exactly 100"
);

/// Combined 0-100 score blending the three category scores.
#[must_use]
pub fn calculate_harbor_score(
    shopping: &ShoppingData,
    brand: &BrandData,
    website: &WebsiteData,
) -> u8 {
    let visibility = calculate_visibility_score(shopping).total;
    let brand = calculate_brand_visibility_score(brand).total;
    let website = calculate_website_readiness_score(website).total;

    let blended = f64::from(visibility) * f64::from(HARBOR_W_VISIBILITY) / 100.0
        + f64::from(brand) * f64::from(HARBOR_W_BRAND) / 100.0
        + f64::from(website) * f64::from(HARBOR_W_WEBSITE) / 100.0;
    to_total(blended)
}

/// Rounds and clamps a raw score into `0..=100`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn to_total(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

/// Rounds a breakdown component to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `numerator / denominator`, or `0.0` when the denominator is zero.
pub(crate) fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        f64::from(numerator) / f64::from(denominator)
    }
}
