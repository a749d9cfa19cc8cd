use serde::Serialize;

use crate::types::{IssueSeverity, WebsiteData};
use crate::{round1, to_total};

pub const W_SCHEMA: u32 = 60;
pub const W_HEALTH: u32 = 40;

const _: () = assert!(
    W_SCHEMA + W_HEALTH == 100,
    "website weights must sum to exactly 100"
);

const PENALTY_CRITICAL: f64 = 10.0;
const PENALTY_WARNING: f64 = 4.0;
const PENALTY_INFO: f64 = 1.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebsiteBreakdown {
    pub schema: f64,
    pub health: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IssueCounts {
    pub critical: u32,
    pub warning: u32,
    pub info: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebsiteReadinessScore {
    pub total: u8,
    pub breakdown: WebsiteBreakdown,
    pub issue_counts: IssueCounts,
}

/// How ready the brand's website is to be read by assistants.
///
/// Health starts at full credit and loses points per issue by severity,
/// never dropping below zero.
#[must_use]
pub fn calculate_website_readiness_score(data: &WebsiteData) -> WebsiteReadinessScore {
    let coverage = if data.schema_coverage_pct.is_finite() {
        (data.schema_coverage_pct / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let schema = coverage * f64::from(W_SCHEMA);

    let mut counts = IssueCounts::default();
    for issue in &data.issues {
        match issue.severity {
            IssueSeverity::Critical => counts.critical += 1,
            IssueSeverity::Warning => counts.warning += 1,
            IssueSeverity::Info => counts.info += 1,
        }
    }
    let penalty = f64::from(counts.critical) * PENALTY_CRITICAL
        + f64::from(counts.warning) * PENALTY_WARNING
        + f64::from(counts.info) * PENALTY_INFO;
    let health = (f64::from(W_HEALTH) - penalty).max(0.0);

    WebsiteReadinessScore {
        total: to_total(schema + health),
        breakdown: WebsiteBreakdown {
            schema: round1(schema),
            health: round1(health),
        },
        issue_counts: counts,
    }
}
