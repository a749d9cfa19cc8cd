//! Prompt freshness.
//!
//! The predicate runs in the application layer against each prompt's own
//! `frequency_days`, so every store (Postgres, in-memory) selects the same
//! prompts for the same inputs.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};

use crate::{PriorityTier, Prompt};

/// Topic/priority narrowing applied before the freshness predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionFilter {
    pub topic: Option<String>,
    pub priority: Option<PriorityTier>,
}

impl SelectionFilter {
    #[must_use]
    pub fn matches(&self, prompt: &Prompt) -> bool {
        self.topic.as_deref().is_none_or(|t| prompt.topic == t)
            && self.priority.is_none_or(|p| prompt.priority == p)
    }
}

/// Returns `true` when `prompt` should run at `now`.
///
/// Inactive prompts are never due. With `force` every active prompt is due.
/// Otherwise a prompt is due if it never ran, or if strictly more than
/// `frequency_days` have elapsed since its last run.
#[must_use]
pub fn is_due(prompt: &Prompt, now: DateTime<Utc>, force: bool) -> bool {
    if !prompt.is_active {
        return false;
    }
    if force {
        return true;
    }
    match prompt.last_executed_at {
        None => true,
        Some(last) => now - last > Duration::days(i64::from(prompt.frequency_days.max(1))),
    }
}

/// Never-executed first, then oldest run first, then lowest id.
fn selection_order(a: &Prompt, b: &Prompt) -> Ordering {
    match (a.last_executed_at, b.last_executed_at) {
        (None, None) => a.id.cmp(&b.id),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y).then(a.id.cmp(&b.id)),
    }
}

/// Pick at most `limit` due prompts from `candidates`.
#[must_use]
pub fn select_due(
    candidates: Vec<Prompt>,
    now: DateTime<Utc>,
    force: bool,
    filter: &SelectionFilter,
    limit: usize,
) -> Vec<Prompt> {
    let mut due: Vec<Prompt> = candidates
        .into_iter()
        .filter(|p| filter.matches(p) && is_due(p, now, force))
        .collect();
    due.sort_by(selection_order);
    due.truncate(limit);
    due
}
