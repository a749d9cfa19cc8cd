//! Read-only staleness report.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use harbor_core::{select_due, PriorityTier, SelectionFilter};
use serde::Serialize;

use crate::error::DispatchError;
use crate::store::DispatchStore;

const SAMPLE_SIZE: usize = 10;
const SAMPLE_TEXT_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StalePromptSample {
    pub id: i64,
    pub prompt_text: String,
    pub topic: String,
    pub priority: PriorityTier,
    pub last_executed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleReport {
    pub total_stale: usize,
    pub by_topic: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub sample: Vec<StalePromptSample>,
}

/// Counts due prompts by topic and priority and samples the most overdue.
///
/// # Errors
///
/// Returns [`DispatchError::LoadPrompts`] if candidates cannot be read.
pub async fn stale_report<S: DispatchStore>(
    store: &S,
    topic: Option<&str>,
    now: DateTime<Utc>,
) -> Result<StaleReport, DispatchError> {
    let candidates = store
        .load_candidates(topic, None)
        .await
        .map_err(DispatchError::LoadPrompts)?;
    let filter = SelectionFilter {
        topic: topic.map(str::to_string),
        priority: None,
    };
    let due = select_due(candidates, now, false, &filter, usize::MAX);

    let mut by_topic: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_priority: BTreeMap<String, usize> = BTreeMap::new();
    for prompt in &due {
        *by_topic.entry(prompt.topic.clone()).or_default() += 1;
        *by_priority
            .entry(prompt.priority.as_str().to_string())
            .or_default() += 1;
    }

    let sample = due
        .iter()
        .take(SAMPLE_SIZE)
        .map(|p| StalePromptSample {
            id: p.id,
            prompt_text: truncate(&p.text, SAMPLE_TEXT_CHARS),
            topic: p.topic.clone(),
            priority: p.priority,
            last_executed_at: p.last_executed_at,
        })
        .collect();

    Ok(StaleReport {
        total_stale: due.len(),
        by_topic,
        by_priority,
        sample,
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push('…');
    cut
}
