//! Aggregate refreshes run after a batch finishes.

use crate::store::DispatchStore;

/// A named SQL-side refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostBatchHook {
    pub name: &'static str,
    pub procedure: &'static str,
}

pub const POST_BATCH_HOOKS: &[PostBatchHook] = &[
    PostBatchHook {
        name: "citation_stats",
        procedure: "refresh_citation_stats",
    },
    PostBatchHook {
        name: "brand_visibility",
        procedure: "refresh_brand_visibility",
    },
    PostBatchHook {
        name: "university_visibility",
        procedure: "refresh_university_visibility",
    },
];

/// Runs every hook independently. Failures are logged and reported back by
/// name; they never propagate.
pub async fn run_post_batch_hooks<S: DispatchStore>(store: &S, batch_id: i64) -> Vec<&'static str> {
    let mut failed = Vec::new();
    for hook in POST_BATCH_HOOKS {
        match store.run_recompute(hook.procedure).await {
            Ok(()) => tracing::debug!(batch_id, hook = hook.name, "post-batch hook ran"),
            Err(e) => {
                tracing::warn!(
                    batch_id,
                    hook = hook.name,
                    procedure = hook.procedure,
                    error = %e,
                    "post-batch hook failed"
                );
                failed.push(hook.name);
            }
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hooks_only_name_allow_listed_procedures() {
        for hook in POST_BATCH_HOOKS {
            assert!(harbor_db::RECOMPUTE_PROCEDURES.contains(&hook.procedure));
        }
    }
}
