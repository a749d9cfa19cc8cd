//! Turns model outputs into result rows.

use harbor_core::Prompt;
use harbor_db::{NewBrandResult, NewConversationResult, NewShoppingResult, PromptResults};
use harbor_llm::{analyze_response, response_hash, ModelOutput};

/// One conversation row per model output; shopping and brand rows only from
/// successful responses. Shopping rows use the prompt topic as category.
pub(crate) fn build_prompt_results(
    prompt: &Prompt,
    outputs: &[ModelOutput],
    tracked_brands: &[String],
) -> PromptResults {
    let mut results = PromptResults::default();

    for output in outputs {
        let model = output.model.slug().to_string();
        results.conversations.push(NewConversationResult {
            model: model.clone(),
            response_text: output.response_text.clone(),
            response_hash: output.response_text.as_deref().map(response_hash),
            tokens_used: i64::try_from(output.tokens_used).unwrap_or(i64::MAX),
            error: output.error.clone(),
        });

        let Some(text) = output.response_text.as_deref().filter(|_| output.succeeded()) else {
            continue;
        };
        let analysis = analyze_response(text, tracked_brands);

        results
            .shopping
            .extend(analysis.shopping.into_iter().map(|m| NewShoppingResult {
                model: model.clone(),
                category: prompt.topic.clone(),
                brand_name: m.brand_name,
                rank: i32::try_from(m.rank).ok(),
                weight: m.weight,
                is_tracked_brand: m.is_tracked_brand,
            }));
        results
            .brand
            .extend(analysis.brand.into_iter().map(|m| NewBrandResult {
                model: model.clone(),
                brand_name: m.brand_name,
                descriptor: m.descriptor,
                sentiment: m.sentiment.as_str().to_string(),
                sentiment_score: m.sentiment_score,
                is_tracked_brand: m.is_tracked_brand,
            }));
    }

    results
}
