use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, error};

use super::model::{Provenance, ResolvedItem, Suggestion};
use crate::oracle::{complete_json, ChatOracle, ChatPrompt};

/// Meals below this total glycemic load get no suggestions.
pub const SUGGESTION_THRESHOLD: f64 = 11.0;

const SYSTEM_PROMPT: &str = r#"You are a nutrition expert providing specific meal improvement suggestions for glycemic load management.

Given a meal with its glycemic load (GL) breakdown, provide 3-4 actionable suggestions to improve the meal's impact on blood sugar.

GUIDELINES:
- Focus on SPECIFIC food swaps, not generic advice
- Consider the actual foods in the meal
- Suggest specific Indian foods from common diet when possible
- Include portion modifications, not just food substitutions
- Explain WHY each suggestion helps
- Be concise but specific

Return ONLY valid JSON with "suggestions" array containing objects with "text" and "reason" keys."#;

#[derive(Debug, Deserialize)]
struct SuggestionReply {
    suggestions: Vec<Suggestion>,
}

pub struct SuggestionAdvisor {
    oracle: Option<Arc<dyn ChatOracle>>,
}

impl SuggestionAdvisor {
    pub fn new(oracle: Option<Arc<dyn ChatOracle>>) -> Self {
        Self { oracle }
    }

    /// Best effort: any failure yields no suggestions.
    pub async fn advise(&self, items: &[ResolvedItem], total_gl: f64) -> Vec<Suggestion> {
        if total_gl < SUGGESTION_THRESHOLD {
            return Vec::new();
        }
        let Some(oracle) = &self.oracle else {
            debug!("no oracle configured; skipping suggestions");
            return Vec::new();
        };

        let prompt = ChatPrompt {
            system: SYSTEM_PROMPT.to_string(),
            user: request_text(items, total_gl),
            max_tokens: 800,
            temperature: 0.4,
        };
        let reply = match complete_json(oracle.as_ref(), &prompt).await {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "suggestion request failed");
                return Vec::new();
            }
        };
        match serde_json::from_value::<SuggestionReply>(reply) {
            Ok(r) => r.suggestions,
            Err(e) => {
                error!(error = %e, "invalid suggestions reply");
                Vec::new()
            }
        }
    }
}

/// The meal breakdown sent to the oracle.
pub fn request_text(items: &[ResolvedItem], total_gl: f64) -> String {
    let lines: Vec<String> = items
        .iter()
        .map(|item| {
            let source = if item.provenance == Provenance::OracleEstimated {
                "AI estimated"
            } else {
                "database"
            };
            format!(
                "- {}: GL {:.1} ({source})",
                item.food,
                item.glycemic_load.unwrap_or(0.0)
            )
        })
        .collect();
    format!(
        "Meal:\n{}\nTotal GL: {total_gl:.1}\n\nProvide improvement suggestions.",
        lines.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::testing::FnOracle;

    const REPLY: &str = r#"{"suggestions": [
        {"text": "Swap white rice for brown rice", "reason": "More fiber slows absorption"},
        {"text": "Add a side salad", "reason": "Vegetables lower the meal's overall load"}
    ]}"#;

    fn items() -> Vec<ResolvedItem> {
        vec![
            ResolvedItem::computed("White Rice", 32.42, Provenance::Catalog),
            ResolvedItem::computed("Kheer", 12.15, Provenance::OracleEstimated),
            ResolvedItem::skipped("XYZ", Provenance::NotFound, None),
        ]
    }

    #[tokio::test]
    async fn below_threshold_makes_no_call() {
        let llm = Arc::new(FnOracle::fixed(REPLY));
        let advisor = SuggestionAdvisor::new(Some(llm.clone()));
        assert!(advisor.advise(&items(), 10.99).await.is_empty());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn threshold_is_inclusive() {
        let llm = Arc::new(FnOracle::fixed(REPLY));
        let advisor = SuggestionAdvisor::new(Some(llm.clone()));
        let out = advisor.advise(&items(), 11.0).await;
        assert_eq!(llm.call_count(), 1);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text, "Swap white rice for brown rice");
    }

    #[tokio::test]
    async fn failures_degrade_to_empty() {
        let advisor = SuggestionAdvisor::new(Some(Arc::new(FnOracle::failing())));
        assert!(advisor.advise(&items(), 40.0).await.is_empty());

        let advisor = SuggestionAdvisor::new(Some(Arc::new(FnOracle::fixed(r#"{"tips": []}"#))));
        assert!(advisor.advise(&items(), 40.0).await.is_empty());

        let advisor = SuggestionAdvisor::new(None);
        assert!(advisor.advise(&items(), 40.0).await.is_empty());
    }

    #[test]
    fn request_text_lists_every_item() {
        let text = request_text(&items(), 44.57);
        assert!(text.contains("- White Rice: GL 32.4 (database)"));
        assert!(text.contains("- Kheer: GL 12.2 (AI estimated)") || text.contains("- Kheer: GL 12.1 (AI estimated)"));
        assert!(text.contains("- XYZ: GL 0.0 (database)"));
        assert!(text.contains("Total GL: 44.6"));
    }
}
