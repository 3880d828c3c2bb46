use tracing::info;

use super::gl::round2;
use super::model::{MealItemRequest, MealResult};
use super::resolver::FoodResolver;
use super::suggestions::SuggestionAdvisor;

/// Resolves every line of a meal, totals the load and asks for advice.
pub struct MealEvaluator {
    resolver: FoodResolver,
    advisor: SuggestionAdvisor,
}

impl MealEvaluator {
    pub fn new(resolver: FoodResolver, advisor: SuggestionAdvisor) -> Self {
        Self { resolver, advisor }
    }

    /// Items come back in input order; repeated foods are resolved separately.
    pub async fn evaluate(&self, lines: &[MealItemRequest]) -> MealResult {
        let mut items = Vec::with_capacity(lines.len());
        let mut total = 0.0;
        for line in lines {
            let item = self.resolver.resolve(line).await;
            if let Some(gl) = item.glycemic_load {
                total += gl;
            }
            items.push(item);
        }
        let total = round2(total);

        let suggestions = self.advisor.advise(&items, total).await;
        info!(items = items.len(), total_gl = total, suggestions = suggestions.len(), "meal evaluated");
        MealResult {
            total_glycemic_load: total,
            items,
            suggestions,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::foods::catalog::tests::sample_catalog;
    use crate::meals::model::Provenance;
    use crate::meals::parser::{MealParser, ParsedItem};
    use crate::oracle::nutrition::{LlmNutritionOracle, NutritionOracle};
    use crate::oracle::testing::FnOracle;
    use crate::oracle::{ChatOracle, OracleError};
    use serde_json::json;

    const SUGGESTIONS: &str = r#"{"suggestions": [{"text": "Have one roti instead of two", "reason": "Halves the load of the main carb"}]}"#;

    /// Nutrition requests fail; suggestion requests succeed.
    fn oracle() -> Arc<FnOracle> {
        Arc::new(FnOracle::new(|p| {
            if p.user.starts_with("Get nutrition info for:") {
                Err(OracleError::EmptyContent)
            } else {
                Ok(SUGGESTIONS.to_string())
            }
        }))
    }

    fn evaluator(llm: Arc<dyn ChatOracle>) -> MealEvaluator {
        let catalog = Arc::new(sample_catalog());
        let nutrition = Arc::new(LlmNutritionOracle::new(llm.clone())) as Arc<dyn NutritionOracle>;
        MealEvaluator::new(
            FoodResolver::new(catalog, Some(nutrition)),
            SuggestionAdvisor::new(Some(llm)),
        )
    }

    #[tokio::test]
    async fn roti_and_unknown_snack() {
        let e = evaluator(oracle());
        let result = e
            .evaluate(&[
                MealItemRequest::new("Roti", 2.0),
                MealItemRequest::new("Unknown Snack XYZ", 1.0),
            ])
            .await;

        assert_eq!(result.total_glycemic_load, 21.08);
        assert_eq!(result.items[0].glycemic_load, Some(21.08));
        assert_eq!(result.items[1].provenance, Provenance::NotFound);
        assert_eq!(result.items[1].glycemic_load, None);
        assert!(!result.suggestions.is_empty());

        let body = serde_json::to_value(&result).unwrap();
        assert_eq!(body["total_gl"], json!(21.08));
        assert_eq!(body["items"][0]["food"], json!("Roti"));
        assert_eq!(body["items"][0]["gl"], json!(21.08));
        assert_eq!(body["items"][1], json!({"food": "Unknown Snack XYZ", "status": "not_found"}));
        assert!(body["suggestions"][0]["text"].is_string());
        assert!(body["suggestions"][0]["reason"].is_string());
    }

    #[tokio::test]
    async fn keeps_order_count_and_duplicates() {
        let e = evaluator(oracle());
        let lines: Vec<MealItemRequest> = [
            json!({"food": "Roti", "quantity": 1}),
            json!({"food": "White Rice", "quantity": 1}),
            json!({"food": "Roti", "quantity": 1}),
            json!({"food": "Dal Tadka", "quantity": -1}),
            json!({"food": "Dal Tadka", "quantity": 1}),
        ]
        .iter()
        .map(MealItemRequest::from_value)
        .collect();

        let result = e.evaluate(&lines).await;
        let foods: Vec<&str> = result.items.iter().map(|i| i.food.as_str()).collect();
        assert_eq!(foods, vec!["Roti", "White Rice", "Roti", "Dal Tadka", "Dal Tadka"]);
        assert_eq!(result.items[3].provenance, Provenance::InvalidQuantity);
        assert_eq!(result.items[0], result.items[2]);

        let expected: f64 = result.items.iter().filter_map(|i| i.glycemic_load).sum();
        assert_eq!(result.total_glycemic_load, round2(expected));
    }

    #[tokio::test]
    async fn low_load_meal_gets_no_suggestions() {
        let llm = oracle();
        let e = evaluator(llm.clone());
        let result = e.evaluate(&[MealItemRequest::new("Chicken Curry", 1.0)]).await;
        assert!(result.total_glycemic_load < 11.0);
        assert!(result.suggestions.is_empty());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn parsed_meal_reevaluates_identically() {
        let llm = Arc::new(FnOracle::new(|p| {
            if p.user.starts_with("Parse this meal:") {
                Ok(r#"{"meal": [{"food": "White Rice", "quantity": 1}, {"food": "Dal Tadka", "quantity": 1}]}"#.into())
            } else {
                Ok(SUGGESTIONS.to_string())
            }
        }));
        let parser = MealParser::new(Arc::new(sample_catalog()), Some(llm.clone()));
        let parsed = parser.parse_free_text("rice and dal").await.unwrap();
        assert_eq!(parsed.len(), 2);

        let e = evaluator(llm);
        let first_lines: Vec<MealItemRequest> =
            parsed.iter().map(|p| MealItemRequest::new(p.food.clone(), p.quantity)).collect();
        let first = e.evaluate(&first_lines).await;

        let wire = serde_json::to_value(json!({ "meal": parsed })).unwrap();
        let reparsed: Vec<ParsedItem> = serde_json::from_value(wire["meal"].clone()).unwrap();
        let second_lines: Vec<MealItemRequest> = wire["meal"]
            .as_array()
            .unwrap()
            .iter()
            .map(MealItemRequest::from_value)
            .collect();
        let second = e.evaluate(&second_lines).await;

        assert_eq!(reparsed, parsed);
        assert_eq!(first.total_glycemic_load, second.total_glycemic_load);
        assert_eq!(first.items, second.items);
    }
}
