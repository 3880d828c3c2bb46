use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info};

use super::{as_number, complete_json, ChatOracle, ChatPrompt, OracleError};
use crate::meals::gl::NutritionFacts;

const SYSTEM_PROMPT: &str = r#"Give glycemic index (GI), carbs per unit (in grams), fiber per unit (in grams), unit, and unit_desc for one serving of the specified food item.
Return only in JSON with keys: gi, carbs_per_unit, fiber_per_unit, unit, unit_desc.

Example for 'Kheer':
{
  "gi": 45,
  "carbs_per_unit": 28,
  "fiber_per_unit": 1,
  "unit": "bowl",
  "unit_desc": "1 bowl = 150g, milk and rice-based sweet dish"
}"#;

const REQUIRED_KEYS: [&str; 5] = ["gi", "carbs_per_unit", "fiber_per_unit", "unit", "unit_desc"];

/// Nutrition facts estimated for a food missing from the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatedNutrition {
    pub facts: NutritionFacts,
    pub unit: String,
    pub unit_description: String,
}

#[async_trait]
pub trait NutritionOracle: Send + Sync {
    async fn estimate(&self, food_name: &str) -> Result<EstimatedNutrition, OracleError>;
}

/// [`NutritionOracle`] backed by a chat model.
pub struct LlmNutritionOracle {
    llm: Arc<dyn ChatOracle>,
}

impl LlmNutritionOracle {
    pub fn new(llm: Arc<dyn ChatOracle>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl NutritionOracle for LlmNutritionOracle {
    async fn estimate(&self, food_name: &str) -> Result<EstimatedNutrition, OracleError> {
        let prompt = ChatPrompt {
            system: SYSTEM_PROMPT.to_string(),
            user: format!("Get nutrition info for: {food_name}"),
            max_tokens: 300,
            temperature: 0.3,
        };
        let reply = complete_json(self.llm.as_ref(), &prompt).await?;
        match parse_estimate(&reply) {
            Ok(est) => {
                info!(food = %food_name, "nutrition estimated by oracle");
                Ok(est)
            }
            Err(e) => {
                error!(food = %food_name, error = %e, reply = %reply, "invalid nutrition data from oracle");
                Err(e)
            }
        }
    }
}

/// Validates an oracle reply: all five keys present, the three numeric ones
/// coercible to `f64`.
pub fn parse_estimate(reply: &Value) -> Result<EstimatedNutrition, OracleError> {
    let obj = reply
        .as_object()
        .ok_or_else(|| OracleError::Shape("expected a JSON object".into()))?;
    if let Some(missing) = REQUIRED_KEYS.iter().find(|k| !obj.contains_key(**k)) {
        return Err(OracleError::Shape(format!("missing key `{missing}`")));
    }

    let number = |key: &str| {
        as_number(&obj[key]).ok_or_else(|| OracleError::Shape(format!("`{key}` is not a number")))
    };
    let text = |key: &str| match &obj[key] {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    Ok(EstimatedNutrition {
        facts: NutritionFacts {
            glycemic_index: number("gi")?,
            carbs_per_unit: number("carbs_per_unit")?,
            fiber_per_unit: number("fiber_per_unit")?,
        },
        unit: text("unit"),
        unit_description: text("unit_desc"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::testing::FnOracle;
    use serde_json::json;

    #[test]
    fn parse_estimate_coerces_numeric_strings() {
        let est = parse_estimate(&json!({
            "gi": "45", "carbs_per_unit": 28, "fiber_per_unit": 1.0,
            "unit": "bowl", "unit_desc": "1 bowl = 150g"
        }))
        .unwrap();
        assert_eq!(est.facts.glycemic_index, 45.0);
        assert_eq!(est.facts.carbs_per_unit, 28.0);
        assert_eq!(est.unit, "bowl");
        assert_eq!(est.unit_description, "1 bowl = 150g");
    }

    #[test]
    fn parse_estimate_requires_every_key() {
        let err = parse_estimate(&json!({
            "gi": 45, "carbs_per_unit": 28, "fiber_per_unit": 1, "unit": "bowl"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("unit_desc"));
    }

    #[test]
    fn parse_estimate_rejects_non_numeric_values() {
        let err = parse_estimate(&json!({
            "gi": "medium", "carbs_per_unit": 28, "fiber_per_unit": 1,
            "unit": "bowl", "unit_desc": "x"
        }))
        .unwrap_err();
        assert!(matches!(err, OracleError::Shape(_)));
        assert!(parse_estimate(&json!([1, 2])).is_err());
    }

    #[tokio::test]
    async fn estimate_asks_for_the_named_food() {
        let llm = Arc::new(FnOracle::fixed(
            r#"{"gi": 45, "carbs_per_unit": 28, "fiber_per_unit": 1, "unit": "bowl", "unit_desc": "1 bowl"}"#,
        ));
        let oracle = LlmNutritionOracle::new(llm.clone());
        let est = oracle.estimate("Kheer").await.unwrap();
        assert_eq!(est.facts.glycemic_index, 45.0);
        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls[0].user, "Get nutrition info for: Kheer");
    }
}
