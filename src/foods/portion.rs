use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::catalog::{FoodCatalog, DEFAULT_SIMILAR_LIMIT};
use crate::oracle::{complete_json, ChatOracle, ChatPrompt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortionSource {
    Catalog,
    SimilarFood,
    AiGenerated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortionInfo {
    pub food: String,
    pub unit: String,
    pub unit_desc: String,
    pub source: PortionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_food: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PortionReply {
    unit_desc: String,
}

/// Describes a serving of a food: catalog, then the closest catalog
/// neighbour by shared words, then the oracle.
pub struct PortionGuide {
    catalog: Arc<FoodCatalog>,
    oracle: Option<Arc<dyn ChatOracle>>,
}

impl PortionGuide {
    pub fn new(catalog: Arc<FoodCatalog>, oracle: Option<Arc<dyn ChatOracle>>) -> Self {
        Self { catalog, oracle }
    }

    pub async fn describe(&self, food: &str) -> PortionInfo {
        if let Some(record) = self.catalog.lookup(food) {
            return PortionInfo {
                food: food.to_string(),
                unit: record.unit.clone(),
                unit_desc: record.unit_description.clone(),
                source: PortionSource::Catalog,
                reference_food: None,
            };
        }

        if let Some(closest) = self.catalog.similar(food, DEFAULT_SIMILAR_LIMIT).into_iter().next() {
            debug!(food = %food, reference = %closest.name, overlap = closest.overlap, "portion from similar food");
            return PortionInfo {
                food: food.to_string(),
                unit: "serving".into(),
                unit_desc: closest.unit_description,
                source: PortionSource::SimilarFood,
                reference_food: Some(closest.name),
            };
        }

        PortionInfo {
            food: food.to_string(),
            unit: "serving".into(),
            unit_desc: self.ask_oracle(food).await,
            source: PortionSource::AiGenerated,
            reference_food: None,
        }
    }

    async fn ask_oracle(&self, food: &str) -> String {
        let fallback = format!("1 serving (typical portion for {food})");
        let Some(oracle) = &self.oracle else {
            return fallback;
        };

        let prompt = ChatPrompt {
            system: "You are a nutrition expert providing portion size guidance.".into(),
            user: format!(
                "Provide typical portion sizes for \"{food}\" in Indian cuisine context.\n\n\
                 Return a JSON object with \"unit_desc\" containing a brief, practical description \
                 of what 1 serving typically weighs or looks like.\n\n\
                 Keep it concise and practical. Return only JSON format: {{\"unit_desc\": \"description\"}}"
            ),
            max_tokens: 200,
            temperature: 0.3,
        };
        let reply = complete_json(oracle.as_ref(), &prompt)
            .await
            .and_then(|v| serde_json::from_value::<PortionReply>(v).map_err(Into::into));
        match reply {
            Ok(r) if !r.unit_desc.trim().is_empty() => r.unit_desc,
            Ok(_) => fallback,
            Err(e) => {
                error!(food = %food, error = %e, "portion description from oracle failed");
                fallback
            }
        }
    }
}
