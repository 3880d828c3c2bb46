use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::foods::catalog::{normalize, FoodCatalog};
use crate::oracle::{as_number, complete_json, ChatOracle, ChatPrompt, OracleError};

const MAPPING_PROMPT: &str = r#"Parse meal descriptions into structured JSON format.

Return JSON with "meal" key containing array of objects with "food" and "quantity" keys.
Examples:
"2 pooris and chole" → {"meal": [{"food": "Poori", "quantity": 2}, {"food": "Chole Masala", "quantity": 1}]}
"rice and dal" → {"meal": [{"food": "White Rice", "quantity": 1}, {"food": "Dal", "quantity": 1}]}

Important: Always return a JSON object with a "meal" key containing an array of food items."#;

const EXTRACT_PROMPT: &str = r#"Parse meal descriptions into structured JSON format.

Extract food items and their quantities from the input text.
Use common food names without specific mapping - just extract what the user mentioned.

Return JSON with "meal" key containing array of objects with "food" and "quantity" keys.

Important: Always return a JSON object with a "meal" key containing an array of food items."#;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("meal parsing is not configured")]
    Unavailable,
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error("reply holds no meal array")]
    NoMealArray,
    #[error("meal item {index} lacks a usable `food` or `quantity`")]
    MalformedItem { index: usize },
}

/// A `{food, quantity}` pair produced from free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedItem {
    pub food: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    NeedsAi,
    SingleMatch,
    NeedsDisambiguation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogMatch {
    pub name: String,
    pub category: String,
    pub unit: String,
    pub unit_desc: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisambiguationResult {
    pub original_name: String,
    pub quantity: f64,
    pub status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_food: Option<String>,
    pub matches: Vec<CatalogMatch>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SmartParse {
    Items(Vec<DisambiguationResult>),
    /// The text parsed, but named no food at all.
    NoFoodItems,
}

pub struct MealParser {
    catalog: Arc<FoodCatalog>,
    oracle: Option<Arc<dyn ChatOracle>>,
}

impl MealParser {
    pub fn new(catalog: Arc<FoodCatalog>, oracle: Option<Arc<dyn ChatOracle>>) -> Self {
        Self { catalog, oracle }
    }

    /// Turns free text into meal lines, letting the oracle map names to common dishes.
    pub async fn parse_free_text(&self, text: &str) -> Result<Vec<ParsedItem>, ParseError> {
        self.parse_with(MAPPING_PROMPT, text).await
    }

    /// Extracts meal lines as written, then matches each against the catalog.
    pub async fn parse_and_disambiguate(&self, text: &str) -> Result<SmartParse, ParseError> {
        let items = self.parse_with(EXTRACT_PROMPT, text).await?;
        if items.is_empty() {
            return Ok(SmartParse::NoFoodItems);
        }
        Ok(SmartParse::Items(
            items.into_iter().map(|item| self.classify(item)).collect(),
        ))
    }

    async fn parse_with(&self, instruction: &str, text: &str) -> Result<Vec<ParsedItem>, ParseError> {
        let oracle = self.oracle.as_ref().ok_or(ParseError::Unavailable)?;
        let prompt = ChatPrompt {
            system: instruction.to_string(),
            user: format!("Parse this meal: {text}"),
            max_tokens: 500,
            temperature: 0.3,
        };
        let reply = complete_json(oracle.as_ref(), &prompt).await.map_err(|e| {
            warn!(error = %e, "meal parse oracle call failed");
            e
        })?;
        let items = read_meal(&reply)?;
        info!(count = items.len(), "meal parsed");
        Ok(items)
    }

    fn classify(&self, item: ParsedItem) -> DisambiguationResult {
        let matches = catalog_matches(&self.catalog, &item.food);
        let (status, selected_food) = match matches.len() {
            0 => (MatchStatus::NeedsAi, None),
            1 => (MatchStatus::SingleMatch, Some(matches[0].name.clone())),
            _ => (MatchStatus::NeedsDisambiguation, None),
        };
        DisambiguationResult {
            original_name: item.food,
            quantity: item.quantity,
            status,
            selected_food,
            matches,
        }
    }
}

/// Accepts `{"meal": [...]}` or a bare array of `{food, quantity}` objects.
pub fn read_meal(reply: &Value) -> Result<Vec<ParsedItem>, ParseError> {
    let array = match reply {
        Value::Array(a) => a,
        Value::Object(o) => o
            .get("meal")
            .and_then(Value::as_array)
            .ok_or(ParseError::NoMealArray)?,
        _ => return Err(ParseError::NoMealArray),
    };

    array
        .iter()
        .enumerate()
        .map(|(index, v)| {
            let food = v.get("food").and_then(Value::as_str);
            let quantity = v.get("quantity").and_then(as_number);
            match (food, quantity) {
                (Some(food), Some(quantity)) => Ok(ParsedItem {
                    food: food.to_string(),
                    quantity,
                }),
                _ => Err(ParseError::MalformedItem { index }),
            }
        })
        .collect()
}

/// Recall-oriented match used for interactive disambiguation: a catalog name
/// matches when it contains the whole query or any single word of it.
pub fn catalog_matches(catalog: &FoodCatalog, food: &str) -> Vec<CatalogMatch> {
    let query = normalize(food);
    let words: Vec<&str> = query.split_whitespace().collect();
    catalog
        .all()
        .iter()
        .filter(|r| {
            let name = r.name.to_lowercase();
            name.contains(&query) || words.iter().any(|w| name.contains(w))
        })
        .map(|r| CatalogMatch {
            name: r.name.clone(),
            category: r.category.clone(),
            unit: r.unit.clone(),
            unit_desc: r.unit_description.clone(),
        })
        .collect()
}
