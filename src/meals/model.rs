use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One meal line as received, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MealItemRequest {
    /// `None` when the line had no `food` or it was not a string.
    pub food: Option<String>,
    pub quantity: Option<Value>,
    /// Display name kept for lines whose `food` was unusable.
    pub label: String,
}

impl MealItemRequest {
    #[cfg(test)]
    pub fn new(food: impl Into<String>, quantity: f64) -> Self {
        let food = food.into();
        Self {
            label: food.clone(),
            food: Some(food),
            quantity: Some(Value::from(quantity)),
        }
    }

    /// Reads a raw `{food, quantity}` element, tolerating any shape.
    pub fn from_value(value: &Value) -> Self {
        let food = value.get("food");
        Self {
            food: food.and_then(Value::as_str).map(str::to_owned),
            quantity: value.get("quantity").cloned(),
            label: match food {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => "Unknown".to_string(),
                Some(other) => other.to_string(),
            },
        }
    }
}

/// How an item's nutrition data was obtained, or why it could not be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Catalog,
    OracleEstimated,
    NotFound,
    InvalidFormat,
    InvalidQuantity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedItem {
    pub food: String,
    /// `None` when no value could be computed; `Some(0.0)` is a real zero.
    #[serde(rename = "gl", skip_serializing_if = "Option::is_none")]
    pub glycemic_load: Option<f64>,
    #[serde(rename = "status")]
    pub provenance: Provenance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResolvedItem {
    pub fn computed(food: impl Into<String>, gl: f64, provenance: Provenance) -> Self {
        Self {
            food: food.into(),
            glycemic_load: Some(gl),
            provenance,
            message: None,
        }
    }

    pub fn skipped(food: impl Into<String>, provenance: Provenance, message: Option<&str>) -> Self {
        Self {
            food: food.into(),
            glycemic_load: None,
            provenance,
            message: message.map(str::to_owned),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealResult {
    #[serde(rename = "total_gl")]
    pub total_glycemic_load: f64,
    pub items: Vec<ResolvedItem>,
    pub suggestions: Vec<Suggestion>,
}
