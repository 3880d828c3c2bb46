//! Language-model oracle used for nutrition estimates, meal parsing,
//! suggestions and portion descriptions.
//!
//! Every capability is built on [`ChatOracle`], a single round-trip that sends
//! a system and a user message and returns the model's JSON reply as text.
//! Callers own the interpretation of that text and downgrade every failure to
//! an "absent" result for their feature.

pub mod nutrition;
pub mod openai;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// One request to the oracle. Replies are always requested as a JSON object.
#[derive(Debug, Clone)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("oracle returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("oracle returned empty content")]
    EmptyContent,
    #[error("oracle reply is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("oracle reply has unexpected shape: {0}")]
    Shape(String),
}

#[async_trait]
pub trait ChatOracle: Send + Sync {
    /// Sends one prompt and returns the reply content. Empty content is an error.
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String, OracleError>;
}

/// Sends `prompt` and parses the reply as JSON.
pub async fn complete_json(oracle: &dyn ChatOracle, prompt: &ChatPrompt) -> Result<Value, OracleError> {
    let content = oracle.complete(prompt).await?;
    if content.trim().is_empty() {
        return Err(OracleError::EmptyContent);
    }
    Ok(serde_json::from_str(&content)?)
}

/// Reads a JSON number or numeric string as `f64`.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FnOracle;
    use super::*;
    use serde_json::json;

    fn prompt() -> ChatPrompt {
        ChatPrompt {
            system: "s".into(),
            user: "u".into(),
            max_tokens: 10,
            temperature: 0.0,
        }
    }

    #[test]
    fn as_number_coerces_numbers_and_numeric_strings() {
        assert_eq!(as_number(&json!(3)), Some(3.0));
        assert_eq!(as_number(&json!(2.5)), Some(2.5));
        assert_eq!(as_number(&json!(" 4 ")), Some(4.0));
        assert_eq!(as_number(&json!("two")), None);
        assert_eq!(as_number(&json!(null)), None);
        assert_eq!(as_number(&json!([1])), None);
    }

    #[tokio::test]
    async fn complete_json_rejects_blank_and_invalid_content() {
        let blank = FnOracle::fixed("   ");
        assert!(matches!(
            complete_json(&blank, &prompt()).await,
            Err(OracleError::EmptyContent)
        ));

        let garbage = FnOracle::fixed("not json");
        assert!(matches!(
            complete_json(&garbage, &prompt()).await,
            Err(OracleError::InvalidJson(_))
        ));

        let ok = FnOracle::fixed(r#"{"a": 1}"#);
        assert_eq!(complete_json(&ok, &prompt()).await.unwrap(), json!({"a": 1}));
    }
}
