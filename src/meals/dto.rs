use serde::Serialize;

use super::model::{ResolvedItem, Suggestion};
use super::parser::{DisambiguationResult, ParsedItem};
use crate::usage::gate::UsageSnapshot;

#[derive(Debug, Serialize)]
pub struct CalculateGlResponse {
    pub total_gl: f64,
    pub items: Vec<ResolvedItem>,
    pub suggestions: Vec<Suggestion>,
    pub usage: UsageSnapshot,
}

#[derive(Debug, Serialize)]
pub struct ParseMealResponse {
    pub meal: Vec<ParsedItem>,
    pub usage: UsageSnapshot,
}

#[derive(Debug, Serialize)]
pub struct SmartParseResponse {
    pub status: &'static str,
    pub items: Vec<DisambiguationResult>,
    pub usage: UsageSnapshot,
}
