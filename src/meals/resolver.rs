use std::sync::Arc;

use tracing::{debug, warn};

use super::gl;
use super::model::{MealItemRequest, Provenance, ResolvedItem};
use crate::foods::catalog::FoodCatalog;
use crate::oracle::{as_number, nutrition::NutritionOracle};

/// Turns one meal line into a glycemic load: catalog first, then the oracle.
pub struct FoodResolver {
    catalog: Arc<FoodCatalog>,
    oracle: Option<Arc<dyn NutritionOracle>>,
}

impl FoodResolver {
    pub fn new(catalog: Arc<FoodCatalog>, oracle: Option<Arc<dyn NutritionOracle>>) -> Self {
        Self { catalog, oracle }
    }

    pub async fn resolve(&self, item: &MealItemRequest) -> ResolvedItem {
        let (Some(food), Some(quantity)) = (item.food.as_deref(), item.quantity.as_ref()) else {
            return ResolvedItem::skipped(
                item.label.clone(),
                Provenance::InvalidFormat,
                Some("Each meal item must have \"food\" and \"quantity\" fields"),
            );
        };
        if food.trim().is_empty() {
            return ResolvedItem::skipped(
                food,
                Provenance::InvalidFormat,
                Some("Food name must be a non-empty string"),
            );
        }

        let quantity = match as_number(quantity).filter(|q| q.is_finite()) {
            Some(q) if q > 0.0 => q,
            Some(_) => {
                return ResolvedItem::skipped(
                    food,
                    Provenance::InvalidQuantity,
                    Some("Quantity must be a positive number"),
                )
            }
            None => {
                return ResolvedItem::skipped(
                    food,
                    Provenance::InvalidQuantity,
                    Some("Quantity must be a valid number"),
                )
            }
        };

        if let Some(record) = self.catalog.lookup(food) {
            let gl = gl::compute(&record.facts(), quantity);
            debug!(food = %food, gl, "resolved from catalog");
            return ResolvedItem::computed(food, gl, Provenance::Catalog);
        }

        let Some(oracle) = &self.oracle else {
            warn!(food = %food, "not in catalog and no oracle configured");
            return ResolvedItem::skipped(food, Provenance::NotFound, None);
        };

        match oracle.estimate(food.trim()).await {
            Ok(est) => {
                let gl = gl::compute(&est.facts, quantity);
                debug!(food = %food, gl, "resolved by oracle");
                ResolvedItem::computed(food, gl, Provenance::OracleEstimated)
            }
            Err(e) => {
                warn!(food = %food, error = %e, "oracle could not estimate nutrition");
                ResolvedItem::skipped(food, Provenance::NotFound, None)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::foods::catalog::tests::sample_catalog;
    use crate::oracle::nutrition::LlmNutritionOracle;
    use crate::oracle::testing::FnOracle;
    use serde_json::json;

    pub(crate) const KHEER_REPLY: &str =
        r#"{"gi": 45, "carbs_per_unit": 28, "fiber_per_unit": 1, "unit": "bowl", "unit_desc": "1 bowl"}"#;

    fn resolver_with(llm: Option<Arc<FnOracle>>) -> FoodResolver {
        let oracle = llm.map(|l| Arc::new(LlmNutritionOracle::new(l)) as Arc<dyn NutritionOracle>);
        FoodResolver::new(Arc::new(sample_catalog()), oracle)
    }

    #[tokio::test]
    async fn catalog_hit_is_case_insensitive_and_skips_oracle() {
        let llm = Arc::new(FnOracle::failing());
        let r = resolver_with(Some(llm.clone()));
        let item = r.resolve(&MealItemRequest::new("ROTI", 2.0)).await;
        assert_eq!(item.glycemic_load, Some(21.08));
        assert_eq!(item.provenance, Provenance::Catalog);
        assert_eq!(item.food, "ROTI");
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn catalog_miss_uses_oracle() {
        let r = resolver_with(Some(Arc::new(FnOracle::fixed(KHEER_REPLY))));
        let item = r.resolve(&MealItemRequest::new("Kheer", 1.0)).await;
        assert_eq!(item.provenance, Provenance::OracleEstimated);
        assert_eq!(item.glycemic_load, Some(12.15));
    }

    #[tokio::test]
    async fn oracle_failure_or_absence_is_not_found() {
        let r = resolver_with(Some(Arc::new(FnOracle::failing())));
        let item = r.resolve(&MealItemRequest::new("Mystery", 1.0)).await;
        assert_eq!(item.provenance, Provenance::NotFound);
        assert_eq!(item.glycemic_load, None);

        let r = resolver_with(Some(Arc::new(FnOracle::fixed(r#"{"gi": 45}"#))));
        let item = r.resolve(&MealItemRequest::new("Mystery", 1.0)).await;
        assert_eq!(item.provenance, Provenance::NotFound);

        let r = resolver_with(None);
        let item = r.resolve(&MealItemRequest::new("Mystery", 1.0)).await;
        assert_eq!(item.provenance, Provenance::NotFound);
    }

    #[tokio::test]
    async fn invalid_lines_never_reach_lookup() {
        let llm = Arc::new(FnOracle::fixed(KHEER_REPLY));
        let r = resolver_with(Some(llm.clone()));

        let zero = r.resolve(&MealItemRequest::new("Roti", 0.0)).await;
        assert_eq!(zero.provenance, Provenance::InvalidQuantity);
        assert_eq!(zero.message.as_deref(), Some("Quantity must be a positive number"));

        let words = r
            .resolve(&MealItemRequest::from_value(&json!({"food": "Kheer", "quantity": "lots"})))
            .await;
        assert_eq!(words.provenance, Provenance::InvalidQuantity);
        assert_eq!(words.message.as_deref(), Some("Quantity must be a valid number"));

        let missing = r.resolve(&MealItemRequest::from_value(&json!({"food": "Kheer"}))).await;
        assert_eq!(missing.provenance, Provenance::InvalidFormat);

        let blank = r.resolve(&MealItemRequest::new("   ", 1.0)).await;
        assert_eq!(blank.provenance, Provenance::InvalidFormat);

        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn numeric_string_quantity_is_accepted() {
        let r = resolver_with(None);
        let item = r
            .resolve(&MealItemRequest::from_value(&json!({"food": "Roti", "quantity": "2"})))
            .await;
        assert_eq!(item.glycemic_load, Some(21.08));
    }
}
