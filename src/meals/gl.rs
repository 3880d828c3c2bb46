use serde::{Deserialize, Serialize};
use tracing::warn;

/// The three numbers glycemic load is computed from, per unit of food.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub glycemic_index: f64,
    pub carbs_per_unit: f64,
    pub fiber_per_unit: f64,
}

impl NutritionFacts {
    pub fn net_carbs(&self) -> f64 {
        self.carbs_per_unit - self.fiber_per_unit
    }
}

/// Glycemic load of `quantity` units, rounded to two decimals.
///
/// Never fails: non-finite inputs or results yield `0.0` with a warning so a
/// single bad item cannot sink a whole meal. Negative net carbs (fiber above
/// carbs) are passed through unclamped.
pub fn compute(facts: &NutritionFacts, quantity: f64) -> f64 {
    let gl = facts.glycemic_index * facts.net_carbs() / 100.0 * quantity;
    if !gl.is_finite() {
        warn!(?facts, quantity, "glycemic load is not finite; using 0");
        return 0.0;
    }
    round2(gl)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(gi: f64, carbs: f64, fiber: f64) -> NutritionFacts {
        NutritionFacts {
            glycemic_index: gi,
            carbs_per_unit: carbs,
            fiber_per_unit: fiber,
        }
    }

    #[test]
    fn roti_example() {
        assert_eq!(compute(&facts(62.0, 18.0, 1.0), 2.0), 21.08);
    }

    #[test]
    fn matches_formula_over_a_grid() {
        for gi in [0.0, 15.0, 55.5, 73.0, 110.0] {
            for (carbs, fiber) in [(0.0, 0.0), (10.0, 2.5), (45.0, 0.6), (18.0, 18.0)] {
                for qty in [0.5, 1.0, 2.0, 3.25] {
                    let expected = round2(gi * (carbs - fiber) / 100.0 * qty);
                    assert_eq!(compute(&facts(gi, carbs, fiber), qty), expected);
                }
            }
        }
    }

    #[test]
    fn negative_net_carbs_are_not_clamped() {
        assert_eq!(compute(&facts(50.0, 2.0, 4.0), 1.0), -1.0);
    }

    #[test]
    fn non_finite_degrades_to_zero() {
        assert_eq!(compute(&facts(f64::NAN, 10.0, 1.0), 1.0), 0.0);
        assert_eq!(compute(&facts(50.0, f64::INFINITY, 1.0), 1.0), 0.0);
        assert_eq!(compute(&facts(50.0, 10.0, 1.0), f64::INFINITY), 0.0);
    }
}
