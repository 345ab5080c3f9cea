//! Base-value models
//!
//! Exactly one model is active per run:
//! - Revenue: max(revenue - cost, 0) × multiple (income-approach heuristic)
//! - Market: average comparable transaction price, passed through
//! - WillingnessToPay: average surveyed WTP, passed through
//!
//! Global invariants enforced:
//! - Revenue model never yields a negative base value
//! - Inputs for non-selected models are kept, never cleared
//! - No input validation here; the input layer clamps at 0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default revenue multiple standing in for a discounted cash flow
pub const DEFAULT_REVENUE_MULTIPLE: f64 = 3.0;

/// Selected valuation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationModel {
    Revenue,
    Market,
    #[default]
    WillingnessToPay,
}

impl ValuationModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValuationModel::Revenue => "revenue",
            ValuationModel::Market => "market",
            ValuationModel::WillingnessToPay => "willingness_to_pay",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ValuationModel::Revenue => "income approach (NPV approximation)",
            ValuationModel::Market => "market approach (comparable transactions)",
            ValuationModel::WillingnessToPay => "contingent valuation (surveyed WTP)",
        }
    }
}

impl fmt::Display for ValuationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw inputs for all three models
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInputs {
    /// Expected annual revenue
    pub revenue: f64,
    /// Expected annual cost
    pub cost: f64,
    /// Average comparable transaction price
    pub market_price: f64,
    /// Average surveyed willingness to pay
    pub wtp: f64,
}

/// Compute the unadjusted base value for the selected model
pub fn compute_base_value(
    model: ValuationModel,
    inputs: &ModelInputs,
    revenue_multiple: f64,
) -> f64 {
    match model {
        ValuationModel::Revenue => (inputs.revenue - inputs.cost).max(0.0) * revenue_multiple,
        ValuationModel::Market => inputs.market_price,
        ValuationModel::WillingnessToPay => inputs.wtp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> ModelInputs {
        ModelInputs {
            revenue: 1_000_000.0,
            cost: 400_000.0,
            market_price: 750_000.0,
            wtp: 120_000.0,
        }
    }

    #[test]
    fn test_revenue_model() {
        let base = compute_base_value(ValuationModel::Revenue, &inputs(), DEFAULT_REVENUE_MULTIPLE);
        assert_eq!(base, 1_800_000.0);
    }

    #[test]
    fn test_revenue_model_negative_margin_clamps_to_zero() {
        let loss = ModelInputs {
            revenue: 100.0,
            cost: 400.0,
            ..ModelInputs::default()
        };
        assert_eq!(compute_base_value(ValuationModel::Revenue, &loss, 3.0), 0.0);
    }

    #[test]
    fn test_passthrough_models() {
        assert_eq!(compute_base_value(ValuationModel::Market, &inputs(), 3.0), 750_000.0);
        assert_eq!(compute_base_value(ValuationModel::WillingnessToPay, &inputs(), 3.0), 120_000.0);
    }

    #[test]
    fn test_negative_passthrough_is_not_rejected() {
        let odd = ModelInputs {
            market_price: -5.0,
            ..ModelInputs::default()
        };
        assert_eq!(compute_base_value(ValuationModel::Market, &odd, 3.0), -5.0);
    }

    #[test]
    fn test_model_serde_names() {
        let model: ValuationModel = serde_json::from_str(r#""willingness_to_pay""#).unwrap();
        assert_eq!(model, ValuationModel::WillingnessToPay);
        assert_eq!(ValuationModel::default(), ValuationModel::WillingnessToPay);
    }
}
