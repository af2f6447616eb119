//! Fixed-cost aggregation by category.

use clinic_core::{FixedCostCategory, FixedCostItem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Category totals of the monthly fixed costs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FixedCostSummary {
    /// Pool allocated to procedures per minute of capacity.
    pub facility_total: Decimal,
    /// Overheads outside the allocation pool.
    pub common_total: Decimal,
    /// Marketing overheads outside the allocation pool.
    pub marketing_total: Decimal,
    /// All categories together.
    pub total: Decimal,
}

/// Sum of monthly amounts, optionally restricted to one category.
pub fn monthly_fixed_total(items: &[FixedCostItem], category: Option<FixedCostCategory>) -> Decimal {
    items
        .iter()
        .filter(|i| category.map_or(true, |c| i.category == c))
        .map(|i| i.monthly_amount)
        .sum()
}

/// Monthly fixed costs split by category.
pub fn summarize_fixed_costs(items: &[FixedCostItem]) -> FixedCostSummary {
    FixedCostSummary {
        facility_total: monthly_fixed_total(items, Some(FixedCostCategory::Facility)),
        common_total: monthly_fixed_total(items, Some(FixedCostCategory::Common)),
        marketing_total: monthly_fixed_total(items, Some(FixedCostCategory::Marketing)),
        total: monthly_fixed_total(items, None),
    }
}

/// Facility cost carried by one minute of capacity; zero without capacity.
pub fn fixed_cost_per_minute(items: &[FixedCostItem], capacity_minutes: Decimal) -> Decimal {
    if capacity_minutes <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    monthly_fixed_total(items, Some(FixedCostCategory::Facility)) / capacity_minutes
}
