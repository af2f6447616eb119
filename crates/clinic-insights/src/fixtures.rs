//! Shared test fixtures.

use crate::insight::{derive_category, ProcedureInsight};
use rust_decimal::Decimal;

/// Insight priced at 100,000 with the given whole-percent margin rate.
pub(crate) fn insight(
    id: &str,
    name: &str,
    margin_rate: i64,
    performed: i64,
    gap: Option<i64>,
) -> ProcedureInsight {
    let price = Decimal::new(100_000, 0);
    let margin = price * Decimal::new(margin_rate, 2);
    let performed = Decimal::new(performed, 0);
    ProcedureInsight {
        procedure_id: id.into(),
        name: name.to_string(),
        category: derive_category(name),
        price,
        total_cost: price - margin,
        unit_margin: margin,
        margin_rate: Decimal::new(margin_rate, 0),
        performed,
        marketing_spend: None,
        revenue: performed * price,
        profit: performed * margin,
        breakeven_units: gap.map(|g| Decimal::new(g, 0) + performed),
        breakeven_gap: gap.map(|g| Decimal::new(g, 0)),
        roas: None,
        cac: None,
        demand_share: 0.0,
        profit_share: 0.0,
    }
}
