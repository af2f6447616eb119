//! Per-procedure insights: breakdowns joined with recorded performance.

use crate::ratio;
use clinic_core::{ProcedureActualPerformance, ProcedureFormValues, ProcedureId};
use clinic_cost::ProcedureCostBreakdown;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Category used when a procedure name has no words.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Unit economics of a procedure next to what it actually did this period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcedureInsight {
    pub procedure_id: ProcedureId,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub total_cost: Decimal,
    pub unit_margin: Decimal,
    pub margin_rate: Decimal,
    pub performed: Decimal,
    pub marketing_spend: Option<Decimal>,
    pub revenue: Decimal,
    pub profit: Decimal,
    pub breakeven_units: Option<Decimal>,
    /// Units still missing to reach breakeven this period.
    pub breakeven_gap: Option<Decimal>,
    pub roas: Option<f64>,
    pub cac: Option<Decimal>,
    pub demand_share: f64,
    pub profit_share: f64,
}

/// Grouping key: the first word of the procedure name.
pub fn derive_category(name: &str) -> String {
    name.split_whitespace()
        .next()
        .unwrap_or(UNCATEGORIZED)
        .to_string()
}

fn insight_for(
    item: &ProcedureFormValues,
    breakdown: &ProcedureCostBreakdown,
    actual: Option<&ProcedureActualPerformance>,
) -> ProcedureInsight {
    let performed = actual.map_or(Decimal::ZERO, |a| a.performed);
    let marketing_spend = actual.and_then(|a| a.marketing_spend);
    let revenue = performed * item.price;
    let profit = performed * breakdown.margin;
    let breakeven_gap = breakeven_gap(breakdown.breakeven_units, performed);
    let spend = marketing_spend.filter(|s| *s > Decimal::ZERO);
    let roas = spend.and_then(|s| ratio(revenue, s));
    let cac = match spend {
        Some(s) if performed > Decimal::ZERO => Some(s / performed),
        _ => None,
    };
    ProcedureInsight {
        procedure_id: item.id.clone(),
        name: item.name.clone(),
        category: derive_category(&item.name),
        price: item.price,
        total_cost: breakdown.total_cost,
        unit_margin: breakdown.margin,
        margin_rate: breakdown.margin_rate,
        performed,
        marketing_spend,
        revenue,
        profit,
        breakeven_units: breakdown.breakeven_units,
        breakeven_gap,
        roas,
        cac,
        demand_share: 0.0,
        profit_share: 0.0,
    }
}

/// `max(0, ceil(breakeven) - floor(performed))`, `None` without a breakeven.
pub fn breakeven_gap(breakeven_units: Option<Decimal>, performed: Decimal) -> Option<Decimal> {
    breakeven_units.map(|be| (be.ceil() - performed.floor()).max(Decimal::ZERO))
}

/// One insight per procedure that has a breakdown, in procedure order.
///
/// Shares are filled in a second pass once portfolio totals are known; a
/// non-positive total leaves every share at zero.
pub fn build_procedure_insights(
    items: &[ProcedureFormValues],
    breakdowns: &[ProcedureCostBreakdown],
    actuals: &[ProcedureActualPerformance],
) -> Vec<ProcedureInsight> {
    let mut insights: Vec<ProcedureInsight> = items
        .iter()
        .filter_map(|item| {
            let b = breakdowns.iter().find(|b| b.procedure_id == item.id)?;
            let actual = actuals.iter().find(|a| a.procedure_id == item.id);
            Some(insight_for(item, b, actual))
        })
        .collect();

    let total_performed: Decimal = insights.iter().map(|i| i.performed).sum();
    let total_profit: Decimal = insights.iter().map(|i| i.profit).sum();
    for i in &mut insights {
        i.demand_share = ratio(i.performed, total_performed).unwrap_or(0.0);
        i.profit_share = ratio(i.profit, total_profit).unwrap_or(0.0);
    }
    insights
}

impl ProcedureInsight {
    /// Margin rate as a plain float for scoring.
    pub fn margin_rate_f64(&self) -> f64 {
        self.margin_rate.to_f64().unwrap_or(0.0)
    }
}
