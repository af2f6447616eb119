//! What-if simulations: bundles, new procedures and price changes.

use crate::insight::ProcedureInsight;
use clinic_core::{ProcedureFormValues, ProcedureId};
use clinic_cost::{build_breakdown, CostContext, ProcedureCostBreakdown};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundleSimulation {
    pub first: ProcedureId,
    pub second: ProcedureId,
    /// Discount off the combined list price, in percent.
    pub discount_percent: Decimal,
    /// Combined list price after the discount.
    pub bundle_price: Decimal,
    /// Sum of both total unit costs.
    pub bundle_cost: Decimal,
    pub bundle_margin: Decimal,
    /// Bundle margin over bundle price, in percent; zero for a free bundle.
    pub bundle_margin_rate: Decimal,
    /// Sum of both unit margins when sold separately.
    pub standalone_margin: Decimal,
    /// Bundle margin minus standalone margin; negative when bundling gives
    /// margin away.
    pub margin_delta: Decimal,
}

/// Hypothetical procedure described by its headline numbers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewProcedureInput {
    pub price: Decimal,
    pub consumable_cost: Decimal,
    pub labor_minutes: Decimal,
    #[serde(default)]
    pub launch_marketing_spend: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewProcedureSimulation {
    /// Portfolio average labor cost per assigned minute.
    pub cost_per_labor_minute: Decimal,
    /// Portfolio average fixed-cost allocation per unit.
    pub fixed_cost_per_unit: Decimal,
    pub labor_cost: Decimal,
    pub consumable_cost: Decimal,
    pub fixed_cost_allocated: Decimal,
    pub total_cost: Decimal,
    pub margin: Decimal,
    pub margin_rate: Decimal,
    /// Units whose margin pays back the launch spend.
    pub breakeven_units: Option<Decimal>,
    /// Revenue over launch spend at the breakeven volume.
    pub roas: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceScenario {
    pub procedure_id: ProcedureId,
    pub current_price: Decimal,
    pub new_price: Decimal,
    /// Breakdown at the current price.
    pub current: ProcedureCostBreakdown,
    /// Breakdown at `new_price`; costs are unchanged, margin and breakeven move.
    pub projected: ProcedureCostBreakdown,
}

impl PriceScenario {
    pub fn margin_delta(&self) -> Decimal {
        self.projected.margin - self.current.margin
    }
}

fn rate_of(margin: Decimal, price: Decimal) -> Decimal {
    if price > Decimal::ZERO {
        margin / price * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

/// Sell two procedures together at `discount_percent` off their combined
/// price. `None` if either id has no insight.
pub fn simulate_bundle(
    insights: &[ProcedureInsight],
    first: &ProcedureId,
    second: &ProcedureId,
    discount_percent: Decimal,
) -> Option<BundleSimulation> {
    let a = insights.iter().find(|i| &i.procedure_id == first)?;
    let b = insights.iter().find(|i| &i.procedure_id == second)?;
    let list_price = a.price + b.price;
    let bundle_price = list_price * (Decimal::ONE - discount_percent / Decimal::ONE_HUNDRED);
    let bundle_cost = a.total_cost + b.total_cost;
    let bundle_margin = bundle_price - bundle_cost;
    let standalone_margin = a.unit_margin + b.unit_margin;
    Some(BundleSimulation {
        first: first.clone(),
        second: second.clone(),
        discount_percent,
        bundle_price,
        bundle_cost,
        bundle_margin,
        bundle_margin_rate: rate_of(bundle_margin, bundle_price),
        standalone_margin,
        margin_delta: bundle_margin - standalone_margin,
    })
}

/// Estimate a procedure that does not exist yet from portfolio averages.
pub fn simulate_new_procedure(
    items: &[ProcedureFormValues],
    breakdowns: &[ProcedureCostBreakdown],
    input: &NewProcedureInput,
) -> NewProcedureSimulation {
    let mut labor_cost_total = Decimal::ZERO;
    let mut labor_minutes_total = Decimal::ZERO;
    for b in breakdowns {
        if let Some(item) = items.iter().find(|i| i.id == b.procedure_id) {
            labor_cost_total += b.direct_labor_cost;
            labor_minutes_total += item.staff_assignments.iter().map(|a| a.minutes).sum::<Decimal>();
        }
    }
    let cost_per_labor_minute = if labor_minutes_total > Decimal::ZERO {
        labor_cost_total / labor_minutes_total
    } else {
        Decimal::ZERO
    };
    let fixed_cost_per_unit = if breakdowns.is_empty() {
        Decimal::ZERO
    } else {
        breakdowns.iter().map(|b| b.fixed_cost_allocated).sum::<Decimal>()
            / Decimal::from(breakdowns.len())
    };

    let labor_cost = cost_per_labor_minute * input.labor_minutes;
    let total_cost = labor_cost + input.consumable_cost + fixed_cost_per_unit;
    let margin = input.price - total_cost;
    let (breakeven_units, roas) = match input.launch_marketing_spend {
        Some(spend) if spend > Decimal::ZERO && margin > Decimal::ZERO => {
            let units = spend / margin;
            let roas = (units * input.price / spend).to_f64();
            (Some(units), roas)
        }
        _ => (None, None),
    };
    NewProcedureSimulation {
        cost_per_labor_minute,
        fixed_cost_per_unit,
        labor_cost,
        consumable_cost: input.consumable_cost,
        fixed_cost_allocated: fixed_cost_per_unit,
        total_cost,
        margin,
        margin_rate: rate_of(margin, input.price),
        breakeven_units,
        roas,
    }
}

/// Price after a percentage change, floored at zero.
pub fn price_after_change(price: Decimal, change_percent: Decimal) -> Decimal {
    (price * (Decimal::ONE + change_percent / Decimal::ONE_HUNDRED)).max(Decimal::ZERO)
}

/// Rebuild one procedure's breakdown at `new_price`; the inputs are untouched.
pub fn simulate_price(
    item: &ProcedureFormValues,
    ctx: &CostContext<'_>,
    new_price: Decimal,
) -> PriceScenario {
    let current = build_breakdown(item, ctx);
    let repriced = ProcedureFormValues {
        price: new_price,
        ..item.clone()
    };
    PriceScenario {
        procedure_id: item.id.clone(),
        current_price: item.price,
        new_price,
        current,
        projected: build_breakdown(&repriced, ctx),
    }
}
