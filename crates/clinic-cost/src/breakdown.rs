//! Per-procedure cost breakdown: labor, consumables, allocated facility cost,
//! margin and breakeven volume.

use crate::capacity::compute_capacity_minutes;
use crate::fixed::{fixed_cost_per_minute, monthly_fixed_total};
use crate::rates::{material_unit_cost, staff_minute_rate};
use clinic_core::{
    ClinicSnapshot, FixedCostCategory, FixedCostItem, MaterialItem, OperationalConfig,
    ProcedureFormValues, ProcedureId, StaffProfile,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Borrowed view of the records a breakdown depends on.
#[derive(Clone, Copy, Debug)]
pub struct CostContext<'a> {
    pub staff: &'a [StaffProfile],
    pub materials: &'a [MaterialItem],
    pub fixed_costs: &'a [FixedCostItem],
    pub operational: &'a OperationalConfig,
}

impl<'a> CostContext<'a> {
    /// Context over borrowed record slices.
    pub fn new(
        staff: &'a [StaffProfile],
        materials: &'a [MaterialItem],
        fixed_costs: &'a [FixedCostItem],
        operational: &'a OperationalConfig,
    ) -> Self {
        Self {
            staff,
            materials,
            fixed_costs,
            operational,
        }
    }

    pub fn from_snapshot(snapshot: &'a ClinicSnapshot) -> Self {
        Self::new(
            &snapshot.staff,
            &snapshot.materials,
            &snapshot.fixed_costs,
            &snapshot.operational,
        )
    }
}

/// Full unit economics of one procedure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcedureCostBreakdown {
    pub procedure_id: ProcedureId,
    pub direct_labor_cost: Decimal,
    pub consumable_cost: Decimal,
    pub fixed_cost_allocated: Decimal,
    pub total_cost: Decimal,
    /// Price minus total cost.
    pub margin: Decimal,
    /// Margin as a percentage of price; zero for free procedures.
    pub margin_rate: Decimal,
    /// Units needed to recover the facility pool, `None` when each unit loses
    /// money before fixed costs.
    pub breakeven_units: Option<Decimal>,
}

impl ProcedureCostBreakdown {
    /// Labor plus consumables, i.e. the cost excluding fixed allocation.
    pub fn direct_cost(&self) -> Decimal {
        self.direct_labor_cost + self.consumable_cost
    }
}

/// Facility pool and its per-minute rate, shared by every procedure.
#[derive(Clone, Copy, Debug)]
struct AllocationBasis {
    facility_total: Decimal,
    per_minute: Decimal,
}

impl AllocationBasis {
    fn of(ctx: &CostContext<'_>) -> Self {
        let capacity = compute_capacity_minutes(ctx.operational);
        Self {
            facility_total: monthly_fixed_total(ctx.fixed_costs, Some(FixedCostCategory::Facility)),
            per_minute: fixed_cost_per_minute(ctx.fixed_costs, capacity),
        }
    }
}

fn labor_cost(item: &ProcedureFormValues, staff: &[StaffProfile]) -> Decimal {
    let mut total = Decimal::ZERO;
    for a in &item.staff_assignments {
        match staff.iter().find(|s| s.id == a.staff_id) {
            Some(s) => total += staff_minute_rate(s) * a.minutes,
            None => debug!(procedure = %item.id, staff = %a.staff_id, "unknown staff skipped"),
        }
    }
    total
}

fn consumable_cost(item: &ProcedureFormValues, materials: &[MaterialItem]) -> Decimal {
    let mut total = Decimal::ZERO;
    for u in &item.material_usages {
        match materials.iter().find(|m| m.id == u.material_id) {
            Some(m) => total += material_unit_cost(m) * u.quantity,
            None => {
                debug!(procedure = %item.id, material = %u.material_id, "unknown material skipped")
            }
        }
    }
    total
}

fn breakdown_with(
    item: &ProcedureFormValues,
    ctx: &CostContext<'_>,
    basis: AllocationBasis,
) -> ProcedureCostBreakdown {
    let direct_labor_cost = labor_cost(item, ctx.staff);
    let consumable_cost = consumable_cost(item, ctx.materials);
    let fixed_cost_allocated = basis.per_minute * item.total_minutes.unwrap_or(Decimal::ZERO);
    let total_cost = direct_labor_cost + consumable_cost + fixed_cost_allocated;
    let margin = item.price - total_cost;
    let margin_rate = if item.price > Decimal::ZERO {
        margin / item.price * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };
    // Contribution margin excludes the fixed allocation: the allocation is a
    // share of the very pool breakeven has to recover.
    let contribution = item.price - (direct_labor_cost + consumable_cost);
    let breakeven_units = if contribution > Decimal::ZERO {
        Some(basis.facility_total / contribution)
    } else {
        None
    };
    ProcedureCostBreakdown {
        procedure_id: item.id.clone(),
        direct_labor_cost,
        consumable_cost,
        fixed_cost_allocated,
        total_cost,
        margin,
        margin_rate,
        breakeven_units,
    }
}

/// Cost breakdown of a single procedure.
pub fn build_breakdown(item: &ProcedureFormValues, ctx: &CostContext<'_>) -> ProcedureCostBreakdown {
    breakdown_with(item, ctx, AllocationBasis::of(ctx))
}

/// Breakdowns of every procedure, in input order.
pub fn build_all_breakdowns(
    items: &[ProcedureFormValues],
    ctx: &CostContext<'_>,
) -> Vec<ProcedureCostBreakdown> {
    let basis = AllocationBasis::of(ctx);
    debug!(
        procedures = items.len(),
        facility_total = %basis.facility_total,
        per_minute = %basis.per_minute,
        "building breakdowns"
    );
    items
        .iter()
        .map(|item| breakdown_with(item, ctx, basis))
        .collect()
}
