#![deny(warnings)]

//! Cost engine: capacity, unit rates, fixed-cost allocation and per-procedure
//! breakdowns.
//!
//! Every function here is total. Degenerate inputs (zero capacity, zero
//! quantities, missing schedule fields) resolve to zero or `None`, never to a
//! panic or a non-finite value.

pub mod breakdown;
pub mod capacity;
pub mod fixed;
pub mod rates;

pub use breakdown::{build_all_breakdowns, build_breakdown, CostContext, ProcedureCostBreakdown};
pub use capacity::{
    compute_capacity_minutes, default_weeks_per_month, per_bed_capacity_minutes,
    weekday_occurrences, weekly_minutes,
};
pub use fixed::{fixed_cost_per_minute, monthly_fixed_total, summarize_fixed_costs, FixedCostSummary};
pub use rates::{material_unit_cost, staff_minute_rate, staff_monthly_minutes};
