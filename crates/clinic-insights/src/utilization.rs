//! Staff and bed utilization from recorded volume, plus bed-count simulation.

use crate::insight::ProcedureInsight;
use crate::ratio;
use clinic_core::{OperationalConfig, ProcedureFormValues, StaffId, StaffProfile};
use clinic_cost::{per_bed_capacity_minutes, staff_monthly_minutes};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaffUtilizationInsight {
    pub staff_id: StaffId,
    pub name: String,
    pub role: String,
    /// Assigned minutes times units performed, over all procedures.
    pub required_minutes: Decimal,
    /// Monthly working minutes of the staff member.
    pub available_minutes: Decimal,
    /// `None` when the staff member has no working minutes.
    pub utilization: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BedUtilizationInsight {
    /// Treatment minutes times units performed, over all procedures.
    pub required_minutes: Decimal,
    /// Monthly minutes of a single bed.
    pub per_bed_capacity_minutes: Decimal,
    /// Configured beds, never below one.
    pub bed_count: u32,
    /// Monthly minutes across all beds.
    pub capacity_minutes: Decimal,
    /// Required over capacity, `None` without capacity.
    pub utilization: Option<f64>,
    /// Unused capacity, never negative.
    pub spare_minutes: Decimal,
    /// `ceil(required / per-bed capacity)`, `None` without capacity.
    pub recommended_beds: Option<u32>,
}

/// Outcome of running the recorded volume on a hypothetical bed count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BedSimulation {
    pub bed_count: u32,
    pub capacity_minutes: Decimal,
    pub utilization: Option<f64>,
    pub spare_minutes: Decimal,
    pub additional_beds_needed: u32,
}

fn performed_of(insights: &[ProcedureInsight], item: &ProcedureFormValues) -> Option<Decimal> {
    insights
        .iter()
        .find(|i| i.procedure_id == item.id)
        .map(|i| i.performed)
}

/// Descending by utilization, undefined utilization last.
fn utilization_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Minutes each staff member must work to deliver the recorded volume.
pub fn staff_utilization(
    items: &[ProcedureFormValues],
    insights: &[ProcedureInsight],
    staff: &[StaffProfile],
) -> Vec<StaffUtilizationInsight> {
    let mut out: Vec<StaffUtilizationInsight> = staff
        .iter()
        .map(|s| {
            let required_minutes: Decimal = items
                .iter()
                .filter_map(|item| {
                    let performed = performed_of(insights, item)?;
                    let per_unit: Decimal = item
                        .staff_assignments
                        .iter()
                        .filter(|a| a.staff_id == s.id)
                        .map(|a| a.minutes)
                        .sum();
                    Some(per_unit * performed)
                })
                .sum();
            let available_minutes = staff_monthly_minutes(s);
            StaffUtilizationInsight {
                staff_id: s.id.clone(),
                name: s.name.clone(),
                role: s.role.clone(),
                required_minutes,
                available_minutes,
                utilization: ratio(required_minutes, available_minutes),
            }
        })
        .collect();
    out.sort_by(|a, b| {
        utilization_desc(a.utilization, b.utilization).then_with(|| a.staff_id.cmp(&b.staff_id))
    });
    out
}

/// Treatment minutes needed for the recorded volume.
pub fn required_treatment_minutes(
    items: &[ProcedureFormValues],
    insights: &[ProcedureInsight],
) -> Decimal {
    items
        .iter()
        .filter_map(|item| Some(item.treatment_minutes * performed_of(insights, item)?))
        .sum()
}

fn beds_needed(required: Decimal, per_bed: Decimal) -> Option<u32> {
    if per_bed <= Decimal::ZERO {
        return None;
    }
    (required / per_bed).ceil().to_u32()
}

/// Utilization of the configured beds.
pub fn bed_utilization(
    items: &[ProcedureFormValues],
    insights: &[ProcedureInsight],
    operational: &OperationalConfig,
) -> BedUtilizationInsight {
    let required_minutes = required_treatment_minutes(items, insights);
    let per_bed = per_bed_capacity_minutes(operational);
    let sim = simulate_bed_count(required_minutes, per_bed, operational.effective_bed_count());
    BedUtilizationInsight {
        required_minutes,
        per_bed_capacity_minutes: per_bed,
        bed_count: sim.bed_count,
        capacity_minutes: sim.capacity_minutes,
        utilization: sim.utilization,
        spare_minutes: sim.spare_minutes,
        recommended_beds: beds_needed(required_minutes, per_bed),
    }
}

/// Run `required_minutes` of treatment on `bed_count` beds.
pub fn simulate_bed_count(
    required_minutes: Decimal,
    per_bed_capacity_minutes: Decimal,
    bed_count: u32,
) -> BedSimulation {
    let capacity_minutes = per_bed_capacity_minutes * Decimal::from(bed_count);
    let additional_beds_needed = beds_needed(required_minutes, per_bed_capacity_minutes)
        .map_or(0, |needed| needed.saturating_sub(bed_count));
    BedSimulation {
        bed_count,
        capacity_minutes,
        utilization: ratio(required_minutes, capacity_minutes),
        spare_minutes: (capacity_minutes - required_minutes).max(Decimal::ZERO),
        additional_beds_needed,
    }
}
