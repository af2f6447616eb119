#![deny(warnings)]

//! Orchestration: the full pipeline in one call, and a workbench that owns a
//! snapshot and recomputes every derived view after each mutation.

use clinic_core::{
    validate_snapshot, ClinicSnapshot, FixedCostId, FixedCostItem, MaterialId, MaterialItem,
    OperationalConfig, ProcedureActualPerformance, ProcedureFormValues, ProcedureId, StaffId,
    StaffProfile, ValidationError,
};
use clinic_cost::{
    build_all_breakdowns, compute_capacity_minutes, per_bed_capacity_minutes,
    summarize_fixed_costs, CostContext, FixedCostSummary, ProcedureCostBreakdown,
};
use clinic_insights::{
    allocate_marketing_budget, build_insights, price_after_change, project_budget_scenario,
    simulate_bed_count, simulate_bundle, simulate_new_procedure, simulate_price, BedSimulation,
    BudgetScenario, BundleSimulation, InsightReport, MarketingAllocation, NewProcedureInput,
    NewProcedureSimulation, PriceScenario, Thresholds,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;
use tracing::{debug, info};

/// Everything derived from one snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub capacity_minutes: Decimal,
    pub fixed_costs: FixedCostSummary,
    pub breakdowns: Vec<ProcedureCostBreakdown>,
    pub insights: InsightReport,
}

/// Capacity, fixed-cost summary, breakdowns and insights for `snapshot`.
///
/// The snapshot is not validated here; callers that accept outside input run
/// [`validate_snapshot`] first.
pub fn run_pipeline(snapshot: &ClinicSnapshot, th: &Thresholds) -> PipelineReport {
    let ctx = CostContext::from_snapshot(snapshot);
    let capacity_minutes = compute_capacity_minutes(&snapshot.operational);
    let breakdowns = build_all_breakdowns(&snapshot.procedures, &ctx);
    let insights = build_insights(
        &snapshot.procedures,
        &breakdowns,
        &snapshot.actuals,
        &snapshot.staff,
        &snapshot.operational,
        th,
    );
    let report = PipelineReport {
        capacity_minutes,
        fixed_costs: summarize_fixed_costs(&snapshot.fixed_costs),
        breakdowns,
        insights,
    };
    info!(
        capacity_minutes = %report.capacity_minutes,
        fixed_total = %report.fixed_costs.total,
        procedures = report.breakdowns.len(),
        "pipeline complete"
    );
    report
}

/// A single edit to the clinic records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    SetOperational(OperationalConfig),
    SetBedCount { beds: u32 },
    UpsertStaff(StaffProfile),
    /// Also drops the staff member's assignments.
    RemoveStaff { id: StaffId },
    UpsertMaterial(MaterialItem),
    /// Also drops every usage of the material.
    RemoveMaterial { id: MaterialId },
    UpsertFixedCost(FixedCostItem),
    RemoveFixedCost { id: FixedCostId },
    UpsertProcedure(ProcedureFormValues),
    /// Also drops the procedure's recorded actuals.
    RemoveProcedure { id: ProcedureId },
    /// Replaces any earlier record for the same procedure.
    RecordActual(ProcedureActualPerformance),
    SetPrice { id: ProcedureId, price: Decimal },
}

impl Mutation {
    fn label(&self) -> &'static str {
        match self {
            Mutation::SetOperational(_) => "set_operational",
            Mutation::SetBedCount { .. } => "set_bed_count",
            Mutation::UpsertStaff(_) => "upsert_staff",
            Mutation::RemoveStaff { .. } => "remove_staff",
            Mutation::UpsertMaterial(_) => "upsert_material",
            Mutation::RemoveMaterial { .. } => "remove_material",
            Mutation::UpsertFixedCost(_) => "upsert_fixed_cost",
            Mutation::RemoveFixedCost { .. } => "remove_fixed_cost",
            Mutation::UpsertProcedure(_) => "upsert_procedure",
            Mutation::RemoveProcedure { .. } => "remove_procedure",
            Mutation::RecordActual(_) => "record_actual",
            Mutation::SetPrice { .. } => "set_price",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum WorkbenchError {
    #[error("no {kind} with id {id}")]
    NotFound { kind: &'static str, id: String },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

fn upsert<T, K: PartialEq>(list: &mut Vec<T>, item: T, key: impl Fn(&T) -> &K) {
    match list.iter().position(|x| key(x) == key(&item)) {
        Some(pos) => list[pos] = item,
        None => list.push(item),
    }
}

fn remove<T, K: PartialEq + Display>(
    list: &mut Vec<T>,
    id: &K,
    kind: &'static str,
    key: impl Fn(&T) -> &K,
) -> Result<(), WorkbenchError> {
    let before = list.len();
    list.retain(|x| key(x) != id);
    if list.len() == before {
        return Err(WorkbenchError::NotFound {
            kind,
            id: id.to_string(),
        });
    }
    Ok(())
}

fn mutate(s: &mut ClinicSnapshot, mutation: Mutation) -> Result<(), WorkbenchError> {
    match mutation {
        Mutation::SetOperational(op) => s.operational = op,
        Mutation::SetBedCount { beds } => s.operational.bed_count = Some(beds),
        Mutation::UpsertStaff(st) => upsert(&mut s.staff, st, |x| &x.id),
        Mutation::RemoveStaff { id } => {
            remove(&mut s.staff, &id, "staff", |x| &x.id)?;
            for p in &mut s.procedures {
                p.staff_assignments.retain(|a| a.staff_id != id);
            }
        }
        Mutation::UpsertMaterial(m) => upsert(&mut s.materials, m, |x| &x.id),
        Mutation::RemoveMaterial { id } => {
            remove(&mut s.materials, &id, "material", |x| &x.id)?;
            for p in &mut s.procedures {
                p.material_usages.retain(|u| u.material_id != id);
            }
        }
        Mutation::UpsertFixedCost(f) => upsert(&mut s.fixed_costs, f, |x| &x.id),
        Mutation::RemoveFixedCost { id } => remove(&mut s.fixed_costs, &id, "fixed cost", |x| &x.id)?,
        Mutation::UpsertProcedure(p) => upsert(&mut s.procedures, p, |x| &x.id),
        Mutation::RemoveProcedure { id } => {
            remove(&mut s.procedures, &id, "procedure", |x| &x.id)?;
            s.actuals.retain(|a| a.procedure_id != id);
        }
        Mutation::RecordActual(a) => upsert(&mut s.actuals, a, |x| &x.procedure_id),
        Mutation::SetPrice { id, price } => match s.procedures.iter_mut().find(|p| p.id == id) {
            Some(p) => p.price = price,
            None => {
                return Err(WorkbenchError::NotFound {
                    kind: "procedure",
                    id: id.to_string(),
                })
            }
        },
    }
    Ok(())
}

/// Owns a validated snapshot and the report derived from it.
///
/// Every successful [`Workbench::apply`] recomputes the report from scratch.
/// A mutation that would leave the snapshot invalid is rejected and leaves
/// both untouched.
#[derive(Clone, Debug)]
pub struct Workbench {
    snapshot: ClinicSnapshot,
    thresholds: Thresholds,
    report: PipelineReport,
}

impl Workbench {
    /// Validate `snapshot` and compute its first report.
    pub fn new(snapshot: ClinicSnapshot, thresholds: Thresholds) -> Result<Self, WorkbenchError> {
        validate_snapshot(&snapshot)?;
        let report = run_pipeline(&snapshot, &thresholds);
        Ok(Self {
            snapshot,
            thresholds,
            report,
        })
    }

    pub fn snapshot(&self) -> &ClinicSnapshot {
        &self.snapshot
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn report(&self) -> &PipelineReport {
        &self.report
    }

    /// Apply one mutation and recompute; on error nothing changes.
    pub fn apply(&mut self, mutation: Mutation) -> Result<&PipelineReport, WorkbenchError> {
        let label = mutation.label();
        let mut next = self.snapshot.clone();
        mutate(&mut next, mutation)?;
        validate_snapshot(&next)?;
        self.snapshot = next;
        self.report = run_pipeline(&self.snapshot, &self.thresholds);
        debug!(mutation = label, "applied");
        Ok(&self.report)
    }

    pub fn set_thresholds(&mut self, thresholds: Thresholds) -> &PipelineReport {
        self.thresholds = thresholds;
        self.report = run_pipeline(&self.snapshot, &self.thresholds);
        &self.report
    }

    pub fn breakdown(&self, id: &ProcedureId) -> Option<&ProcedureCostBreakdown> {
        self.report.breakdowns.iter().find(|b| &b.procedure_id == id)
    }

    pub fn allocate_marketing(
        &self,
        total_budget: Decimal,
        revenue_target: Decimal,
    ) -> Vec<MarketingAllocation> {
        allocate_marketing_budget(
            &self.report.insights.procedures,
            total_budget,
            revenue_target,
            &self.thresholds,
        )
    }

    pub fn budget_scenario(&self, adjustment_percent: Decimal) -> BudgetScenario {
        project_budget_scenario(
            &self.report.insights.procedures,
            adjustment_percent,
            &self.thresholds,
        )
    }

    /// Recorded treatment volume run on `bed_count` beds.
    pub fn simulate_beds(&self, bed_count: u32) -> BedSimulation {
        simulate_bed_count(
            self.report.insights.bed_utilization.required_minutes,
            per_bed_capacity_minutes(&self.snapshot.operational),
            bed_count,
        )
    }

    pub fn simulate_bundle(
        &self,
        first: &ProcedureId,
        second: &ProcedureId,
        discount_percent: Decimal,
    ) -> Option<BundleSimulation> {
        simulate_bundle(&self.report.insights.procedures, first, second, discount_percent)
    }

    pub fn simulate_new_procedure(&self, input: &NewProcedureInput) -> NewProcedureSimulation {
        simulate_new_procedure(&self.snapshot.procedures, &self.report.breakdowns, input)
    }

    pub fn simulate_price(
        &self,
        id: &ProcedureId,
        new_price: Decimal,
    ) -> Result<PriceScenario, WorkbenchError> {
        let item = self
            .snapshot
            .procedures
            .iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| WorkbenchError::NotFound {
                kind: "procedure",
                id: id.to_string(),
            })?;
        Ok(simulate_price(
            item,
            &CostContext::from_snapshot(&self.snapshot),
            new_price,
        ))
    }

    /// Price scenario for a percentage change of the current price.
    pub fn simulate_price_change(
        &self,
        id: &ProcedureId,
        change_percent: Decimal,
    ) -> Result<PriceScenario, WorkbenchError> {
        let current = self
            .snapshot
            .procedures
            .iter()
            .find(|p| &p.id == id)
            .map(|p| p.price)
            .ok_or_else(|| WorkbenchError::NotFound {
                kind: "procedure",
                id: id.to_string(),
            })?;
        self.simulate_price(id, price_after_change(current, change_percent))
    }

    /// Commit a price scenario to the snapshot.
    pub fn apply_price_scenario(
        &mut self,
        scenario: &PriceScenario,
    ) -> Result<&PipelineReport, WorkbenchError> {
        self.apply(Mutation::SetPrice {
            id: scenario.procedure_id.clone(),
            price: scenario.new_price,
        })
    }
}
