#![deny(warnings)]
//! Portfolio analytics over procedure cost breakdowns.
//!
//! Everything here is a pure function of the snapshot records, the
//! breakdowns built by `clinic-cost`, and a [`Thresholds`] set. Nothing is
//! cached between calls.

pub mod insight;
pub mod marketing;
pub mod portfolio;
pub mod simulation;
pub mod thresholds;
pub mod utilization;

#[cfg(test)]
mod fixtures;

pub use insight::{breakeven_gap, build_procedure_insights, derive_category, ProcedureInsight};
pub use marketing::{
    allocate_marketing_budget, allocation_score, project_budget_scenario, BudgetScenario,
    MarketingAllocation,
};
pub use portfolio::{
    category_rollup, growth_candidates, prune_candidates, Candidate, CategoryInsight,
    CategoryMember, PortfolioStats,
};
pub use simulation::{
    price_after_change, simulate_bundle, simulate_new_procedure, simulate_price,
    BundleSimulation, NewProcedureInput, NewProcedureSimulation, PriceScenario,
};
pub use thresholds::{ConfigError, Thresholds};
pub use utilization::{
    bed_utilization, required_treatment_minutes, simulate_bed_count, staff_utilization,
    BedSimulation, BedUtilizationInsight, StaffUtilizationInsight,
};

use clinic_core::{OperationalConfig, ProcedureActualPerformance, ProcedureFormValues, StaffProfile};
use clinic_cost::ProcedureCostBreakdown;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// `num / den` as a float, `None` unless the denominator is positive.
pub(crate) fn ratio(num: Decimal, den: Decimal) -> Option<f64> {
    if den <= Decimal::ZERO {
        return None;
    }
    (num / den).to_f64()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub stats: PortfolioStats,
    pub overall_roas: Option<f64>,
    pub growth_candidates: Vec<Candidate>,
    pub prune_candidates: Vec<Candidate>,
}

/// Every derived view of the portfolio for one period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub procedures: Vec<ProcedureInsight>,
    pub categories: Vec<CategoryInsight>,
    pub staff_utilization: Vec<StaffUtilizationInsight>,
    pub bed_utilization: BedUtilizationInsight,
    pub summary: PortfolioSummary,
}

/// Insights, category rollup, utilization and portfolio summary in one pass.
pub fn build_insights(
    items: &[ProcedureFormValues],
    breakdowns: &[ProcedureCostBreakdown],
    actuals: &[ProcedureActualPerformance],
    staff: &[StaffProfile],
    operational: &OperationalConfig,
    th: &Thresholds,
) -> InsightReport {
    let procedures = build_procedure_insights(items, breakdowns, actuals);
    let stats = PortfolioStats::of(&procedures);
    let summary = PortfolioSummary {
        overall_roas: stats.overall_roas(),
        growth_candidates: growth_candidates(&procedures, th),
        prune_candidates: prune_candidates(&procedures, th),
        stats,
    };
    debug!(
        growth = summary.growth_candidates.len(),
        prune = summary.prune_candidates.len(),
        "portfolio candidates"
    );
    let report = InsightReport {
        categories: category_rollup(&procedures),
        staff_utilization: staff_utilization(items, &procedures, staff),
        bed_utilization: bed_utilization(items, &procedures, operational),
        procedures,
        summary,
    };
    info!(
        procedures = report.procedures.len(),
        categories = report.categories.len(),
        revenue = %report.summary.stats.total_revenue,
        profit = %report.summary.stats.total_profit,
        "insights built"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_core::{
        FixedCostCategory, FixedCostItem, MaterialItem, MaterialUsage, StaffAssignment,
    };
    use clinic_cost::{build_all_breakdowns, CostContext};

    #[test]
    fn ratio_requires_positive_denominator() {
        assert_eq!(ratio(Decimal::ONE, Decimal::ZERO), None);
        assert_eq!(ratio(Decimal::ONE, Decimal::new(-2, 0)), None);
        assert_eq!(ratio(Decimal::ONE, Decimal::new(4, 0)), Some(0.25));
    }

    fn staff() -> Vec<StaffProfile> {
        vec![StaffProfile {
            id: "dr".into(),
            name: "Han".to_string(),
            role: "doctor".to_string(),
            monthly_salary: Decimal::new(9_600_000, 0),
            work_days_per_month: Decimal::new(20, 0),
            work_hours_per_day: Decimal::new(8, 0),
            work_pattern: None,
        }]
    }

    fn procedure(id: &str, name: &str, price: i64, minutes: i64) -> ProcedureFormValues {
        ProcedureFormValues {
            id: id.into(),
            name: name.to_string(),
            price: Decimal::new(price, 0),
            treatment_minutes: Decimal::new(minutes, 0),
            total_minutes: Some(Decimal::new(minutes + 10, 0)),
            staff_assignments: vec![StaffAssignment {
                staff_id: "dr".into(),
                minutes: Decimal::new(minutes, 0),
            }],
            material_usages: vec![MaterialUsage {
                material_id: "gel".into(),
                quantity: Decimal::ONE,
            }],
            notes: None,
        }
    }

    #[test]
    fn end_to_end_report() {
        let staff = staff();
        let materials = vec![MaterialItem {
            id: "gel".into(),
            name: "Gel".to_string(),
            unit: "ml".to_string(),
            unit_quantity: Decimal::new(10, 0),
            unit_price: Decimal::new(20_000, 0),
        }];
        let fixed = vec![FixedCostItem {
            id: "rent".into(),
            name: "Rent".to_string(),
            monthly_amount: Decimal::new(3_000_000, 0),
            category: FixedCostCategory::Facility,
        }];
        let op = OperationalConfig::simple(Decimal::new(25, 0), Decimal::new(10, 0));
        let items = vec![
            procedure("p1", "Laser toning", 150_000, 20),
            procedure("p2", "Laser hair", 90_000, 30),
            procedure("p3", "Filler lips", 400_000, 40),
        ];
        let actuals = vec![
            ProcedureActualPerformance {
                procedure_id: "p1".into(),
                performed: Decimal::new(40, 0),
                marketing_spend: Some(Decimal::new(1_000_000, 0)),
            },
            ProcedureActualPerformance {
                procedure_id: "p3".into(),
                performed: Decimal::new(12, 0),
                marketing_spend: None,
            },
        ];
        let ctx = CostContext::new(&staff, &materials, &fixed, &op);
        let bds = build_all_breakdowns(&items, &ctx);
        let th = Thresholds::default();
        let report = build_insights(&items, &bds, &actuals, &staff, &op, &th);

        assert_eq!(report.procedures.len(), 3);
        assert_eq!(report.categories.len(), 2);
        assert_eq!(report.summary.stats.total_performed, Decimal::new(52, 0));
        let expected_revenue = Decimal::new(40 * 150_000 + 12 * 400_000, 0);
        assert_eq!(report.summary.stats.total_revenue, expected_revenue);
        assert_eq!(
            report.summary.overall_roas,
            ratio(expected_revenue, Decimal::new(1_000_000, 0))
        );
        // 40 x 20 + 12 x 40 minutes of the only doctor
        assert_eq!(report.staff_utilization[0].required_minutes, Decimal::new(1_280, 0));
        assert_eq!(report.bed_utilization.required_minutes, Decimal::new(1_280, 0));
        assert_eq!(report.bed_utilization.recommended_beds, Some(1));
        for g in &report.summary.growth_candidates {
            assert!(!report
                .summary
                .prune_candidates
                .iter()
                .any(|p| p.procedure_id == g.procedure_id));
        }
    }

    #[test]
    fn empty_portfolio_report() {
        let op = OperationalConfig::simple(Decimal::new(25, 0), Decimal::new(10, 0));
        let report = build_insights(&[], &[], &[], &[], &op, &Thresholds::default());
        assert!(report.procedures.is_empty());
        assert!(report.categories.is_empty());
        assert_eq!(report.summary.stats, PortfolioStats::default());
        assert_eq!(report.bed_utilization.utilization, Some(0.0));
    }
}
