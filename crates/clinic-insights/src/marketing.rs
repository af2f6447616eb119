//! Marketing budget scoring, allocation and global budget scenarios.

use crate::insight::ProcedureInsight;
use crate::portfolio::PortfolioStats;
use crate::thresholds::Thresholds;
use clinic_core::ProcedureId;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Share of the marketing budget assigned to one procedure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketingAllocation {
    pub procedure_id: ProcedureId,
    pub name: String,
    pub score: f64,
    /// Score normalized over the portfolio; weights sum to one.
    pub weight: f64,
    pub budget: Decimal,
    pub current_performed: Decimal,
    pub target_performed: Decimal,
}

/// Projection of the portfolio under a changed marketing budget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetScenario {
    pub adjustment_percent: Decimal,
    pub current_budget: Decimal,
    pub adjusted_budget: Decimal,
    /// Revenue per unit of spend used for the projection.
    pub efficiency: Decimal,
    /// False when `efficiency` is the configured assumption.
    pub efficiency_observed: bool,
    pub profit_ratio: Decimal,
    pub current_revenue: Decimal,
    pub current_profit: Decimal,
    pub projected_revenue: Decimal,
    pub projected_profit: Decimal,
}

/// Composite score of one procedure. Negative scores clamp to zero.
pub fn allocation_score(
    insight: &ProcedureInsight,
    average_margin_rate: Decimal,
    even_share: f64,
    th: &Thresholds,
) -> f64 {
    let demand_boost = if insight.demand_share < even_share {
        th.underserved_demand_boost
    } else {
        1.0
    };
    let profitability_boost = if insight.margin_rate >= average_margin_rate {
        th.profitability_boost
    } else {
        1.0
    };
    // Grows linearly to 2.0 at the gap cap; a zero cap disables the boost.
    let breakeven_boost = match insight.breakeven_gap {
        Some(gap) if th.breakeven_gap_cap > 0 => {
            let cap = Decimal::from(th.breakeven_gap_cap);
            1.0 + (gap.min(cap) / cap).to_f64().unwrap_or(0.0)
        }
        _ => 1.0,
    };
    let score =
        (insight.margin_rate_f64() + 1.0) * demand_boost * profitability_boost * breakeven_boost;
    score.max(0.0)
}

/// Split `total_budget` across procedures by score, and derive the volume
/// each needs to contribute its share of `revenue_target`.
///
/// When no procedure scores above zero every weight is zero. Output is
/// ordered by weight, largest first.
pub fn allocate_marketing_budget(
    insights: &[ProcedureInsight],
    total_budget: Decimal,
    revenue_target: Decimal,
    th: &Thresholds,
) -> Vec<MarketingAllocation> {
    if insights.is_empty() {
        return vec![];
    }
    let stats = PortfolioStats::of(insights);
    let even_share = 1.0 / insights.len() as f64;
    let scores: Vec<f64> = insights
        .iter()
        .map(|i| allocation_score(i, stats.average_margin_rate, even_share, th))
        .collect();
    let score_sum: f64 = scores.iter().sum();
    if score_sum <= 0.0 {
        debug!("no procedure scored above zero, budget left unallocated");
    }
    let mut out: Vec<MarketingAllocation> = insights
        .iter()
        .zip(scores)
        .map(|(i, score)| {
            let weight = if score_sum > 0.0 { score / score_sum } else { 0.0 };
            let w = Decimal::from_f64(weight).unwrap_or(Decimal::ZERO);
            let extra_units = if i.price > Decimal::ZERO {
                w * revenue_target / i.price
            } else {
                Decimal::ZERO
            };
            MarketingAllocation {
                procedure_id: i.procedure_id.clone(),
                name: i.name.clone(),
                score,
                weight,
                budget: w * total_budget,
                current_performed: i.performed,
                target_performed: (i.performed + extra_units).max(Decimal::ZERO),
            }
        })
        .collect();
    out.sort_by(|a, b| {
        b.weight
            .total_cmp(&a.weight)
            .then_with(|| a.procedure_id.cmp(&b.procedure_id))
    });
    out
}

/// Project revenue and profit after changing total marketing spend by
/// `adjustment_percent`.
pub fn project_budget_scenario(
    insights: &[ProcedureInsight],
    adjustment_percent: Decimal,
    th: &Thresholds,
) -> BudgetScenario {
    let stats = PortfolioStats::of(insights);
    let current_budget = stats.total_marketing_spend;
    let adjusted_budget = (current_budget
        * (Decimal::ONE + adjustment_percent / Decimal::ONE_HUNDRED))
        .max(Decimal::ZERO);
    let (efficiency, efficiency_observed) = if current_budget > Decimal::ZERO {
        (stats.total_revenue / current_budget, true)
    } else {
        (th.implied_efficiency(), false)
    };
    let profit_ratio = if stats.total_revenue > Decimal::ZERO {
        stats.total_profit / stats.total_revenue
    } else {
        th.profit_ratio()
    };
    let projected_revenue = adjusted_budget * efficiency;
    BudgetScenario {
        adjustment_percent,
        current_budget,
        adjusted_budget,
        efficiency,
        efficiency_observed,
        profit_ratio,
        current_revenue: stats.total_revenue,
        current_profit: stats.total_profit,
        projected_revenue,
        projected_profit: projected_revenue * profit_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::insight;
    use proptest::prelude::*;

    fn with_shares(mut ins: Vec<ProcedureInsight>) -> Vec<ProcedureInsight> {
        let total: Decimal = ins.iter().map(|i| i.performed).sum();
        for i in &mut ins {
            i.demand_share = if total > Decimal::ZERO {
                (i.performed / total).to_f64().unwrap()
            } else {
                0.0
            };
        }
        ins
    }

    #[test]
    fn score_combines_boosts() {
        let th = Thresholds::default();
        let mut i = insight("p1", "p1", 49, 10, Some(4));
        i.demand_share = 0.1;
        // (49 + 1) x 1.25 x 1.2 x 1.4
        let s = allocation_score(&i, Decimal::new(40, 0), 0.25, &th);
        assert!((s - 105.0).abs() < 1e-9);
        // gap is capped at 10
        i.breakeven_gap = Some(Decimal::new(50, 0));
        let s = allocation_score(&i, Decimal::new(40, 0), 0.25, &th);
        assert!((s - 150.0).abs() < 1e-9);
        // no boosts at all
        i.breakeven_gap = None;
        i.demand_share = 0.5;
        let s = allocation_score(&i, Decimal::new(60, 0), 0.25, &th);
        assert!((s - 50.0).abs() < 1e-9);
    }

    #[test]
    fn breakeven_boost_follows_configured_cap() {
        let mut i = insight("p1", "p1", 49, 10, Some(20));
        i.demand_share = 0.5;
        let th = Thresholds {
            breakeven_gap_cap: 20,
            ..Thresholds::default()
        };
        // boost tops out at 2.0 whatever the cap
        let s = allocation_score(&i, Decimal::new(60, 0), 0.25, &th);
        assert!((s - 100.0).abs() < 1e-9);
        i.breakeven_gap = Some(Decimal::new(5, 0));
        let s = allocation_score(&i, Decimal::new(60, 0), 0.25, &th);
        assert!((s - 62.5).abs() < 1e-9);
        let off = Thresholds {
            breakeven_gap_cap: 0,
            ..Thresholds::default()
        };
        let s = allocation_score(&i, Decimal::new(60, 0), 0.25, &off);
        assert!((s - 50.0).abs() < 1e-9);
    }

    #[test]
    fn negative_scores_clamp_to_zero() {
        let i = insight("p1", "p1", -80, 1, None);
        assert_eq!(allocation_score(&i, Decimal::ZERO, 0.5, &Thresholds::default()), 0.0);
    }

    #[test]
    fn allocation_splits_budget_and_sets_targets() {
        let ins = with_shares(vec![
            insight("a", "A", 60, 30, Some(2)),
            insight("b", "B", 30, 10, None),
        ]);
        let budget = Decimal::new(1_000_000, 0);
        let target = Decimal::new(2_000_000, 0);
        let out = allocate_marketing_budget(&ins, budget, target, &Thresholds::default());
        assert_eq!(out.len(), 2);
        let w: f64 = out.iter().map(|a| a.weight).sum();
        assert!((w - 1.0).abs() < 1e-9);
        let spent: Decimal = out.iter().map(|a| a.budget).sum();
        assert!((spent - budget).abs() < Decimal::ONE);
        for a in &out {
            assert!(a.target_performed >= a.current_performed);
        }
        // a: 61 x 1.2 x 1.2 = 87.84; b: 31 x 1.25 = 38.75
        assert_eq!(out[0].procedure_id.0, "a");
        assert!((out[0].weight - 87.84 / 126.59).abs() < 1e-9);
    }

    #[test]
    fn all_negative_scores_allocate_nothing() {
        let ins = with_shares(vec![insight("a", "A", -90, 3, None), insight("b", "B", -70, 3, None)]);
        let out = allocate_marketing_budget(&ins, Decimal::new(500, 0), Decimal::ZERO, &Thresholds::default());
        assert!(out.iter().all(|a| a.weight == 0.0 && a.budget == Decimal::ZERO));
        assert!(allocate_marketing_budget(&[], Decimal::ONE, Decimal::ONE, &Thresholds::default()).is_empty());
    }

    #[test]
    fn budget_scenario_uses_observed_efficiency() {
        let mut a = insight("a", "A", 40, 10, None);
        a.marketing_spend = Some(Decimal::new(250_000, 0));
        let b = insight("b", "B", 20, 10, None);
        let s = project_budget_scenario(&[a, b], Decimal::new(20, 0), &Thresholds::default());
        // revenue 2,000,000 on 250,000 spend, profit 600,000
        assert!(s.efficiency_observed);
        assert_eq!(s.efficiency, Decimal::new(8, 0));
        assert_eq!(s.adjusted_budget, Decimal::new(300_000, 0));
        assert_eq!(s.projected_revenue, Decimal::new(2_400_000, 0));
        assert_eq!(s.projected_profit, Decimal::new(720_000, 0));
    }

    #[test]
    fn budget_scenario_without_history_uses_defaults() {
        let s = project_budget_scenario(&[], Decimal::new(50, 0), &Thresholds::default());
        assert!(!s.efficiency_observed);
        assert_eq!(s.efficiency, Decimal::new(3, 0));
        assert_eq!(s.profit_ratio, Decimal::new(3, 1));
        assert_eq!(s.projected_revenue, Decimal::ZERO);
    }

    #[test]
    fn deep_cut_never_goes_negative() {
        let mut a = insight("a", "A", 40, 10, None);
        a.marketing_spend = Some(Decimal::new(100, 0));
        let s = project_budget_scenario(&[a], Decimal::new(-150, 0), &Thresholds::default());
        assert_eq!(s.adjusted_budget, Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn weights_sum_to_one(rows in proptest::collection::vec((-20i64..100, 0i64..60, proptest::option::of(0i64..30)), 1..25)) {
            let ins = with_shares(
                rows.iter()
                    .enumerate()
                    .map(|(k, (r, p, g))| insight(&format!("p{k}"), "x", *r, *p, *g))
                    .collect(),
            );
            let out = allocate_marketing_budget(&ins, Decimal::new(1_000, 0), Decimal::new(10_000, 0), &Thresholds::default());
            let sum: f64 = out.iter().map(|a| a.weight).sum();
            if out.iter().any(|a| a.score > 0.0) {
                prop_assert!((sum - 1.0).abs() < 1e-9);
            } else {
                prop_assert_eq!(sum, 0.0);
            }
        }
    }
}
