//! Portfolio-level rollups: averages, categories, growth and prune candidates.

use crate::insight::ProcedureInsight;
use crate::thresholds::Thresholds;
use crate::ratio;
use clinic_core::ProcedureId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Portfolio totals and means derived from the insights.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub procedure_count: usize,
    pub total_performed: Decimal,
    pub total_revenue: Decimal,
    pub total_profit: Decimal,
    pub total_marketing_spend: Decimal,
    /// Unweighted mean of item margin rates.
    pub average_margin_rate: Decimal,
    /// Mean performed units per item.
    pub mean_performed: Decimal,
}

impl PortfolioStats {
    pub fn of(insights: &[ProcedureInsight]) -> Self {
        if insights.is_empty() {
            return Self::default();
        }
        let n = Decimal::from(insights.len());
        let total_performed: Decimal = insights.iter().map(|i| i.performed).sum();
        let rate_sum: Decimal = insights.iter().map(|i| i.margin_rate).sum();
        Self {
            procedure_count: insights.len(),
            total_performed,
            total_revenue: insights.iter().map(|i| i.revenue).sum(),
            total_profit: insights.iter().map(|i| i.profit).sum(),
            total_marketing_spend: insights.iter().filter_map(|i| i.marketing_spend).sum(),
            average_margin_rate: rate_sum / n,
            mean_performed: total_performed / n,
        }
    }

    /// Portfolio revenue per unit of marketing spend.
    pub fn overall_roas(&self) -> Option<f64> {
        ratio(self.total_revenue, self.total_marketing_spend)
    }
}

/// A procedure singled out by a heuristic, with the key it was ranked by.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub procedure_id: ProcedureId,
    pub name: String,
    pub margin_rate: Decimal,
    pub performed: Decimal,
    pub rank_key: Decimal,
}

impl Candidate {
    fn of(i: &ProcedureInsight, rank_key: Decimal) -> Self {
        Self {
            procedure_id: i.procedure_id.clone(),
            name: i.name.clone(),
            margin_rate: i.margin_rate,
            performed: i.performed,
            rank_key,
        }
    }
}

/// Member of a category singled out as leader or laggard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryMember {
    pub procedure_id: ProcedureId,
    pub name: String,
    pub margin_rate: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryInsight {
    /// First word of the member names.
    pub category: String,
    pub procedure_count: usize,
    /// Units performed across the category this period.
    pub total_performed: Decimal,
    /// Price times units performed, summed over members.
    pub total_revenue: Decimal,
    /// Unit margin times units performed, summed over members.
    pub total_profit: Decimal,
    /// Unweighted mean of member margin rates, in percent.
    pub average_margin_rate: Decimal,
    /// Highest margin rate in the category.
    pub leader: CategoryMember,
    /// Lowest margin rate in the category.
    pub laggard: CategoryMember,
}

fn member(i: &ProcedureInsight) -> CategoryMember {
    CategoryMember {
        procedure_id: i.procedure_id.clone(),
        name: i.name.clone(),
        margin_rate: i.margin_rate,
    }
}

/// Roll insights up by category, largest revenue first.
pub fn category_rollup(insights: &[ProcedureInsight]) -> Vec<CategoryInsight> {
    let mut groups: BTreeMap<&str, Vec<&ProcedureInsight>> = BTreeMap::new();
    for i in insights {
        groups.entry(i.category.as_str()).or_default().push(i);
    }
    let mut out: Vec<CategoryInsight> = groups
        .into_iter()
        .filter_map(|(category, members)| {
            // First member wins ties in both directions.
            let mut leader = *members.first()?;
            let mut laggard = leader;
            for &m in &members[1..] {
                if m.margin_rate > leader.margin_rate {
                    leader = m;
                }
                if m.margin_rate < laggard.margin_rate {
                    laggard = m;
                }
            }
            let n = Decimal::from(members.len());
            let rate_sum: Decimal = members.iter().map(|m| m.margin_rate).sum();
            Some(CategoryInsight {
                category: category.to_string(),
                procedure_count: members.len(),
                total_performed: members.iter().map(|m| m.performed).sum(),
                total_revenue: members.iter().map(|m| m.revenue).sum(),
                total_profit: members.iter().map(|m| m.profit).sum(),
                average_margin_rate: rate_sum / n,
                leader: member(leader),
                laggard: member(laggard),
            })
        })
        .collect();
    out.sort_by(|a, b| {
        b.total_revenue
            .cmp(&a.total_revenue)
            .then_with(|| a.category.cmp(&b.category))
    });
    out
}

fn by_key_then_name(a: &Candidate, b: &Candidate, key: Ordering) -> Ordering {
    key.then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.procedure_id.cmp(&b.procedure_id))
}

/// Profitable procedures still short of breakeven (or without breakeven
/// data), ranked by the margin the missing units would bring.
pub fn growth_candidates(insights: &[ProcedureInsight], th: &Thresholds) -> Vec<Candidate> {
    let stats = PortfolioStats::of(insights);
    let fallback = Decimal::from(th.growth_gap_fallback);
    let mut out: Vec<Candidate> = insights
        .iter()
        .filter(|i| i.margin_rate >= stats.average_margin_rate)
        .filter(|i| i.breakeven_gap.map_or(true, |g| g > Decimal::ZERO))
        .map(|i| Candidate::of(i, i.breakeven_gap.unwrap_or(fallback) * i.unit_margin))
        .collect();
    out.sort_by(|a, b| by_key_then_name(a, b, b.rank_key.cmp(&a.rank_key)));
    out.truncate(th.candidate_limit);
    out
}

/// Low-margin, low-volume procedures, worst margin first. Never overlaps
/// with the growth list.
pub fn prune_candidates(insights: &[ProcedureInsight], th: &Thresholds) -> Vec<Candidate> {
    let stats = PortfolioStats::of(insights);
    let growth: BTreeSet<ProcedureId> = growth_candidates(insights, th)
        .into_iter()
        .map(|c| c.procedure_id)
        .collect();
    let ceiling = stats.average_margin_rate * th.prune_factor();
    let mut out: Vec<Candidate> = insights
        .iter()
        .filter(|i| i.margin_rate < ceiling && i.performed < stats.mean_performed)
        .filter(|i| !growth.contains(&i.procedure_id))
        .map(|i| Candidate::of(i, i.margin_rate))
        .collect();
    out.sort_by(|a, b| by_key_then_name(a, b, a.rank_key.cmp(&b.rank_key)));
    out.truncate(th.candidate_limit);
    out
}
