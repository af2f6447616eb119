#![deny(warnings)]

//! Headless CLI: load a clinic snapshot (or the built-in demo clinic), run the
//! pipeline and print the cost and portfolio report.

use anyhow::{bail, Context, Result};
use chrono::Weekday;
use clinic_core::*;
use clinic_insights::Thresholds;
use clinic_runtime::{PipelineReport, Workbench};
use rust_decimal::Decimal;
use std::path::Path;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    snapshot: Option<String>,
    thresholds: Option<String>,
    budget: Option<Decimal>,
    revenue_target: Option<Decimal>,
    beds: Option<u32>,
    budget_pct: Option<Decimal>,
    version: bool,
}

fn value<T: std::str::FromStr>(flag: &str, raw: Option<String>) -> Result<T> {
    let raw = raw.with_context(|| format!("{flag} needs a value"))?;
    match raw.parse() {
        Ok(v) => Ok(v),
        Err(_) => bail!("invalid value for {flag}: {raw}"),
    }
}

fn parse_args(raw: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut args = Args::default();
    let mut it = raw.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--snapshot" => args.snapshot = Some(value(&arg, it.next())?),
            "--thresholds" => args.thresholds = Some(value(&arg, it.next())?),
            "--budget" => args.budget = Some(value(&arg, it.next())?),
            "--revenue-target" => args.revenue_target = Some(value(&arg, it.next())?),
            "--beds" => args.beds = Some(value(&arg, it.next())?),
            "--budget-pct" => args.budget_pct = Some(value(&arg, it.next())?),
            "--version" => args.version = true,
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

fn load_snapshot(path: &str) -> Result<ClinicSnapshot> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let yaml = matches!(
        Path::new(path).extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    if yaml {
        let snapshot: ClinicSnapshot =
            serde_yaml::from_str(&text).with_context(|| format!("parsing {path}"))?;
        validate_snapshot(&snapshot)?;
        Ok(snapshot)
    } else {
        Ok(ClinicSnapshot::from_json_str(&text)?)
    }
}

fn won(v: i64) -> Decimal {
    Decimal::new(v, 0)
}

fn staff(id: &str, name: &str, role: &str, salary: i64, days: i64, hours: i64) -> StaffProfile {
    StaffProfile {
        id: id.into(),
        name: name.to_string(),
        role: role.to_string(),
        monthly_salary: won(salary),
        work_days_per_month: won(days),
        work_hours_per_day: won(hours),
        work_pattern: None,
    }
}

fn procedure(
    id: &str,
    name: &str,
    price: i64,
    minutes: (i64, i64),
    staff: &[(&str, i64)],
    materials: &[(&str, i64)],
) -> ProcedureFormValues {
    ProcedureFormValues {
        id: id.into(),
        name: name.to_string(),
        price: won(price),
        treatment_minutes: won(minutes.0),
        total_minutes: Some(won(minutes.1)),
        staff_assignments: staff
            .iter()
            .map(|(s, m)| StaffAssignment {
                staff_id: (*s).into(),
                minutes: won(*m),
            })
            .collect(),
        material_usages: materials
            .iter()
            .map(|(m, q)| MaterialUsage {
                material_id: (*m).into(),
                quantity: won(*q),
            })
            .collect(),
        notes: None,
    }
}

fn actual(id: &str, performed: i64, spend: Option<i64>) -> ProcedureActualPerformance {
    ProcedureActualPerformance {
        procedure_id: id.into(),
        performed: won(performed),
        marketing_spend: spend.map(won),
    }
}

/// Small aesthetic clinic used when no snapshot file is given.
fn demo_snapshot() -> ClinicSnapshot {
    let mut days: Vec<WeekdayHours> = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]
    .into_iter()
    .map(|d| WeekdayHours::open(d, "10:00", "19:00"))
    .collect();
    days.push(WeekdayHours::open(Weekday::Sat, "10:00", "15:00"));
    days.push(WeekdayHours::closed(Weekday::Sun));

    let mut s = ClinicSnapshot::new(OperationalConfig {
        schedule: Schedule::Weekly(WeeklySchedule {
            days,
            weeks_per_month: None,
            calendar_month: None,
        }),
        bed_count: Some(3),
        notes: Some("demo clinic".to_string()),
    });
    s.staff = vec![
        staff("dr-kim", "Dr. Kim", "doctor", 15_000_000, 22, 8),
        staff("dr-lee", "Dr. Lee", "doctor", 12_000_000, 20, 8),
        staff("rn-park", "Park", "nurse", 3_500_000, 22, 8),
        staff("co-jung", "Jung", "coordinator", 3_000_000, 22, 8),
    ];
    s.materials = vec![
        MaterialItem {
            id: "botox-100u".into(),
            name: "Botulinum toxin 100U".to_string(),
            unit: "U".to_string(),
            unit_quantity: won(100),
            unit_price: won(150_000),
        },
        MaterialItem {
            id: "ha-filler".into(),
            name: "HA filler 1cc".to_string(),
            unit: "cc".to_string(),
            unit_quantity: won(1),
            unit_price: won(90_000),
        },
        MaterialItem {
            id: "gel".into(),
            name: "Cooling gel".to_string(),
            unit: "ml".to_string(),
            unit_quantity: won(500),
            unit_price: won(25_000),
        },
    ];
    s.fixed_costs = vec![
        FixedCostItem {
            id: "rent".into(),
            name: "Rent".to_string(),
            monthly_amount: won(8_000_000),
            category: FixedCostCategory::Facility,
        },
        FixedCostItem {
            id: "equipment".into(),
            name: "Laser lease".to_string(),
            monthly_amount: won(3_500_000),
            category: FixedCostCategory::Facility,
        },
        FixedCostItem {
            id: "admin".into(),
            name: "Accounting and software".to_string(),
            monthly_amount: won(1_200_000),
            category: FixedCostCategory::Common,
        },
        FixedCostItem {
            id: "ads".into(),
            name: "Search ads".to_string(),
            monthly_amount: won(4_000_000),
            category: FixedCostCategory::Marketing,
        },
    ];
    s.procedures = vec![
        procedure(
            "laser-toning",
            "Laser toning",
            120_000,
            (20, 30),
            &[("dr-kim", 10), ("rn-park", 20)],
            &[("gel", 30)],
        ),
        procedure(
            "laser-hair",
            "Laser hair removal",
            80_000,
            (30, 40),
            &[("rn-park", 30)],
            &[("gel", 50)],
        ),
        procedure(
            "botox-forehead",
            "Botox forehead",
            150_000,
            (15, 20),
            &[("dr-lee", 10), ("co-jung", 5)],
            &[("botox-100u", 20)],
        ),
        procedure(
            "filler-lips",
            "Filler lips",
            450_000,
            (30, 45),
            &[("dr-kim", 25), ("rn-park", 10)],
            &[("ha-filler", 1)],
        ),
        procedure(
            "skin-booster",
            "Skin booster",
            250_000,
            (40, 50),
            &[("dr-lee", 20), ("rn-park", 20)],
            &[],
        ),
    ];
    s.actuals = vec![
        actual("laser-toning", 140, Some(1_500_000)),
        actual("laser-hair", 60, Some(800_000)),
        actual("botox-forehead", 90, Some(1_000_000)),
        actual("filler-lips", 25, Some(700_000)),
        actual("skin-booster", 12, None),
    ];
    s
}

fn pct(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |x| format!("{:.1}%", x * 100.0))
}

fn opt(v: Option<Decimal>) -> String {
    v.map_or_else(|| "n/a".to_string(), |x| x.round_dp(2).to_string())
}

fn print_report(snapshot: &ClinicSnapshot, r: &PipelineReport) {
    println!(
        "Clinic OK | staff: {} | materials: {} | fixed costs: {} | procedures: {}",
        snapshot.staff.len(),
        snapshot.materials.len(),
        snapshot.fixed_costs.len(),
        snapshot.procedures.len()
    );
    println!(
        "Capacity | {} min/month | beds: {} | fixed: facility {} common {} marketing {} total {}",
        r.capacity_minutes.round_dp(0),
        snapshot.operational.effective_bed_count(),
        r.fixed_costs.facility_total,
        r.fixed_costs.common_total,
        r.fixed_costs.marketing_total,
        r.fixed_costs.total
    );
    for (b, i) in r.breakdowns.iter().zip(&r.insights.procedures) {
        println!(
            "Procedure | {} | labor {} | consumables {} | fixed {} | total {} | margin {} ({}%) | breakeven {} | gap {} | ROAS {}",
            i.name,
            b.direct_labor_cost.round_dp(2),
            b.consumable_cost.round_dp(2),
            b.fixed_cost_allocated.round_dp(2),
            b.total_cost.round_dp(2),
            b.margin.round_dp(2),
            b.margin_rate.round_dp(1),
            opt(b.breakeven_units),
            opt(i.breakeven_gap),
            i.roas.map_or_else(|| "n/a".to_string(), |x| format!("{x:.2}"))
        );
    }
    for c in &r.insights.categories {
        println!(
            "Category | {} | items {} | revenue {} | avg margin {}% | leader {} | laggard {}",
            c.category,
            c.procedure_count,
            c.total_revenue.round_dp(0),
            c.average_margin_rate.round_dp(1),
            c.leader.name,
            c.laggard.name
        );
    }
    let summary = &r.insights.summary;
    println!(
        "Portfolio | revenue {} | profit {} | avg margin {}% | ROAS {}",
        summary.stats.total_revenue.round_dp(0),
        summary.stats.total_profit.round_dp(0),
        summary.stats.average_margin_rate.round_dp(1),
        summary
            .overall_roas
            .map_or_else(|| "n/a".to_string(), |x| format!("{x:.2}"))
    );
    for c in &summary.growth_candidates {
        println!("Grow | {} | margin {}% | key {}", c.name, c.margin_rate.round_dp(1), c.rank_key.round_dp(0));
    }
    for c in &summary.prune_candidates {
        println!("Prune | {} | margin {}% | performed {}", c.name, c.margin_rate.round_dp(1), c.performed);
    }
    for s in &r.insights.staff_utilization {
        println!(
            "Staff | {} ({}) | {} / {} min | {}",
            s.name,
            s.role,
            s.required_minutes.round_dp(0),
            s.available_minutes.round_dp(0),
            pct(s.utilization)
        );
    }
    let bed = &r.insights.bed_utilization;
    println!(
        "Beds | {} min needed of {} | {} | spare {} | recommended {}",
        bed.required_minutes.round_dp(0),
        bed.capacity_minutes.round_dp(0),
        pct(bed.utilization),
        bed.spare_minutes.round_dp(0),
        bed.recommended_beds
            .map_or_else(|| "n/a".to_string(), |n| n.to_string())
    );
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.version {
        println!(
            "clinic-margin {} ({} built {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }
    info!(snapshot = ?args.snapshot, thresholds = ?args.thresholds, "starting CLI");

    let snapshot = match &args.snapshot {
        Some(path) => load_snapshot(path)?,
        None => demo_snapshot(),
    };
    let thresholds = match &args.thresholds {
        Some(path) => Thresholds::load(path)?,
        None => Thresholds::default(),
    };
    let wb = Workbench::new(snapshot, thresholds)?;
    print_report(wb.snapshot(), wb.report());

    if let Some(budget) = args.budget {
        let target = args.revenue_target.unwrap_or(Decimal::ZERO);
        for a in wb.allocate_marketing(budget, target) {
            println!(
                "Allocate | {} | weight {:.1}% | budget {} | target units {} (now {})",
                a.name,
                a.weight * 100.0,
                a.budget.round_dp(0),
                a.target_performed.round_dp(1),
                a.current_performed
            );
        }
    }
    if let Some(pct_change) = args.budget_pct {
        let s = wb.budget_scenario(pct_change);
        println!(
            "Budget {}% | spend {} -> {} | revenue {} -> {} | profit {} -> {}{}",
            pct_change,
            s.current_budget.round_dp(0),
            s.adjusted_budget.round_dp(0),
            s.current_revenue.round_dp(0),
            s.projected_revenue.round_dp(0),
            s.current_profit.round_dp(0),
            s.projected_profit.round_dp(0),
            if s.efficiency_observed { "" } else { " (assumed ROAS)" }
        );
    }
    if let Some(beds) = args.beds {
        let sim = wb.simulate_beds(beds);
        println!(
            "Beds x{} | capacity {} | {} | spare {} | short by {} beds",
            sim.bed_count,
            sim.capacity_minutes.round_dp(0),
            pct(sim.utilization),
            sim.spare_minutes.round_dp(0),
            sim.additional_beds_needed
        );
    }

    Ok(())
}
