#![deny(warnings)]

//! Core domain records for the clinic margin engine.
//!
//! This crate defines the serializable entity graph consumed by the cost and
//! insight engines (operational schedule, staff, materials, fixed costs,
//! procedures and recorded performance) together with shape validation that
//! collaborators run before handing a snapshot to the engine.

use chrono::{NaiveDate, NaiveTime, Timelike, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Snapshot format version understood by this crate.
pub const SNAPSHOT_VERSION: u32 = 1;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

record_id!(
    /// Identifier of a staff member.
    StaffId
);
record_id!(
    /// Identifier of a consumable material.
    MaterialId
);
record_id!(
    /// Identifier of a fixed-cost line.
    FixedCostId
);
record_id!(
    /// Identifier of a procedure (a sellable item).
    ProcedureId
);

/// A specific calendar month, used for exact weekday counting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarMonth {
    pub year: i32,
    /// Month number in [1, 12].
    pub month: u32,
}

impl CalendarMonth {
    /// First day of the month, or `None` when year/month are out of range.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

/// Opening hours of one weekday.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeekdayHours {
    pub weekday: Weekday,
    pub open: bool,
    /// Opening time as "HH:MM".
    #[serde(default)]
    pub start: Option<String>,
    /// Closing time as "HH:MM".
    #[serde(default)]
    pub end: Option<String>,
}

impl WeekdayHours {
    /// Open weekday helper used by fixtures and the CLI demo.
    pub fn open(weekday: Weekday, start: &str, end: &str) -> Self {
        Self {
            weekday,
            open: true,
            start: Some(start.to_string()),
            end: Some(end.to_string()),
        }
    }

    /// A day without opening hours.
    pub fn closed(weekday: Weekday) -> Self {
        Self {
            weekday,
            open: false,
            start: None,
            end: None,
        }
    }
}

/// A per-weekday schedule repeated over a month.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub days: Vec<WeekdayHours>,
    /// Fractional weeks per month; engines fall back to a default when unset.
    #[serde(default)]
    pub weeks_per_month: Option<Decimal>,
    /// When set, weekday occurrences of this month are counted exactly.
    #[serde(default)]
    pub calendar_month: Option<CalendarMonth>,
}

/// Operating schedule of the facility. Exactly one variant is authoritative.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Schedule {
    /// Flat schedule: operating days per month times hours per day.
    Simple {
        #[serde(default)]
        operating_days: Option<Decimal>,
        #[serde(default)]
        hours_per_day: Option<Decimal>,
    },
    /// Per-weekday opening hours.
    Weekly(WeeklySchedule),
}

/// Capacity description of the facility.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationalConfig {
    pub schedule: Schedule,
    /// Parallel capacity units (beds, chairs, rooms). Unset or zero means one.
    #[serde(default)]
    pub bed_count: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl OperationalConfig {
    /// Simple schedule with a single bed.
    pub fn simple(operating_days: Decimal, hours_per_day: Decimal) -> Self {
        Self {
            schedule: Schedule::Simple {
                operating_days: Some(operating_days),
                hours_per_day: Some(hours_per_day),
            },
            bed_count: Some(1),
            notes: None,
        }
    }

    /// Effective bed count, never below one.
    pub fn effective_bed_count(&self) -> u32 {
        self.bed_count.unwrap_or(1).max(1)
    }
}

/// A staff member whose salary is amortized over working minutes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaffProfile {
    pub id: StaffId,
    pub name: String,
    pub role: String,
    pub monthly_salary: Decimal,
    pub work_days_per_month: Decimal,
    pub work_hours_per_day: Decimal,
    /// Richer weekly pattern; replaces days x hours when it yields minutes.
    #[serde(default)]
    pub work_pattern: Option<WeeklySchedule>,
}

/// A consumable bought in packs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialItem {
    pub id: MaterialId,
    pub name: String,
    /// Unit label, e.g. "ml", "vial".
    pub unit: String,
    /// Number of units in one purchase.
    pub unit_quantity: Decimal,
    /// Price paid for one purchase.
    pub unit_price: Decimal,
}

/// Fixed-cost category. Only `Facility` feeds per-minute allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedCostCategory {
    Facility,
    Common,
    Marketing,
}

/// A recurring monthly cost.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixedCostItem {
    pub id: FixedCostId,
    pub name: String,
    pub monthly_amount: Decimal,
    pub category: FixedCostCategory,
}

/// Staff minutes spent on one unit of a procedure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaffAssignment {
    pub staff_id: StaffId,
    pub minutes: Decimal,
}

/// Material consumed by one unit of a procedure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialUsage {
    pub material_id: MaterialId,
    pub quantity: Decimal,
}

/// A sellable procedure as entered by the operator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcedureFormValues {
    pub id: ProcedureId,
    pub name: String,
    pub price: Decimal,
    /// Hands-on minutes; drives capacity analytics.
    pub treatment_minutes: Decimal,
    /// Full occupancy including setup and cleanup; drives fixed-cost allocation.
    #[serde(default)]
    pub total_minutes: Option<Decimal>,
    #[serde(default)]
    pub staff_assignments: Vec<StaffAssignment>,
    #[serde(default)]
    pub material_usages: Vec<MaterialUsage>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Recorded volume and spend of a procedure for the period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcedureActualPerformance {
    pub procedure_id: ProcedureId,
    pub performed: Decimal,
    #[serde(default)]
    pub marketing_spend: Option<Decimal>,
}

/// Immutable input bundle handed to the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClinicSnapshot {
    pub version: u32,
    pub operational: OperationalConfig,
    #[serde(default)]
    pub staff: Vec<StaffProfile>,
    #[serde(default)]
    pub materials: Vec<MaterialItem>,
    #[serde(default)]
    pub fixed_costs: Vec<FixedCostItem>,
    #[serde(default)]
    pub procedures: Vec<ProcedureFormValues>,
    #[serde(default)]
    pub actuals: Vec<ProcedureActualPerformance>,
}

impl ClinicSnapshot {
    /// Empty snapshot around an operational config.
    pub fn new(operational: OperationalConfig) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            operational,
            staff: vec![],
            materials: vec![],
            fixed_costs: vec![],
            procedures: vec![],
            actuals: vec![],
        }
    }

    /// Parse a JSON snapshot and validate its shape.
    pub fn from_json_str(s: &str) -> Result<Self, ValidationError> {
        let snapshot: ClinicSnapshot =
            serde_json::from_str(s).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        validate_snapshot(&snapshot)?;
        Ok(snapshot)
    }

    /// Actual performance recorded for a procedure, if any.
    pub fn actual_for(&self, id: &ProcedureId) -> Option<&ProcedureActualPerformance> {
        self.actuals.iter().find(|a| &a.procedure_id == id)
    }
}

/// Shape and reference errors found by validation.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Snapshot produced by an incompatible writer.
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
    /// Input could not be parsed at all.
    #[error("malformed input: {0}")]
    Malformed(String),
    #[error("name must not be empty: {0}")]
    EmptyName(String),
    #[error("negative monetary value: {0}")]
    NegativeMoney(String),
    #[error("negative value: {0}")]
    NegativeValue(String),
    /// Purchase quantity must be strictly positive.
    #[error("quantity must be > 0: {0}")]
    NonPositiveQuantity(String),
    /// Clock time is not "HH:MM".
    #[error("invalid clock time: {0}")]
    InvalidClockTime(String),
    #[error("weekday listed twice: {0:?}")]
    DuplicateWeekday(Weekday),
    #[error("invalid calendar month {year}-{month}")]
    InvalidCalendarMonth { year: i32, month: u32 },
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    /// A record points at an id that does not exist.
    #[error("reference not found: {0}")]
    UnknownReference(String),
}

/// Minutes in a day; also the value of the "24:00" end-of-day time.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Parse an "HH:MM" clock time into minutes since midnight. Seconds are not
/// accepted. "24:00" parses to [`MINUTES_PER_DAY`] so a day can close at
/// midnight.
pub fn parse_clock_time(s: &str) -> Option<u32> {
    let (h, m) = s.trim().split_once(':')?;
    if h.is_empty() || m.len() != 2 {
        return None;
    }
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h == 24 && m == 0 {
        return Some(MINUTES_PER_DAY);
    }
    NaiveTime::from_hms_opt(h, m, 0).map(|t| t.num_seconds_from_midnight() / 60)
}

fn non_negative(value: Decimal, what: impl FnOnce() -> String) -> Result<(), ValidationError> {
    if value < Decimal::ZERO {
        return Err(ValidationError::NegativeValue(what()));
    }
    Ok(())
}

fn non_negative_money(value: Decimal, what: impl FnOnce() -> String) -> Result<(), ValidationError> {
    if value < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney(what()));
    }
    Ok(())
}

fn named(name: &str, id: &dyn fmt::Display) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName(id.to_string()));
    }
    Ok(())
}

/// Validate a weekly schedule (also used for staff work patterns).
pub fn validate_weekly(w: &WeeklySchedule) -> Result<(), ValidationError> {
    let mut seen = BTreeSet::new();
    for d in &w.days {
        if !seen.insert(d.weekday.num_days_from_monday()) {
            return Err(ValidationError::DuplicateWeekday(d.weekday));
        }
        if !d.open {
            continue;
        }
        if let Some(t) = &d.start {
            // "24:00" only closes a day
            if parse_clock_time(t).map_or(true, |m| m >= MINUTES_PER_DAY) {
                return Err(ValidationError::InvalidClockTime(t.clone()));
            }
        }
        if let Some(t) = &d.end {
            if parse_clock_time(t).is_none() {
                return Err(ValidationError::InvalidClockTime(t.clone()));
            }
        }
    }
    if let Some(weeks) = w.weeks_per_month {
        non_negative(weeks, || "weeks_per_month".to_string())?;
    }
    if let Some(cm) = w.calendar_month {
        if cm.first_day().is_none() {
            return Err(ValidationError::InvalidCalendarMonth {
                year: cm.year,
                month: cm.month,
            });
        }
    }
    Ok(())
}

/// Validate the operational config.
pub fn validate_operational(c: &OperationalConfig) -> Result<(), ValidationError> {
    match &c.schedule {
        Schedule::Simple {
            operating_days,
            hours_per_day,
        } => {
            if let Some(d) = operating_days {
                non_negative(*d, || "operating_days".to_string())?;
            }
            if let Some(h) = hours_per_day {
                non_negative(*h, || "hours_per_day".to_string())?;
            }
            Ok(())
        }
        Schedule::Weekly(w) => validate_weekly(w),
    }
}

/// Validate a staff profile.
pub fn validate_staff(s: &StaffProfile) -> Result<(), ValidationError> {
    named(&s.name, &s.id)?;
    non_negative_money(s.monthly_salary, || format!("salary of {}", s.id))?;
    non_negative(s.work_days_per_month, || format!("work days of {}", s.id))?;
    non_negative(s.work_hours_per_day, || format!("work hours of {}", s.id))?;
    if let Some(p) = &s.work_pattern {
        validate_weekly(p)?;
    }
    Ok(())
}

/// Validate a material.
pub fn validate_material(m: &MaterialItem) -> Result<(), ValidationError> {
    named(&m.name, &m.id)?;
    non_negative_money(m.unit_price, || format!("price of {}", m.id))?;
    if m.unit_quantity <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveQuantity(m.id.to_string()));
    }
    Ok(())
}

/// Validate a fixed-cost line.
pub fn validate_fixed_cost(f: &FixedCostItem) -> Result<(), ValidationError> {
    named(&f.name, &f.id)?;
    non_negative_money(f.monthly_amount, || format!("amount of {}", f.id))
}

/// Validate a procedure on its own (references are checked by [`validate_snapshot`]).
pub fn validate_procedure(p: &ProcedureFormValues) -> Result<(), ValidationError> {
    named(&p.name, &p.id)?;
    non_negative_money(p.price, || format!("price of {}", p.id))?;
    non_negative(p.treatment_minutes, || format!("treatment minutes of {}", p.id))?;
    if let Some(total) = p.total_minutes {
        non_negative(total, || format!("total minutes of {}", p.id))?;
    }
    for a in &p.staff_assignments {
        non_negative(a.minutes, || format!("{} minutes in {}", a.staff_id, p.id))?;
    }
    for u in &p.material_usages {
        non_negative(u.quantity, || format!("{} quantity in {}", u.material_id, p.id))?;
    }
    Ok(())
}

fn unique<'a, T: fmt::Display + Ord + 'a>(
    ids: impl IntoIterator<Item = &'a T>,
) -> Result<BTreeSet<&'a T>, ValidationError> {
    let mut set = BTreeSet::new();
    for id in ids {
        if !set.insert(id) {
            return Err(ValidationError::DuplicateId(id.to_string()));
        }
    }
    Ok(set)
}

/// Validate the whole snapshot, including cross-references.
pub fn validate_snapshot(s: &ClinicSnapshot) -> Result<(), ValidationError> {
    if s.version != SNAPSHOT_VERSION {
        return Err(ValidationError::UnsupportedVersion(s.version));
    }
    validate_operational(&s.operational)?;
    for st in &s.staff {
        validate_staff(st)?;
    }
    for m in &s.materials {
        validate_material(m)?;
    }
    for f in &s.fixed_costs {
        validate_fixed_cost(f)?;
    }
    for p in &s.procedures {
        validate_procedure(p)?;
    }

    let staff_ids = unique(s.staff.iter().map(|x| &x.id))?;
    let material_ids = unique(s.materials.iter().map(|x| &x.id))?;
    unique(s.fixed_costs.iter().map(|x| &x.id))?;
    let procedure_ids = unique(s.procedures.iter().map(|x| &x.id))?;

    for p in &s.procedures {
        for a in &p.staff_assignments {
            if !staff_ids.contains(&a.staff_id) {
                return Err(ValidationError::UnknownReference(format!(
                    "staff {} in {}",
                    a.staff_id, p.id
                )));
            }
        }
        for u in &p.material_usages {
            if !material_ids.contains(&u.material_id) {
                return Err(ValidationError::UnknownReference(format!(
                    "material {} in {}",
                    u.material_id, p.id
                )));
            }
        }
    }
    unique(s.actuals.iter().map(|x| &x.procedure_id))?;
    for a in &s.actuals {
        if !procedure_ids.contains(&a.procedure_id) {
            return Err(ValidationError::UnknownReference(format!(
                "actual for {}",
                a.procedure_id
            )));
        }
        non_negative(a.performed, || format!("performed of {}", a.procedure_id))?;
        if let Some(spend) = a.marketing_spend {
            non_negative_money(spend, || format!("marketing spend of {}", a.procedure_id))?;
        }
    }
    debug!(
        staff = s.staff.len(),
        materials = s.materials.len(),
        procedures = s.procedures.len(),
        "snapshot validated"
    );
    Ok(())
}
