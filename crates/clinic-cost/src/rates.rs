//! Per-minute staff rates and per-unit material costs.

use crate::capacity::{monthly_minutes, simple_minutes};
use clinic_core::{MaterialItem, StaffProfile};
use rust_decimal::Decimal;

/// Monthly working minutes of a staff member.
///
/// A work pattern wins when it yields any minutes; otherwise
/// `days x hours x 60`.
pub fn staff_monthly_minutes(staff: &StaffProfile) -> Decimal {
    if let Some(pattern) = &staff.work_pattern {
        let minutes = monthly_minutes(pattern);
        if minutes > Decimal::ZERO {
            return minutes;
        }
    }
    simple_minutes(
        Some(staff.work_days_per_month),
        Some(staff.work_hours_per_day),
    )
}

/// Salary cost of one working minute, zero when no minutes are worked.
pub fn staff_minute_rate(staff: &StaffProfile) -> Decimal {
    let minutes = staff_monthly_minutes(staff);
    if minutes <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    staff.monthly_salary / minutes
}

/// Cost of a single consumed unit, zero for an empty pack.
pub fn material_unit_cost(material: &MaterialItem) -> Decimal {
    if material.unit_quantity <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    material.unit_price / material.unit_quantity
}
