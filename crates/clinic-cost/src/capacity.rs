//! Monthly capacity in minutes from an operational schedule.

use chrono::Datelike;
use clinic_core::{parse_clock_time, CalendarMonth, OperationalConfig, Schedule, WeekdayHours, WeeklySchedule};
use rust_decimal::Decimal;
use tracing::debug;

const MINUTES_PER_HOUR: i64 = 60;

/// Weeks per month used when a weekly schedule does not set its own
/// (365.25 / 12 / 7, rounded).
pub fn default_weeks_per_month() -> Decimal {
    Decimal::new(4345, 3)
}

/// `days x hours x 60`, or zero when either side is missing or non-positive.
pub fn simple_minutes(days: Option<Decimal>, hours_per_day: Option<Decimal>) -> Decimal {
    match (days, hours_per_day) {
        (Some(d), Some(h)) if d > Decimal::ZERO && h > Decimal::ZERO => {
            d * h * Decimal::from(MINUTES_PER_HOUR)
        }
        _ => Decimal::ZERO,
    }
}

/// Open minutes of a single weekday occurrence.
///
/// Closed days, unparsable times and spans that end before they start all
/// count as zero.
pub fn day_minutes(day: &WeekdayHours) -> Decimal {
    if !day.open {
        return Decimal::ZERO;
    }
    let (Some(start), Some(end)) = (
        day.start.as_deref().and_then(parse_clock_time),
        day.end.as_deref().and_then(parse_clock_time),
    ) else {
        return Decimal::ZERO;
    };
    if end <= start {
        return Decimal::ZERO;
    }
    Decimal::from(end - start)
}

/// Minutes of one representative week.
pub fn weekly_minutes(schedule: &WeeklySchedule) -> Decimal {
    schedule.days.iter().map(day_minutes).sum()
}

/// How often each weekday (Monday first) occurs in the given month.
pub fn weekday_occurrences(month: CalendarMonth) -> Option<[u32; 7]> {
    let mut day = month.first_day()?;
    let mut counts = [0u32; 7];
    while day.month() == month.month {
        counts[day.weekday().num_days_from_monday() as usize] += 1;
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    Some(counts)
}

/// Monthly minutes of one capacity unit following a weekly schedule.
///
/// With a calendar month the exact weekday occurrences are used, otherwise the
/// representative week is scaled by `weeks_per_month`.
pub fn monthly_minutes(schedule: &WeeklySchedule) -> Decimal {
    if let Some(month) = schedule.calendar_month {
        match weekday_occurrences(month) {
            Some(counts) => {
                return schedule
                    .days
                    .iter()
                    .map(|d| {
                        let n = counts[d.weekday.num_days_from_monday() as usize];
                        day_minutes(d) * Decimal::from(n)
                    })
                    .sum();
            }
            None => debug!(
                year = month.year,
                month = month.month,
                "invalid calendar month, falling back to weeks per month"
            ),
        }
    }
    let weeks = schedule
        .weeks_per_month
        .filter(|w| *w > Decimal::ZERO)
        .unwrap_or_else(default_weeks_per_month);
    weekly_minutes(schedule) * weeks
}

/// Monthly minutes of a single bed.
pub fn per_bed_capacity_minutes(config: &OperationalConfig) -> Decimal {
    match &config.schedule {
        Schedule::Simple {
            operating_days,
            hours_per_day,
        } => simple_minutes(*operating_days, *hours_per_day),
        Schedule::Weekly(w) => monthly_minutes(w),
    }
}

/// Monthly minutes across all beds.
pub fn compute_capacity_minutes(config: &OperationalConfig) -> Decimal {
    let beds = config.effective_bed_count();
    let minutes = per_bed_capacity_minutes(config) * Decimal::from(beds);
    if minutes.is_zero() {
        debug!("operational schedule yields zero capacity");
    }
    minutes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use proptest::prelude::*;

    const WEEK: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    fn weekly(days: Vec<WeekdayHours>) -> OperationalConfig {
        OperationalConfig {
            schedule: Schedule::Weekly(WeeklySchedule {
                days,
                weeks_per_month: None,
                calendar_month: None,
            }),
            bed_count: Some(1),
            notes: None,
        }
    }

    fn weekdays_nine_to_six() -> Vec<WeekdayHours> {
        WEEK.iter()
            .map(|&d| match d {
                Weekday::Sat | Weekday::Sun => WeekdayHours::closed(d),
                _ => WeekdayHours::open(d, "09:00", "18:00"),
            })
            .collect()
    }

    #[test]
    fn simple_schedule_single_bed() {
        let cfg = OperationalConfig::simple(Decimal::new(26, 0), Decimal::new(10, 0));
        assert_eq!(compute_capacity_minutes(&cfg), Decimal::new(15_600, 0));
    }

    #[test]
    fn beds_multiply_capacity() {
        let mut cfg = OperationalConfig::simple(Decimal::new(26, 0), Decimal::new(10, 0));
        cfg.bed_count = Some(3);
        assert_eq!(per_bed_capacity_minutes(&cfg), Decimal::new(15_600, 0));
        assert_eq!(compute_capacity_minutes(&cfg), Decimal::new(46_800, 0));
        cfg.bed_count = Some(0);
        assert_eq!(compute_capacity_minutes(&cfg), Decimal::new(15_600, 0));
    }

    #[test]
    fn simple_schedule_missing_fields_is_zero() {
        let cfg = OperationalConfig {
            schedule: Schedule::Simple {
                operating_days: None,
                hours_per_day: Some(Decimal::new(8, 0)),
            },
            bed_count: None,
            notes: None,
        };
        assert_eq!(compute_capacity_minutes(&cfg), Decimal::ZERO);
        let cfg = OperationalConfig::simple(Decimal::new(-2, 0), Decimal::new(8, 0));
        assert_eq!(compute_capacity_minutes(&cfg), Decimal::ZERO);
    }

    #[test]
    fn weekly_schedule_uses_default_weeks() {
        let cfg = weekly(weekdays_nine_to_six());
        // 5 x 540 minutes x 4.345
        assert_eq!(compute_capacity_minutes(&cfg), Decimal::new(117_315, 1));
    }

    #[test]
    fn all_closed_week_is_zero() {
        let cfg = weekly(WEEK.iter().map(|&d| WeekdayHours::closed(d)).collect());
        assert_eq!(compute_capacity_minutes(&cfg), Decimal::ZERO);
    }

    #[test]
    fn inverted_or_invalid_hours_are_ignored() {
        let cfg = weekly(vec![
            WeekdayHours::open(Weekday::Mon, "18:00", "09:00"),
            WeekdayHours::open(Weekday::Tue, "nine", "18:00"),
            WeekdayHours {
                weekday: Weekday::Wed,
                open: true,
                start: Some("10:00".to_string()),
                end: None,
            },
            WeekdayHours::open(Weekday::Thu, "10:00", "12:30"),
        ]);
        let expected = Decimal::new(150, 0) * default_weeks_per_month();
        assert_eq!(compute_capacity_minutes(&cfg), expected);
    }

    #[test]
    fn weekday_occurrences_january_2024() {
        // 2024-01-01 is a Monday; 31 days.
        let counts = weekday_occurrences(CalendarMonth {
            year: 2024,
            month: 1,
        })
        .unwrap();
        assert_eq!(counts, [5, 5, 5, 4, 4, 4, 4]);
        let feb = weekday_occurrences(CalendarMonth {
            year: 2024,
            month: 2,
        })
        .unwrap();
        assert_eq!(feb.iter().sum::<u32>(), 29);
        assert!(weekday_occurrences(CalendarMonth {
            year: 2024,
            month: 0
        })
        .is_none());
    }

    #[test]
    fn calendar_month_counts_exact_days() {
        let mut cfg = weekly(weekdays_nine_to_six());
        if let Schedule::Weekly(w) = &mut cfg.schedule {
            w.calendar_month = Some(CalendarMonth {
                year: 2024,
                month: 1,
            });
        }
        // 23 weekdays x 540 minutes
        assert_eq!(compute_capacity_minutes(&cfg), Decimal::new(12_420, 0));
    }

    #[test]
    fn exact_and_average_agree_over_a_year() {
        let days: Vec<WeekdayHours> = WEEK
            .iter()
            .map(|&d| WeekdayHours::open(d, "10:00", "20:00"))
            .collect();
        let averaged = monthly_minutes(&WeeklySchedule {
            days: days.clone(),
            weeks_per_month: None,
            calendar_month: None,
        }) * Decimal::from(12);
        let exact: Decimal = (1..=12)
            .map(|m| {
                monthly_minutes(&WeeklySchedule {
                    days: days.clone(),
                    weeks_per_month: None,
                    calendar_month: Some(CalendarMonth {
                        year: 2023,
                        month: m,
                    }),
                })
            })
            .sum();
        assert_eq!(exact, Decimal::new(365 * 600, 0));
        let drift = (exact - averaged).abs() / exact;
        assert!(drift < Decimal::new(1, 3), "drift {drift}");
    }

    #[test]
    fn day_can_close_at_midnight() {
        let late = WeekdayHours::open(Weekday::Fri, "18:00", "24:00");
        assert_eq!(day_minutes(&late), Decimal::new(360, 0));
        let mut cfg = weekly(vec![late]);
        if let Schedule::Weekly(w) = &mut cfg.schedule {
            w.weeks_per_month = Some(Decimal::new(4, 0));
        }
        clinic_core::validate_operational(&cfg).unwrap();
        assert_eq!(compute_capacity_minutes(&cfg), Decimal::new(1_440, 0));
        // "00:00" as a closing time is still an empty span
        assert_eq!(
            day_minutes(&WeekdayHours::open(Weekday::Fri, "18:00", "00:00")),
            Decimal::ZERO
        );
    }

    #[test]
    fn invalid_calendar_month_falls_back_to_average_weeks() {
        let schedule = WeeklySchedule {
            days: weekdays_nine_to_six(),
            weeks_per_month: None,
            calendar_month: Some(CalendarMonth {
                year: 2024,
                month: 13,
            }),
        };
        let expected = weekly_minutes(&schedule) * default_weeks_per_month();
        assert_eq!(monthly_minutes(&schedule), expected);
        assert_eq!(expected, Decimal::new(117_315, 1));
    }

    #[test]
    fn explicit_weeks_per_month_is_used() {
        let mut cfg = weekly(weekdays_nine_to_six());
        if let Schedule::Weekly(w) = &mut cfg.schedule {
            w.weeks_per_month = Some(Decimal::new(4, 0));
        }
        assert_eq!(compute_capacity_minutes(&cfg), Decimal::new(10_800, 0));
    }

    proptest! {
        #[test]
        fn capacity_is_never_negative(days in -40i64..40, hours in -24i64..24, beds in 0u32..8) {
            let mut cfg = OperationalConfig::simple(Decimal::new(days, 0), Decimal::new(hours, 0));
            cfg.bed_count = Some(beds);
            prop_assert!(compute_capacity_minutes(&cfg) >= Decimal::ZERO);
        }

        #[test]
        fn capacity_scales_with_beds(beds in 1u32..20) {
            let mut cfg = weekly(weekdays_nine_to_six());
            let one = compute_capacity_minutes(&cfg);
            cfg.bed_count = Some(beds);
            prop_assert_eq!(compute_capacity_minutes(&cfg), one * Decimal::from(beds));
        }
    }
}
