//! Local insight generators. Each is a pure function of [`InsightMetrics`].

use chrono::{Datelike, Duration, Weekday};

use super::{InsightCategory, InsightItem, InsightMetrics};
use crate::date_util::last_day_of_month;
use crate::metrics::classify::{
    classify_capacity_buffer, classify_project_load, classify_utilization, target_buffer_pct,
    utilization_description, Severity,
};

/// Holidays this close trigger a leave insight.
pub const LEAVE_WINDOW_DAYS: i64 = 14;
/// Holidays this many in the next month mark a busy leave period.
pub const BUSY_LEAVE_COUNT: usize = 3;

fn item(
    title: impl Into<String>,
    description: impl Into<String>,
    severity: Severity,
    category: InsightCategory,
    icon: &str,
    metric: Option<String>,
    priority: u8,
) -> InsightItem {
    InsightItem {
        title: title.into(),
        description: description.into(),
        severity,
        category,
        icon: icon.to_string(),
        metric,
        priority,
    }
}

fn plural(n: u64, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

pub fn utilization_insights(m: &InsightMetrics) -> Vec<InsightItem> {
    use InsightCategory::Utilization;

    if m.team_size == 0 {
        return vec![item(
            "No Team Data",
            "Add team members to start tracking utilization.",
            Severity::Info,
            Utilization,
            "users",
            None,
            1,
        )];
    }

    let rate = m.utilization_rate.round();
    let metric = Some(format!("{rate:.0}% utilized"));
    let c = classify_utilization(m.utilization_rate);
    let mut out = vec![match c.label {
        "Critical" => item(
            "Team Over Capacity",
            format!("Average utilization is {rate:.0}%. Redistribute work or extend timelines before people burn out."),
            Severity::Danger,
            Utilization,
            "alert-triangle",
            metric,
            1,
        ),
        "High" => item(
            utilization_description(c.label),
            format!("The team is at {rate:.0}%. New work will push members past capacity."),
            Severity::Warning,
            Utilization,
            "trending-up",
            metric,
            2,
        ),
        "Optimal" => item(
            "Optimal Utilization",
            format!("At {rate:.0}% the team is inside the 70-90% target band."),
            Severity::Good,
            Utilization,
            "check-circle",
            metric,
            6,
        ),
        "Moderate" => item(
            utilization_description(c.label),
            format!("The team is at {rate:.0}% and can take on new project work."),
            Severity::Info,
            Utilization,
            "briefcase",
            metric,
            3,
        ),
        _ => item(
            utilization_description(c.label),
            format!("Only {rate:.0}% of capacity is booked. Pursue new work or rebalance assignments."),
            Severity::Info,
            Utilization,
            "battery-low",
            metric,
            3,
        ),
    }];

    if m.overloaded_count > 0 {
        out.push(item(
            format!("{} Over-allocated", plural(m.overloaded_count, "Member", "Members")),
            "Some people are booked beyond their weekly capacity. Move hours to members with slack.",
            Severity::Warning,
            Utilization,
            "user-x",
            Some(format!("{} over 100%", m.overloaded_count)),
            2,
        ));
    }
    if m.underutilized_count > 0 {
        out.push(item(
            format!("{} Under-utilized", plural(m.underutilized_count, "Member", "Members")),
            "These people are below 50% and are the first candidates for new assignments.",
            Severity::Info,
            Utilization,
            "user-plus",
            Some(format!("{} under 50%", m.underutilized_count)),
            5,
        ));
    }
    out
}

pub fn project_load_insights(m: &InsightMetrics) -> Vec<InsightItem> {
    if m.team_size == 0 {
        return Vec::new();
    }
    let per_person = m.active_project_count as f64 / m.team_size as f64;
    let metric = Some(format!("{per_person:.1} projects/person"));
    let c = classify_project_load(per_person);
    let (title, description, icon, priority) = match c.severity {
        Severity::Danger => (
            "Project Overload",
            "Each person is spread across too many live projects. Context switching will slow delivery.",
            "layers",
            1,
        ),
        Severity::Warning => (
            "Heavy Project Load",
            "People are juggling several projects each. Watch for slipping deadlines.",
            "layers",
            2,
        ),
        Severity::Good => (
            "Balanced Project Load",
            "Project count is in proportion to team size.",
            "check-circle",
            6,
        ),
        Severity::Info => (
            "Light Project Load",
            "There is room to take on more projects with the current team.",
            "folder-plus",
            5,
        ),
    };
    vec![item(
        title,
        description,
        c.severity,
        InsightCategory::ProjectLoad,
        icon,
        metric,
        priority,
    )]
}

pub fn team_scaling_insights(m: &InsightMetrics) -> Vec<InsightItem> {
    use InsightCategory::TeamScaling;

    if m.team_size == 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    let rate = m.utilization_rate;

    if rate > 100.0 {
        let needed = ((m.team_size as f64) * (rate - 100.0) / 100.0).ceil().max(1.0) as u64;
        out.push(item(
            "Consider Hiring",
            format!(
                "At {rate:.0}% utilization the team needs about {} to get back to 100%.",
                plural(needed, "more person", "more people")
            ),
            Severity::Warning,
            TeamScaling,
            "user-plus",
            Some(format!("+{needed} people")),
            2,
        ));
    } else if rate < 50.0 && m.team_size >= 5 {
        out.push(item(
            "Hold Hiring",
            "Existing capacity is largely unbooked. Fill it before adding headcount.",
            Severity::Info,
            TeamScaling,
            "pause-circle",
            Some(format!("{rate:.0}% utilized")),
            4,
        ));
    }

    if m.pending_count > 0 {
        out.push(item(
            "Pending Invitations",
            format!(
                "{} not joined yet. Pre-allocated hours for them are already in the plan.",
                plural(m.pending_count, "invited person has", "invited people have")
            ),
            Severity::Info,
            TeamScaling,
            "mail",
            Some(format!("{} pending", m.pending_count)),
            6,
        ));
    }
    out
}

/// Keyed only on `m.now`.
pub fn time_based_insights(m: &InsightMetrics) -> Vec<InsightItem> {
    use InsightCategory::Timing;

    let now = m.now;
    let mut out = Vec::new();

    if now.day() >= 25 {
        let month_end = last_day_of_month(now.year(), now.month());
        out.push(item(
            "Month-End Planning",
            format!(
                "Confirm next month's allocations before {}.",
                month_end.format("%b %-d")
            ),
            Severity::Info,
            Timing,
            "calendar",
            Some(format!("{} days left", (month_end - now).num_days())),
            5,
        ));
    }
    if now.month() % 3 == 0 && now.day() >= 15 {
        out.push(item(
            "Quarter Planning Window",
            "The quarter closes soon. Review staffing for next quarter's pipeline.",
            Severity::Info,
            Timing,
            "calendar-range",
            None,
            4,
        ));
    }
    if now.weekday() == Weekday::Mon {
        out.push(item(
            "Weekly Allocation Review",
            "Start of the week: check this week's bookings against capacity.",
            Severity::Info,
            Timing,
            "clock",
            None,
            7,
        ));
    }
    out
}

pub fn capacity_buffer_insights(m: &InsightMetrics) -> Vec<InsightItem> {
    use InsightCategory::CapacityBuffer;

    if m.team_size == 0 {
        return Vec::new();
    }
    let buffer = m.capacity_buffer_pct;
    let target = target_buffer_pct(m.team_size);
    let metric = Some(format!("{buffer:.0}% buffer"));
    let c = classify_capacity_buffer(buffer, m.team_size);

    let out = match c.severity {
        Severity::Danger => item(
            "Capacity Exceeded",
            format!("Booked hours exceed capacity by {:.0}%.", buffer.abs()),
            c.severity,
            CapacityBuffer,
            "alert-octagon",
            metric,
            1,
        ),
        Severity::Warning => item(
            "Thin Capacity Buffer",
            format!("Only {buffer:.0}% slack against a {target:.0}% target. Absences will cause overruns."),
            c.severity,
            CapacityBuffer,
            "shield-alert",
            metric,
            3,
        ),
        Severity::Good => item(
            "Healthy Buffer",
            format!("{buffer:.0}% slack covers the {target:.0}% target."),
            c.severity,
            CapacityBuffer,
            "shield-check",
            metric,
            7,
        ),
        Severity::Info => item(
            "Excess Capacity",
            format!("{buffer:.0}% of capacity is unallocated."),
            c.severity,
            CapacityBuffer,
            "battery",
            metric,
            4,
        ),
    };
    vec![out]
}

pub fn leave_insights(m: &InsightMetrics) -> Vec<InsightItem> {
    use InsightCategory::Leave;

    let soon = m.now + Duration::days(LEAVE_WINDOW_DAYS);
    let month = m.now + Duration::days(30);
    let active = |end: chrono::NaiveDate| end >= m.now;

    let mut upcoming: Vec<_> = m
        .upcoming_holidays
        .iter()
        .filter(|h| h.date <= soon && active(h.end_date.unwrap_or(h.date)))
        .collect();
    upcoming.sort_by_key(|h| h.date);

    let mut out = Vec::new();
    if let Some(next) = upcoming.first() {
        let days = (next.date - m.now).num_days().max(0);
        let when = next.date.format("%b %-d");
        let metric = Some(if days == 0 {
            "today".to_string()
        } else {
            format!("in {days} days")
        });
        if m.utilization_rate >= 90.0 {
            out.push(item(
                "Holiday During High Utilization",
                format!(
                    "{} on {when} lands while the team is at {:.0}%. Plan cover now.",
                    next.name, m.utilization_rate
                ),
                Severity::Warning,
                Leave,
                "umbrella",
                metric,
                2,
            ));
        } else {
            out.push(item(
                "Upcoming Holiday",
                format!("{} on {when}. Adjust allocations for the lost day.", next.name),
                Severity::Info,
                Leave,
                "sun",
                metric,
                4,
            ));
        }
    }

    let this_month = m
        .upcoming_holidays
        .iter()
        .filter(|h| h.date <= month && active(h.end_date.unwrap_or(h.date)))
        .count();
    if this_month >= BUSY_LEAVE_COUNT {
        out.push(item(
            "Busy Leave Period",
            format!("{this_month} holidays fall in the next 30 days. Expect reduced capacity."),
            Severity::Info,
            Leave,
            "calendar-x",
            Some(format!("{this_month} holidays")),
            5,
        ));
    }
    out
}
