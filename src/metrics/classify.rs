//! Threshold tables mapping metrics onto status labels for badges and alerts.

use serde::{Deserialize, Serialize};

/// Ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Good,
    Warning,
    Danger,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Good => "good",
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Severity::Info => "#3b82f6",
            Severity::Good => "#22c55e",
            Severity::Warning => "#f59e0b",
            Severity::Danger => "#ef4444",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub label: &'static str,
    pub severity: Severity,
    pub color: &'static str,
}

impl Classification {
    fn new(label: &'static str, severity: Severity) -> Self {
        Self {
            label,
            severity,
            color: severity.color(),
        }
    }
}

pub const UTILIZATION_LABELS: [&str; 5] = ["Critical", "High", "Optimal", "Moderate", "Low"];

/// Utilization bands: `>120` critical, `90..=120` high, `70..90` optimal,
/// `50..70` moderate, `<50` low. NaN is read as 0.
pub fn classify_utilization(rate: f64) -> Classification {
    let rate = if rate.is_nan() { 0.0 } else { rate };
    if rate > 120.0 {
        Classification::new("Critical", Severity::Danger)
    } else if rate >= 90.0 {
        Classification::new("High", Severity::Warning)
    } else if rate >= 70.0 {
        Classification::new("Optimal", Severity::Good)
    } else if rate >= 50.0 {
        Classification::new("Moderate", Severity::Info)
    } else {
        Classification::new("Low", Severity::Info)
    }
}

/// Longer badge text for a utilization label.
pub fn utilization_description(label: &str) -> &'static str {
    match label {
        "Critical" => "Over Capacity",
        "High" => "Near Capacity",
        "Optimal" => "Optimal",
        "Moderate" => "Ready for Projects",
        _ => "Significant Available Capacity",
    }
}

/// Projects per person: `>3.5` overloaded, `>2.5` heavy, `>1.5` balanced, else light.
pub fn classify_project_load(projects_per_person: f64) -> Classification {
    let load = if projects_per_person.is_nan() { 0.0 } else { projects_per_person };
    if load > 3.5 {
        Classification::new("Overloaded", Severity::Danger)
    } else if load > 2.5 {
        Classification::new("Heavy", Severity::Warning)
    } else if load > 1.5 {
        Classification::new("Balanced", Severity::Good)
    } else {
        Classification::new("Light", Severity::Info)
    }
}

/// Smaller teams need more slack to absorb absences.
pub fn target_buffer_pct(team_size: u64) -> f64 {
    if team_size < 10 {
        20.0
    } else {
        15.0
    }
}

/// Capacity buffer (% of capacity left unallocated) against the team-size target.
pub fn classify_capacity_buffer(buffer_pct: f64, team_size: u64) -> Classification {
    let buffer = if buffer_pct.is_nan() { 0.0 } else { buffer_pct };
    let target = target_buffer_pct(team_size);
    if buffer < 0.0 {
        Classification::new("Over Capacity", Severity::Danger)
    } else if buffer < target {
        Classification::new("Thin Buffer", Severity::Warning)
    } else if buffer <= target + 15.0 {
        Classification::new("Healthy Buffer", Severity::Good)
    } else {
        Classification::new("Excess Capacity", Severity::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utilization_bands() {
        assert_eq!(classify_utilization(125.0).label, "Critical");
        assert_eq!(classify_utilization(125.0).severity, Severity::Danger);
        assert_eq!(classify_utilization(120.0).label, "High");
        assert_eq!(classify_utilization(90.0).label, "High");
        assert_eq!(classify_utilization(89.9).label, "Optimal");
        assert_eq!(classify_utilization(75.0).label, "Optimal");
        assert_eq!(classify_utilization(75.0).severity, Severity::Good);
        assert_eq!(classify_utilization(70.0).label, "Optimal");
        assert_eq!(classify_utilization(50.0).label, "Moderate");
        assert_eq!(classify_utilization(49.9).label, "Low");
        assert_eq!(classify_utilization(0.0).label, "Low");
        assert_eq!(classify_utilization(f64::NAN).label, "Low");
    }

    #[test]
    fn test_utilization_total_and_monotonic() {
        let mut prev = Severity::Info;
        let mut rate = 0.0;
        while rate <= 300.0 {
            let c = classify_utilization(rate);
            assert!(UTILIZATION_LABELS.contains(&c.label));
            assert!(c.severity >= prev, "severity dropped at {rate}");
            assert_eq!(c.color, c.severity.color());
            prev = c.severity;
            rate += 0.5;
        }
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(utilization_description("Critical"), "Over Capacity");
        assert_eq!(utilization_description("Moderate"), "Ready for Projects");
        assert_eq!(utilization_description("Low"), "Significant Available Capacity");
    }

    #[test]
    fn test_project_load() {
        assert_eq!(classify_project_load(4.0).severity, Severity::Danger);
        assert_eq!(classify_project_load(3.5).severity, Severity::Warning);
        assert_eq!(classify_project_load(2.0).label, "Balanced");
        assert_eq!(classify_project_load(1.5).label, "Light");
    }

    #[test]
    fn test_capacity_buffer_depends_on_team_size() {
        assert_eq!(classify_capacity_buffer(-5.0, 4).label, "Over Capacity");
        // 17% is thin for a small team, healthy for a large one
        assert_eq!(classify_capacity_buffer(17.0, 4).label, "Thin Buffer");
        assert_eq!(classify_capacity_buffer(17.0, 25).label, "Healthy Buffer");
        assert_eq!(classify_capacity_buffer(35.0, 4).label, "Healthy Buffer");
        assert_eq!(classify_capacity_buffer(36.0, 4).label, "Excess Capacity");
    }
}
