use crate::members::Resource;

/// Fallback work week when neither the company nor the config sets one.
pub const FALLBACK_WEEKLY_HOURS: f64 = 40.0;

/// Effective weekly capacity: the member's override if positive, else the company default.
pub fn resolve_capacity(member: &Resource, company_default_hours: f64) -> f64 {
    match member.weekly_capacity() {
        Some(c) if c.is_finite() && c > 0.0 => c,
        _ => company_default_hours,
    }
}

/// Pick the company work week: office setting, then configured default, then 40h.
pub fn company_default_hours(office_setting: Option<f64>, configured: Option<&str>) -> f64 {
    office_setting
        .filter(|h| h.is_finite() && *h > 0.0)
        .or_else(|| {
            configured
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|h| h.is_finite() && *h > 0.0)
        })
        .unwrap_or(FALLBACK_WEEKLY_HOURS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::members::fixtures::{member, pending};

    #[test]
    fn test_override_wins() {
        let m = Resource::Active(member("m1", "Ada", Some(32.0)));
        assert_eq!(resolve_capacity(&m, 40.0), 32.0);
    }

    #[test]
    fn test_missing_or_zero_override_uses_default() {
        let none = Resource::Active(member("m1", "Ada", None));
        let zero = Resource::Pending(pending("i1", "Bo", Some(0.0)));
        let negative = Resource::Active(member("m2", "Cy", Some(-5.0)));
        assert_eq!(resolve_capacity(&none, 37.5), 37.5);
        assert_eq!(resolve_capacity(&zero, 37.5), 37.5);
        assert_eq!(resolve_capacity(&negative, 37.5), 37.5);
    }

    #[test]
    fn test_company_default_precedence() {
        assert_eq!(company_default_hours(Some(35.0), Some("40")), 35.0);
        assert_eq!(company_default_hours(None, Some("37.5")), 37.5);
        assert_eq!(company_default_hours(Some(0.0), Some("abc")), FALLBACK_WEEKLY_HOURS);
        assert_eq!(company_default_hours(None, None), FALLBACK_WEEKLY_HOURS);
    }
}
