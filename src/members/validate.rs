use std::sync::LazyLock;

use regex::Regex;

use super::{MemberPatch, NewMember};
use crate::error::{Error, Result};

static RE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Upper bound on a weekly capacity override (hours).
pub const MAX_WEEKLY_CAPACITY: f64 = 168.0;

pub fn is_valid_email(s: &str) -> bool {
    RE_EMAIL.is_match(s.trim())
}

/// Validate an add/invite form. `require_email` is set for email invites.
pub fn validate_new_member(input: &NewMember, require_email: bool) -> Result<()> {
    if input.first_name.trim().is_empty() {
        return Err(Error::validation("first_name", "is required"));
    }

    match input.email.as_deref().map(str::trim) {
        None | Some("") if require_email => {
            return Err(Error::validation("email", "is required"));
        }
        Some(email) if !email.is_empty() && !is_valid_email(email) => {
            return Err(Error::validation(
                "email",
                format!("'{email}' is not a valid address"),
            ));
        }
        _ => {}
    }

    validate_capacity(input.weekly_capacity)
}

/// Validate an edit form or bulk update.
pub fn validate_patch(patch: &MemberPatch) -> Result<()> {
    if patch.is_empty() {
        return Err(Error::validation("patch", "no fields to update"));
    }
    if let Some(name) = &patch.first_name {
        if name.trim().is_empty() {
            return Err(Error::validation("first_name", "cannot be blank"));
        }
    }
    validate_capacity(patch.weekly_capacity)
}

fn validate_capacity(capacity: Option<f64>) -> Result<()> {
    match capacity {
        Some(c) if !c.is_finite() || c <= 0.0 => Err(Error::validation(
            "weekly_capacity",
            "must be greater than zero",
        )),
        Some(c) if c > MAX_WEEKLY_CAPACITY => Err(Error::validation(
            "weekly_capacity",
            format!("cannot exceed {MAX_WEEKLY_CAPACITY} hours"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(first: &str, email: Option<&str>, capacity: Option<f64>) -> NewMember {
        NewMember {
            first_name: first.to_string(),
            email: email.map(str::to_string),
            weekly_capacity: capacity,
            ..Default::default()
        }
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email(" jane.doe@firm.example "));
        assert!(!is_valid_email("jane"));
        assert!(!is_valid_email("jane@firm"));
        assert!(!is_valid_email("ja ne@firm.com"));
    }

    #[test]
    fn test_missing_email_on_invite() {
        let err = validate_new_member(&input("Ada", None, None), true).unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "email"));
        let err = validate_new_member(&input("Ada", Some("  "), None), true).unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "email"));
    }

    #[test]
    fn test_email_optional_for_pre_registered() {
        assert!(validate_new_member(&input("Ada", None, None), false).is_ok());
    }

    #[test]
    fn test_malformed_email() {
        let err = validate_new_member(&input("Ada", Some("ada-at-firm"), None), false).unwrap_err();
        assert!(err.to_string().contains("not a valid address"));
    }

    #[test]
    fn test_non_positive_capacity() {
        for c in [0.0, -8.0, f64::NAN] {
            let err = validate_new_member(&input("Ada", None, Some(c)), false).unwrap_err();
            assert!(matches!(err, Error::Validation { ref field, .. } if field == "weekly_capacity"));
        }
        assert!(validate_new_member(&input("Ada", None, Some(200.0)), false).is_err());
        assert!(validate_new_member(&input("Ada", None, Some(37.5)), false).is_ok());
    }

    #[test]
    fn test_blank_name() {
        assert!(validate_new_member(&input("  ", None, None), false).is_err());
    }

    #[test]
    fn test_patch_rules() {
        assert!(validate_patch(&MemberPatch::default()).is_err());
        let patch = MemberPatch {
            weekly_capacity: Some(0.0),
            ..Default::default()
        };
        assert!(validate_patch(&patch).is_err());
        let patch = MemberPatch {
            department: Some("Engineering".into()),
            ..Default::default()
        };
        assert!(validate_patch(&patch).is_ok());
    }
}
